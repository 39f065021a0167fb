use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use quest_core::model::{
    Challenge, ChallengeId, Course, CourseId, Lesson, LessonId, Unit, UserId, UserProgress,
};
use quest_core::time::fixed_now;
use services::{AppServices, ChallengeOutcome, Clock, ProgressService};
use storage::repository::{
    CourseRepository, InMemoryRepository, StorageError, UserProgressRepository,
};
use storage::seed::SAMPLE_COURSE_ID;

/// Counts tree reads so tests can assert which fetches happened.
struct CountingCourses {
    inner: InMemoryRepository,
    unit_fetches: AtomicUsize,
    lesson_fetches: AtomicUsize,
}

impl CountingCourses {
    fn new(inner: InMemoryRepository) -> Self {
        Self {
            inner,
            unit_fetches: AtomicUsize::new(0),
            lesson_fetches: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CourseRepository for CountingCourses {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        self.inner.upsert_course(course).await
    }

    async fn upsert_unit(&self, unit: &Unit) -> Result<(), StorageError> {
        self.inner.upsert_unit(unit).await
    }

    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        self.inner.upsert_lesson(lesson).await
    }

    async fn upsert_challenge(&self, challenge: &Challenge) -> Result<(), StorageError> {
        self.inner.upsert_challenge(challenge).await
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        self.inner.list_courses().await
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        self.inner.get_course(id).await
    }

    async fn units_with_progress(
        &self,
        user: &UserId,
        course: CourseId,
    ) -> Result<Vec<Unit>, StorageError> {
        self.unit_fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.units_with_progress(user, course).await
    }

    async fn lesson_with_progress(
        &self,
        user: &UserId,
        lesson: LessonId,
    ) -> Result<Option<Lesson>, StorageError> {
        self.lesson_fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.lesson_with_progress(user, lesson).await
    }

    async fn challenge_lesson(
        &self,
        challenge: ChallengeId,
    ) -> Result<Option<LessonId>, StorageError> {
        self.inner.challenge_lesson(challenge).await
    }
}

fn user() -> UserId {
    UserId::new("user_1").unwrap()
}

async fn seeded_services() -> AppServices {
    let services = AppServices::in_memory(Clock::fixed(fixed_now()));
    services.seed_sample_course().await.unwrap();
    services
        .challenges()
        .select_course(&user(), SAMPLE_COURSE_ID, "Ada", "/ada.png")
        .await
        .unwrap();
    services
}

#[tokio::test]
async fn no_active_course_yields_zero_and_none_without_reading_units() {
    let repo = InMemoryRepository::new();
    storage::seed::seed_sample_course(&repo).await.unwrap();
    repo.upsert_user_progress(&UserProgress::new_learner(user(), "Ada", "", None))
        .await
        .unwrap();

    let courses = Arc::new(CountingCourses::new(repo.clone()));
    let service = ProgressService::new(courses.clone(), Arc::new(repo));
    let request = service.request(user());

    assert_eq!(request.lesson_percentage().await.unwrap(), 0);
    assert!(request.course_progress().await.unwrap().is_none());
    assert!(request.lesson(None).await.unwrap().is_none());
    assert!(request.units().await.unwrap().is_empty());
    assert_eq!(courses.unit_fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_learner_has_no_progress() {
    let services = seeded_services().await;
    let request = services
        .progress()
        .request(UserId::new("never_signed_in").unwrap());
    assert!(request.user_progress().await.unwrap().is_none());
    assert!(request.course_progress().await.unwrap().is_none());
    assert_eq!(request.lesson_percentage().await.unwrap(), 0);
    assert!(request.quests().await.unwrap().is_empty());
}

#[tokio::test]
async fn one_request_reads_the_tree_once() {
    let repo = InMemoryRepository::new();
    storage::seed::seed_sample_course(&repo).await.unwrap();
    repo.upsert_user_progress(&UserProgress::new_learner(
        user(),
        "Ada",
        "",
        Some(SAMPLE_COURSE_ID),
    ))
    .await
    .unwrap();

    let courses = Arc::new(CountingCourses::new(repo.clone()));
    let service = ProgressService::new(courses.clone(), Arc::new(repo));
    let request = service.request(user());

    let progress = request.course_progress().await.unwrap().unwrap();
    assert_eq!(progress.active_lesson_id, Some(LessonId::new(1)));
    assert_eq!(request.lesson_percentage().await.unwrap(), 0);
    let lesson = request.lesson(None).await.unwrap().unwrap();
    assert_eq!(lesson.id, LessonId::new(1));
    assert_eq!(request.units().await.unwrap().len(), 2);

    assert_eq!(courses.unit_fetches.load(Ordering::SeqCst), 1);
    assert_eq!(courses.lesson_fetches.load(Ordering::SeqCst), 0);

    // A new request sees fresh data.
    let second = service.request(user());
    second.units().await.unwrap();
    assert_eq!(courses.unit_fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn completing_challenges_advances_the_active_lesson() {
    let services = seeded_services().await;
    let challenges = services.challenges();

    // Lesson 1 holds challenges 1..=3.
    let outcome = challenges
        .complete_challenge(&user(), ChallengeId::new(1))
        .await
        .unwrap();
    assert!(matches!(outcome, ChallengeOutcome::Completed { .. }));
    challenges
        .complete_challenge(&user(), ChallengeId::new(2))
        .await
        .unwrap();

    let request = services.progress().request(user());
    assert_eq!(request.lesson_percentage().await.unwrap(), 67);
    let view = request.lesson(None).await.unwrap().unwrap();
    let flags: Vec<bool> = view.challenges.iter().map(|c| c.completed).collect();
    assert_eq!(flags, vec![true, true, false]);
    assert!(!view.completed);
    assert_eq!(view.percentage, 67);

    challenges
        .complete_challenge(&user(), ChallengeId::new(3))
        .await
        .unwrap();

    let request = services.progress().request(user());
    let progress = request.course_progress().await.unwrap().unwrap();
    assert_eq!(progress.course.id(), SAMPLE_COURSE_ID);
    assert_eq!(progress.active_lesson_id, Some(LessonId::new(2)));
    assert_eq!(request.lesson_percentage().await.unwrap(), 0);

    let units = request.units().await.unwrap();
    assert!(units[0].lessons[0].completed);
    assert!(!units[0].lessons[1].completed);

    let finished = request.lesson(Some(LessonId::new(1))).await.unwrap().unwrap();
    assert!(finished.completed);
    assert_eq!(finished.percentage, 100);

    let quests = request.quests().await.unwrap();
    assert!(quests[0].completed);
    assert_eq!(quests[1].percentage, 60);
}

#[tokio::test]
async fn finishing_the_course_leaves_no_active_lesson() {
    let services = seeded_services().await;
    for id in 1..=10 {
        services
            .challenges()
            .complete_challenge(&user(), ChallengeId::new(id))
            .await
            .unwrap();
    }

    let request = services.progress().request(user());
    let progress = request.course_progress().await.unwrap().unwrap();
    assert!(progress.active_lesson.is_none());
    assert!(progress.active_unit.is_none());
    assert!(progress.active_lesson_id.is_none());
    assert_eq!(request.lesson_percentage().await.unwrap(), 0);
    assert!(request.units().await.unwrap().iter().all(|u| u.is_complete()));

    let board = services.leaderboard().top_ten().await.unwrap();
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].points, 100);
}

#[tokio::test]
async fn progress_views_serialize_for_the_api() {
    let services = seeded_services().await;
    let request = services.progress().request(user());
    let progress = request.course_progress().await.unwrap().unwrap();
    let json = serde_json::to_value(&progress).unwrap();
    assert_eq!(json["active_lesson_id"], 1);
    assert_eq!(json["active_lesson"]["completed"], false);
    assert_eq!(json["course"]["title"], "AWS Cloud Practitioner");
}
