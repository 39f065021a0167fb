use async_trait::async_trait;
use quest_core::model::{
    Challenge, ChallengeId, ChallengeProgress, Course, CourseId, Lesson, LessonId, Unit, UnitId,
    UserId, UserProgress, UserSubscription,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Course content, read back as the learner-specific tree the progress engine consumes.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Persist or update a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError>;

    /// Persist or update a unit. Its `lessons` are ignored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the course does not exist.
    async fn upsert_unit(&self, unit: &Unit) -> Result<(), StorageError>;

    /// Persist or update a lesson. Its `challenges` are ignored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the unit does not exist.
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError>;

    /// Persist or update a challenge. Its `progress` rows are ignored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the lesson does not exist.
    async fn upsert_challenge(&self, challenge: &Challenge) -> Result<(), StorageError>;

    /// All courses ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_courses(&self) -> Result<Vec<Course>, StorageError>;

    /// Fetch a course by id; `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError>;

    /// Units of a course with their lessons, challenges and `user`'s progress rows.
    ///
    /// Units come ordered by `order` then id, lessons and challenges likewise.
    /// Progress rows belonging to other users are never included.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn units_with_progress(
        &self,
        user: &UserId,
        course: CourseId,
    ) -> Result<Vec<Unit>, StorageError>;

    /// A single lesson with its challenges and `user`'s progress rows.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn lesson_with_progress(
        &self,
        user: &UserId,
        lesson: LessonId,
    ) -> Result<Option<Lesson>, StorageError>;

    /// The lesson a challenge belongs to; `Ok(None)` for unknown challenges.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn challenge_lesson(&self, challenge: ChallengeId)
    -> Result<Option<LessonId>, StorageError>;
}

#[async_trait]
pub trait UserProgressRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_user_progress(&self, user: &UserId)
    -> Result<Option<UserProgress>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the active course does not exist.
    async fn upsert_user_progress(&self, progress: &UserProgress) -> Result<(), StorageError>;

    /// Learners with the most points first, ties by user id, at most `limit`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn top_users(&self, limit: usize) -> Result<Vec<UserProgress>, StorageError>;
}

/// Write side of challenge attempts. One row per (user, challenge).
#[async_trait]
pub trait ChallengeProgressRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_progress(
        &self,
        user: &UserId,
        challenge: ChallengeId,
    ) -> Result<Option<ChallengeProgress>, StorageError>;

    /// Insert or update the row for `(progress.user_id, progress.challenge_id)`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the challenge does not exist.
    async fn upsert_progress(&self, progress: &ChallengeProgress) -> Result<(), StorageError>;
}

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_subscription(
        &self,
        user: &UserId,
    ) -> Result<Option<UserSubscription>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn upsert_subscription(&self, subscription: &UserSubscription)
    -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct Tables {
    courses: HashMap<CourseId, Course>,
    units: HashMap<UnitId, Unit>,
    lessons: HashMap<LessonId, Lesson>,
    challenges: HashMap<ChallengeId, Challenge>,
    progress: HashMap<(UserId, ChallengeId), ChallengeProgress>,
    users: HashMap<UserId, UserProgress>,
    subscriptions: HashMap<UserId, UserSubscription>,
}

impl Tables {
    fn challenges_for(&self, user: &UserId, lesson: LessonId) -> Vec<Challenge> {
        let mut challenges: Vec<Challenge> = self
            .challenges
            .values()
            .filter(|c| c.lesson_id == lesson)
            .map(|c| {
                let rows = self
                    .progress
                    .get(&(user.clone(), c.id))
                    .cloned()
                    .into_iter()
                    .collect();
                c.clone().with_progress(rows)
            })
            .collect();
        challenges.sort_by_key(|c| (c.order, c.id));
        challenges
    }

    fn lesson_tree(&self, user: &UserId, lesson: &Lesson) -> Lesson {
        lesson.clone().with_challenges(self.challenges_for(user, lesson.id))
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StorageError> {
        self.tables
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.courses.insert(course.id(), course.clone());
        Ok(())
    }

    async fn upsert_unit(&self, unit: &Unit) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.courses.contains_key(&unit.course_id) {
            return Err(StorageError::Conflict);
        }
        guard
            .units
            .insert(unit.id, unit.clone().with_lessons(Vec::new()));
        Ok(())
    }

    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.units.contains_key(&lesson.unit_id) {
            return Err(StorageError::Conflict);
        }
        guard
            .lessons
            .insert(lesson.id, lesson.clone().with_challenges(Vec::new()));
        Ok(())
    }

    async fn upsert_challenge(&self, challenge: &Challenge) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.lessons.contains_key(&challenge.lesson_id) {
            return Err(StorageError::Conflict);
        }
        guard
            .challenges
            .insert(challenge.id, challenge.clone().with_progress(Vec::new()));
        Ok(())
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        let guard = self.lock()?;
        let mut courses: Vec<Course> = guard.courses.values().cloned().collect();
        courses.sort_by_key(Course::id);
        Ok(courses)
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.courses.get(&id).cloned())
    }

    async fn units_with_progress(
        &self,
        user: &UserId,
        course: CourseId,
    ) -> Result<Vec<Unit>, StorageError> {
        let guard = self.lock()?;
        let mut units: Vec<Unit> = guard
            .units
            .values()
            .filter(|u| u.course_id == course)
            .map(|u| {
                let mut lessons: Vec<Lesson> = guard
                    .lessons
                    .values()
                    .filter(|l| l.unit_id == u.id)
                    .map(|l| guard.lesson_tree(user, l))
                    .collect();
                lessons.sort_by_key(Lesson::sort_key);
                u.clone().with_lessons(lessons)
            })
            .collect();
        units.sort_by_key(Unit::sort_key);
        Ok(units)
    }

    async fn lesson_with_progress(
        &self,
        user: &UserId,
        lesson: LessonId,
    ) -> Result<Option<Lesson>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.lessons.get(&lesson).map(|l| guard.lesson_tree(user, l)))
    }

    async fn challenge_lesson(
        &self,
        challenge: ChallengeId,
    ) -> Result<Option<LessonId>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.challenges.get(&challenge).map(|c| c.lesson_id))
    }
}

#[async_trait]
impl UserProgressRepository for InMemoryRepository {
    async fn get_user_progress(
        &self,
        user: &UserId,
    ) -> Result<Option<UserProgress>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.users.get(user).cloned())
    }

    async fn upsert_user_progress(&self, progress: &UserProgress) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if let Some(course) = progress.active_course_id() {
            if !guard.courses.contains_key(&course) {
                return Err(StorageError::Conflict);
            }
        }
        guard
            .users
            .insert(progress.user_id().clone(), progress.clone());
        Ok(())
    }

    async fn top_users(&self, limit: usize) -> Result<Vec<UserProgress>, StorageError> {
        let guard = self.lock()?;
        let mut users: Vec<UserProgress> = guard.users.values().cloned().collect();
        users.sort_by(|a, b| {
            b.points()
                .cmp(&a.points())
                .then_with(|| a.user_id().cmp(b.user_id()))
        });
        users.truncate(limit);
        Ok(users)
    }
}

#[async_trait]
impl ChallengeProgressRepository for InMemoryRepository {
    async fn get_progress(
        &self,
        user: &UserId,
        challenge: ChallengeId,
    ) -> Result<Option<ChallengeProgress>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.progress.get(&(user.clone(), challenge)).cloned())
    }

    async fn upsert_progress(&self, progress: &ChallengeProgress) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.challenges.contains_key(&progress.challenge_id) {
            return Err(StorageError::Conflict);
        }
        guard.progress.insert(
            (progress.user_id.clone(), progress.challenge_id),
            progress.clone(),
        );
        Ok(())
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryRepository {
    async fn get_subscription(
        &self,
        user: &UserId,
    ) -> Result<Option<UserSubscription>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.subscriptions.get(user).cloned())
    }

    async fn upsert_subscription(
        &self,
        subscription: &UserSubscription,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard
            .subscriptions
            .insert(subscription.user_id.clone(), subscription.clone());
        Ok(())
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub courses: Arc<dyn CourseRepository>,
    pub user_progress: Arc<dyn UserProgressRepository>,
    pub challenge_progress: Arc<dyn ChallengeProgressRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            courses: Arc::new(repo.clone()),
            user_progress: Arc::new(repo.clone()),
            challenge_progress: Arc::new(repo.clone()),
            subscriptions: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quest_core::model::ChallengeKind;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    async fn seeded() -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        let course = CourseId::new(1);
        repo.upsert_course(&Course::new(course, "AWS Basics", "/aws.svg").unwrap())
            .await
            .unwrap();
        // inserted out of order on purpose
        for (id, order) in [(2, 2), (1, 1)] {
            repo.upsert_unit(
                &Unit::new(UnitId::new(id), course, format!("Unit {id}"), "", order).unwrap(),
            )
            .await
            .unwrap();
        }
        for (id, unit, order) in [(11, 1, 2), (10, 1, 1), (20, 2, 1)] {
            repo.upsert_lesson(
                &Lesson::new(LessonId::new(id), UnitId::new(unit), format!("L{id}"), order)
                    .unwrap(),
            )
            .await
            .unwrap();
        }
        for (id, lesson, order) in [(102, 10, 2), (101, 10, 1), (111, 11, 1), (201, 20, 1)] {
            repo.upsert_challenge(
                &Challenge::new(
                    ChallengeId::new(id),
                    LessonId::new(lesson),
                    ChallengeKind::Select,
                    format!("Q{id}"),
                    order,
                )
                .unwrap(),
            )
            .await
            .unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn tree_is_ordered_and_filtered_to_user() {
        let repo = seeded().await;
        repo.upsert_progress(&ChallengeProgress::new(user("a"), ChallengeId::new(101), true))
            .await
            .unwrap();
        repo.upsert_progress(&ChallengeProgress::new(user("b"), ChallengeId::new(102), true))
            .await
            .unwrap();

        let units = repo
            .units_with_progress(&user("a"), CourseId::new(1))
            .await
            .unwrap();
        let unit_ids: Vec<_> = units.iter().map(|u| u.id.value()).collect();
        assert_eq!(unit_ids, vec![1, 2]);
        let lesson_ids: Vec<_> = units[0].lessons.iter().map(|l| l.id.value()).collect();
        assert_eq!(lesson_ids, vec![10, 11]);

        let first = &units[0].lessons[0];
        let challenge_ids: Vec<_> = first.challenges.iter().map(|c| c.id.value()).collect();
        assert_eq!(challenge_ids, vec![101, 102]);
        assert_eq!(first.challenges[0].progress.len(), 1);
        assert!(first.challenges[1].progress.is_empty());
    }

    #[tokio::test]
    async fn children_require_parents() {
        let repo = InMemoryRepository::new();
        let unit = Unit::new(UnitId::new(1), CourseId::new(9), "Orphan", "", 1).unwrap();
        assert!(matches!(
            repo.upsert_unit(&unit).await,
            Err(StorageError::Conflict)
        ));
        let progress = ChallengeProgress::new(user("a"), ChallengeId::new(1), true);
        assert!(matches!(
            repo.upsert_progress(&progress).await,
            Err(StorageError::Conflict)
        ));
    }

    #[tokio::test]
    async fn progress_upsert_keeps_one_row_per_pair() {
        let repo = seeded().await;
        let id = ChallengeId::new(201);
        repo.upsert_progress(&ChallengeProgress::new(user("a"), id, false))
            .await
            .unwrap();
        repo.upsert_progress(&ChallengeProgress::new(user("a"), id, true))
            .await
            .unwrap();
        let lesson = repo
            .lesson_with_progress(&user("a"), LessonId::new(20))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(lesson.challenges[0].progress.len(), 1);
        assert!(lesson.challenges[0].progress[0].completed);
        assert_eq!(
            repo.challenge_lesson(id).await.unwrap(),
            Some(LessonId::new(20))
        );
    }
}
