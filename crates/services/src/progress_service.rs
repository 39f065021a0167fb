use std::sync::Arc;

use serde::Serialize;
use tokio::sync::OnceCell;

use quest_core::model::{Challenge, Course, Lesson, LessonId, Unit, UserId, UserProgress};
use quest_core::progress::{
    AnnotatedLesson, AnnotatedUnit, annotate_lessons, is_challenge_complete, is_lesson_complete,
    lesson_percentage, resolve_active_lesson,
};
use quest_core::quests::{QuestStatus, quest_progress};
use storage::repository::{CourseRepository, UserProgressRepository};

use crate::error::ProgressServiceError;

//
// ─── VIEWS ─────────────────────────────────────────────────────────────────────
//

/// "Continue learning" card data.
///
/// `active_lesson` is `None` once every lesson of the course is complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseProgress {
    pub course: Course,
    pub active_unit: Option<Unit>,
    pub active_lesson: Option<AnnotatedLesson>,
    pub active_lesson_id: Option<LessonId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChallengeView {
    pub challenge: Challenge,
    pub completed: bool,
}

/// A lesson ready for the lesson screen: per-challenge flags plus totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonView {
    pub id: LessonId,
    pub title: String,
    pub challenges: Vec<ChallengeView>,
    pub completed: bool,
    pub percentage: u8,
}

impl LessonView {
    #[must_use]
    pub fn from_lesson(lesson: &Lesson) -> Self {
        Self {
            id: lesson.id,
            title: lesson.title.clone(),
            challenges: lesson
                .challenges
                .iter()
                .map(|c| ChallengeView {
                    challenge: c.clone(),
                    completed: is_challenge_complete(c),
                })
                .collect(),
            completed: is_lesson_complete(lesson),
            percentage: lesson_percentage(lesson),
        }
    }
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Entry point for progress reads. Hands out one [`ProgressRequest`] per request.
#[derive(Clone)]
pub struct ProgressService {
    courses: Arc<dyn CourseRepository>,
    users: Arc<dyn UserProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(courses: Arc<dyn CourseRepository>, users: Arc<dyn UserProgressRepository>) -> Self {
        Self { courses, users }
    }

    /// Start a request-scoped view of `user_id`'s progress.
    ///
    /// Reads made through the returned value are memoized until it is dropped.
    #[must_use]
    pub fn request(&self, user_id: UserId) -> ProgressRequest {
        ProgressRequest {
            user_id,
            courses: Arc::clone(&self.courses),
            users: Arc::clone(&self.users),
            user_progress: OnceCell::new(),
            units: OnceCell::new(),
        }
    }
}

/// Progress reads for one user during one request.
///
/// The user row and the annotated course tree are each loaded at most once;
/// every derived answer (active lesson, percentage) comes from that single
/// snapshot, so two answers in the same request never disagree.
pub struct ProgressRequest {
    user_id: UserId,
    courses: Arc<dyn CourseRepository>,
    users: Arc<dyn UserProgressRepository>,
    user_progress: OnceCell<Option<UserProgress>>,
    units: OnceCell<Vec<AnnotatedUnit>>,
}

impl ProgressRequest {
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// The learner's progress row, if they have started.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn user_progress(&self) -> Result<Option<&UserProgress>, ProgressServiceError> {
        let row = self
            .user_progress
            .get_or_try_init(|| async {
                self.users
                    .get_user_progress(&self.user_id)
                    .await
                    .map_err(ProgressServiceError::from)
            })
            .await?;
        Ok(row.as_ref())
    }

    /// Units of the active course with per-lesson completion, in course order.
    ///
    /// Empty when the learner has no active course; the course tree is not
    /// read in that case.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn units(&self) -> Result<&[AnnotatedUnit], ProgressServiceError> {
        let active_course = self
            .user_progress()
            .await?
            .and_then(UserProgress::active_course_id);

        let units = self
            .units
            .get_or_try_init(|| async {
                let Some(course_id) = active_course else {
                    return Ok(Vec::new());
                };
                let raw = self
                    .courses
                    .units_with_progress(&self.user_id, course_id)
                    .await?;
                let annotated = annotate_lessons(&raw);
                tracing::debug!(
                    user = %self.user_id,
                    course = %course_id,
                    units = annotated.len(),
                    "loaded course tree"
                );
                Ok::<_, ProgressServiceError>(annotated)
            })
            .await?;
        Ok(units.as_slice())
    }

    /// Active course plus the first incomplete lesson.
    ///
    /// Returns `Ok(None)` when the learner has no progress row, no active
    /// course, or the course no longer exists.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn course_progress(&self) -> Result<Option<CourseProgress>, ProgressServiceError> {
        let Some(course_id) = self
            .user_progress()
            .await?
            .and_then(UserProgress::active_course_id)
        else {
            return Ok(None);
        };

        let Some(course) = self.courses.get_course(course_id).await? else {
            tracing::warn!(user = %self.user_id, course = %course_id, "active course is missing");
            return Ok(None);
        };

        let units = self.units().await?;
        let active = resolve_active_lesson(units);

        Ok(Some(CourseProgress {
            course,
            active_unit: active.map(|a| a.unit.unit.clone()),
            active_lesson: active.map(|a| a.lesson.clone()),
            active_lesson_id: active.map(|a| a.lesson.id()),
        }))
    }

    /// A lesson with per-challenge completion.
    ///
    /// With `None`, the active lesson is taken from this request's course tree
    /// instead of being read again. With an explicit id, the lesson is loaded
    /// directly and may belong to any course.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn lesson(
        &self,
        lesson_id: Option<LessonId>,
    ) -> Result<Option<LessonView>, ProgressServiceError> {
        match lesson_id {
            Some(id) => {
                let lesson = self.courses.lesson_with_progress(&self.user_id, id).await?;
                Ok(lesson.as_ref().map(LessonView::from_lesson))
            }
            None => {
                let units = self.units().await?;
                Ok(resolve_active_lesson(units).map(|a| LessonView::from_lesson(&a.lesson.lesson)))
            }
        }
    }

    /// Completion percentage of the active lesson, or 0 when there is none.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn lesson_percentage(&self) -> Result<u8, ProgressServiceError> {
        let units = self.units().await?;
        Ok(resolve_active_lesson(units).map_or(0, |a| a.lesson.percentage()))
    }

    /// XP quests for the learner; empty before they have a progress row.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn quests(&self) -> Result<Vec<QuestStatus>, ProgressServiceError> {
        Ok(self
            .user_progress()
            .await?
            .map(|p| quest_progress(p.points()))
            .unwrap_or_default())
    }
}
