use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use quest_core::model::{
    ChallengeId, ChallengeProgress, CourseId, LessonId, ProgressRuleError, UserId, UserProgress,
};
use storage::repository::{
    ChallengeProgressRepository, CourseRepository, SubscriptionRepository, UserProgressRepository,
};

use crate::Clock;
use crate::error::ChallengeServiceError;

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// Result of submitting a correct answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeOutcome {
    /// Progress recorded and XP awarded. `practice` is true when the challenge
    /// had been attempted before.
    Completed {
        lesson_id: LessonId,
        practice: bool,
        progress: UserProgress,
    },
    /// The learner has no hearts left and is not practicing or subscribed.
    OutOfHearts,
}

/// Result of submitting a wrong answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartsOutcome {
    /// One heart was taken.
    Reduced(UserProgress),
    /// Practice mistakes are free.
    Practice,
    /// Pro learners do not lose hearts.
    Subscribed,
    /// Nothing left to take.
    OutOfHearts,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Records challenge attempts and applies the hearts/XP rules.
///
/// Every operation that rewrites a learner's progress row holds that learner's
/// write lock from the first read to the last write. Clones share the locks.
#[derive(Clone)]
pub struct ChallengeService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
    users: Arc<dyn UserProgressRepository>,
    attempts: Arc<dyn ChallengeProgressRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    writers: Arc<Mutex<HashMap<UserId, Arc<Mutex<()>>>>>,
}

impl ChallengeService {
    #[must_use]
    pub fn new(
        clock: Clock,
        courses: Arc<dyn CourseRepository>,
        users: Arc<dyn UserProgressRepository>,
        attempts: Arc<dyn ChallengeProgressRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
    ) -> Self {
        Self {
            clock,
            courses,
            users,
            attempts,
            subscriptions,
            writers: Arc::default(),
        }
    }

    async fn lock_user(&self, user: &UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut writers = self.writers.lock().await;
            Arc::clone(writers.entry(user.clone()).or_default())
        };
        lock.lock_owned().await
    }

    async fn load_user(&self, user: &UserId) -> Result<UserProgress, ChallengeServiceError> {
        self.users
            .get_user_progress(user)
            .await?
            .ok_or(ChallengeServiceError::UserProgressNotFound)
    }

    async fn lesson_of(&self, challenge: ChallengeId) -> Result<LessonId, ChallengeServiceError> {
        self.courses
            .challenge_lesson(challenge)
            .await?
            .ok_or(ChallengeServiceError::ChallengeNotFound(challenge))
    }

    async fn is_practice(
        &self,
        user: &UserId,
        challenge: ChallengeId,
    ) -> Result<bool, ChallengeServiceError> {
        Ok(self.attempts.get_progress(user, challenge).await?.is_some())
    }

    /// Whether the learner currently holds an active Pro subscription.
    ///
    /// # Errors
    ///
    /// Returns `ChallengeServiceError::Storage` if repository access fails.
    pub async fn is_pro(&self, user: &UserId) -> Result<bool, ChallengeServiceError> {
        let now = self.clock.now();
        Ok(self
            .subscriptions
            .get_subscription(user)
            .await?
            .is_some_and(|s| s.is_active(now)))
    }

    /// Record a correct answer.
    ///
    /// # Errors
    ///
    /// Returns `ChallengeServiceError::UserProgressNotFound` if the learner has
    /// not started a course, `ChallengeServiceError::ChallengeNotFound` for an
    /// unknown challenge, or `ChallengeServiceError::Storage` on persistence failures.
    pub async fn complete_challenge(
        &self,
        user: &UserId,
        challenge: ChallengeId,
    ) -> Result<ChallengeOutcome, ChallengeServiceError> {
        let _writer = self.lock_user(user).await;
        let mut progress = self.load_user(user).await?;
        let lesson_id = self.lesson_of(challenge).await?;
        let practice = self.is_practice(user, challenge).await?;

        if !progress.has_hearts() && !practice && !self.is_pro(user).await? {
            tracing::debug!(%user, %challenge, "answer rejected, no hearts left");
            return Ok(ChallengeOutcome::OutOfHearts);
        }

        self.attempts
            .upsert_progress(&ChallengeProgress::new(user.clone(), challenge, true))
            .await?;
        progress.award_challenge(practice);
        self.users.upsert_user_progress(&progress).await?;

        tracing::info!(
            %user,
            %challenge,
            lesson = %lesson_id,
            practice,
            points = progress.points(),
            hearts = progress.hearts(),
            "challenge completed"
        );
        Ok(ChallengeOutcome::Completed {
            lesson_id,
            practice,
            progress,
        })
    }

    /// Record a wrong answer.
    ///
    /// # Errors
    ///
    /// Same as [`ChallengeService::complete_challenge`].
    pub async fn reduce_hearts(
        &self,
        user: &UserId,
        challenge: ChallengeId,
    ) -> Result<HeartsOutcome, ChallengeServiceError> {
        let _writer = self.lock_user(user).await;
        let mut progress = self.load_user(user).await?;
        self.lesson_of(challenge).await?;

        if self.is_practice(user, challenge).await? {
            return Ok(HeartsOutcome::Practice);
        }
        if self.is_pro(user).await? {
            return Ok(HeartsOutcome::Subscribed);
        }
        match progress.lose_heart() {
            Ok(()) => {}
            Err(ProgressRuleError::OutOfHearts) => return Ok(HeartsOutcome::OutOfHearts),
            Err(other) => return Err(other.into()),
        }

        self.users.upsert_user_progress(&progress).await?;
        tracing::info!(%user, %challenge, hearts = progress.hearts(), "heart lost");
        Ok(HeartsOutcome::Reduced(progress))
    }

    /// Spend XP to refill hearts.
    ///
    /// # Errors
    ///
    /// Returns `ChallengeServiceError::Rule` when hearts are full or XP is short,
    /// `ChallengeServiceError::UserProgressNotFound` if the learner has no row.
    pub async fn refill_hearts(&self, user: &UserId) -> Result<UserProgress, ChallengeServiceError> {
        let _writer = self.lock_user(user).await;
        let mut progress = self.load_user(user).await?;
        progress.refill_hearts()?;
        self.users.upsert_user_progress(&progress).await?;
        tracing::info!(%user, points = progress.points(), "hearts refilled");
        Ok(progress)
    }

    /// Make `course` the learner's active course, creating their progress row
    /// on first use.
    ///
    /// # Errors
    ///
    /// Returns `ChallengeServiceError::CourseNotFound` for unknown courses and
    /// `ChallengeServiceError::CourseHasNoContent` when no unit has a lesson.
    pub async fn select_course(
        &self,
        user: &UserId,
        course: CourseId,
        user_name: &str,
        user_image_src: &str,
    ) -> Result<UserProgress, ChallengeServiceError> {
        if self.courses.get_course(course).await?.is_none() {
            return Err(ChallengeServiceError::CourseNotFound(course));
        }
        let units = self.courses.units_with_progress(user, course).await?;
        if units.iter().all(|u| u.lessons.is_empty()) {
            return Err(ChallengeServiceError::CourseHasNoContent(course));
        }

        let _writer = self.lock_user(user).await;
        let progress = match self.users.get_user_progress(user).await? {
            Some(mut existing) => {
                existing.select_course(course, user_name, user_image_src);
                existing
            }
            None => {
                UserProgress::new_learner(user.clone(), user_name, user_image_src, Some(course))
            }
        };
        self.users.upsert_user_progress(&progress).await?;
        tracing::info!(%user, %course, "active course selected");
        Ok(progress)
    }
}
