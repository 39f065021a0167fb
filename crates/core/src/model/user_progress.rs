use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CourseId, UserId};
use crate::model::rules::{MAX_HEARTS, POINTS_PER_CHALLENGE, POINTS_TO_REFILL};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Gameplay rule violations when mutating a learner's progress.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressRuleError {
    #[error("hearts are already full")]
    HeartsFull,

    #[error("not enough points to refill hearts (have {have}, need {need})")]
    NotEnoughPoints { have: u32, need: u32 },

    #[error("no hearts left")]
    OutOfHearts,
}

//
// ─── USER PROGRESS ─────────────────────────────────────────────────────────────
//

/// Per-learner gameplay state: hearts, XP, gems and the active course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProgress {
    user_id: UserId,
    user_name: String,
    user_image_src: String,
    active_course_id: Option<CourseId>,
    hearts: u32,
    points: u32,
    gems: u32,
}

impl UserProgress {
    /// A learner who just joined: full hearts, no XP, no gems.
    #[must_use]
    pub fn new_learner(
        user_id: UserId,
        user_name: impl Into<String>,
        user_image_src: impl Into<String>,
        active_course_id: Option<CourseId>,
    ) -> Self {
        Self {
            user_id,
            user_name: user_name.into(),
            user_image_src: user_image_src.into(),
            active_course_id,
            hearts: MAX_HEARTS,
            points: 0,
            gems: 0,
        }
    }

    /// Rehydrate a record from storage.
    ///
    /// Hearts are not capped here; Pro learners may hold more than
    /// [`MAX_HEARTS`] if another collaborator granted them.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn from_persisted(
        user_id: UserId,
        user_name: String,
        user_image_src: String,
        active_course_id: Option<CourseId>,
        hearts: u32,
        points: u32,
        gems: u32,
    ) -> Self {
        Self {
            user_id,
            user_name,
            user_image_src,
            active_course_id,
            hearts,
            points,
            gems,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    #[must_use]
    pub fn user_image_src(&self) -> &str {
        &self.user_image_src
    }

    #[must_use]
    pub fn active_course_id(&self) -> Option<CourseId> {
        self.active_course_id
    }

    #[must_use]
    pub fn hearts(&self) -> u32 {
        self.hearts
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    #[must_use]
    pub fn gems(&self) -> u32 {
        self.gems
    }

    #[must_use]
    pub fn has_hearts(&self) -> bool {
        self.hearts > 0
    }

    /// Switch the learner to a new course, keeping hearts and XP.
    pub fn select_course(
        &mut self,
        course_id: CourseId,
        user_name: impl Into<String>,
        user_image_src: impl Into<String>,
    ) {
        self.active_course_id = Some(course_id);
        self.user_name = user_name.into();
        self.user_image_src = user_image_src.into();
    }

    /// Credit a completed challenge.
    ///
    /// Practice (re-doing an already attempted challenge) also restores one
    /// heart, never above [`MAX_HEARTS`].
    pub fn award_challenge(&mut self, practice: bool) {
        self.points = self.points.saturating_add(POINTS_PER_CHALLENGE);
        if practice && self.hearts < MAX_HEARTS {
            self.hearts += 1;
        }
    }

    /// Take one heart for a wrong answer.
    ///
    /// # Errors
    ///
    /// Returns `ProgressRuleError::OutOfHearts` when no hearts are left.
    pub fn lose_heart(&mut self) -> Result<(), ProgressRuleError> {
        if self.hearts == 0 {
            return Err(ProgressRuleError::OutOfHearts);
        }
        self.hearts -= 1;
        Ok(())
    }

    /// Trade [`POINTS_TO_REFILL`] XP for a full set of hearts.
    ///
    /// # Errors
    ///
    /// Returns `ProgressRuleError::HeartsFull` if hearts are already at the cap,
    /// or `ProgressRuleError::NotEnoughPoints` if the learner cannot pay.
    pub fn refill_hearts(&mut self) -> Result<(), ProgressRuleError> {
        if self.hearts >= MAX_HEARTS {
            return Err(ProgressRuleError::HeartsFull);
        }
        if self.points < POINTS_TO_REFILL {
            return Err(ProgressRuleError::NotEnoughPoints {
                have: self.points,
                need: POINTS_TO_REFILL,
            });
        }
        self.hearts = MAX_HEARTS;
        self.points -= POINTS_TO_REFILL;
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn learner() -> UserProgress {
        UserProgress::new_learner(
            UserId::new("user_1").unwrap(),
            "Ada",
            "/mascot.svg",
            Some(CourseId::new(1)),
        )
    }

    #[test]
    fn new_learner_starts_with_full_hearts() {
        let progress = learner();
        assert_eq!(progress.hearts(), MAX_HEARTS);
        assert_eq!(progress.points(), 0);
        assert_eq!(progress.gems(), 0);
    }

    #[test]
    fn first_completion_awards_points_only() {
        let mut progress = learner();
        progress.lose_heart().unwrap();
        progress.award_challenge(false);
        assert_eq!(progress.points(), POINTS_PER_CHALLENGE);
        assert_eq!(progress.hearts(), MAX_HEARTS - 1);
    }

    #[test]
    fn practice_restores_a_heart_up_to_the_cap() {
        let mut progress = learner();
        progress.lose_heart().unwrap();
        progress.award_challenge(true);
        assert_eq!(progress.hearts(), MAX_HEARTS);
        progress.award_challenge(true);
        assert_eq!(progress.hearts(), MAX_HEARTS);
        assert_eq!(progress.points(), 2 * POINTS_PER_CHALLENGE);
    }

    #[test]
    fn lose_heart_stops_at_zero() {
        let mut progress = learner();
        for _ in 0..MAX_HEARTS {
            progress.lose_heart().unwrap();
        }
        assert!(!progress.has_hearts());
        assert_eq!(progress.lose_heart(), Err(ProgressRuleError::OutOfHearts));
    }

    #[test]
    fn refill_requires_missing_hearts_and_points() {
        let mut progress = learner();
        assert_eq!(progress.refill_hearts(), Err(ProgressRuleError::HeartsFull));

        progress.lose_heart().unwrap();
        assert_eq!(
            progress.refill_hearts(),
            Err(ProgressRuleError::NotEnoughPoints {
                have: 0,
                need: POINTS_TO_REFILL
            })
        );

        progress.award_challenge(false);
        progress.refill_hearts().unwrap();
        assert_eq!(progress.hearts(), MAX_HEARTS);
        assert_eq!(progress.points(), 0);
    }

    #[test]
    fn select_course_keeps_hearts_and_points() {
        let mut progress = learner();
        progress.award_challenge(false);
        progress.select_course(CourseId::new(2), "Ada L.", "/ada.png");
        assert_eq!(progress.active_course_id(), Some(CourseId::new(2)));
        assert_eq!(progress.points(), POINTS_PER_CHALLENGE);
        assert_eq!(progress.user_name(), "Ada L.");
    }
}
