//! Gameplay constants shared by the engine and the services.

use chrono::Duration;

/// Hearts a learner starts with and can refill to.
pub const MAX_HEARTS: u32 = 5;

/// XP awarded for every completed challenge, first try or practice.
pub const POINTS_PER_CHALLENGE: u32 = 10;

/// XP spent to refill hearts back to [`MAX_HEARTS`].
pub const POINTS_TO_REFILL: u32 = 10;

/// Number of learners shown on the leaderboard.
pub const LEADERBOARD_SIZE: usize = 10;

/// XP milestones shown as quests.
pub const QUEST_MILESTONES: [u32; 5] = [20, 50, 100, 500, 1000];

/// Extra time a lapsed subscription stays active after its period ends.
#[must_use]
pub fn subscription_grace() -> Duration {
    Duration::days(1)
}
