use std::sync::Arc;

use quest_core::leaderboard::{LeaderboardEntry, rank};
use quest_core::model::rules::LEADERBOARD_SIZE;
use storage::repository::UserProgressRepository;

use crate::error::LeaderboardError;

#[derive(Clone)]
pub struct LeaderboardService {
    users: Arc<dyn UserProgressRepository>,
}

impl LeaderboardService {
    #[must_use]
    pub fn new(users: Arc<dyn UserProgressRepository>) -> Self {
        Self { users }
    }

    /// The ten learners with the most XP.
    ///
    /// # Errors
    ///
    /// Returns `LeaderboardError::Storage` if repository access fails.
    pub async fn top_ten(&self) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        let users = self.users.top_users(LEADERBOARD_SIZE).await?;
        Ok(rank(&users, LEADERBOARD_SIZE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quest_core::model::{UserId, UserProgress};
    use storage::repository::InMemoryRepository;

    #[tokio::test]
    async fn top_ten_is_ranked_and_capped() {
        let repo = InMemoryRepository::new();
        for i in 0..12_u32 {
            let mut learner = UserProgress::new_learner(
                UserId::new(format!("user_{i:02}")).unwrap(),
                format!("Learner {i}"),
                "",
                None,
            );
            for _ in 0..i {
                learner.award_challenge(false);
            }
            repo.upsert_user_progress(&learner).await.unwrap();
        }

        let board = LeaderboardService::new(Arc::new(repo)).top_ten().await.unwrap();
        assert_eq!(board.len(), LEADERBOARD_SIZE);
        assert_eq!(board[0].user_id, "user_11");
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[9].user_id, "user_02");
    }
}
