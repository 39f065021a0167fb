//! Leaderboard ranking over learners' XP.

use serde::Serialize;

use crate::model::UserProgress;

/// One row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: String,
    pub user_name: String,
    pub user_image_src: String,
    pub points: u32,
}

/// Rank learners by points, highest first, keeping at most `limit` rows.
///
/// Ties are broken by user id so the board is stable between requests.
/// Ranks are 1-based and strictly increasing.
#[must_use]
pub fn rank(users: &[UserProgress], limit: usize) -> Vec<LeaderboardEntry> {
    let mut ordered: Vec<&UserProgress> = users.iter().collect();
    ordered.sort_by(|a, b| {
        b.points()
            .cmp(&a.points())
            .then_with(|| a.user_id().cmp(b.user_id()))
    });

    ordered
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(idx, user)| LeaderboardEntry {
            rank: idx + 1,
            user_id: user.user_id().to_string(),
            user_name: user.user_name().to_string(),
            user_image_src: user.user_image_src().to_string(),
            points: user.points(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UserId;

    fn learner(id: &str, points: u32) -> UserProgress {
        UserProgress::from_persisted(
            UserId::new(id).unwrap(),
            id.to_uppercase(),
            String::new(),
            None,
            5,
            points,
            0,
        )
    }

    #[test]
    fn ranks_by_points_then_user_id() {
        let users = vec![
            learner("carol", 40),
            learner("bob", 90),
            learner("alice", 40),
            learner("dave", 10),
        ];
        let board = rank(&users, 10);
        let order: Vec<_> = board.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(order, vec!["bob", "alice", "carol", "dave"]);
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[3].rank, 4);
    }

    #[test]
    fn truncates_to_limit() {
        let users: Vec<_> = (0..15).map(|i| learner(&format!("u{i:02}"), i)).collect();
        let board = rank(&users, 10);
        assert_eq!(board.len(), 10);
        assert_eq!(board[0].points, 14);
        assert!(rank(&[], 10).is_empty());
    }
}
