use async_trait::async_trait;
use quest_core::model::{ChallengeId, ChallengeProgress, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{db_err, id_to_i64, ser};
use crate::repository::{ChallengeProgressRepository, StorageError};

#[async_trait]
impl ChallengeProgressRepository for SqliteRepository {
    async fn get_progress(
        &self,
        user: &UserId,
        challenge: ChallengeId,
    ) -> Result<Option<ChallengeProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT completed
            FROM challenge_progress
            WHERE user_id = ?1 AND challenge_id = ?2
            ",
        )
        .bind(user.as_str())
        .bind(id_to_i64("challenge_id", challenge.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let completed: i64 = row.try_get("completed").map_err(ser)?;
        Ok(Some(ChallengeProgress::new(
            user.clone(),
            challenge,
            completed != 0,
        )))
    }

    async fn upsert_progress(&self, progress: &ChallengeProgress) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO challenge_progress (user_id, challenge_id, completed)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id, challenge_id) DO UPDATE SET
                completed = excluded.completed
            ",
        )
        .bind(progress.user_id.as_str())
        .bind(id_to_i64("challenge_id", progress.challenge_id.value())?)
        .bind(i64::from(progress.completed))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }
}
