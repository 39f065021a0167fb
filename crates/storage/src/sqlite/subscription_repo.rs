use async_trait::async_trait;
use quest_core::model::{UserId, UserSubscription};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{db_err, ser};
use crate::repository::{StorageError, SubscriptionRepository};

#[async_trait]
impl SubscriptionRepository for SqliteRepository {
    async fn get_subscription(
        &self,
        user: &UserId,
    ) -> Result<Option<UserSubscription>, StorageError> {
        let row = sqlx::query(
            "SELECT current_period_end FROM user_subscriptions WHERE user_id = ?1",
        )
        .bind(user.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(UserSubscription::new(
            user.clone(),
            row.try_get("current_period_end").map_err(ser)?,
        )))
    }

    async fn upsert_subscription(
        &self,
        subscription: &UserSubscription,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO user_subscriptions (user_id, current_period_end)
            VALUES (?1, ?2)
            ON CONFLICT(user_id) DO UPDATE SET
                current_period_end = excluded.current_period_end
            ",
        )
        .bind(subscription.user_id.as_str())
        .bind(subscription.current_period_end)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }
}
