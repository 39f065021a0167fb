use async_trait::async_trait;
use quest_core::model::{UserId, UserProgress};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{course_id_from_i64, db_err, id_to_i64, ser, u32_from_i64, user_id_from_str};
use crate::repository::{StorageError, UserProgressRepository};

fn map_user_progress_row(row: &SqliteRow) -> Result<UserProgress, StorageError> {
    let active_course_id = row
        .try_get::<Option<i64>, _>("active_course_id")
        .map_err(ser)?
        .map(course_id_from_i64)
        .transpose()?;

    Ok(UserProgress::from_persisted(
        user_id_from_str(row.try_get("user_id").map_err(ser)?)?,
        row.try_get("user_name").map_err(ser)?,
        row.try_get("user_image_src").map_err(ser)?,
        active_course_id,
        u32_from_i64("hearts", row.try_get::<i64, _>("hearts").map_err(ser)?)?,
        u32_from_i64("points", row.try_get::<i64, _>("points").map_err(ser)?)?,
        u32_from_i64("gems", row.try_get::<i64, _>("gems").map_err(ser)?)?,
    ))
}

#[async_trait]
impl UserProgressRepository for SqliteRepository {
    async fn get_user_progress(
        &self,
        user: &UserId,
    ) -> Result<Option<UserProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, user_name, user_image_src, active_course_id, hearts, points, gems
            FROM user_progress
            WHERE user_id = ?1
            ",
        )
        .bind(user.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_user_progress_row).transpose()
    }

    async fn upsert_user_progress(&self, progress: &UserProgress) -> Result<(), StorageError> {
        let active_course_id = progress
            .active_course_id()
            .map(|id| id_to_i64("course_id", id.value()))
            .transpose()?;

        sqlx::query(
            r"
            INSERT INTO user_progress (
                user_id, user_name, user_image_src, active_course_id, hearts, points, gems
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(user_id) DO UPDATE SET
                user_name = excluded.user_name,
                user_image_src = excluded.user_image_src,
                active_course_id = excluded.active_course_id,
                hearts = excluded.hearts,
                points = excluded.points,
                gems = excluded.gems
            ",
        )
        .bind(progress.user_id().as_str())
        .bind(progress.user_name())
        .bind(progress.user_image_src())
        .bind(active_course_id)
        .bind(i64::from(progress.hearts()))
        .bind(i64::from(progress.points()))
        .bind(i64::from(progress.gems()))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn top_users(&self, limit: usize) -> Result<Vec<UserProgress>, StorageError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            r"
            SELECT user_id, user_name, user_image_src, active_course_id, hearts, points, gems
            FROM user_progress
            ORDER BY points DESC, user_id ASC
            LIMIT ?1
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_user_progress_row).collect()
    }
}
