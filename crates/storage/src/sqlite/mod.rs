use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{
    ChallengeProgressRepository, CourseRepository, Storage, SubscriptionRepository,
    UserProgressRepository,
};

mod challenge_progress_repo;
mod course_repo;
mod mapping;
mod migrate;
mod subscription_repo;
mod user_progress_repo;

/// One pool serving every repository trait.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// Open the database at `database_url`, creating the file if needed.
    ///
    /// Foreign keys are enforced on every pooled connection; progress rows
    /// rely on them for `Conflict` detection.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the URL is malformed or the connection fails.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        tracing::debug!(url = database_url, "connected to sqlite");
        Ok(Self { pool })
    }

    /// Bring the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if a migration statement fails.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Build a `Storage` backed by `SQLite`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        let repo = Arc::new(repo);
        Ok(Self {
            courses: Arc::clone(&repo) as Arc<dyn CourseRepository>,
            user_progress: Arc::clone(&repo) as Arc<dyn UserProgressRepository>,
            challenge_progress: Arc::clone(&repo) as Arc<dyn ChallengeProgressRepository>,
            subscriptions: repo as Arc<dyn SubscriptionRepository>,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrations_can_run_again_on_an_open_database() {
        let repo = SqliteRepository::connect("sqlite:file:memdb_remigrate?mode=memory&cache=shared")
            .await
            .unwrap();
        repo.migrate().await.unwrap();
        repo.migrate().await.unwrap();
        assert!(repo.list_courses().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_url_is_rejected() {
        assert!(matches!(
            SqliteRepository::connect("postgres://nope").await,
            Err(SqliteInitError::Sqlx(_))
        ));
    }
}
