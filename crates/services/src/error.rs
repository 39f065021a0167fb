//! Shared error types for the services crate.

use thiserror::Error;

use quest_core::model::{ChallengeId, CourseId, ProgressRuleError};
use storage::repository::StorageError;
use storage::seed::SeedError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ProgressService` and `ProgressRequest`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ChallengeService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChallengeServiceError {
    #[error("no progress found for this user")]
    UserProgressNotFound,
    #[error("challenge {0} not found")]
    ChallengeNotFound(ChallengeId),
    #[error("course {0} not found")]
    CourseNotFound(CourseId),
    #[error("course {0} has no lessons yet")]
    CourseHasNoContent(CourseId),
    #[error(transparent)]
    Rule(#[from] ProgressRuleError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `LeaderboardService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LeaderboardError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Seed(#[from] SeedError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
