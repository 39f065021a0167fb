use std::sync::Arc;

use storage::repository::Storage;
use storage::seed::{SeedReport, seed_sample_course};

use crate::Clock;
use crate::challenge_service::ChallengeService;
use crate::error::AppServicesError;
use crate::leaderboard_service::LeaderboardService;
use crate::progress_service::ProgressService;

/// Assembles the app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    progress: Arc<ProgressService>,
    challenges: Arc<ChallengeService>,
    leaderboard: Arc<LeaderboardService>,
}

impl AppServices {
    #[must_use]
    pub fn from_storage(storage: Storage, clock: Clock) -> Self {
        let progress = Arc::new(ProgressService::new(
            Arc::clone(&storage.courses),
            Arc::clone(&storage.user_progress),
        ));
        let challenges = Arc::new(ChallengeService::new(
            clock,
            Arc::clone(&storage.courses),
            Arc::clone(&storage.user_progress),
            Arc::clone(&storage.challenge_progress),
            Arc::clone(&storage.subscriptions),
        ));
        let leaderboard = Arc::new(LeaderboardService::new(Arc::clone(&storage.user_progress)));
        Self {
            storage,
            progress,
            challenges,
            leaderboard,
        }
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(storage, clock))
    }

    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(Storage::in_memory(), clock)
    }

    /// Write the sample course into the backing store.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Seed` if any record cannot be stored.
    pub async fn seed_sample_course(&self) -> Result<SeedReport, AppServicesError> {
        Ok(seed_sample_course(self.storage.courses.as_ref()).await?)
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn challenges(&self) -> Arc<ChallengeService> {
        Arc::clone(&self.challenges)
    }

    #[must_use]
    pub fn leaderboard(&self) -> Arc<LeaderboardService> {
        Arc::clone(&self.leaderboard)
    }
}
