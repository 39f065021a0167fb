#![forbid(unsafe_code)]

pub mod app_services;
pub mod challenge_service;
pub mod error;
pub mod leaderboard_service;
pub mod progress_service;

pub use quest_core::Clock;

pub use app_services::AppServices;
pub use challenge_service::{ChallengeOutcome, ChallengeService, HeartsOutcome};
pub use error::{AppServicesError, ChallengeServiceError, LeaderboardError, ProgressServiceError};
pub use leaderboard_service::LeaderboardService;
pub use progress_service::{
    ChallengeView, CourseProgress, LessonView, ProgressRequest, ProgressService,
};
