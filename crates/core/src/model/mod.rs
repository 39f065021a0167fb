mod course;
mod ids;
pub mod rules;
mod subscription;
mod user_progress;

pub use course::{Challenge, ChallengeKind, ChallengeProgress, Course, CourseError, Lesson, Unit};
pub use ids::{ChallengeId, CourseId, LessonId, ParseIdError, UnitId, UserId, UserIdError};
pub use subscription::UserSubscription;
pub use user_progress::{ProgressRuleError, UserProgress};
