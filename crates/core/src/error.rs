use thiserror::Error;

use crate::model::{CourseError, ParseIdError, ProgressRuleError, UserIdError};

/// Any domain validation failure raised by this crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    UserId(#[from] UserIdError),
    #[error(transparent)]
    ParseId(#[from] ParseIdError),
    #[error(transparent)]
    ProgressRule(#[from] ProgressRuleError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{UserId, UserProgress};

    #[test]
    fn domain_errors_convert_and_keep_messages() {
        let err: Error = UserId::new(" ").unwrap_err().into();
        assert!(matches!(err, Error::UserId(_)));

        let mut learner = UserProgress::new_learner(UserId::new("u").unwrap(), "U", "", None);
        let err: Error = learner.refill_hearts().unwrap_err().into();
        assert!(matches!(err, Error::ProgressRule(ProgressRuleError::HeartsFull)));

        let err: Error = "x".parse::<crate::model::LessonId>().unwrap_err().into();
        assert_eq!(err.to_string(), "failed to parse LessonId from string");
    }
}
