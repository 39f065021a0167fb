use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ChallengeId, CourseId, LessonId, UnitId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyCourseTitle,

    #[error("unit title cannot be empty")]
    EmptyUnitTitle,

    #[error("lesson title cannot be empty")]
    EmptyLessonTitle,

    #[error("challenge question cannot be empty")]
    EmptyQuestion,

    #[error("invalid challenge kind: {0}")]
    InvalidChallengeKind(String),
}

fn non_empty(value: impl Into<String>, err: CourseError) -> Result<String, CourseError> {
    let raw = value.into();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(err);
    }
    Ok(trimmed.to_string())
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// A course a learner can pick as their active course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    id: CourseId,
    title: String,
    image_src: String,
}

impl Course {
    /// Creates a course.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyCourseTitle` if the title is blank.
    pub fn new(
        id: CourseId,
        title: impl Into<String>,
        image_src: impl Into<String>,
    ) -> Result<Self, CourseError> {
        Ok(Self {
            id,
            title: non_empty(title, CourseError::EmptyCourseTitle)?,
            image_src: image_src.into(),
        })
    }

    #[must_use]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn image_src(&self) -> &str {
        &self.image_src
    }
}

//
// ─── UNIT / LESSON ─────────────────────────────────────────────────────────────
//

/// An ordered group of lessons within a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub course_id: CourseId,
    pub title: String,
    pub description: String,
    pub order: i32,
    pub lessons: Vec<Lesson>,
}

impl Unit {
    /// Creates a unit with no lessons.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyUnitTitle` if the title is blank.
    pub fn new(
        id: UnitId,
        course_id: CourseId,
        title: impl Into<String>,
        description: impl Into<String>,
        order: i32,
    ) -> Result<Self, CourseError> {
        Ok(Self {
            id,
            course_id,
            title: non_empty(title, CourseError::EmptyUnitTitle)?,
            description: description.into(),
            order,
            lessons: Vec::new(),
        })
    }

    #[must_use]
    pub fn with_lessons(mut self, lessons: Vec<Lesson>) -> Self {
        self.lessons = lessons;
        self
    }

    /// Canonical sort key: `order` ascending, then id.
    #[must_use]
    pub fn sort_key(&self) -> (i32, UnitId) {
        (self.order, self.id)
    }
}

/// An ordered sequence of challenges; the unit of completion shown to learners.
///
/// Completion is never stored here; see [`crate::progress::is_lesson_complete`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    pub unit_id: UnitId,
    pub title: String,
    pub order: i32,
    pub challenges: Vec<Challenge>,
}

impl Lesson {
    /// Creates a lesson with no challenges.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyLessonTitle` if the title is blank.
    pub fn new(
        id: LessonId,
        unit_id: UnitId,
        title: impl Into<String>,
        order: i32,
    ) -> Result<Self, CourseError> {
        Ok(Self {
            id,
            unit_id,
            title: non_empty(title, CourseError::EmptyLessonTitle)?,
            order,
            challenges: Vec::new(),
        })
    }

    #[must_use]
    pub fn with_challenges(mut self, challenges: Vec<Challenge>) -> Self {
        self.challenges = challenges;
        self
    }

    #[must_use]
    pub fn sort_key(&self) -> (i32, LessonId) {
        (self.order, self.id)
    }
}

//
// ─── CHALLENGE ─────────────────────────────────────────────────────────────────
//

/// How a challenge is presented to the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChallengeKind {
    /// Pick the right option among several cards.
    Select,
    /// Pick the option that completes a sentence.
    Assist,
}

impl ChallengeKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ChallengeKind::Select => "SELECT",
            ChallengeKind::Assist => "ASSIST",
        }
    }

    /// Parses the stored representation.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::InvalidChallengeKind` for unknown values.
    pub fn parse(value: &str) -> Result<Self, CourseError> {
        match value {
            "SELECT" => Ok(ChallengeKind::Select),
            "ASSIST" => Ok(ChallengeKind::Assist),
            other => Err(CourseError::InvalidChallengeKind(other.to_string())),
        }
    }
}

/// One user's record against one challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeProgress {
    pub user_id: UserId,
    pub challenge_id: ChallengeId,
    pub completed: bool,
}

impl ChallengeProgress {
    #[must_use]
    pub fn new(user_id: UserId, challenge_id: ChallengeId, completed: bool) -> Self {
        Self {
            user_id,
            challenge_id,
            completed,
        }
    }
}

/// A single gradable exercise, carrying the requesting user's progress rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: ChallengeId,
    pub lesson_id: LessonId,
    pub kind: ChallengeKind,
    pub question: String,
    pub order: i32,
    pub progress: Vec<ChallengeProgress>,
}

impl Challenge {
    /// Creates a challenge with no progress rows.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyQuestion` if the question is blank.
    pub fn new(
        id: ChallengeId,
        lesson_id: LessonId,
        kind: ChallengeKind,
        question: impl Into<String>,
        order: i32,
    ) -> Result<Self, CourseError> {
        Self::from_rows(id, lesson_id, kind, question, order, None)
    }

    /// Builds a challenge from loosely-shaped storage rows.
    ///
    /// A progress collection that was never fetched (`None`) becomes empty, so
    /// the engine only ever sees a concrete list.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyQuestion` if the question is blank.
    pub fn from_rows(
        id: ChallengeId,
        lesson_id: LessonId,
        kind: ChallengeKind,
        question: impl Into<String>,
        order: i32,
        progress: Option<Vec<ChallengeProgress>>,
    ) -> Result<Self, CourseError> {
        Ok(Self {
            id,
            lesson_id,
            kind,
            question: non_empty(question, CourseError::EmptyQuestion)?,
            order,
            progress: progress.unwrap_or_default(),
        })
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Vec<ChallengeProgress>) -> Self {
        self.progress = progress;
        self
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_rejects_blank_title() {
        let err = Course::new(CourseId::new(1), "  ", "/aws.svg").unwrap_err();
        assert_eq!(err, CourseError::EmptyCourseTitle);
    }

    #[test]
    fn unit_title_is_trimmed() {
        let unit = Unit::new(UnitId::new(1), CourseId::new(1), " Compute ", "EC2", 1).unwrap();
        assert_eq!(unit.title, "Compute");
        assert!(unit.lessons.is_empty());
    }

    #[test]
    fn missing_progress_rows_become_empty() {
        let challenge = Challenge::from_rows(
            ChallengeId::new(3),
            LessonId::new(1),
            ChallengeKind::Select,
            "Which service stores objects?",
            1,
            None,
        )
        .unwrap();
        assert!(challenge.progress.is_empty());
    }

    #[test]
    fn challenge_kind_parses_stored_values() {
        assert_eq!(ChallengeKind::parse("SELECT").unwrap(), ChallengeKind::Select);
        assert_eq!(ChallengeKind::parse("ASSIST").unwrap(), ChallengeKind::Assist);
        assert!(matches!(
            ChallengeKind::parse("select"),
            Err(CourseError::InvalidChallengeKind(_))
        ));
        assert_eq!(ChallengeKind::Assist.as_str(), "ASSIST");
    }
}
