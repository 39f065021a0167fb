//! Progress engine: derives lesson completion, the active lesson and
//! lesson percentages from a user's challenge progress rows.
//!
//! Everything here is a pure function over an already-loaded snapshot. Nothing
//! is cached and nothing is written; callers re-run the engine on every read.

use serde::Serialize;

use crate::model::{Challenge, Lesson, LessonId, Unit};

//
// ─── LESSON COMPLETION ─────────────────────────────────────────────────────────
//

/// A challenge counts as done once any of its progress rows is completed.
#[must_use]
pub fn is_challenge_complete(challenge: &Challenge) -> bool {
    challenge.progress.iter().any(|p| p.completed)
}

/// A lesson is complete when it has at least one challenge and every challenge
/// is done. An empty lesson is never complete.
#[must_use]
pub fn is_lesson_complete(lesson: &Lesson) -> bool {
    !lesson.challenges.is_empty() && lesson.challenges.iter().all(is_challenge_complete)
}

//
// ─── TREE ANNOTATION ───────────────────────────────────────────────────────────
//

/// A lesson paired with its freshly derived completion flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotatedLesson {
    pub lesson: Lesson,
    pub completed: bool,
}

impl AnnotatedLesson {
    #[must_use]
    pub fn new(lesson: Lesson) -> Self {
        let completed = is_lesson_complete(&lesson);
        Self { lesson, completed }
    }

    #[must_use]
    pub fn id(&self) -> LessonId {
        self.lesson.id
    }

    #[must_use]
    pub fn percentage(&self) -> u8 {
        lesson_percentage(&self.lesson)
    }
}

/// A unit whose lessons carry completion flags, in canonical order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotatedUnit {
    pub unit: Unit,
    pub lessons: Vec<AnnotatedLesson>,
}

impl AnnotatedUnit {
    /// All lessons done. A unit without lessons is not complete.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.lessons.is_empty() && self.lessons.iter().all(|l| l.completed)
    }
}

/// Annotate every lesson in `units` with its completion flag.
///
/// The output is in canonical course order: units by `order` then id, lessons
/// by `order` then id. Input that is already ordered keeps its order.
#[must_use]
pub fn annotate_lessons(units: &[Unit]) -> Vec<AnnotatedUnit> {
    let mut ordered: Vec<&Unit> = units.iter().collect();
    ordered.sort_by_key(|u| u.sort_key());

    ordered
        .into_iter()
        .map(|unit| {
            let mut lessons: Vec<&Lesson> = unit.lessons.iter().collect();
            lessons.sort_by_key(|l| l.sort_key());

            AnnotatedUnit {
                unit: Unit {
                    lessons: Vec::new(),
                    title: unit.title.clone(),
                    description: unit.description.clone(),
                    ..*unit
                },
                lessons: lessons
                    .into_iter()
                    .cloned()
                    .map(AnnotatedLesson::new)
                    .collect(),
            }
        })
        .collect()
}

//
// ─── ACTIVE LESSON ─────────────────────────────────────────────────────────────
//

/// The lesson a learner should continue with, and the unit it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveLesson<'a> {
    pub unit: &'a AnnotatedUnit,
    pub lesson: &'a AnnotatedLesson,
}

/// First incomplete lesson in course order.
///
/// Returns `None` both when every lesson is complete and when there is no
/// content at all; callers that care check `units.is_empty()` themselves.
#[must_use]
pub fn resolve_active_lesson(units: &[AnnotatedUnit]) -> Option<ActiveLesson<'_>> {
    units.iter().find_map(|unit| {
        unit.lessons
            .iter()
            .find(|lesson| !lesson.completed)
            .map(|lesson| ActiveLesson { unit, lesson })
    })
}

//
// ─── PERCENTAGE ────────────────────────────────────────────────────────────────
//

/// `numerator / denominator` as a 0..=100 percentage, rounded half up.
///
/// A zero denominator yields 0. The numerator is clamped to the denominator.
#[must_use]
pub fn rounded_percentage(numerator: usize, denominator: usize) -> u8 {
    if denominator == 0 {
        return 0;
    }
    let n = numerator.min(denominator) as u128;
    let d = denominator as u128;
    let pct = (200 * n + d) / (2 * d);
    u8::try_from(pct).unwrap_or(100)
}

/// Share of the lesson's challenges that are done, 0..=100.
///
/// A lesson with no challenges is at 0%.
#[must_use]
pub fn lesson_percentage(lesson: &Lesson) -> u8 {
    let completed = lesson
        .challenges
        .iter()
        .filter(|c| is_challenge_complete(c))
        .count();
    rounded_percentage(completed, lesson.challenges.len())
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
