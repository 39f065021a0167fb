//! Sample AWS course used by the `seed` command and the integration tests.

use quest_core::model::{
    Challenge, ChallengeId, ChallengeKind, Course, CourseError, CourseId, Lesson, LessonId, Unit,
    UnitId,
};
use thiserror::Error;

use crate::repository::{CourseRepository, StorageError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SeedError {
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Counts of what a seed run wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedReport {
    pub units: usize,
    pub lessons: usize,
    pub challenges: usize,
}

pub const SAMPLE_COURSE_ID: CourseId = CourseId::new(1);

struct UnitSeed {
    title: &'static str,
    description: &'static str,
    lessons: &'static [(&'static str, &'static [(ChallengeKind, &'static str)])],
}

const SAMPLE_UNITS: &[UnitSeed] = &[
    UnitSeed {
        title: "Cloud Concepts",
        description: "What the cloud is and why AWS",
        lessons: &[
            (
                "Benefits of the cloud",
                &[
                    (ChallengeKind::Select, "Which benefit lets you pay only for what you use?"),
                    (ChallengeKind::Assist, "Trading fixed expense for ..."),
                    (ChallengeKind::Select, "Which model gives you the most control over servers?"),
                ],
            ),
            (
                "Global infrastructure",
                &[
                    (ChallengeKind::Select, "What is a group of isolated data centers called?"),
                    (ChallengeKind::Select, "Which service caches content at edge locations?"),
                ],
            ),
        ],
    },
    UnitSeed {
        title: "Core Services",
        description: "Compute, storage and databases",
        lessons: &[
            (
                "Compute",
                &[
                    (ChallengeKind::Select, "Which service runs virtual servers?"),
                    (ChallengeKind::Assist, "Run code without servers using ..."),
                ],
            ),
            (
                "Storage",
                &[
                    (ChallengeKind::Select, "Which service stores objects in buckets?"),
                    (ChallengeKind::Select, "Which storage class is cheapest for archives?"),
                    (ChallengeKind::Assist, "Block storage for EC2 is provided by ..."),
                ],
            ),
        ],
    },
];

/// Upsert the sample course. Ids are deterministic, so running it twice is harmless.
///
/// # Errors
///
/// Returns `SeedError` if a record is invalid or cannot be stored.
pub async fn seed_sample_course(courses: &dyn CourseRepository) -> Result<SeedReport, SeedError> {
    let mut report = SeedReport::default();
    courses
        .upsert_course(&Course::new(
            SAMPLE_COURSE_ID,
            "AWS Cloud Practitioner",
            "/aws.svg",
        )?)
        .await?;

    let mut next_lesson = 1_u64;
    let mut next_challenge = 1_u64;
    for (unit_idx, seed) in SAMPLE_UNITS.iter().enumerate() {
        let unit_id = UnitId::new(unit_idx as u64 + 1);
        let unit = Unit::new(
            unit_id,
            SAMPLE_COURSE_ID,
            seed.title,
            seed.description,
            i32::try_from(unit_idx + 1).unwrap_or(i32::MAX),
        )?;
        courses.upsert_unit(&unit).await?;
        report.units += 1;

        for (lesson_idx, (title, challenges)) in seed.lessons.iter().enumerate() {
            let lesson_id = LessonId::new(next_lesson);
            next_lesson += 1;
            let lesson = Lesson::new(
                lesson_id,
                unit_id,
                *title,
                i32::try_from(lesson_idx + 1).unwrap_or(i32::MAX),
            )?;
            courses.upsert_lesson(&lesson).await?;
            report.lessons += 1;

            for (challenge_idx, (kind, question)) in challenges.iter().enumerate() {
                let challenge = Challenge::new(
                    ChallengeId::new(next_challenge),
                    lesson_id,
                    *kind,
                    *question,
                    i32::try_from(challenge_idx + 1).unwrap_or(i32::MAX),
                )?;
                next_challenge += 1;
                courses.upsert_challenge(&challenge).await?;
                report.challenges += 1;
            }
        }
    }

    tracing::info!(
        course_id = %SAMPLE_COURSE_ID,
        units = report.units,
        lessons = report.lessons,
        challenges = report.challenges,
        "seeded sample course"
    );
    Ok(report)
}
