use quest_core::model::{
    Challenge, ChallengeId, ChallengeKind, ChallengeProgress, CourseId, Lesson, LessonId, Unit,
    UnitId, UserId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Constraint violations become `Conflict`; everything else is a connection problem.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db)
            if db.is_foreign_key_violation() || db.is_unique_violation() =>
        {
            StorageError::Conflict
        }
        _ => StorageError::Connection(e.to_string()),
    }
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn course_id_from_i64(v: i64) -> Result<CourseId, StorageError> {
    Ok(CourseId::new(i64_to_u64("course_id", v)?))
}

pub(crate) fn unit_id_from_i64(v: i64) -> Result<UnitId, StorageError> {
    Ok(UnitId::new(i64_to_u64("unit_id", v)?))
}

pub(crate) fn lesson_id_from_i64(v: i64) -> Result<LessonId, StorageError> {
    Ok(LessonId::new(i64_to_u64("lesson_id", v)?))
}

pub(crate) fn challenge_id_from_i64(v: i64) -> Result<ChallengeId, StorageError> {
    Ok(ChallengeId::new(i64_to_u64("challenge_id", v)?))
}

pub(crate) fn order_from_i64(v: i64) -> Result<i32, StorageError> {
    i32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid sort_order: {v}")))
}

pub(crate) fn user_id_from_str(v: String) -> Result<UserId, StorageError> {
    UserId::new(v).map_err(ser)
}

//
// ─── TREE ASSEMBLY ─────────────────────────────────────────────────────────────
//

/// Folds ordered `units ⟕ lessons ⟕ challenges ⟕ challenge_progress` rows into units.
///
/// Rows must be sorted by unit, lesson and challenge so each parent's children
/// arrive contiguously. Missing children (NULL join columns) leave empty lists.
pub(crate) fn assemble_units(
    rows: &[SqliteRow],
    user: &UserId,
) -> Result<Vec<Unit>, StorageError> {
    let mut units: Vec<Unit> = Vec::new();

    for row in rows {
        let unit_id = unit_id_from_i64(row.try_get::<i64, _>("unit_id").map_err(ser)?)?;
        if units.last().is_none_or(|u| u.id != unit_id) {
            units.push(
                Unit::new(
                    unit_id,
                    course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?,
                    row.try_get::<String, _>("unit_title").map_err(ser)?,
                    row.try_get::<String, _>("unit_description").map_err(ser)?,
                    order_from_i64(row.try_get::<i64, _>("unit_order").map_err(ser)?)?,
                )
                .map_err(ser)?,
            );
        }
        let Some(unit) = units.last_mut() else {
            continue;
        };

        let Some(lesson_raw) = row.try_get::<Option<i64>, _>("lesson_id").map_err(ser)? else {
            continue;
        };
        let lesson_id = lesson_id_from_i64(lesson_raw)?;
        if unit.lessons.last().is_none_or(|l| l.id != lesson_id) {
            unit.lessons.push(
                Lesson::new(
                    lesson_id,
                    unit_id,
                    row.try_get::<String, _>("lesson_title").map_err(ser)?,
                    order_from_i64(row.try_get::<i64, _>("lesson_order").map_err(ser)?)?,
                )
                .map_err(ser)?,
            );
        }
        let Some(lesson) = unit.lessons.last_mut() else {
            continue;
        };

        push_challenge_row(lesson, row, user)?;
    }

    Ok(units)
}

/// Appends one `challenges ⟕ challenge_progress` row to `lesson`.
pub(crate) fn push_challenge_row(
    lesson: &mut Lesson,
    row: &SqliteRow,
    user: &UserId,
) -> Result<(), StorageError> {
    let Some(challenge_raw) = row.try_get::<Option<i64>, _>("challenge_id").map_err(ser)? else {
        return Ok(());
    };
    let challenge_id = challenge_id_from_i64(challenge_raw)?;

    if lesson.challenges.last().is_none_or(|c| c.id != challenge_id) {
        let kind: String = row.try_get("kind").map_err(ser)?;
        lesson.challenges.push(
            Challenge::from_rows(
                challenge_id,
                lesson.id,
                ChallengeKind::parse(&kind).map_err(ser)?,
                row.try_get::<String, _>("question").map_err(ser)?,
                order_from_i64(row.try_get::<i64, _>("challenge_order").map_err(ser)?)?,
                None,
            )
            .map_err(ser)?,
        );
    }

    if let Some(completed) = row.try_get::<Option<i64>, _>("completed").map_err(ser)? {
        if let Some(challenge) = lesson.challenges.last_mut() {
            challenge.progress.push(ChallengeProgress::new(
                user.clone(),
                challenge_id,
                completed != 0,
            ));
        }
    }
    Ok(())
}
