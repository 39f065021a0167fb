use async_trait::async_trait;
use quest_core::model::{Challenge, ChallengeId, Course, CourseId, Lesson, LessonId, Unit, UserId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{
    assemble_units, course_id_from_i64, db_err, id_to_i64, lesson_id_from_i64, order_from_i64,
    push_challenge_row, ser, unit_id_from_i64,
};
use crate::repository::{CourseRepository, StorageError};

fn course_from_row(row: &SqliteRow) -> Result<Course, StorageError> {
    Course::new(
        course_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<String, _>("image_src").map_err(ser)?,
    )
    .map_err(ser)
}

#[async_trait]
impl CourseRepository for SqliteRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO courses (id, title, image_src)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                image_src = excluded.image_src
            ",
        )
        .bind(id_to_i64("course_id", course.id().value())?)
        .bind(course.title())
        .bind(course.image_src())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn upsert_unit(&self, unit: &Unit) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO units (id, course_id, title, description, sort_order)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                course_id = excluded.course_id,
                title = excluded.title,
                description = excluded.description,
                sort_order = excluded.sort_order
            ",
        )
        .bind(id_to_i64("unit_id", unit.id.value())?)
        .bind(id_to_i64("course_id", unit.course_id.value())?)
        .bind(&unit.title)
        .bind(&unit.description)
        .bind(i64::from(unit.order))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO lessons (id, unit_id, title, sort_order)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                unit_id = excluded.unit_id,
                title = excluded.title,
                sort_order = excluded.sort_order
            ",
        )
        .bind(id_to_i64("lesson_id", lesson.id.value())?)
        .bind(id_to_i64("unit_id", lesson.unit_id.value())?)
        .bind(&lesson.title)
        .bind(i64::from(lesson.order))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn upsert_challenge(&self, challenge: &Challenge) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO challenges (id, lesson_id, kind, question, sort_order)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                lesson_id = excluded.lesson_id,
                kind = excluded.kind,
                question = excluded.question,
                sort_order = excluded.sort_order
            ",
        )
        .bind(id_to_i64("challenge_id", challenge.id.value())?)
        .bind(id_to_i64("lesson_id", challenge.lesson_id.value())?)
        .bind(challenge.kind.as_str())
        .bind(&challenge.question)
        .bind(i64::from(challenge.order))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        let rows = sqlx::query("SELECT id, title, image_src FROM courses ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(course_from_row).collect()
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let row = sqlx::query("SELECT id, title, image_src FROM courses WHERE id = ?1")
            .bind(id_to_i64("course_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(course_from_row).transpose()
    }

    async fn units_with_progress(
        &self,
        user: &UserId,
        course: CourseId,
    ) -> Result<Vec<Unit>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT
                u.id AS unit_id,
                u.course_id AS course_id,
                u.title AS unit_title,
                u.description AS unit_description,
                u.sort_order AS unit_order,
                l.id AS lesson_id,
                l.title AS lesson_title,
                l.sort_order AS lesson_order,
                c.id AS challenge_id,
                c.kind AS kind,
                c.question AS question,
                c.sort_order AS challenge_order,
                cp.completed AS completed
            FROM units u
            LEFT JOIN lessons l ON l.unit_id = u.id
            LEFT JOIN challenges c ON c.lesson_id = l.id
            LEFT JOIN challenge_progress cp
                ON cp.challenge_id = c.id AND cp.user_id = ?2
            WHERE u.course_id = ?1
            ORDER BY u.sort_order, u.id, l.sort_order, l.id, c.sort_order, c.id
            ",
        )
        .bind(id_to_i64("course_id", course.value())?)
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        assemble_units(&rows, user)
    }

    async fn lesson_with_progress(
        &self,
        user: &UserId,
        lesson: LessonId,
    ) -> Result<Option<Lesson>, StorageError> {
        let lesson_key = id_to_i64("lesson_id", lesson.value())?;
        let Some(row) = sqlx::query("SELECT id, unit_id, title, sort_order FROM lessons WHERE id = ?1")
            .bind(lesson_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        let mut found = Lesson::new(
            lesson_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
            unit_id_from_i64(row.try_get::<i64, _>("unit_id").map_err(ser)?)?,
            row.try_get::<String, _>("title").map_err(ser)?,
            order_from_i64(row.try_get::<i64, _>("sort_order").map_err(ser)?)?,
        )
        .map_err(ser)?;

        let rows = sqlx::query(
            r"
            SELECT
                c.id AS challenge_id,
                c.kind AS kind,
                c.question AS question,
                c.sort_order AS challenge_order,
                cp.completed AS completed
            FROM challenges c
            LEFT JOIN challenge_progress cp
                ON cp.challenge_id = c.id AND cp.user_id = ?2
            WHERE c.lesson_id = ?1
            ORDER BY c.sort_order, c.id
            ",
        )
        .bind(lesson_key)
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        for row in &rows {
            push_challenge_row(&mut found, row, user)?;
        }
        Ok(Some(found))
    }

    async fn challenge_lesson(
        &self,
        challenge: ChallengeId,
    ) -> Result<Option<LessonId>, StorageError> {
        let row = sqlx::query("SELECT lesson_id FROM challenges WHERE id = ?1")
            .bind(id_to_i64("challenge_id", challenge.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(|r| lesson_id_from_i64(r.try_get::<i64, _>("lesson_id").map_err(ser)?))
            .transpose()
    }
}
