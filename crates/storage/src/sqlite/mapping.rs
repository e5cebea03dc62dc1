use codepath_core::model::{CertificateId, CertificateRecord, CourseId, Difficulty, UserId};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn parse_difficulty(s: &str) -> Result<Difficulty, StorageError> {
    Difficulty::parse_loose(s)
        .ok_or_else(|| StorageError::Serialization(format!("invalid difficulty: {s}")))
}

pub(crate) fn map_certificate_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<CertificateRecord, StorageError> {
    let difficulty: String = row.try_get("difficulty").map_err(ser)?;
    let duration_hours: f64 = row.try_get("duration_hours").map_err(ser)?;

    #[allow(clippy::cast_possible_truncation)]
    let duration_hours = duration_hours as f32;

    Ok(CertificateRecord {
        id: CertificateId::new(i64_to_u64("id", row.try_get("id").map_err(ser)?)?),
        course_id: CourseId::new(i64_to_u64(
            "course_id",
            row.try_get("course_id").map_err(ser)?,
        )?),
        user_id: UserId::new(i64_to_u64("user_id", row.try_get("user_id").map_err(ser)?)?),
        course_name: row.try_get("course_name").map_err(ser)?,
        course_description: row.try_get("course_description").map_err(ser)?,
        instructor: row.try_get("instructor").map_err(ser)?,
        completion_date: row.try_get("completion_date").map_err(ser)?,
        issue_date: row.try_get("issue_date").map_err(ser)?,
        certificate_number: row.try_get("certificate_number").map_err(ser)?,
        language: row.try_get("language").map_err(ser)?,
        difficulty: parse_difficulty(&difficulty)?,
        duration_hours,
    })
}
