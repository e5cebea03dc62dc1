use codepath_core::model::{
    CertificateDraft, CertificateId, CertificateRecord, CourseId, UserId,
};

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, map_certificate_row};
use crate::repository::{CertificateInsert, CertificateRepository, StorageError};

const SELECT_CERTIFICATE: &str = r"
    SELECT
        id, course_id, user_id, course_name, course_description, instructor,
        completion_date, issue_date, certificate_number, language, difficulty,
        duration_hours
    FROM certificates
";

#[async_trait::async_trait]
impl CertificateRepository for SqliteRepository {
    async fn insert_or_get(&self, draft: CertificateDraft) -> Result<CertificateInsert, StorageError> {
        let course_id = id_to_i64("course_id", draft.course_id.value())?;
        let user_id = id_to_i64("user_id", draft.user_id.value())?;

        let mut tx = self.pool.begin().await.map_err(conn)?;

        let res = sqlx::query(
            r"
            INSERT INTO certificates (
                course_id, user_id, course_name, course_description, instructor,
                completion_date, issue_date, certificate_number, language, difficulty,
                duration_hours
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(course_id, user_id) DO NOTHING
            ",
        )
        .bind(course_id)
        .bind(user_id)
        .bind(draft.course_name.as_str())
        .bind(draft.course_description.as_str())
        .bind(draft.instructor.as_str())
        .bind(draft.completion_date)
        .bind(draft.issue_date)
        .bind(draft.certificate_number.as_str())
        .bind(draft.language.as_str())
        .bind(draft.difficulty.as_str())
        .bind(f64::from(draft.duration_hours))
        .execute(&mut *tx)
        .await
        .map_err(conn)?;
        let created = res.rows_affected() == 1;

        let row = sqlx::query(&format!(
            "{SELECT_CERTIFICATE} WHERE course_id = ?1 AND user_id = ?2"
        ))
        .bind(course_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(conn)?;
        let record = map_certificate_row(&row)?;

        tx.commit().await.map_err(conn)?;

        Ok(CertificateInsert { record, created })
    }

    async fn find_for(
        &self,
        course_id: CourseId,
        user_id: UserId,
    ) -> Result<Option<CertificateRecord>, StorageError> {
        let row = sqlx::query(&format!(
            "{SELECT_CERTIFICATE} WHERE course_id = ?1 AND user_id = ?2"
        ))
        .bind(id_to_i64("course_id", course_id.value())?)
        .bind(id_to_i64("user_id", user_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_certificate_row).transpose()
    }

    async fn get_certificate(
        &self,
        id: CertificateId,
    ) -> Result<Option<CertificateRecord>, StorageError> {
        let row = sqlx::query(&format!("{SELECT_CERTIFICATE} WHERE id = ?1"))
            .bind(id_to_i64("id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_certificate_row).transpose()
    }

    async fn list_certificates(&self) -> Result<Vec<CertificateRecord>, StorageError> {
        let rows = sqlx::query(&format!("{SELECT_CERTIFICATE} ORDER BY id ASC"))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_certificate_row).collect()
    }

    async fn list_for_course(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<CertificateRecord>, StorageError> {
        let rows = sqlx::query(&format!(
            "{SELECT_CERTIFICATE} WHERE course_id = ?1 ORDER BY id ASC"
        ))
        .bind(id_to_i64("course_id", course_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_certificate_row).collect()
    }

    async fn delete_certificate(&self, id: CertificateId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM certificates WHERE id = ?1")
            .bind(id_to_i64("id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
