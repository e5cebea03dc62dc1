use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use codepath_core::model::{CertificateDraft, CertificateId, CertificateRecord, CourseId, UserId};
use storage::catalog::CourseCatalog;
use storage::repository::{CertificateRepository, StorageError};
use tracing::info;

use crate::Clock;
use crate::error::{CertificateServiceError, IssuanceError};

/// Issues the certificate for a completed course.
///
/// Implementations must be idempotent per (course, user): a second call returns the
/// record created by the first.
#[async_trait]
pub trait CertificateIssuer: Send + Sync {
    /// # Errors
    ///
    /// Returns `IssuanceError` if the certificate could not be produced.
    async fn issue(
        &self,
        course_id: CourseId,
        completion_date: DateTime<Utc>,
    ) -> Result<CertificateRecord, IssuanceError>;
}

/// Creates and looks up certificates for a single local user.
#[derive(Clone)]
pub struct CertificateService {
    clock: Clock,
    user_id: UserId,
    catalog: Arc<dyn CourseCatalog>,
    certificates: Arc<dyn CertificateRepository>,
}

impl CertificateService {
    #[must_use]
    pub fn new(
        clock: Clock,
        user_id: UserId,
        catalog: Arc<dyn CourseCatalog>,
        certificates: Arc<dyn CertificateRepository>,
    ) -> Self {
        Self {
            clock,
            user_id,
            catalog,
            certificates,
        }
    }

    /// Return the user's certificate for the course, creating it if needed.
    ///
    /// An existing certificate is returned unchanged, even if the catalog entry has
    /// since changed or the course was removed from it.
    ///
    /// # Errors
    ///
    /// Returns `IssuanceError::CourseNotFound` if a new certificate is needed for a
    /// course the catalog does not know.
    /// Returns `IssuanceError::Storage` if repository access fails.
    pub async fn generate(
        &self,
        course_id: CourseId,
        completion_date: DateTime<Utc>,
    ) -> Result<CertificateRecord, IssuanceError> {
        if let Some(existing) = self.certificates.find_for(course_id, self.user_id).await? {
            return Ok(existing);
        }
        let course = self
            .catalog
            .get_by_id(course_id)
            .await?
            .ok_or(IssuanceError::CourseNotFound(course_id))?;
        let draft =
            CertificateDraft::snapshot(&course, self.user_id, completion_date, self.clock.now());
        let inserted = self.certificates.insert_or_get(draft).await?;
        if inserted.created {
            info!(
                course_id = course_id.value(),
                certificate = %inserted.record.certificate_number,
                "certificate issued"
            );
        }
        Ok(inserted.record)
    }

    /// # Errors
    ///
    /// Returns `CertificateServiceError::Storage` if repository access fails.
    pub async fn list(&self) -> Result<Vec<CertificateRecord>, CertificateServiceError> {
        Ok(self.certificates.list_certificates().await?)
    }

    /// # Errors
    ///
    /// Returns `CertificateServiceError::Storage` if repository access fails.
    pub async fn list_by_course(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<CertificateRecord>, CertificateServiceError> {
        Ok(self.certificates.list_for_course(course_id).await?)
    }

    /// # Errors
    ///
    /// Returns `CertificateServiceError::NotFound` if no certificate has this id.
    /// Returns `CertificateServiceError::Storage` if repository access fails.
    pub async fn get(
        &self,
        id: CertificateId,
    ) -> Result<CertificateRecord, CertificateServiceError> {
        self.certificates
            .get_certificate(id)
            .await?
            .ok_or(CertificateServiceError::NotFound(id))
    }

    /// # Errors
    ///
    /// Returns `CertificateServiceError::NotFound` if no certificate has this id.
    /// Returns `CertificateServiceError::Storage` if repository access fails.
    pub async fn delete(&self, id: CertificateId) -> Result<(), CertificateServiceError> {
        match self.certificates.delete_certificate(id).await {
            Ok(()) => {
                info!(certificate_id = id.value(), "certificate deleted");
                Ok(())
            }
            Err(StorageError::NotFound) => Err(CertificateServiceError::NotFound(id)),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl CertificateIssuer for CertificateService {
    async fn issue(
        &self,
        course_id: CourseId,
        completion_date: DateTime<Utc>,
    ) -> Result<CertificateRecord, IssuanceError> {
        self.generate(course_id, completion_date).await
    }
}
