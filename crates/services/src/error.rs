//! Shared error types for the services crate.

use std::time::Duration;

use thiserror::Error;

use codepath_core::model::{CertificateId, CourseId, ProgressError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ProgressLedger` and `BookmarkIndex`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ProgressError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while issuing a certificate.
///
/// After a completion has been committed these are reported as warnings; the
/// completion itself stands.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IssuanceError {
    #[error("course {0} not found in catalog")]
    CourseNotFound(CourseId),
    #[error("certificate service did not answer within {0:?}")]
    Timeout(Duration),
    #[error("certificate issuance failed: {0}")]
    Failed(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CompletionEvaluator`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompletionError {
    #[error("course {0} not found in catalog")]
    CourseNotFound(CourseId),
    #[error("course {0} has not been completed")]
    NotComplete(CourseId),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Issuance(#[from] IssuanceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CertificateService` lookups.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CertificateServiceError {
    #[error("certificate {0} not found")]
    NotFound(CertificateId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `StatsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StatsError {
    #[error("course {0} not found in catalog")]
    CourseNotFound(CourseId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
