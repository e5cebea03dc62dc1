use thiserror::Error;

use crate::model::{CatalogError, ProgressError, QuizGradeError};

/// Any validation failure raised by the domain layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    QuizGrade(#[from] QuizGradeError),
}
