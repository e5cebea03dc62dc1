#![forbid(unsafe_code)]

pub mod catalog;
pub mod documents;
pub mod repository;
pub mod sqlite;

pub use catalog::{CatalogLoadError, CourseCatalog, FixtureCatalog};
pub use repository::{
    CertificateInsert, CertificateRepository, DocumentKey, DocumentStore, InMemoryRepository,
    Storage, StorageError,
};
