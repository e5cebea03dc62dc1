use async_trait::async_trait;
use codepath_core::model::{
    CertificateDraft, CertificateId, CertificateRecord, CourseId, UserId,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored document exists but cannot be parsed or violates its invariants.
    ///
    /// Never treated as absence; callers decide whether to reset.
    #[error("stored document `{key}` is corrupted: {reason}")]
    Corrupted { key: DocumentKey, reason: String },
}

//
// ─── DOCUMENTS ─────────────────────────────────────────────────────────────────
//

/// The two whole-document records kept by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKey {
    Progress,
    Bookmarks,
}

impl DocumentKey {
    pub const ALL: [DocumentKey; 2] = [DocumentKey::Progress, DocumentKey::Bookmarks];

    /// Storage key, shared with the browser build's local storage layout.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKey::Progress => "codepath_user_progress",
            DocumentKey::Bookmarks => "codepath_bookmarks",
        }
    }

    /// Serialized body of the document's zero value.
    #[must_use]
    pub fn empty_body(&self) -> &'static str {
        match self {
            DocumentKey::Progress => "{}",
            DocumentKey::Bookmarks => "[]",
        }
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable key -> JSON document storage.
///
/// Each write replaces the whole body; a concurrent reader sees either the old or
/// the new body, never a mix.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch the raw body stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be reached. Absence is `Ok(None)`.
    async fn read_document(&self, key: DocumentKey) -> Result<Option<String>, StorageError>;

    /// Replace the body stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails; the previous body is kept.
    async fn write_document(&self, key: DocumentKey, body: &str) -> Result<(), StorageError>;

    /// Replace several documents as one unit.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if any write fails; none of the writes are kept.
    async fn write_documents(&self, docs: &[(DocumentKey, String)]) -> Result<(), StorageError>;
}

//
// ─── CERTIFICATES ──────────────────────────────────────────────────────────────
//

/// Result of an idempotent certificate insert.
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateInsert {
    pub record: CertificateRecord,
    /// False when a certificate for the same course and user already existed.
    pub created: bool,
}

#[async_trait]
pub trait CertificateRepository: Send + Sync {
    /// Insert `draft` unless the (course, user) pair already holds a certificate,
    /// in which case the stored record is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write or read-back fails.
    async fn insert_or_get(&self, draft: CertificateDraft) -> Result<CertificateInsert, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be queried.
    async fn find_for(
        &self,
        course_id: CourseId,
        user_id: UserId,
    ) -> Result<Option<CertificateRecord>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be queried.
    async fn get_certificate(
        &self,
        id: CertificateId,
    ) -> Result<Option<CertificateRecord>, StorageError>;

    /// All certificates ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be queried.
    async fn list_certificates(&self) -> Result<Vec<CertificateRecord>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be queried.
    async fn list_for_course(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<CertificateRecord>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no certificate has this id.
    async fn delete_certificate(&self, id: CertificateId) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    documents: Arc<Mutex<HashMap<DocumentKey, String>>>,
    certificates: Arc<Mutex<Vec<CertificateRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            documents: Arc::new(Mutex::new(HashMap::new())),
            certificates: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryRepository {
    async fn read_document(&self, key: DocumentKey) -> Result<Option<String>, StorageError> {
        let guard = self
            .documents
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&key).cloned())
    }

    async fn write_document(&self, key: DocumentKey, body: &str) -> Result<(), StorageError> {
        let mut guard = self
            .documents
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key, body.to_owned());
        Ok(())
    }

    async fn write_documents(&self, docs: &[(DocumentKey, String)]) -> Result<(), StorageError> {
        let mut guard = self
            .documents
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        for (key, body) in docs {
            guard.insert(*key, body.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl CertificateRepository for InMemoryRepository {
    async fn insert_or_get(&self, draft: CertificateDraft) -> Result<CertificateInsert, StorageError> {
        let mut guard = self
            .certificates
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if let Some(existing) = guard
            .iter()
            .find(|c| c.course_id == draft.course_id && c.user_id == draft.user_id)
        {
            return Ok(CertificateInsert {
                record: existing.clone(),
                created: false,
            });
        }
        let next_id = guard.iter().map(|c| c.id.value()).max().unwrap_or(0) + 1;
        let record = draft.assign_id(CertificateId::new(next_id));
        guard.push(record.clone());
        Ok(CertificateInsert {
            record,
            created: true,
        })
    }

    async fn find_for(
        &self,
        course_id: CourseId,
        user_id: UserId,
    ) -> Result<Option<CertificateRecord>, StorageError> {
        let guard = self
            .certificates
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .iter()
            .find(|c| c.course_id == course_id && c.user_id == user_id)
            .cloned())
    }

    async fn get_certificate(
        &self,
        id: CertificateId,
    ) -> Result<Option<CertificateRecord>, StorageError> {
        let guard = self
            .certificates
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.iter().find(|c| c.id == id).cloned())
    }

    async fn list_certificates(&self) -> Result<Vec<CertificateRecord>, StorageError> {
        let guard = self
            .certificates
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut all = guard.clone();
        all.sort_by_key(|c| c.id);
        Ok(all)
    }

    async fn list_for_course(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<CertificateRecord>, StorageError> {
        let mut all = self.list_certificates().await?;
        all.retain(|c| c.course_id == course_id);
        Ok(all)
    }

    async fn delete_certificate(&self, id: CertificateId) -> Result<(), StorageError> {
        let mut guard = self
            .certificates
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let index = guard
            .iter()
            .position(|c| c.id == id)
            .ok_or(StorageError::NotFound)?;
        guard.remove(index);
        Ok(())
    }
}

/// Aggregates document and certificate repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub documents: Arc<dyn DocumentStore>,
    pub certificates: Arc<dyn CertificateRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let documents: Arc<dyn DocumentStore> = Arc::new(repo.clone());
        let certificates: Arc<dyn CertificateRepository> = Arc::new(repo);
        Self {
            documents,
            certificates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codepath_core::model::{Course, Difficulty, LOCAL_USER};
    use codepath_core::time::fixed_now;

    fn course(id: u64) -> Course {
        Course {
            id: CourseId::new(id),
            title: format!("Course {id}"),
            description: "desc".into(),
            instructor: "Grace".into(),
            language: "Go".into(),
            difficulty: Difficulty::Advanced,
            estimated_hours: 6.0,
            total_lessons: 3,
        }
    }

    #[tokio::test]
    async fn second_insert_returns_first_certificate() {
        let repo = InMemoryRepository::new();
        let now = fixed_now();

        let first = repo
            .insert_or_get(CertificateDraft::snapshot(&course(1), LOCAL_USER, now, now))
            .await
            .unwrap();
        assert!(first.created);

        let later = now + chrono::Duration::days(1);
        let second = repo
            .insert_or_get(CertificateDraft::snapshot(&course(1), LOCAL_USER, later, later))
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(second.record, first.record);
        assert_eq!(repo.list_certificates().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_missing_certificate_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo
            .delete_certificate(CertificateId::new(9))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn documents_are_replaced_whole() {
        let repo = InMemoryRepository::new();
        assert_eq!(repo.read_document(DocumentKey::Bookmarks).await.unwrap(), None);

        repo.write_document(DocumentKey::Bookmarks, "[1]").await.unwrap();
        repo.write_document(DocumentKey::Bookmarks, "[]").await.unwrap();

        assert_eq!(
            repo.read_document(DocumentKey::Bookmarks).await.unwrap().as_deref(),
            Some("[]")
        );
    }
}
