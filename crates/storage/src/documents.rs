//! Typed access to the progress and bookmark documents.
//!
//! Absent documents read as their empty value. A body that fails to parse, or that
//! parses but breaks a ledger invariant, is reported as `StorageError::Corrupted`
//! and never replaced automatically.

use codepath_core::ledger::{BookmarkDocument, ProgressDocument};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::repository::{DocumentKey, DocumentStore, StorageError};

fn corrupted(key: DocumentKey, reason: impl core::fmt::Display) -> StorageError {
    StorageError::Corrupted {
        key,
        reason: reason.to_string(),
    }
}

async fn load<T: DeserializeOwned + Default>(
    store: &dyn DocumentStore,
    key: DocumentKey,
) -> Result<T, StorageError> {
    match store.read_document(key).await? {
        Some(body) => serde_json::from_str(&body).map_err(|e| corrupted(key, e)),
        None => Ok(T::default()),
    }
}

fn encode<T: Serialize>(doc: &T) -> Result<String, StorageError> {
    serde_json::to_string(doc).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Write the empty value for every document that is not stored yet.
///
/// # Errors
///
/// Returns `StorageError` if the store cannot be read or written.
pub async fn initialize(store: &dyn DocumentStore) -> Result<(), StorageError> {
    for key in DocumentKey::ALL {
        if store.read_document(key).await?.is_none() {
            store.write_document(key, key.empty_body()).await?;
        }
    }
    Ok(())
}

/// # Errors
///
/// Returns `StorageError::Corrupted` if the stored body is unusable.
pub async fn load_progress(store: &dyn DocumentStore) -> Result<ProgressDocument, StorageError> {
    let doc: ProgressDocument = load(store, DocumentKey::Progress).await?;
    doc.validate()
        .map_err(|e| corrupted(DocumentKey::Progress, e))?;
    Ok(doc)
}

/// # Errors
///
/// Returns `StorageError` if encoding or the write fails.
pub async fn save_progress(
    store: &dyn DocumentStore,
    doc: &ProgressDocument,
) -> Result<(), StorageError> {
    store
        .write_document(DocumentKey::Progress, &encode(doc)?)
        .await
}

/// # Errors
///
/// Returns `StorageError::Corrupted` if the stored body is unusable.
pub async fn load_bookmarks(store: &dyn DocumentStore) -> Result<BookmarkDocument, StorageError> {
    let doc: BookmarkDocument = load(store, DocumentKey::Bookmarks).await?;
    doc.validate()
        .map_err(|e| corrupted(DocumentKey::Bookmarks, e))?;
    Ok(doc)
}

/// # Errors
///
/// Returns `StorageError` if encoding or the write fails.
pub async fn save_bookmarks(
    store: &dyn DocumentStore,
    doc: &BookmarkDocument,
) -> Result<(), StorageError> {
    store
        .write_document(DocumentKey::Bookmarks, &encode(doc)?)
        .await
}

/// Reset both documents to empty in a single write.
///
/// # Errors
///
/// Returns `StorageError` if the write fails; neither document changes then.
pub async fn reset_all(store: &dyn DocumentStore) -> Result<(), StorageError> {
    let docs: Vec<(DocumentKey, String)> = DocumentKey::ALL
        .iter()
        .map(|key| (*key, key.empty_body().to_owned()))
        .collect();
    store.write_documents(&docs).await
}
