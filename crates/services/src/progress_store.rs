use std::sync::Arc;

use codepath_core::ledger::{BookmarkDocument, ProgressDocument};
use storage::documents;
use storage::repository::{DocumentStore, StorageError};
use tokio::sync::Mutex;

/// Shared handle to the progress and bookmark documents.
///
/// Every mutation is a full `load -> mutate -> save` cycle run under one write
/// gate, so cycles never interleave. Each cycle runs on its own task holding the
/// gate: if the caller stops waiting, the cycle still finishes and the next one
/// observes its result.
#[derive(Clone)]
pub struct ProgressStore {
    documents: Arc<dyn DocumentStore>,
    gate: Arc<Mutex<()>>,
}

impl ProgressStore {
    #[must_use]
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self {
            documents,
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the document cannot be read or is corrupted.
    pub async fn progress(&self) -> Result<ProgressDocument, StorageError> {
        documents::load_progress(self.documents.as_ref()).await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the document cannot be read or is corrupted.
    pub async fn bookmarks(&self) -> Result<BookmarkDocument, StorageError> {
        documents::load_bookmarks(self.documents.as_ref()).await
    }

    /// Both documents read while no mutation is in flight.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if either document cannot be read or is corrupted.
    pub async fn snapshot(&self) -> Result<(ProgressDocument, BookmarkDocument), StorageError> {
        let _guard = self.gate.lock().await;
        let progress = documents::load_progress(self.documents.as_ref()).await?;
        let bookmarks = documents::load_bookmarks(self.documents.as_ref()).await?;
        Ok((progress, bookmarks))
    }

    /// Run one read-modify-write cycle over the progress document.
    ///
    /// `mutate` returns the next document (or `None` to leave storage untouched)
    /// plus a value handed back to the caller. An error from `mutate` aborts the
    /// cycle before anything is written.
    ///
    /// # Errors
    ///
    /// Returns `mutate`'s error, or a `StorageError` converted into `E`.
    pub async fn update_progress<T, E, F>(&self, mutate: F) -> Result<T, E>
    where
        F: FnOnce(ProgressDocument) -> Result<(Option<ProgressDocument>, T), E> + Send + 'static,
        T: Send + 'static,
        E: From<StorageError> + Send + 'static,
    {
        let documents = Arc::clone(&self.documents);
        let gate = Arc::clone(&self.gate);
        let cycle = tokio::spawn(async move {
            let _guard = gate.lock_owned().await;
            let current = documents::load_progress(documents.as_ref()).await?;
            let (next, out) = mutate(current)?;
            if let Some(next) = next {
                documents::save_progress(documents.as_ref(), &next).await?;
            }
            Ok::<T, E>(out)
        });
        cycle.await.map_err(|e| E::from(aborted(&e)))?
    }

    /// Run one read-modify-write cycle over the bookmark document.
    ///
    /// # Errors
    ///
    /// Returns `mutate`'s error, or a `StorageError` converted into `E`.
    pub async fn update_bookmarks<T, E, F>(&self, mutate: F) -> Result<T, E>
    where
        F: FnOnce(BookmarkDocument) -> Result<(BookmarkDocument, T), E> + Send + 'static,
        T: Send + 'static,
        E: From<StorageError> + Send + 'static,
    {
        let documents = Arc::clone(&self.documents);
        let gate = Arc::clone(&self.gate);
        let cycle = tokio::spawn(async move {
            let _guard = gate.lock_owned().await;
            let current = documents::load_bookmarks(documents.as_ref()).await?;
            let (next, out) = mutate(current)?;
            documents::save_bookmarks(documents.as_ref(), &next).await?;
            Ok::<T, E>(out)
        });
        cycle.await.map_err(|e| E::from(aborted(&e)))?
    }

    /// Empty both documents in one write.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    pub async fn reset(&self) -> Result<(), StorageError> {
        let documents = Arc::clone(&self.documents);
        let gate = Arc::clone(&self.gate);
        let cycle = tokio::spawn(async move {
            let _guard = gate.lock_owned().await;
            documents::reset_all(documents.as_ref()).await
        });
        cycle.await.map_err(|e| aborted(&e))?
    }
}

fn aborted(err: &tokio::task::JoinError) -> StorageError {
    StorageError::Connection(format!("document write task ended abnormally: {err}"))
}
