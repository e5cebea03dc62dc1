use std::sync::Arc;

use codepath_core::model::LOCAL_USER;
use storage::catalog::CourseCatalog;
use storage::documents;
use storage::repository::Storage;

use crate::Clock;
use crate::bookmark_service::BookmarkIndex;
use crate::certificate_service::CertificateService;
use crate::completion_service::{CompletionEvaluator, IssuancePolicy};
use crate::error::AppServicesError;
use crate::progress_service::ProgressLedger;
use crate::progress_store::ProgressStore;
use crate::stats_service::StatsService;

/// Assembles app-facing services over one store and one catalog.
#[derive(Clone)]
pub struct AppServices {
    catalog: Arc<dyn CourseCatalog>,
    ledger: Arc<ProgressLedger>,
    bookmarks: Arc<BookmarkIndex>,
    completion: Arc<CompletionEvaluator>,
    certificates: Arc<CertificateService>,
    stats: Arc<StatsService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        policy: IssuancePolicy,
        catalog: Arc<dyn CourseCatalog>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::from_storage(storage, clock, policy, catalog).await
    }

    /// Build services backed by in-memory storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the empty documents cannot be written.
    pub async fn in_memory(
        clock: Clock,
        policy: IssuancePolicy,
        catalog: Arc<dyn CourseCatalog>,
    ) -> Result<Self, AppServicesError> {
        Self::from_storage(Storage::in_memory(), clock, policy, catalog).await
    }

    /// Wire every service to `storage`, writing empty documents where none exist.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Storage` if the documents cannot be initialized.
    pub async fn from_storage(
        storage: Storage,
        clock: Clock,
        policy: IssuancePolicy,
        catalog: Arc<dyn CourseCatalog>,
    ) -> Result<Self, AppServicesError> {
        documents::initialize(storage.documents.as_ref()).await?;

        let store = ProgressStore::new(Arc::clone(&storage.documents));
        let certificates = Arc::new(CertificateService::new(
            clock,
            LOCAL_USER,
            Arc::clone(&catalog),
            Arc::clone(&storage.certificates),
        ));
        let completion = Arc::new(CompletionEvaluator::new(
            clock,
            policy,
            store.clone(),
            Arc::clone(&catalog),
            certificates.clone(),
        ));
        let ledger = Arc::new(ProgressLedger::new(clock, store.clone()));
        let bookmarks = Arc::new(BookmarkIndex::new(clock, store.clone()));
        let stats = Arc::new(StatsService::new(store, Arc::clone(&catalog)));

        Ok(Self {
            catalog,
            ledger,
            bookmarks,
            completion,
            certificates,
            stats,
        })
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<dyn CourseCatalog> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn ledger(&self) -> Arc<ProgressLedger> {
        Arc::clone(&self.ledger)
    }

    #[must_use]
    pub fn bookmarks(&self) -> Arc<BookmarkIndex> {
        Arc::clone(&self.bookmarks)
    }

    #[must_use]
    pub fn completion(&self) -> Arc<CompletionEvaluator> {
        Arc::clone(&self.completion)
    }

    #[must_use]
    pub fn certificates(&self) -> Arc<CertificateService> {
        Arc::clone(&self.certificates)
    }

    #[must_use]
    pub fn stats(&self) -> Arc<StatsService> {
        Arc::clone(&self.stats)
    }
}
