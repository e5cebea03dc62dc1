#![forbid(unsafe_code)]

pub mod app_services;
pub mod bookmark_service;
pub mod certificate_service;
pub mod completion_service;
pub mod error;
pub mod progress_service;
pub mod progress_store;
pub mod stats_service;

pub use codepath_core::Clock;

pub use app_services::AppServices;
pub use bookmark_service::{BookmarkIndex, ToggleResult};
pub use certificate_service::{CertificateIssuer, CertificateService};
pub use completion_service::{
    CompletionEvaluator, CompletionOutcome, CompletionReport, IssuancePolicy,
};
pub use error::{
    AppServicesError, CertificateServiceError, CompletionError, IssuanceError, LedgerError,
    StatsError,
};
pub use progress_service::ProgressLedger;
pub use progress_store::ProgressStore;
pub use stats_service::StatsService;
