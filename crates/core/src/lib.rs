#![forbid(unsafe_code)]

pub mod completion;
pub mod error;
pub mod ledger;
pub mod model;
pub mod stats;
pub mod time;

pub use completion::CompletionState;
pub use error::Error;
pub use ledger::{BookmarkDocument, ProgressDocument, ProgressEvent};
pub use stats::{DashboardSummary, LearningStats};
pub use time::Clock;
