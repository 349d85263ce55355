//! Reference data, solution knowledge base and analysis history.
//!
//! Lookups go through the narrow [`ReferenceStore`] and [`SolutionStore`]
//! traits. [`SqliteStore`] implements both; it is passed around explicitly
//! (usually as `Arc<SqliteStore>`) and takes its connection lock per call.

mod history;
mod records;
mod seed;
mod solutions;
mod sqlite;

pub use history::{AnalysisQuery, AnalysisRecord};
pub use records::{Application, LogSettings};
pub use seed::{PatternSeed, ReferenceSeed, SampleSeed};
pub use solutions::{
    parse_steps, Recommendation, SolutionReport, SolutionStore, StoredSolution, NO_ERRORS_SUMMARY,
    NO_SOLUTION_FOUND,
};
pub use sqlite::SqliteStore;

use logadvisor_core::{SuccessPattern, SuccessSample};
use thiserror::Error;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Lock error")]
    Lock,
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Keyed lookups for applications and their reference workflow data.
pub trait ReferenceStore: Send + Sync {
    fn list_applications(&self) -> Result<Vec<Application>, StoreError>;

    fn get_log_settings(&self, app_id: i64) -> Result<Option<LogSettings>, StoreError>;

    /// The ordered success pattern for an application/order-type pair.
    fn get_success_pattern(
        &self,
        app_id: i64,
        order_type: &str,
    ) -> Result<Option<SuccessPattern>, StoreError>;

    /// Success samples ordered by `task_sequence`.
    fn get_success_samples(
        &self,
        app_id: i64,
        order_type: &str,
    ) -> Result<Vec<SuccessSample>, StoreError>;
}
