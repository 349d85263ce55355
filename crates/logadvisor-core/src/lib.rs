//! Core domain types and error definitions for logadvisor.
//!
//! This crate provides the types shared across the logadvisor workspace:
//!
//! - [`TaskExecution`]: One observed task execution from a workflow trace
//! - [`ExpectedPatternStep`], [`SuccessPattern`] and [`SuccessSample`]: Reference data
//! - [`AnalysisResult`] and [`ErrorRecord`]: Output of a conformance analysis
//! - [`LogRecord`]: A normalized log line returned by a log backend
//! - [`CoreError`]: Error type for decoding reference data
//!
//! # Example
//!
//! ```rust
//! use logadvisor_core::{ExpectedPatternStep, SuccessPattern, TaskExecution};
//!
//! let task = TaskExecution::new("ValidateOrder", "Completed").with_response_code("200");
//! assert!(task.is_completed());
//!
//! let pattern = SuccessPattern::new(vec![
//!     ExpectedPatternStep::new("ValidateOrder").critical(),
//!     ExpectedPatternStep::new("ShipOrder"),
//! ]);
//! assert_eq!(pattern.steps().unwrap().len(), 2);
//! ```

mod analysis;
mod log;
mod pattern;
pub mod serde_util;
mod task;

pub use analysis::{
    AnalysisResult, AnalysisStatus, ErrorDetail, ErrorRecord, SequenceErrorDetail, Severity,
    TaskFailureDetail, WorkflowInfo,
};
pub use log::{LogLevelClass, LogRecord};
pub use pattern::{ExpectedPatternStep, SuccessPattern, SuccessSample, WorkflowSequence};
pub use task::TaskExecution;

use thiserror::Error;

/// The only task status that passes a task unconditionally.
pub const COMPLETED_STATUS: &str = "Completed";

/// Errors raised while decoding reference or trace data.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A pattern's `workflow_sequence` could not be decoded.
    #[error("Failed to decode workflow sequence: {0}")]
    SequenceDecode(String),

    /// A raw payload did not have the expected shape.
    #[error("Failed to parse payload: {0}")]
    ParseError(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::ParseError(err.to_string())
    }
}

/// Current UTC time as an RFC 3339 string.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
