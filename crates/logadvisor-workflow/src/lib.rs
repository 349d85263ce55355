//! Workflow trace normalization and conformance analysis.
//!
//! The pipeline is pure and synchronous:
//!
//! 1. [`ObservedTrace`] decodes an upstream workflow-detail payload into
//!    ordered [`TaskExecution`](logadvisor_core::TaskExecution) records.
//! 2. [`analyze`] compares the trace against a success pattern and/or
//!    success samples and returns an [`AnalysisResult`](logadvisor_core::AnalysisResult).
//! 3. [`format_report`] and [`format_trace`] render the result and trace as
//!    plain text for downstream narrative analysis.
//!
//! ```rust
//! use logadvisor_core::{ExpectedPatternStep, SuccessPattern, TaskExecution};
//! use logadvisor_workflow::{analyze, ObservedTrace};
//!
//! let trace = ObservedTrace::from_executions(vec![
//!     TaskExecution::new("Validate", "Completed"),
//!     TaskExecution::new("Ship", "Completed"),
//! ]);
//! let pattern = SuccessPattern::new(vec![
//!     ExpectedPatternStep::new("Validate"),
//!     ExpectedPatternStep::new("Ship"),
//! ]);
//!
//! let result = analyze(&trace, Some(&pattern), &[]);
//! assert!(result.errors.is_empty());
//! ```

mod analyzer;
mod error;
mod reference;
mod report;
mod trace;

pub use analyzer::{
    analyze, NO_REFERENCE_DATA, NO_WORKFLOW_DATA, SEQUENCE_ROOT_CAUSE, TASK_FAILURE_ROOT_CAUSE,
    WORKFLOW_OK,
};
pub use error::AnalysisError;
pub use reference::{ExpectedSequence, ReferenceSource};
pub use report::{format_report, format_trace};
pub use trace::{normalize, ObservedTrace, RawTaskExecution};
