use logadvisor_core::CoreError;
use thiserror::Error;

/// Conditions that stop an analysis before a report can be built.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no workflow data to analyze")]
    NoInput,

    #[error("no success pattern or success samples available")]
    NoReference,

    #[error(transparent)]
    Reference(#[from] CoreError),
}
