//! # logadvisor
//!
//! Diagnoses order-processing transactions two ways:
//!
//! - **Workflow conformance**: an order's task-execution trace is compared
//!   against the application's success pattern and success samples, giving
//!   missing, extra, failed and out-of-sequence tasks with severities.
//! - **Log diagnosis**: logs for a work order and task are pulled from ELK
//!   and summarized by a hosted model into errors and root causes.
//!
//! Both paths look up known fixes in the solution knowledge base.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use logadvisor::prelude::*;
//!
//! logadvisor::telemetry::init_tracing();
//! let advisor = Advisor::from_env()?;
//!
//! let payload = serde_json::json!([
//!     {"wf_task_name": "CreateOrder", "status": "Completed", "resp_status_code": 200},
//!     {"wf_task_name": "ChargePayment", "status": "Failed", "resp_status_code": 502}
//! ]);
//! let diagnosis = advisor.analyze_workflow(7, "NEW", "WO-1001", &payload).await?;
//! println!("{}", diagnosis.report);
//! ```

mod advisor;
mod error;
pub mod telemetry;

pub use advisor::{Advisor, LogDiagnosis, ServiceStatus, WorkflowDiagnosis};
pub use error::AdvisorError;

pub use logadvisor_config as config;
pub use logadvisor_core as model;
pub use logadvisor_llm as llm;
pub use logadvisor_logs as logs;
pub use logadvisor_store as store;
pub use logadvisor_workflow as workflow;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{Advisor, AdvisorError, LogDiagnosis, WorkflowDiagnosis};
    pub use logadvisor_config::AdvisorConfig;
    pub use logadvisor_core::{
        AnalysisResult, AnalysisStatus, ErrorRecord, LogRecord, Severity, SuccessPattern,
        SuccessSample, TaskExecution,
    };
    pub use logadvisor_llm::{LlmClient, NarrativeAnalysis};
    pub use logadvisor_logs::{LogQuery, LogSource};
    pub use logadvisor_store::{ReferenceStore, SolutionReport, SolutionStore, SqliteStore};
    pub use logadvisor_workflow::{analyze, format_report, ObservedTrace};
}
