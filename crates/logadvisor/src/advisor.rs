//! The advisor: wires log retrieval, conformance analysis, narrative
//! analysis and the solution knowledge base together.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use logadvisor_config::AdvisorConfig;
use logadvisor_core::{AnalysisResult, LogRecord};
use logadvisor_llm::{
    InferenceClient, InferenceClientConfig, LlmClient, NarrativeAnalysis, NarrativeAnalyzer,
};
use logadvisor_logs::{
    ElkLogSource, ElkLogSourceConfig, LogQuery, LogScope, LogSource, DEFAULT_MAX_LOGS,
};
use logadvisor_store::{
    AnalysisRecord, ReferenceSeed, ReferenceStore, SolutionReport, SolutionStore, SqliteStore,
};
use logadvisor_workflow::{analyze, format_report, ObservedTrace};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::AdvisorError;

/// Outcome of diagnosing one work order/task from its logs.
#[derive(Debug, Clone, Serialize)]
pub struct LogDiagnosis {
    pub query: LogQuery,
    pub logs: Vec<LogRecord>,
    /// `None` when no logs were found.
    pub analysis: Option<NarrativeAnalysis>,
    pub solutions: SolutionReport,
}

/// Outcome of analyzing one order's workflow trace.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowDiagnosis {
    /// Id of the persisted history record, if it could be saved.
    pub analysis_id: Option<String>,
    pub result: AnalysisResult,
    /// Plain-text rendering of `result`.
    pub report: String,
    /// Model explanation; `None` when no inference service is configured or
    /// the analysis itself could not run.
    pub narrative: Option<NarrativeAnalysis>,
    pub solutions: SolutionReport,
}

/// Connectivity of one collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStatus {
    pub service: &'static str,
    pub ok: bool,
    pub message: String,
}

pub struct Advisor {
    logs: Arc<dyn LogSource>,
    narrator: NarrativeAnalyzer<Arc<dyn LlmClient>>,
    store: Arc<SqliteStore>,
    max_logs: usize,
}

impl Advisor {
    pub fn new(
        logs: Arc<dyn LogSource>,
        llm: Arc<dyn LlmClient>,
        store: Arc<SqliteStore>,
    ) -> Self {
        Self {
            logs,
            narrator: NarrativeAnalyzer::new(llm),
            store,
            max_logs: DEFAULT_MAX_LOGS,
        }
    }

    /// Caps the number of log records fetched by [`Advisor::log_query`].
    pub fn with_max_logs(mut self, max_logs: usize) -> Self {
        self.max_logs = max_logs;
        self
    }

    /// Builds an advisor from environment variables (and a `.env` file if
    /// present).
    pub fn from_env() -> Result<Self, AdvisorError> {
        dotenvy::dotenv().ok();
        Self::from_config(&AdvisorConfig::from_env()?)
    }

    /// Builds the HTTP collaborators and opens the store. Unconfigured
    /// collaborators are still created; their operations report that they
    /// are not configured.
    pub fn from_config(config: &AdvisorConfig) -> Result<Self, AdvisorError> {
        if !config.elk.is_configured() {
            warn!("ELK is not configured; log diagnosis is unavailable");
        }
        if !config.inference.is_configured() {
            warn!("Inference service is not configured; narrative analysis is unavailable");
        }

        let logs = ElkLogSource::new(ElkLogSourceConfig {
            endpoint: config.elk.endpoint.clone(),
            username: config.elk.username.clone(),
            password: config.elk.password.clone(),
            timeout_secs: config.elk.timeout_secs,
        })?;

        let llm = InferenceClient::new(InferenceClientConfig {
            url: config.inference.url.clone(),
            token: config.inference.token.clone(),
            model: config.inference.model.clone(),
            temperature: config.inference.temperature,
            max_output_tokens: config.inference.max_output_tokens,
            timeout_secs: config.inference.timeout_secs,
        })?;

        let store = SqliteStore::new(&config.store.path)?;
        if let Some(seed_file) = &config.store.seed_file {
            seed_store(&store, Path::new(seed_file))?;
        }

        info!(db = %config.store.path, "Advisor ready");
        Ok(Self::new(Arc::new(logs), Arc::new(llm), Arc::new(store))
            .with_max_logs(config.elk.max_logs))
    }

    pub fn store(&self) -> &Arc<SqliteStore> {
        &self.store
    }

    /// A log query using this advisor's configured result cap.
    pub fn log_query(
        &self,
        work_order: &str,
        task_name: &str,
        start_time: &str,
        end_time: &str,
    ) -> LogQuery {
        LogQuery::new(work_order, task_name, start_time, end_time).with_max_logs(self.max_logs)
    }

    /// Like [`Advisor::log_query`], scoped to one application's logs. Stored
    /// log settings win; otherwise the application's log source is used as
    /// the index with default field names. Unknown applications get an
    /// unscoped query.
    pub fn app_log_query(
        &self,
        app_id: i64,
        work_order: &str,
        task_name: &str,
        start_time: &str,
        end_time: &str,
    ) -> Result<LogQuery, AdvisorError> {
        let query = self.log_query(work_order, task_name, start_time, end_time);

        if let Some(settings) = self.store.get_log_settings(app_id)? {
            let scope = LogScope::new(settings.index_pattern)
                .with_transaction_field(settings.transaction_field)
                .with_timestamp_field(settings.timestamp_field);
            return Ok(query.with_scope(scope));
        }

        let app = self
            .store
            .list_applications()?
            .into_iter()
            .find(|app| app.app_id == app_id);
        match app {
            Some(app) if !app.log_source.trim().is_empty() => {
                Ok(query.with_scope(LogScope::new(app.log_source)))
            }
            _ => {
                warn!(app_id, "No log settings for application, searching all indices");
                Ok(query)
            }
        }
    }

    /// Retrieves logs for `query`, has the model identify errors in them and
    /// looks up known solutions for those errors.
    pub async fn diagnose_logs(&self, query: &LogQuery) -> Result<LogDiagnosis, AdvisorError> {
        query.validate()?;

        let logs = self.logs.retrieve(query).await?;
        if logs.is_empty() {
            info!(work_order = %query.work_order, task = %query.task_name, "No logs to diagnose");
            return Ok(LogDiagnosis {
                query: query.clone(),
                logs,
                analysis: None,
                solutions: self.store.find_solutions(&[]),
            });
        }

        let analysis = self.narrator.analyze_logs(&logs).await;
        let solutions = self.store.find_solutions(&analysis.error_messages());

        Ok(LogDiagnosis {
            query: query.clone(),
            logs,
            analysis: Some(analysis),
            solutions,
        })
    }

    /// Analyzes an order's raw workflow-detail payload against the reference
    /// data stored for `app_id`/`order_type`, and records the result.
    pub async fn analyze_workflow(
        &self,
        app_id: i64,
        order_type: &str,
        order_number: &str,
        raw_trace: &Value,
    ) -> Result<WorkflowDiagnosis, AdvisorError> {
        let trace = ObservedTrace::from_payload(raw_trace)?;
        let pattern = self.store.get_success_pattern(app_id, order_type)?;
        let samples = self.store.get_success_samples(app_id, order_type)?;

        let result = analyze(&trace, pattern.as_ref(), &samples);
        let report = format_report(&result);

        let narrative = if result.is_success() && self.narrator.is_configured() {
            Some(self.narrator.analyze_workflow(&result, &trace).await)
        } else {
            None
        };

        let messages: Vec<String> = result.errors.iter().map(|e| e.message.clone()).collect();
        let solutions = self.store.find_solutions(&messages);

        let record = AnalysisRecord::new(
            app_id,
            order_number,
            Some(order_type.to_string()),
            result.clone(),
        );
        let analysis_id = match self.store.save_analysis(&record) {
            Ok(()) => Some(record.analysis_id),
            Err(e) => {
                warn!("Failed to save analysis: {}", e);
                None
            }
        };

        info!(
            app_id,
            order = %order_number,
            status = result.status.as_str(),
            errors = result.errors.len(),
            "Workflow analyzed"
        );

        Ok(WorkflowDiagnosis {
            analysis_id,
            result,
            report,
            narrative,
            solutions,
        })
    }

    /// Checks each external collaborator.
    pub async fn check_connections(&self) -> Vec<ServiceStatus> {
        let logs = match self.logs.test_connection().await {
            Ok(message) => ServiceStatus {
                service: "logs",
                ok: true,
                message,
            },
            Err(e) => ServiceStatus {
                service: "logs",
                ok: false,
                message: e.to_string(),
            },
        };

        let inference = match self.narrator.client().health_check().await {
            Ok(message) => ServiceStatus {
                service: "inference",
                ok: true,
                message,
            },
            Err(e) => ServiceStatus {
                service: "inference",
                ok: false,
                message: e.to_string(),
            },
        };

        let store = match self.store.list_applications() {
            Ok(apps) => ServiceStatus {
                service: "store",
                ok: true,
                message: format!("{} applications configured", apps.len()),
            },
            Err(e) => ServiceStatus {
                service: "store",
                ok: false,
                message: e.to_string(),
            },
        };

        vec![logs, inference, store]
    }
}

fn seed_store(store: &SqliteStore, path: &Path) -> Result<(), AdvisorError> {
    let content = fs::read_to_string(path)?;
    let seed = ReferenceSeed::from_json(&content)?;
    store.seed_if_empty(&seed)?;
    Ok(())
}
