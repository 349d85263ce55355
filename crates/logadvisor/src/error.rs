use logadvisor_config::ConfigError;
use logadvisor_core::CoreError;
use logadvisor_llm::LlmError;
use logadvisor_logs::LogSourceError;
use logadvisor_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Log retrieval failed: {0}")]
    Logs(#[from] LogSourceError),

    #[error("Inference client error: {0}")]
    Llm(#[from] LlmError),

    #[error("Invalid workflow payload: {0}")]
    Payload(#[from] CoreError),

    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),
}
