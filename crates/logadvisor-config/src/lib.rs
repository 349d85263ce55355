use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

// ─────────────────────────────────────────────────────────────────────────────
// Error
// ─────────────────────────────────────────────────────────────────────────────

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

// ─────────────────────────────────────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────────────────────────────────────

/// Log backend (ELK) connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElkConfig {
    pub endpoint: String,
    pub username: String,
    pub password: String,
    pub max_logs: usize,
    pub timeout_secs: u64,
}

impl Default for ElkConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            username: String::new(),
            password: String::new(),
            max_logs: 1000,
            timeout_secs: 30,
        }
    }
}

impl ElkConfig {
    pub fn is_configured(&self) -> bool {
        !self.endpoint.is_empty() && !self.username.is_empty() && !self.password.is_empty()
    }
}

/// Hosted inference API connection and generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub url: String,
    pub token: String,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            token: String::new(),
            model: "VEGAS".to_string(),
            temperature: 0.8,
            max_output_tokens: 3200,
            timeout_secs: 60,
        }
    }
}

impl InferenceConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty() && !self.token.is_empty()
    }
}

/// Reference/solution database location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: String,
    /// JSON reference data loaded into an empty database on start-up.
    pub seed_file: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "log_advisor.db".to_string(),
            seed_file: None,
        }
    }
}

impl StoreConfig {
    pub fn is_configured(&self) -> bool {
        !self.path.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Advisor Config
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    pub elk: ElkConfig,
    pub inference: InferenceConfig,
    pub store: StoreConfig,
}

impl AdvisorConfig {
    /// Reads settings from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`; unset or blank keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(v) = get("ELK_API_ENDPOINT") {
            config.elk.endpoint = v;
        }
        if let Some(v) = get("ELK_USERNAME") {
            config.elk.username = v;
        }
        if let Some(v) = get("ELK_PASSWORD") {
            config.elk.password = v;
        }
        if let Some(v) = get("ELK_MAX_LOGS") {
            config.elk.max_logs = parse_value("ELK_MAX_LOGS", &v)?;
        }

        if let Some(v) = get("INSPIRE_AGENT_URL") {
            config.inference.url = v;
        }
        if let Some(v) = get("INSPIRE_AGENT_TOKEN") {
            config.inference.token = v;
        }
        if let Some(v) = get("INSPIRE_MODEL") {
            config.inference.model = v;
        }
        if let Some(v) = get("INSPIRE_TEMPERATURE") {
            config.inference.temperature = parse_value("INSPIRE_TEMPERATURE", &v)?;
        }
        if let Some(v) = get("INSPIRE_MAX_OUTPUT_TOKENS") {
            config.inference.max_output_tokens = parse_value("INSPIRE_MAX_OUTPUT_TOKENS", &v)?;
        }

        if let Some(v) = get("LOG_ADVISOR_DB") {
            config.store.path = v;
        }
        config.store.seed_file = get("LOG_ADVISOR_SEED");

        Ok(config)
    }

    /// Reads a JSON config file; missing sections and fields take defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AdvisorConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, AdvisorConfig::default());
        assert_eq!(config.elk.max_logs, 1000);
        assert_eq!(config.inference.model, "VEGAS");
        assert_eq!(config.store.path, "log_advisor.db");
        assert!(!config.elk.is_configured());
        assert!(!config.inference.is_configured());
        assert!(config.store.is_configured());
    }

    #[test]
    fn test_from_lookup() {
        let config = AdvisorConfig::from_lookup(lookup(&[
            ("ELK_API_ENDPOINT", "https://elk.local:9200"),
            ("ELK_USERNAME", "elastic"),
            ("ELK_PASSWORD", "changeme"),
            ("ELK_MAX_LOGS", "250"),
            ("INSPIRE_AGENT_URL", "https://inference.local"),
            ("INSPIRE_AGENT_TOKEN", "  tok  "),
            ("INSPIRE_TEMPERATURE", "0.2"),
            ("LOG_ADVISOR_DB", ":memory:"),
            ("LOG_ADVISOR_SEED", ""),
        ]))
        .unwrap();

        assert!(config.elk.is_configured());
        assert_eq!(config.elk.max_logs, 250);
        assert_eq!(config.inference.token, "tok");
        assert_eq!(config.inference.temperature, 0.2);
        assert_eq!(config.inference.max_output_tokens, 3200);
        assert_eq!(config.store.path, ":memory:");
        assert_eq!(config.store.seed_file, None);
    }

    #[test]
    fn test_invalid_number() {
        let err = AdvisorConfig::from_lookup(lookup(&[("ELK_MAX_LOGS", "lots")])).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for ELK_MAX_LOGS: 'lots'");
    }

    #[test]
    fn test_load_partial_file() {
        let path = std::env::temp_dir().join(format!("logadvisor-config-{}.json", std::process::id()));
        fs::write(&path, r#"{"inference": {"url": "http://x", "token": "t"}}"#).unwrap();

        let config = AdvisorConfig::load(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert!(config.inference.is_configured());
        assert_eq!(config.inference.timeout_secs, 60);
        assert_eq!(config.elk, ElkConfig::default());
    }

    #[test]
    fn test_load_missing_file() {
        let err = AdvisorConfig::load(Path::new("/nonexistent/logadvisor.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
