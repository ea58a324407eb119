//! Configuration for the assistant tooling
//!
//! Settings come from an optional JSON file under `~/.julep-assistant`,
//! then from environment variables (and a `.env` file in the working
//! directory), which always win.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub mod paths;

pub use paths::{config_path, data_dir, expand_home};

/// Agent every command talks to unless `AGENT_UUID` overrides it
pub const DEFAULT_AGENT_ID: &str = "ce7be83e-db8b-4ba9-808e-7cade6812e98";
/// Task that crawls a documentation site
pub const DEFAULT_CRAWL_TASK_ID: &str = "ff6e1014-7240-4049-94f1-115b17b971fe";
/// Task that enriches and indexes one crawled page
pub const DEFAULT_INDEX_TASK_ID: &str = "6ad7f516-703d-46aa-ab6c-4d99c60edcbc";

pub const ENV_API_KEY: &str = "JULEP_API_KEY";
pub const ENV_AGENT_ID: &str = "AGENT_UUID";
pub const ENV_ENVIRONMENT: &str = "JULEP_ENV";
pub const ENV_API_BASE: &str = "JULEP_API_BASE";

/// Errors in configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JULEP_API_KEY environment variable is not set")]
    MissingApiKey,

    #[error("invalid agent id '{0}': expected a UUID")]
    InvalidAgentId(String),

    #[error("unknown environment '{0}' (expected 'production' or 'dev')")]
    UnknownEnvironment(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Remote platform access
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default = "default_agent_id")]
    pub agent_id: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            environment: default_environment(),
            api_base: None,
            agent_id: default_agent_id(),
        }
    }
}

fn default_environment() -> String {
    "production".to_string()
}

fn default_agent_id() -> String {
    DEFAULT_AGENT_ID.to_string()
}

/// Batch job parameters (crawl and index)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Upper bound on a single poll loop; `None` waits forever
    #[serde(default = "default_max_poll")]
    pub max_poll_secs: Option<u64>,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_item_delay")]
    pub item_delay_secs: u64,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_definitions_dir")]
    pub definitions_dir: String,
    #[serde(default = "default_crawl_task_id")]
    pub crawl_task_id: String,
    #[serde(default = "default_index_task_id")]
    pub index_task_id: String,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            max_poll_secs: default_max_poll(),
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay(),
            item_delay_secs: default_item_delay(),
            output_dir: default_output_dir(),
            definitions_dir: default_definitions_dir(),
            crawl_task_id: default_crawl_task_id(),
            index_task_id: default_index_task_id(),
        }
    }
}

fn default_poll_interval() -> u64 {
    5
}

fn default_max_poll() -> Option<u64> {
    Some(3600)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    10
}

fn default_item_delay() -> u64 {
    2
}

fn default_output_dir() -> String {
    "output".to_string()
}

fn default_definitions_dir() -> String {
    "definitions".to_string()
}

fn default_crawl_task_id() -> String {
    DEFAULT_CRAWL_TASK_ID.to_string()
}

fn default_index_task_id() -> String {
    DEFAULT_INDEX_TASK_ID.to_string()
}

impl JobsConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn max_poll(&self) -> Option<Duration> {
        self.max_poll_secs.map(Duration::from_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn item_delay(&self) -> Duration {
        Duration::from_secs(self.item_delay_secs)
    }

    pub fn output_dir(&self) -> PathBuf {
        expand_home(&self.output_dir)
    }

    pub fn definitions_dir(&self) -> PathBuf {
        expand_home(&self.definitions_dir)
    }
}

/// Document search options attached to chat sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallConfig {
    #[serde(default = "default_recall_mode")]
    pub mode: String,
    #[serde(default = "default_recall_confidence")]
    pub confidence: f64,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default = "default_mmr_strength")]
    pub mmr_strength: f64,
    #[serde(default = "default_recall_limit")]
    pub limit: u32,
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            mode: default_recall_mode(),
            confidence: default_recall_confidence(),
            alpha: default_alpha(),
            mmr_strength: default_mmr_strength(),
            limit: default_recall_limit(),
        }
    }
}

fn default_recall_mode() -> String {
    "hybrid".to_string()
}

fn default_recall_confidence() -> f64 {
    0.7
}

fn default_alpha() -> f64 {
    0.5
}

fn default_mmr_strength() -> f64 {
    0.7
}

fn default_recall_limit() -> u32 {
    15
}

/// Feedback loop parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackConfig {
    /// Minimum validator confidence before instructions are rewritten
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    #[serde(default = "default_not_helpful_timeout")]
    pub not_helpful_timeout_secs: u64,
    #[serde(default = "default_detailed_timeout")]
    pub detailed_timeout_secs: u64,
    #[serde(default = "default_model")]
    pub validation_model: String,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            not_helpful_timeout_secs: default_not_helpful_timeout(),
            detailed_timeout_secs: default_detailed_timeout(),
            validation_model: default_model(),
        }
    }
}

fn default_confidence_threshold() -> f64 {
    0.7
}

fn default_not_helpful_timeout() -> u64 {
    60
}

fn default_detailed_timeout() -> u64 {
    90
}

fn default_model() -> String {
    "claude-sonnet-4".to_string()
}

/// Chat front end configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub recall: RecallConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            recall: RecallConfig::default(),
            feedback: FeedbackConfig::default(),
        }
    }
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl Config {
    /// Load the config file (if any), then apply `.env` and process environment
    pub async fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::load_from(&config_path()).await?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load from a specific location, defaults when the file is absent
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config file at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        debug!("Loading config from {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save to a specific location
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        debug!("Saving config to {:?}", path);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Override fields from environment lookups; empty values are ignored
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(key) = get(ENV_API_KEY) {
            self.platform.api_key = key;
        }
        if let Some(agent_id) = get(ENV_AGENT_ID) {
            self.platform.agent_id = agent_id;
        }
        if let Some(environment) = get(ENV_ENVIRONMENT) {
            self.platform.environment = environment;
        }
        if let Some(base) = get(ENV_API_BASE) {
            self.platform.api_base = Some(base);
        }
    }

    /// Check identifiers and environment name
    pub fn validate(&self) -> Result<()> {
        uuid::Uuid::parse_str(&self.platform.agent_id)
            .map_err(|_| ConfigError::InvalidAgentId(self.platform.agent_id.clone()))?;
        self.api_base()?;
        Ok(())
    }

    /// API key, if configured
    pub fn api_key(&self) -> Option<&str> {
        let key = self.platform.api_key.as_str();
        if key.is_empty() {
            None
        } else {
            Some(key)
        }
    }

    /// API key or a `MissingApiKey` error
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key().ok_or(ConfigError::MissingApiKey)
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    /// Base URL of the platform API
    pub fn api_base(&self) -> Result<String> {
        if let Some(base) = &self.platform.api_base {
            if !base.is_empty() {
                return Ok(base.trim_end_matches('/').to_string());
            }
        }

        match self.platform.environment.as_str() {
            "production" => Ok("https://api.julep.ai/api".to_string()),
            "dev" | "development" => Ok("https://dev.julep.ai/api".to_string()),
            other => Err(ConfigError::UnknownEnvironment(other.to_string())),
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.platform.agent_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.platform.environment, "production");
        assert_eq!(config.agent_id(), DEFAULT_AGENT_ID);
        assert_eq!(config.jobs.poll_interval_secs, 5);
        assert_eq!(config.jobs.max_attempts, 3);
        assert_eq!(config.jobs.retry_delay_secs, 10);
        assert_eq!(config.jobs.item_delay_secs, 2);
        assert_eq!(config.chat.feedback.confidence_threshold, 0.7);
        assert_eq!(config.chat.feedback.not_helpful_timeout_secs, 60);
        assert_eq!(config.chat.feedback.detailed_timeout_secs, 90);
        assert_eq!(config.chat.recall.limit, 15);
        assert!(!config.has_api_key());
    }

    #[test]
    fn test_apply_env_overrides() {
        let vars = env(&[
            (ENV_API_KEY, "secret"),
            (ENV_AGENT_ID, "00000000-0000-0000-0000-000000000001"),
            (ENV_ENVIRONMENT, "dev"),
        ]);
        let mut config = Config::default();
        config.apply_env(|key| vars.get(key).cloned());

        assert_eq!(config.api_key(), Some("secret"));
        assert_eq!(config.agent_id(), "00000000-0000-0000-0000-000000000001");
        assert_eq!(config.api_base().unwrap(), "https://dev.julep.ai/api");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apply_env_ignores_empty_values() {
        let vars = env(&[(ENV_API_KEY, "  "), (ENV_AGENT_ID, "")]);
        let mut config = Config::default();
        config.apply_env(|key| vars.get(key).cloned());

        assert!(config.api_key().is_none());
        assert_eq!(config.agent_id(), DEFAULT_AGENT_ID);
    }

    #[test]
    fn test_require_api_key() {
        let mut config = Config::default();
        assert!(matches!(
            config.require_api_key(),
            Err(ConfigError::MissingApiKey)
        ));

        config.platform.api_key = "key".to_string();
        assert_eq!(config.require_api_key().unwrap(), "key");
    }

    #[test]
    fn test_api_base_override_wins() {
        let mut config = Config::default();
        config.platform.api_base = Some("http://localhost:8080/api/".to_string());
        config.platform.environment = "nowhere".to_string();
        assert_eq!(config.api_base().unwrap(), "http://localhost:8080/api");
    }

    #[test]
    fn test_unknown_environment() {
        let mut config = Config::default();
        config.platform.environment = "staging".to_string();
        assert!(matches!(
            config.api_base(),
            Err(ConfigError::UnknownEnvironment(env)) if env == "staging"
        ));
    }

    #[test]
    fn test_invalid_agent_id_rejected() {
        let mut config = Config::default();
        config.platform.agent_id = "not-a-uuid".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidAgentId(_))
        ));
    }

    #[test]
    fn test_missing_api_key_message_names_variable() {
        assert_eq!(
            ConfigError::MissingApiKey.to_string(),
            "JULEP_API_KEY environment variable is not set"
        );
    }

    #[test]
    fn test_job_durations() {
        let jobs = JobsConfig::default();
        assert_eq!(jobs.poll_interval(), Duration::from_secs(5));
        assert_eq!(jobs.retry_delay(), Duration::from_secs(10));
        assert_eq!(jobs.item_delay(), Duration::from_secs(2));
        assert_eq!(jobs.max_poll(), Some(Duration::from_secs(3600)));
        assert_eq!(jobs.output_dir(), PathBuf::from("output"));
    }
}
