// Configuration module
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::retry::BackoffPolicy;

/// Tunables for the load engine. Loadable from a TOML file; every
/// field has a conservative default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Rows per ingestion chunk. Deliberately small relative to the
    /// store's request-size ceiling: timeouts and oversize rejections
    /// cost more than the lost throughput.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Pacing between chunk submissions.
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,

    /// Attempts per chunk before it is recorded as failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between attempts on the same chunk.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Timeout applied to every HTTP-bound call.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Description file names searched in the archive-specific and
    /// shared directories, in load order.
    #[serde(default = "default_description_files")]
    pub description_files: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            requests_per_second: default_requests_per_second(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            description_files: default_description_files(),
        }
    }
}

impl LoaderConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(self.max_attempts, Duration::from_millis(self.retry_delay_ms))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_chunk_size() -> usize {
    50
}

fn default_requests_per_second() -> f64 {
    1.0
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_description_files() -> Vec<String> {
    vec![
        "AcctDesc.txt".to_string(),
        "Acct-DescGrants.txt".to_string(),
        "Acct-DescTradeNames.txt".to_string(),
    ]
}
