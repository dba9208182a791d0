//! Runtime configuration loaded from `jobflow.toml`.
//!
//! Every field has a default, so a missing file is a valid configuration.
//! The `WEBHOOK_URL` environment variable takes precedence over the file.
//! An absent or empty webhook URL disables notifications.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "jobflow.toml";
pub const WEBHOOK_URL_ENV: &str = "WEBHOOK_URL";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobflowConfig {
    /// Where completion events are posted.
    #[serde(default)]
    pub webhook_url: Option<String>,

    #[serde(default = "default_webhook_timeout_ms")]
    pub webhook_timeout_ms: u64,

    /// Latency of the placeholder execution adapter.
    #[serde(default = "default_execution_delay_ms")]
    pub execution_delay_ms: u64,

    /// Upper bound on a single execution. Unbounded when unset.
    #[serde(default)]
    pub execution_timeout_ms: Option<u64>,

    /// Buffer size of the job event channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_webhook_timeout_ms() -> u64 {
    5000
}

fn default_execution_delay_ms() -> u64 {
    3000
}

fn default_event_capacity() -> usize {
    256
}

impl Default for JobflowConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            webhook_timeout_ms: default_webhook_timeout_ms(),
            execution_delay_ms: default_execution_delay_ms(),
            execution_timeout_ms: None,
            event_capacity: default_event_capacity(),
        }
    }
}

impl JobflowConfig {
    /// Loads `jobflow.toml` from the working directory, then applies the
    /// environment.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_PATH))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<JobflowConfig>(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            Self::default()
        };

        let config = config.normalized();
        Ok(config.with_webhook_override(std::env::var(WEBHOOK_URL_ENV).ok()))
    }

    /// Replaces the webhook URL when `url` is given. An empty string disables
    /// the webhook.
    pub fn with_webhook_override(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            self.webhook_url = non_empty(url);
        }
        self
    }

    fn normalized(mut self) -> Self {
        self.webhook_url = self.webhook_url.and_then(non_empty);
        self
    }

    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_millis(self.webhook_timeout_ms)
    }

    pub fn execution_delay(&self) -> Duration {
        Duration::from_millis(self.execution_delay_ms)
    }

    pub fn execution_timeout(&self) -> Option<Duration> {
        self.execution_timeout_ms.map(Duration::from_millis)
    }
}

fn non_empty(url: String) -> Option<String> {
    let trimmed = url.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
