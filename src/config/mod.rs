//! Pipeline configuration
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `WORKSHOP_*` environment variables. The API credential itself never lives
//! here; only the name of the environment variable it is read from at call
//! time.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

pub const ENV_PREFIX: &str = "WORKSHOP_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Independent generation batches issued by stage 2.
    pub batch_count: usize,
    /// Workshop items requested per batch.
    pub items_per_batch: usize,
    /// Regeneration rounds allowed per item in stage 3.
    pub max_attempts: u32,
    /// Accepted suggestions an item needs before validation stops.
    pub target_suggestions: usize,
    /// Minimum quality score (0-100) for a suggestion to pass.
    pub pass_threshold: u8,
    /// Score assigned when the judge is unavailable and validation fails open.
    pub fail_open_score: u8,
    /// Upper bound on items validated concurrently.
    pub max_concurrent_items: usize,
    pub generation: GenerationSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Hard deadline for a single network call.
    pub request_timeout_secs: u64,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_count: 3,
            items_per_batch: 3,
            max_attempts: 2,
            target_suggestions: 3,
            pass_threshold: 70,
            fail_open_score: 65,
            max_concurrent_items: 9,
            generation: GenerationSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-sonnet-4-5".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            request_timeout_secs: 60,
            max_tokens: 4096,
        }
    }
}

impl GenerationSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load defaults, overlay `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.merge_env_vars();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn merge_env_vars(&mut self) {
        self.merge_env_with(|key| std::env::var(key).ok());
    }

    /// Overlay values found through `lookup`. Unparseable values are ignored.
    pub fn merge_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = get("BATCH_COUNT").and_then(|v| v.parse().ok()) {
            self.batch_count = v;
        }
        if let Some(v) = get("ITEMS_PER_BATCH").and_then(|v| v.parse().ok()) {
            self.items_per_batch = v;
        }
        if let Some(v) = get("MAX_ATTEMPTS").and_then(|v| v.parse().ok()) {
            self.max_attempts = v;
        }
        if let Some(v) = get("PASS_THRESHOLD").and_then(|v| v.parse().ok()) {
            self.pass_threshold = v;
        }
        if let Some(v) = get("MAX_CONCURRENT_ITEMS").and_then(|v| v.parse().ok()) {
            self.max_concurrent_items = v;
        }
        if let Some(v) = get("API_BASE_URL") {
            self.generation.base_url = v;
        }
        if let Some(v) = get("MODEL") {
            self.generation.model = v;
        }
        if let Some(v) = get("REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.generation.request_timeout_secs = v;
        }
        if let Some(v) = get("BIND") {
            self.server.bind = v;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_count == 0 {
            return Err(Error::Config("batch_count must be at least 1".to_string()));
        }
        if self.items_per_batch == 0 {
            return Err(Error::Config(
                "items_per_batch must be at least 1".to_string(),
            ));
        }
        if !(1..=3).contains(&self.target_suggestions) {
            return Err(Error::Config(format!(
                "target_suggestions must be between 1 and 3, got {}",
                self.target_suggestions
            )));
        }
        if self.pass_threshold > 100 {
            return Err(Error::Config(format!(
                "pass_threshold must be at most 100, got {}",
                self.pass_threshold
            )));
        }
        if !(60..=70).contains(&self.fail_open_score) {
            return Err(Error::Config(format!(
                "fail_open_score must be between 60 and 70, got {}",
                self.fail_open_score
            )));
        }
        if self.max_concurrent_items == 0 {
            return Err(Error::Config(
                "max_concurrent_items must be at least 1".to_string(),
            ));
        }
        if self.generation.request_timeout_secs == 0 {
            return Err(Error::Config(
                "generation.request_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
