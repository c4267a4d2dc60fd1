//! Application configuration
//!
//! Settings that shape the process rather than the pipeline: verbosity and
//! where the pipeline configuration file lives.

use std::path::PathBuf;

use crate::config::PipelineConfig;
use crate::error::Result;

/// Application configuration structure
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Verbosity level for logging
    pub verbose: u8,
    /// Optional TOML file layered over the built-in pipeline defaults
    pub config_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn new(verbose: u8) -> Self {
        Self {
            verbose,
            config_path: None,
        }
    }

    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Get the log level string based on verbosity
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            2 => "trace",
            _ => "trace,hyper=debug,tower=debug,reqwest=debug",
        }
    }

    /// Load and validate the pipeline configuration: defaults, then the file
    /// (if any), then `WORKSHOP_*` environment variables.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        PipelineConfig::load(self.config_path.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_log_level_follows_verbosity() {
        assert_eq!(AppConfig::new(0).log_level(), "info");
        assert_eq!(AppConfig::new(1).log_level(), "debug");
        assert!(AppConfig::new(5).log_level().starts_with("trace"));
    }

    #[test]
    fn test_pipeline_config_rejects_invalid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "batch_count = 0").unwrap();

        let app = AppConfig::new(0).with_config_path(Some(file.path().to_path_buf()));
        assert!(app.pipeline_config().is_err());
    }
}
