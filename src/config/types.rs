use crate::optimizer::OptimizerConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Optimizer loop configuration
    #[serde(default)]
    pub optimizer: OptimizerConfig,

    /// Persistent store locations
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Persistent store configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// Error log (JSON lines)
    pub error_log_path: PathBuf,

    /// Adaptive rules (JSON)
    pub rules_path: PathBuf,

    /// Optional error statistics file (JSON)
    #[serde(default)]
    pub stats_path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,

    /// Log format
    pub format: LogFormat,

    /// Enable console output
    #[serde(default = "default_true")]
    pub console: bool,

    /// Optional log directory for rolling files
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Delete rolled files older than this many days
    #[serde(default)]
    pub retention_days: Option<u32>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LogFormat {
    /// Pretty-printed format
    #[serde(rename = "pretty")]
    Pretty,

    /// JSON format
    #[serde(rename = "json")]
    Json,

    /// Compact format
    #[serde(rename = "compact")]
    Compact,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            error_log_path: PathBuf::from("data/error-log.jsonl"),
            rules_path: PathBuf::from("data/adaptive-rules.json"),
            stats_path: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            console: true,
            directory: None,
            retention_days: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            optimizer: OptimizerConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// サンプル設定ファイル（TOML）を生成
    pub fn sample_toml() -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(&Self::default())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_toml_round_trips() {
        let sample = AppConfig::sample_toml().unwrap();
        assert!(sample.contains("[optimizer]"));
        assert!(sample.contains("target_compliance_score"));
        let parsed: AppConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed, AppConfig::default());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: AppConfig = toml::from_str("[logging]\nlevel = \"debug\"\nformat = \"json\"\n").unwrap();
        assert_eq!(parsed.logging.level, "debug");
        assert_eq!(parsed.logging.format, LogFormat::Json);
        assert!(parsed.logging.console);
        assert_eq!(parsed.optimizer, OptimizerConfig::default());
    }
}
