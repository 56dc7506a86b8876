use super::types::AppConfig;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use std::path::Path;
use tracing::debug;

/// 環境変数のプレフィックス（`CONTENT_OPTIMIZER__OPTIMIZER__MAX_ITERATIONS=5` など）
pub const ENV_PREFIX: &str = "CONTENT_OPTIMIZER";

/// Configuration loader with builder pattern
///
/// 優先順位: デフォルト値 → 設定ファイル → 環境変数
pub struct ConfigLoader {
    config_file: Option<String>,
    load_env: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            config_file: None,
            load_env: false,
        }
    }

    /// Load configuration from file
    pub fn load_from_file(mut self, path: Option<&Path>) -> Self {
        self.config_file = path.map(|p| p.to_string_lossy().into_owned());
        self
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> Result<AppConfig> {
        let mut builder = Config::builder().add_source(
            Config::try_from(&AppConfig::default()).context("Failed to serialize default configuration")?,
        );

        if let Some(config_path) = &self.config_file {
            // 明示的に指定されたファイルは必須
            if !Path::new(config_path).exists() {
                anyhow::bail!("Configuration file not found: {}", config_path);
            }
            debug!("Loading configuration from {}", config_path);
            builder = builder.add_source(File::with_name(config_path).required(true));
        } else {
            // Try to load from standard locations
            builder = builder
                .add_source(File::with_name("content-optimizer").required(false))
                .add_source(File::with_name("config/content-optimizer").required(false));
        }

        if self.load_env {
            builder = builder.add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let config: AppConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config
            .optimizer
            .validate()
            .context("Invalid optimizer configuration")?;

        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_sources() {
        let config = ConfigLoader::new().build().unwrap();
        assert_eq!(config.optimizer.max_iterations, 10);
        assert_eq!(config.optimizer.target_compliance_score, 95.0);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[optimizer]\nmax_iterations = 4\ntarget_compliance_score = 90.0\n\n[logging]\nlevel = \"debug\""
        )
        .unwrap();

        let config = ConfigLoader::new()
            .load_from_file(Some(file.path()))
            .build()
            .unwrap();
        assert_eq!(config.optimizer.max_iterations, 4);
        assert_eq!(config.optimizer.target_compliance_score, 90.0);
        assert_eq!(config.optimizer.stagnation_threshold, 3);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = ConfigLoader::new()
            .load_from_file(Some(Path::new("/nonexistent/content-optimizer.toml")))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_optimizer_values_are_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[optimizer]\ntarget_compliance_score = 150.0").unwrap();
        let result = ConfigLoader::new().load_from_file(Some(file.path())).build();
        assert!(result.is_err());
    }
}
