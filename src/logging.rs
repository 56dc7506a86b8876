use crate::config::{LogFormat, LoggingConfig};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// ログファイル名のプレフィックス
const LOG_FILE_PREFIX: &str = "content-optimizer.log";

/// ログ設定
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// ログレベル (trace, debug, info, warn, error)
    pub level: String,
    /// 追加のフィルターディレクティブ（`content_optimizer::optimizer=debug` など）
    pub directives: Vec<String>,
    /// 出力形式
    pub format: LogFormat,
    /// コンソール出力有効
    pub console_enabled: bool,
    /// ファイル出力先（日次ローテーション）
    pub log_dir: Option<PathBuf>,
    /// 指定日数より古いファイルを削除
    pub retention_days: Option<u32>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::from_logging_config(&LoggingConfig::default())
    }
}

impl LogConfig {
    /// 設定ファイルのセクションから作成
    pub fn from_logging_config(config: &LoggingConfig) -> Self {
        Self {
            level: config.level.clone(),
            directives: Vec::new(),
            format: config.format,
            console_enabled: config.console,
            log_dir: config.directory.clone(),
            retention_days: config.retention_days,
        }
    }

    /// フィルターディレクティブを追加
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// カスタムログディレクトリを設定
    pub fn with_log_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// コンソール出力制御
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.console_enabled = enabled;
        self
    }

    /// `RUST_LOG` が無い場合に使うフィルター
    pub fn filter(&self) -> EnvFilter {
        let mut filter_str = self.level.clone();
        for directive in &self.directives {
            filter_str.push(',');
            filter_str.push_str(directive);
        }
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&filter_str))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// ファイル出力のフラッシュを保証するガード（プロセス終了まで保持する）
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// ログシステムを初期化
pub fn init_logging(config: &LogConfig) -> Result<LogGuard> {
    let mut guard = None;
    let file_writer = match &config.log_dir {
        Some(dir) => {
            ensure_log_dir(dir)?;
            let (writer, worker) = non_blocking(rolling::daily(dir, LOG_FILE_PREFIX));
            guard = Some(worker);
            Some(writer)
        }
        None => None,
    };

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match (config.console_enabled, file_writer) {
        (true, Some(file)) => format_layer(config.format, std::io::stderr.and(file)),
        (false, Some(file)) => format_layer(config.format, file),
        // ファイルが無い場合は常にコンソールへ出力する
        (_, None) => format_layer(config.format, std::io::stderr),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(config.filter())
        .try_init()
        .context("Failed to initialise tracing subscriber")?;

    if let (Some(dir), Some(days)) = (&config.log_dir, config.retention_days) {
        match cleanup_old_logs(dir, days) {
            Ok(0) => {}
            Ok(removed) => tracing::info!("🗑️  Removed {} log file(s) older than {} days", removed, days),
            Err(e) => tracing::warn!("Log retention cleanup failed: {}", e),
        }
    }

    Ok(LogGuard { _file: guard })
}

fn format_layer<W>(format: LogFormat, writer: W) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'a> fmt::MakeWriter<'a> + Send + Sync + 'static,
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_writer(writer).boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(false)
            .with_writer(writer)
            .boxed(),
    }
}

/// ログディレクトリを確保
fn ensure_log_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    }
    Ok(())
}

/// ログファイルかどうかを判定
fn is_log_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|name| name.starts_with(LOG_FILE_PREFIX))
        .unwrap_or(false)
}

/// `max_days` 日より古いログファイルを削除し、削除数を返す
pub fn cleanup_old_logs(log_dir: &Path, max_days: u32) -> Result<usize> {
    let cutoff = SystemTime::now()
        .checked_sub(Duration::from_secs(u64::from(max_days) * 24 * 60 * 60))
        .unwrap_or(SystemTime::UNIX_EPOCH);
    let mut removed = 0;

    for entry in fs::read_dir(log_dir)? {
        let path = entry?.path();
        if !path.is_file() || !is_log_file(&path) {
            continue;
        }
        let modified = fs::metadata(&path).and_then(|m| m.modified());
        match modified {
            Ok(modified) if modified < cutoff => match fs::remove_file(&path) {
                Ok(()) => {
                    removed += 1;
                    tracing::debug!("Removed old log file {}", path.display());
                }
                Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
            },
            _ => {}
        }
    }

    Ok(removed)
}
