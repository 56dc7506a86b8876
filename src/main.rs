//! content-optimizer Binary Entry Point
//!
//! 設定の読み込み、ログ初期化、JSONレコードの最適化（バッチは並行実行）

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use content_optimizer::adaptive::{ErrorHandler, ExportFormat, FileRuleStore, JsonLinesLogSink};
use content_optimizer::config::{AppConfig, ConfigLoader};
use content_optimizer::logging::{init_logging, LogConfig};
use content_optimizer::{ContentOptimizer, ContentRecord, OptimizationResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Multi-pass SEO and readability compliance optimizer
#[derive(Parser)]
#[command(name = "content-optimizer")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize a single content record
    Optimize {
        /// Content record (JSON)
        #[arg(long)]
        input: PathBuf,

        /// Focus keyword
        #[arg(long)]
        keyword: String,

        /// Synonym / secondary keyword (repeatable, in priority order)
        #[arg(long = "synonym")]
        synonyms: Vec<String>,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Optimize every JSON record in a directory concurrently
    Bulk {
        /// Directory containing content records
        #[arg(long)]
        input_dir: PathBuf,

        /// Focus keyword
        #[arg(long)]
        keyword: String,

        /// Synonym / secondary keyword (repeatable, in priority order)
        #[arg(long = "synonym")]
        synonyms: Vec<String>,

        /// Directory for optimization results
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Maximum number of records optimized at once
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
    },

    /// Validate a content record without correcting it
    Revalidate {
        /// Content record (JSON)
        #[arg(long)]
        input: PathBuf,

        /// Focus keyword
        #[arg(long)]
        keyword: String,

        /// Synonym / secondary keyword (repeatable, in priority order)
        #[arg(long = "synonym")]
        synonyms: Vec<String>,
    },

    /// Export the validation error log
    ExportLogs {
        /// Export format
        #[arg(long, default_value = "json")]
        format: FormatArg,

        /// Only include entries from the last N days
        #[arg(long, default_value_t = 30)]
        days: u32,
    },

    /// Print a sample configuration file
    GenerateConfig,
}

/// Export format CLI argument
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Json,
    Csv,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => ExportFormat::Json,
            FormatArg::Csv => ExportFormat::Csv,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::GenerateConfig = cli.command {
        print!("{}", AppConfig::sample_toml()?);
        return Ok(());
    }

    let config = ConfigLoader::new()
        .load_from_file(cli.config.as_deref())
        .load_from_env()
        .build()?;

    let log_config = LogConfig::from_logging_config(&config.logging).with_directive(format!(
        "content_optimizer::optimizer={}",
        config.optimizer.log_level
    ));
    let _guard = init_logging(&log_config)?;

    let handler = Arc::new(build_error_handler(&config)?);

    match cli.command {
        Commands::Optimize {
            input,
            keyword,
            synonyms,
            output,
        } => {
            let optimizer = ContentOptimizer::new(config.optimizer.clone(), handler)?;
            let record = read_record(&input)?;
            let result = optimizer.optimize(&record, &keyword, &synonyms);
            log_summary(&input, &result);
            write_result(output.as_deref(), &result)?;
        }
        Commands::Bulk {
            input_dir,
            keyword,
            synonyms,
            output_dir,
            concurrency,
        } => {
            let optimizer = Arc::new(ContentOptimizer::new(config.optimizer.clone(), handler)?);
            run_bulk(optimizer, &input_dir, keyword, synonyms, output_dir, concurrency).await?;
        }
        Commands::Revalidate {
            input,
            keyword,
            synonyms,
        } => {
            let optimizer = ContentOptimizer::new(config.optimizer.clone(), handler)?;
            let record = read_record(&input)?;
            let validation = optimizer.revalidate(&record, &keyword, &synonyms);
            println!("{}", serde_json::to_string_pretty(&validation)?);
        }
        Commands::ExportLogs { format, days } => {
            print!("{}", handler.export_logs(format.into(), days)?);
        }
        Commands::GenerateConfig => {}
    }

    Ok(())
}

/// 設定に従ってファイルバックエンドのエラーハンドラーを作成
fn build_error_handler(config: &AppConfig) -> Result<ErrorHandler> {
    let storage = &config.storage;
    let sink = JsonLinesLogSink::new(&storage.error_log_path)
        .with_context(|| format!("Failed to open error log {}", storage.error_log_path.display()))?;
    let rules = FileRuleStore::open(&storage.rules_path)
        .with_context(|| format!("Failed to open rule store {}", storage.rules_path.display()))?;

    let handler = ErrorHandler::new(Arc::new(sink), Arc::new(rules));
    match &storage.stats_path {
        Some(path) => Ok(handler
            .with_stats_path(path)
            .with_context(|| format!("Failed to load error stats {}", path.display()))?),
        None => Ok(handler),
    }
}

fn read_record(path: &Path) -> Result<ContentRecord> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid content record in {}", path.display()))
}

fn write_result(output: Option<&Path>, result: &OptimizationResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
        }
        None => {
            println!("{}", json);
            Ok(())
        }
    }
}

fn log_summary(source: &Path, result: &OptimizationResult) {
    let progress = &result.progress_data;
    if result.success {
        info!(
            "📄 {}: {} (score {:.1}, {} iteration(s))",
            source.display(),
            progress.termination_reason,
            progress.final_score,
            progress.total_iterations
        );
    } else {
        warn!(
            "📄 {}: {} (score {:.1}, {} iteration(s), {} issue(s) left)",
            source.display(),
            progress.termination_reason,
            progress.final_score,
            progress.total_iterations,
            result.validation_result.issue_count
        );
    }
}

/// ディレクトリ内のレコードを並行して最適化
async fn run_bulk(
    optimizer: Arc<ContentOptimizer>,
    input_dir: &Path,
    keyword: String,
    synonyms: Vec<String>,
    output_dir: Option<PathBuf>,
    concurrency: usize,
) -> Result<()> {
    let mut inputs: Vec<PathBuf> = std::fs::read_dir(input_dir)
        .with_context(|| format!("Failed to read {}", input_dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().map(|e| e == "json").unwrap_or(false))
        .collect();
    inputs.sort();
    info!("🚀 Optimizing {} record(s) with concurrency {}", inputs.len(), concurrency.max(1));

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let keyword = Arc::new(keyword);
    let synonyms = Arc::new(synonyms);
    let mut tasks = JoinSet::new();

    for path in inputs {
        let permit = semaphore.clone().acquire_owned().await?;
        let optimizer = optimizer.clone();
        let keyword = keyword.clone();
        let synonyms = synonyms.clone();
        tasks.spawn_blocking(move || {
            let _permit = permit;
            let outcome = read_record(&path).map(|record| optimizer.optimize(&record, &keyword, &synonyms));
            (path, outcome)
        });
    }

    let (mut compliant, mut failed, mut total) = (0usize, 0usize, 0usize);
    while let Some(joined) = tasks.join_next().await {
        total += 1;
        let (path, outcome) = joined.context("Optimization task panicked")?;
        match outcome {
            Ok(result) => {
                log_summary(&path, &result);
                if result.success {
                    compliant += 1;
                }
                if let Some(dir) = &output_dir {
                    let name = path
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "record".to_string());
                    write_result(Some(&dir.join(format!("{}.optimized.json", name))), &result)?;
                }
            }
            Err(e) => {
                failed += 1;
                error!("❌ {}: {:#}", path.display(), e);
            }
        }
    }

    info!(
        "✅ Bulk optimization finished: {}/{} compliant, {} failed",
        compliant, total, failed
    );
    Ok(())
}
