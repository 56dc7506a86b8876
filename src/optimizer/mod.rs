//! Optimization Loop
//!
//! 検出・修正・採点のイテレーションを管理するループマネージャー
//!
//! ## 使用例
//!
//! ```rust
//! use content_optimizer::adaptive::{ErrorHandler, InMemoryLogSink, InMemoryRuleStore};
//! use content_optimizer::content::ContentRecord;
//! use content_optimizer::optimizer::{ContentOptimizer, OptimizerConfig};
//! use std::sync::Arc;
//!
//! let handler = Arc::new(ErrorHandler::new(
//!     Arc::new(InMemoryLogSink::new()),
//!     Arc::new(InMemoryRuleStore::new()),
//! ));
//! let optimizer = ContentOptimizer::new(OptimizerConfig::default().with_max_iterations(3), handler).unwrap();
//! let result = optimizer.optimize(&ContentRecord::default(), "rust", &[]);
//! assert!(!result.content.title.is_empty());
//! assert!(result.progress_data.total_iterations <= 3);
//! ```

pub mod correctors;
pub mod loop_manager;
pub mod progress;

pub use correctors::{default_correctors, Correction, CorrectionRequest, Corrector, TitleCorrector};
pub use loop_manager::{ContentOptimizer, OptimizationResult, OptimizerConfig, MAX_ITERATIONS_LIMIT};
pub use progress::{IterationRecord, PerformanceMetrics, ProgressData, RecordType, TerminationReason};
