//! Error Handler & Adaptive Rule Store
//!
//! エラーログ、発生統計、手動オーバーライド、適応ルールを管理する。
//!
//! ## 使用例
//!
//! ```rust
//! use content_optimizer::adaptive::{ErrorHandler, InMemoryLogSink, InMemoryRuleStore, LogSeverity};
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//!
//! let handler = ErrorHandler::new(
//!     Arc::new(InMemoryLogSink::new()),
//!     Arc::new(InMemoryRuleStore::new()),
//! );
//! handler
//!     .log_validation_failure("title", "too long", BTreeMap::new(), LogSeverity::Warning)
//!     .unwrap();
//! assert_eq!(handler.error_stats().unwrap()[0].count, 1);
//! ```

pub mod handler;
pub mod log_sink;
pub mod rules;

pub use handler::{ErrorHandler, ErrorStats, ExportFormat, ManualOverride, CSV_HEADER};
pub use log_sink::{ErrorLogEntry, InMemoryLogSink, JsonLinesLogSink, LogSeverity, LogSink};
pub use rules::{
    AdaptiveRules, FileRuleStore, InMemoryRuleStore, RuleStore, RuleUpdateReport, Thresholds,
};
