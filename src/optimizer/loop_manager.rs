//! Optimization Loop Manager
//!
//! 検出 → 修正 → 再採点を繰り返し、目標スコア・反復上限・停滞のいずれかで終了する。

use super::correctors::{default_correctors, CorrectionRequest, Corrector};
use super::progress::{IterationRecord, PerformanceMetrics, ProgressData, RecordType, TerminationReason};
use crate::adaptive::{ErrorHandler, ErrorLogEntry, LogSeverity, Thresholds};
use crate::content::{ContentRecord, Issue, Severity};
use crate::error::{Error, Result};
use crate::seo::{compliance_score, IssueDetector, ValidationResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// 設定可能な反復回数の上限
pub const MAX_ITERATIONS_LIMIT: u32 = 100;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// 最適化ループの設定
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OptimizerConfig {
    /// 最大イテレーション数（ベースラインを除く）
    pub max_iterations: u32,
    /// 目標スコア（0-100）
    pub target_compliance_score: f64,
    /// 停滞時の早期終了
    pub enable_early_termination: bool,
    /// 停滞と判定する連続イテレーション数
    pub stagnation_threshold: u32,
    /// 1イテレーションで必要な最小改善幅（スコア）
    pub min_improvement_threshold: f64,
    /// false の場合は検出のみ
    pub auto_correction: bool,
    /// 最適化ループのログレベル
    pub log_level: String,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            target_compliance_score: 95.0,
            enable_early_termination: true,
            stagnation_threshold: 3,
            min_improvement_threshold: 1.0,
            auto_correction: true,
            log_level: "info".to_string(),
        }
    }
}

impl OptimizerConfig {
    /// 目標スコアを設定
    pub fn with_target_score(mut self, score: f64) -> Self {
        self.target_compliance_score = score;
        self
    }

    /// 最大イテレーション数を設定
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// 設定値を検証
    pub fn validate(&self) -> Result<()> {
        if !self.target_compliance_score.is_finite() || !(0.0..=100.0).contains(&self.target_compliance_score) {
            return Err(Error::InvalidConfiguration(format!(
                "target_compliance_score must be within 0-100, got {}",
                self.target_compliance_score
            )));
        }
        if self.max_iterations > MAX_ITERATIONS_LIMIT {
            return Err(Error::InvalidConfiguration(format!(
                "max_iterations must be at most {}, got {}",
                MAX_ITERATIONS_LIMIT, self.max_iterations
            )));
        }
        if !self.min_improvement_threshold.is_finite() || self.min_improvement_threshold < 0.0 {
            return Err(Error::InvalidConfiguration(format!(
                "min_improvement_threshold must be a non-negative number, got {}",
                self.min_improvement_threshold
            )));
        }
        if self.enable_early_termination && self.stagnation_threshold == 0 {
            return Err(Error::InvalidConfiguration(
                "stagnation_threshold must be at least 1 when early termination is enabled".to_string(),
            ));
        }
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(Error::InvalidConfiguration(format!(
                "unknown log_level: {}",
                self.log_level
            )));
        }
        Ok(())
    }
}

/// 最適化結果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// 準拠を達成したか（初期準拠を含む）
    pub success: bool,
    /// 最良の修正済みレコード
    pub content: ContentRecord,
    pub validation_result: ValidationResult,
    pub progress_data: ProgressData,
    pub config: OptimizerConfig,
    /// この実行で記録されたログエントリ
    pub error_log: Vec<ErrorLogEntry>,
}

/// 採点済みのレコード
struct Scored {
    content: ContentRecord,
    issues: Vec<Issue>,
    score: f64,
}

/// コンテンツオプティマイザー（ループマネージャー）
pub struct ContentOptimizer {
    config: OptimizerConfig,
    handler: Arc<ErrorHandler>,
    correctors: Vec<Box<dyn Corrector>>,
}

impl ContentOptimizer {
    /// 新規オプティマイザーを作成（設定は境界で検証する）
    pub fn new(config: OptimizerConfig, handler: Arc<ErrorHandler>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            handler,
            correctors: default_correctors(),
        })
    }

    /// 修正器を差し替える
    pub fn with_correctors(mut self, correctors: Vec<Box<dyn Corrector>>) -> Self {
        self.correctors = correctors;
        self
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn handler(&self) -> &Arc<ErrorHandler> {
        &self.handler
    }

    /// 検出のみ（手動の再検証用）
    pub fn revalidate(&self, content: &ContentRecord, keyword: &str, synonyms: &[String]) -> ValidationResult {
        let detector = IssueDetector::new(self.handler.thresholds());
        ValidationResult::from_issues(self.active_issues(&detector, content, keyword, synonyms))
    }

    /// コンテンツを最適化
    ///
    /// 失敗は伝播せず、常に終了理由と最良のレコードを返す。
    pub fn optimize(&self, content: &ContentRecord, keyword: &str, synonyms: &[String]) -> OptimizationResult {
        let started = Instant::now();
        let thresholds = self.handler.thresholds();
        let detector = IssueDetector::new(thresholds.clone());
        let target = self.config.target_compliance_score;
        let mut error_log = Vec::new();

        let mut best = self.score(&detector, content.clone(), keyword, synonyms);
        let mut iterations = vec![IterationRecord {
            iteration: 0,
            record_type: RecordType::Baseline,
            score: best.score,
            improvements: Vec::new(),
            timestamp: Utc::now(),
        }];
        info!(
            "🔍 Baseline compliance score {:.1} ({} issues, target {:.1})",
            best.score,
            best.issues.len(),
            target
        );

        let mut improvements: Vec<f64> = Vec::new();
        let mut iteration: u32 = 0;
        let reason = if best.score >= target {
            TerminationReason::InitialCompliance
        } else if !self.config.auto_correction {
            TerminationReason::InsufficientImprovement
        } else if self.config.max_iterations == 0 {
            TerminationReason::MaxIterationsReached
        } else {
            loop {
                iteration += 1;
                let previous_score = best.score;
                let outcome = self.run_iteration(&best, keyword, synonyms, &thresholds);

                let (changes, failure) = match outcome {
                    Ok((candidate, changes)) => {
                        let candidate = self.score(&detector, candidate, keyword, synonyms);
                        if candidate.score >= best.score {
                            best = candidate;
                            (changes, None)
                        } else {
                            debug!(
                                "Iteration {}: discarded candidate scoring {:.1} (best {:.1})",
                                iteration, candidate.score, best.score
                            );
                            (
                                vec![format!(
                                    "Discarded candidate scoring {:.1} below best {:.1}",
                                    candidate.score, best.score
                                )],
                                None,
                            )
                        }
                    }
                    Err(e) => (vec![format!("Correction failed: {}", e)], Some(e)),
                };

                let improvement = best.score - previous_score;
                improvements.push(improvement);
                iterations.push(IterationRecord {
                    iteration,
                    record_type: RecordType::Optimization,
                    score: best.score,
                    improvements: changes,
                    timestamp: Utc::now(),
                });
                debug!(
                    "Iteration {}: score {:.1} ({:+.1})",
                    iteration, best.score, improvement
                );

                if let Some(e) = failure {
                    error!("❌ Optimization aborted at iteration {}: {}", iteration, e);
                    self.log_critical(&e, iteration, keyword, &mut error_log);
                    break TerminationReason::CriticalError;
                }
                if best.score >= target {
                    break TerminationReason::ComplianceAchieved;
                }
                if iteration >= self.config.max_iterations {
                    break TerminationReason::MaxIterationsReached;
                }
                if let Some(reason) = self.early_termination(&improvements) {
                    break reason;
                }
            }
        };

        for issue in &best.issues {
            self.log_remaining_issue(issue, reason, keyword, &mut error_log);
        }

        let final_score = best.score;
        let progress_data = ProgressData {
            iterations,
            total_iterations: iteration,
            final_score,
            compliance_achieved: reason.is_compliant(),
            termination_reason: reason,
            performance_metrics: PerformanceMetrics {
                total_duration_ms: started.elapsed().as_millis() as u64,
                final_compliance_score: final_score,
            },
        };
        info!(
            "✅ Optimization finished: {} after {} iteration(s), score {:.1}",
            reason, iteration, final_score
        );

        OptimizationResult {
            success: reason.is_compliant(),
            content: best.content,
            validation_result: ValidationResult::from_issues(best.issues),
            progress_data,
            config: self.config.clone(),
            error_log,
        }
    }

    /// 最も重要度の高い問題を担当する修正器を順に適用
    fn run_iteration(
        &self,
        best: &Scored,
        keyword: &str,
        synonyms: &[String],
        thresholds: &Thresholds,
    ) -> Result<(ContentRecord, Vec<String>)> {
        let tier: Option<Severity> = best.issues.iter().map(|i| i.severity).min();
        let tier_issues: Vec<Issue> = best
            .issues
            .iter()
            .filter(|i| Some(i.severity) == tier)
            .cloned()
            .collect();

        let mut candidate = best.content.clone();
        let mut changes = Vec::new();
        for corrector in &self.correctors {
            let handled: Vec<Issue> = tier_issues
                .iter()
                .filter(|i| corrector.handles(i.issue_type))
                .cloned()
                .collect();
            if handled.is_empty() {
                continue;
            }

            let request = CorrectionRequest {
                issues: &handled,
                keyword,
                synonyms,
                thresholds,
            };
            let correction = corrector.correct(&candidate, &request)?;
            if !candidate.body.trim().is_empty() && correction.content.body.trim().is_empty() {
                return Err(Error::corrector(corrector.name(), "correction produced an empty body"));
            }
            debug!("{} applied {} change(s)", corrector.name(), correction.changes.len());
            candidate = correction.content;
            changes.extend(correction.changes);
        }
        Ok((candidate, changes))
    }

    /// 直近 `stagnation_threshold` 回の改善幅がすべて最小値未満なら終了
    fn early_termination(&self, improvements: &[f64]) -> Option<TerminationReason> {
        if !self.config.enable_early_termination {
            return None;
        }
        let window = self.config.stagnation_threshold as usize;
        if window == 0 || improvements.len() < window {
            return None;
        }
        let recent = &improvements[improvements.len() - window..];
        if !recent.iter().all(|d| *d < self.config.min_improvement_threshold) {
            return None;
        }
        if recent.iter().all(|d| *d <= 0.0) {
            warn!("Optimization stagnated for {} iteration(s)", window);
            Some(TerminationReason::StagnationDetected)
        } else {
            warn!("Improvement below {:.1} for {} iteration(s)", self.config.min_improvement_threshold, window);
            Some(TerminationReason::InsufficientImprovement)
        }
    }

    fn score(&self, detector: &IssueDetector, content: ContentRecord, keyword: &str, synonyms: &[String]) -> Scored {
        let issues = self.active_issues(detector, &content, keyword, synonyms);
        let score = compliance_score(&issues);
        Scored { content, issues, score }
    }

    /// 手動オーバーライドで抑制されていない問題
    fn active_issues(
        &self,
        detector: &IssueDetector,
        content: &ContentRecord,
        keyword: &str,
        synonyms: &[String],
    ) -> Vec<Issue> {
        detector
            .detect(content, keyword, synonyms)
            .into_iter()
            .filter(|issue| {
                let skipped = self.handler.is_overridden(issue.component(), issue.issue_type.signature());
                if skipped {
                    debug!("Skipping overridden issue {}:{}", issue.component(), issue.issue_type);
                }
                !skipped
            })
            .collect()
    }

    fn log_remaining_issue(
        &self,
        issue: &Issue,
        reason: TerminationReason,
        keyword: &str,
        error_log: &mut Vec<ErrorLogEntry>,
    ) {
        let mut context: BTreeMap<String, Value> = BTreeMap::new();
        context.insert("message".to_string(), json!(issue.message));
        context.insert("issueSeverity".to_string(), json!(issue.severity.name()));
        context.insert("terminationReason".to_string(), json!(reason.name()));
        context.insert("keyword".to_string(), json!(keyword));
        if let Some(quantification) = &issue.quantification {
            context.insert("quantification".to_string(), json!(quantification));
        }
        let severity = match issue.severity {
            Severity::Critical => LogSeverity::Error,
            Severity::Major => LogSeverity::Warning,
            Severity::Minor => LogSeverity::Info,
        };

        match self
            .handler
            .log_validation_failure(issue.component(), issue.issue_type.signature(), context, severity)
        {
            Ok(entry) => error_log.push(entry),
            Err(e) => warn!("Failed to record remaining issue {}: {}", issue.issue_type, e),
        }
    }

    fn log_critical(&self, failure: &Error, iteration: u32, keyword: &str, error_log: &mut Vec<ErrorLogEntry>) {
        let component = match failure {
            Error::Corrector { component, .. } => component.as_str(),
            _ => "optimizer",
        };
        let mut context: BTreeMap<String, Value> = BTreeMap::new();
        context.insert("message".to_string(), json!(failure.to_string()));
        context.insert("kind".to_string(), json!(failure.kind()));
        context.insert("iteration".to_string(), json!(iteration));
        context.insert("keyword".to_string(), json!(keyword));

        match self
            .handler
            .log_validation_failure(component, "critical_error", context, LogSeverity::Critical)
        {
            Ok(entry) => error_log.push(entry),
            Err(e) => warn!("Failed to record critical error: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adaptive::{InMemoryLogSink, InMemoryRuleStore, ManualOverride};
    use crate::content::IssueType;
    use crate::optimizer::correctors::Correction;

    fn handler() -> Arc<ErrorHandler> {
        Arc::new(ErrorHandler::new(
            Arc::new(InMemoryLogSink::new()),
            Arc::new(InMemoryRuleStore::new()),
        ))
    }

    fn optimizer(config: OptimizerConfig) -> ContentOptimizer {
        ContentOptimizer::new(config, handler()).unwrap()
    }

    struct FailingCorrector;

    impl Corrector for FailingCorrector {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn handles(&self, _issue_type: IssueType) -> bool {
            true
        }

        fn correct(&self, _content: &ContentRecord, _request: &CorrectionRequest<'_>) -> Result<Correction> {
            Err(Error::corrector("failing", "boom"))
        }
    }

    struct NoopCorrector;

    impl Corrector for NoopCorrector {
        fn name(&self) -> &'static str {
            "noop"
        }

        fn handles(&self, _issue_type: IssueType) -> bool {
            true
        }

        fn correct(&self, content: &ContentRecord, _request: &CorrectionRequest<'_>) -> Result<Correction> {
            Ok(Correction {
                content: content.clone(),
                changes: Vec::new(),
            })
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(OptimizerConfig::default().validate().is_ok());
        assert!(OptimizerConfig::default().with_target_score(101.0).validate().is_err());
        assert!(OptimizerConfig::default().with_target_score(f64::NAN).validate().is_err());
        assert!(OptimizerConfig::default().with_max_iterations(1000).validate().is_err());

        let config = OptimizerConfig {
            stagnation_threshold: 0,
            ..OptimizerConfig::default()
        };
        assert!(config.validate().is_err());
        let config = OptimizerConfig {
            log_level: "loud".to_string(),
            ..OptimizerConfig::default()
        };
        assert!(ContentOptimizer::new(config, handler()).is_err());
    }

    #[test]
    fn test_initial_compliance_skips_iterations() {
        let result = optimizer(OptimizerConfig::default().with_target_score(0.0)).optimize(
            &ContentRecord::default(),
            "rust",
            &[],
        );
        assert!(result.success);
        assert_eq!(result.progress_data.termination_reason, TerminationReason::InitialCompliance);
        assert_eq!(result.progress_data.total_iterations, 0);
        assert_eq!(result.progress_data.iterations.len(), 1);
        assert_eq!(result.content, ContentRecord::default());
    }

    #[test]
    fn test_detect_only_run() {
        let config = OptimizerConfig {
            auto_correction: false,
            ..OptimizerConfig::default()
        };
        let result = optimizer(config).optimize(&ContentRecord::default(), "rust", &[]);
        assert!(!result.success);
        assert_eq!(
            result.progress_data.termination_reason,
            TerminationReason::InsufficientImprovement
        );
        assert_eq!(result.progress_data.total_iterations, 0);
        assert_eq!(result.content, ContentRecord::default());
        assert_eq!(result.validation_result.overall_score, 35.0);
    }

    #[test]
    fn test_zero_iteration_budget() {
        let result = optimizer(OptimizerConfig::default().with_max_iterations(0)).optimize(
            &ContentRecord::default(),
            "rust",
            &[],
        );
        assert_eq!(
            result.progress_data.termination_reason,
            TerminationReason::MaxIterationsReached
        );
        assert_eq!(result.progress_data.total_iterations, 0);
    }

    #[test]
    fn test_empty_content_is_filled_in() {
        let result = optimizer(OptimizerConfig::default().with_max_iterations(3)).optimize(
            &ContentRecord::default(),
            "rust",
            &[],
        );
        let progress = &result.progress_data;
        assert!(progress.total_iterations <= 3);
        assert!(!result.content.title.is_empty());
        assert!(!result.content.body.is_empty());
        assert!(!result.content.meta_description.is_empty());
        assert!(progress.final_score > progress.baseline_score().unwrap());
        for delta in progress.improvements() {
            assert!(delta >= 0.0);
        }
        if progress.termination_reason == TerminationReason::ComplianceAchieved {
            assert!(progress.final_score >= 95.0);
        }
        if progress.termination_reason == TerminationReason::MaxIterationsReached {
            assert_eq!(progress.total_iterations, 3);
        }
    }

    #[test]
    fn test_corrector_failure_keeps_last_good_content() {
        let original = ContentRecord::new("Rust", "Some body text.");
        let result = optimizer(OptimizerConfig::default())
            .with_correctors(vec![Box::new(FailingCorrector)])
            .optimize(&original, "rust", &[]);
        assert!(!result.success);
        assert_eq!(result.progress_data.termination_reason, TerminationReason::CriticalError);
        assert_eq!(result.content, original);
        assert_eq!(result.progress_data.total_iterations, 1);
        assert!(result
            .error_log
            .iter()
            .any(|e| e.error == "critical_error" && e.severity == LogSeverity::Critical && e.component == "failing"));
    }

    #[test]
    fn test_stagnation_detected() {
        let config = OptimizerConfig {
            stagnation_threshold: 2,
            ..OptimizerConfig::default()
        };
        let result = optimizer(config)
            .with_correctors(vec![Box::new(NoopCorrector)])
            .optimize(&ContentRecord::default(), "rust", &[]);
        assert_eq!(result.progress_data.termination_reason, TerminationReason::StagnationDetected);
        assert_eq!(result.progress_data.total_iterations, 2);
    }

    #[test]
    fn test_no_early_termination_runs_to_budget() {
        let config = OptimizerConfig {
            enable_early_termination: false,
            max_iterations: 4,
            ..OptimizerConfig::default()
        };
        let result = optimizer(config)
            .with_correctors(vec![Box::new(NoopCorrector)])
            .optimize(&ContentRecord::default(), "rust", &[]);
        assert_eq!(
            result.progress_data.termination_reason,
            TerminationReason::MaxIterationsReached
        );
        assert_eq!(result.progress_data.total_iterations, 4);
        assert_eq!(result.progress_data.iterations.len(), 5);
    }

    #[test]
    fn test_overrides_suppress_issues() {
        let optimizer = optimizer(OptimizerConfig::default());
        let before = optimizer.revalidate(&ContentRecord::default(), "rust", &[]);
        optimizer
            .handler()
            .add_manual_override(ManualOverride::new("title", "title_missing", "drafts", "editor"))
            .unwrap();
        let after = optimizer.revalidate(&ContentRecord::default(), "rust", &[]);
        assert_eq!(after.overall_score, before.overall_score + 20.0);
        assert!(after.errors.iter().all(|i| i.issue_type != IssueType::TitleMissing));
    }

    #[test]
    fn test_remaining_issues_are_logged() {
        let config = OptimizerConfig {
            auto_correction: false,
            ..OptimizerConfig::default()
        };
        let optimizer = optimizer(config);
        let result = optimizer.optimize(&ContentRecord::default(), "rust", &[]);
        assert_eq!(result.error_log.len(), result.validation_result.issue_count);
        let stats = optimizer.handler().error_stats().unwrap();
        assert!(stats
            .iter()
            .any(|s| s.component == "title" && s.message == "title_missing" && s.count == 1));
    }
}
