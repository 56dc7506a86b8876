//! Optimization Progress
//!
//! イテレーション履歴と終了理由の記録

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// イテレーション記録の種別
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Baseline,
    Optimization,
}

/// 1イテレーション分の記録（追記のみ）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IterationRecord {
    /// 0 = ベースライン
    pub iteration: u32,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub score: f64,
    /// 適用された修正の説明
    pub improvements: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// 終了理由
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    ComplianceAchieved,
    MaxIterationsReached,
    StagnationDetected,
    InsufficientImprovement,
    InitialCompliance,
    CriticalError,
}

impl TerminationReason {
    pub fn name(&self) -> &'static str {
        match self {
            TerminationReason::ComplianceAchieved => "compliance_achieved",
            TerminationReason::MaxIterationsReached => "max_iterations_reached",
            TerminationReason::StagnationDetected => "stagnation_detected",
            TerminationReason::InsufficientImprovement => "insufficient_improvement",
            TerminationReason::InitialCompliance => "initial_compliance",
            TerminationReason::CriticalError => "critical_error",
        }
    }

    /// 準拠を達成した終了か
    pub fn is_compliant(&self) -> bool {
        matches!(
            self,
            TerminationReason::ComplianceAchieved | TerminationReason::InitialCompliance
        )
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// パフォーマンス指標
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceMetrics {
    pub total_duration_ms: u64,
    pub final_compliance_score: f64,
}

/// 最適化の進捗データ
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressData {
    pub iterations: Vec<IterationRecord>,
    /// ベースラインを除いた最適化イテレーション数
    pub total_iterations: u32,
    pub final_score: f64,
    pub compliance_achieved: bool,
    pub termination_reason: TerminationReason,
    pub performance_metrics: PerformanceMetrics,
}

impl ProgressData {
    /// 各最適化イテレーションのスコア改善幅（直前の記録との差）
    pub fn improvements(&self) -> Vec<f64> {
        self.iterations
            .windows(2)
            .map(|pair| pair[1].score - pair[0].score)
            .collect()
    }

    /// ベースラインのスコア
    pub fn baseline_score(&self) -> Option<f64> {
        self.iterations
            .iter()
            .find(|r| r.record_type == RecordType::Baseline)
            .map(|r| r.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(iteration: u32, score: f64) -> IterationRecord {
        IterationRecord {
            iteration,
            record_type: if iteration == 0 {
                RecordType::Baseline
            } else {
                RecordType::Optimization
            },
            score,
            improvements: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_termination_reason_serialization() {
        let json = serde_json::to_string(&TerminationReason::StagnationDetected).unwrap();
        assert_eq!(json, "\"stagnation_detected\"");
        assert!(TerminationReason::InitialCompliance.is_compliant());
        assert!(!TerminationReason::MaxIterationsReached.is_compliant());
    }

    #[test]
    fn test_improvements_and_baseline() {
        let progress = ProgressData {
            iterations: vec![record(0, 40.0), record(1, 70.0), record(2, 75.0)],
            total_iterations: 2,
            final_score: 75.0,
            compliance_achieved: false,
            termination_reason: TerminationReason::MaxIterationsReached,
            performance_metrics: PerformanceMetrics {
                total_duration_ms: 3,
                final_compliance_score: 75.0,
            },
        };
        assert_eq!(progress.improvements(), vec![30.0, 5.0]);
        assert_eq!(progress.baseline_score(), Some(40.0));

        let value = serde_json::to_value(&progress).unwrap();
        assert_eq!(value["iterations"][0]["type"], "baseline");
        assert_eq!(value["termination_reason"], "max_iterations_reached");
    }
}
