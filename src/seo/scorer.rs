//! Compliance Scorer

use crate::content::{Issue, Severity};
use serde::{Deserialize, Serialize};

/// 致命的な問題1件あたりの減点
pub const CRITICAL_PENALTY: f64 = 20.0;
/// 重大・軽微な問題1件あたりの減点
pub const ISSUE_PENALTY: f64 = 5.0;

/// 問題の集合からスコアを計算（0-100）
pub fn compliance_score(issues: &[Issue]) -> f64 {
    let critical = issues
        .iter()
        .filter(|i| i.severity == Severity::Critical)
        .count() as f64;
    let others = issues.len() as f64 - critical;
    (100.0 - CRITICAL_PENALTY * critical - ISSUE_PENALTY * others).max(0.0)
}

/// 検証結果
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// 致命的・重大な問題
    pub errors: Vec<Issue>,
    /// 軽微な問題
    pub warnings: Vec<Issue>,
    pub overall_score: f64,
    pub issue_count: usize,
}

impl ValidationResult {
    /// 問題の集合から作成
    pub fn from_issues(issues: Vec<Issue>) -> Self {
        let overall_score = compliance_score(&issues);
        let issue_count = issues.len();
        let (warnings, errors): (Vec<Issue>, Vec<Issue>) = issues
            .into_iter()
            .partition(|i| i.severity == Severity::Minor);
        Self {
            errors,
            warnings,
            overall_score,
            issue_count,
        }
    }

    /// すべての問題（errors → warnings）
    pub fn issues(&self) -> impl Iterator<Item = &Issue> {
        self.errors.iter().chain(self.warnings.iter())
    }

    pub fn critical_count(&self) -> usize {
        self.errors
            .iter()
            .filter(|i| i.severity == Severity::Critical)
            .count()
    }

    pub fn is_compliant(&self, target: f64) -> bool {
        self.overall_score >= target
    }
}
