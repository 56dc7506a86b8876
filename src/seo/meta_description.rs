//! Meta Description Corrector
//!
//! 長さ（既定 120-156 文字）とキーワードを満たすようにメタディスクリプションを修正する。
//! リトライが尽きた場合はキーワード入りのテンプレートにフォールバックする。

use crate::adaptive::Thresholds;
use crate::content::text::{
    capitalize_first, char_len, normalize_whitespace, strip_tags, trim_dangling,
    truncate_at_word_boundary, KeywordMatcher,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// 短い説明文に追加する補足文（`{kw}` はキーワード）
const EXPANSION_CLAUSES: &[&str] = &[
    "Learn how {kw} works in practice.",
    "Discover practical tips for {kw}.",
    "Explore expert insights and proven strategies.",
    "Get clear, actionable advice you can use today.",
    "Find out what matters most and how to get started.",
];

/// フォールバック用の一般的な補足文
const FALLBACK_FILLERS: &[&str] = &[
    "Learn the key concepts, avoid common mistakes, and get started with confidence today.",
    "Clear steps and practical examples for beginners and experienced readers alike.",
    "Everything you need in one place.",
];

/// 検証結果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetaValidation {
    pub valid: bool,
    pub length: usize,
    pub has_keyword: bool,
    pub issues: Vec<String>,
}

/// 自動修正の結果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetaCorrection {
    pub original: String,
    pub corrected: String,
    pub changes: Vec<String>,
}

/// 1回の試行の記録
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetaAttempt {
    pub attempt: usize,
    pub candidate: String,
    pub valid: bool,
    pub issues: Vec<String>,
}

/// リトライ付き修正の結果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetaRetryResult {
    pub success: bool,
    pub meta_description: String,
    pub attempts: usize,
    pub attempt_details: Vec<MetaAttempt>,
    pub used_fallback: bool,
}

/// メタディスクリプション修正器
#[derive(Debug, Clone)]
pub struct MetaDescriptionCorrector {
    min_length: usize,
    max_length: usize,
}

impl Default for MetaDescriptionCorrector {
    fn default() -> Self {
        Self::from_thresholds(&Thresholds::default())
    }
}

impl MetaDescriptionCorrector {
    pub fn new(min_length: usize, max_length: usize) -> Self {
        let max_length = max_length.max(2);
        Self {
            min_length: min_length.min(max_length - 1),
            max_length,
        }
    }

    pub fn from_thresholds(thresholds: &Thresholds) -> Self {
        Self::new(thresholds.meta_min_length, thresholds.meta_max_length)
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// 説明文を検証
    pub fn validate(&self, description: &str, keyword: &str, synonyms: &[String]) -> MetaValidation {
        self.validate_with(description, &KeywordMatcher::new(keyword, synonyms))
    }

    fn validate_with(&self, description: &str, matcher: &KeywordMatcher) -> MetaValidation {
        let length = char_len(description);
        let has_keyword = matcher.is_empty() || matcher.contains(description);
        let mut issues = Vec::new();
        if description.trim().is_empty() {
            issues.push("Meta description is empty".to_string());
        } else if length < self.min_length {
            issues.push(format!(
                "Meta description is too short ({} < {} characters)",
                length, self.min_length
            ));
        } else if length > self.max_length {
            issues.push(format!(
                "Meta description is too long ({} > {} characters)",
                length, self.max_length
            ));
        }
        if !has_keyword {
            issues.push("Meta description does not contain the focus keyword".to_string());
        }
        MetaValidation {
            valid: issues.is_empty(),
            length,
            has_keyword,
            issues,
        }
    }

    /// 自動修正（常に有効な結果を返す）
    pub fn auto_correct(&self, description: &str, keyword: &str, synonyms: &[String]) -> MetaCorrection {
        let matcher = KeywordMatcher::new(keyword, synonyms);
        let (candidate, mut changes) = self.attempt(description, &matcher, 0);
        let corrected = if self.validate_with(&candidate, &matcher).valid {
            candidate
        } else {
            changes.push("Replaced with keyword template".to_string());
            self.fallback(&matcher)
        };
        MetaCorrection {
            original: description.to_string(),
            corrected,
            changes,
        }
    }

    /// 試行回数を制限した修正
    ///
    /// 各試行は補足文の順序を変えて修正する。すべて失敗した場合は
    /// フォールバックテンプレートを使用する。`max_attempts = 0` は直接フォールバック。
    pub fn correct_with_retry(
        &self,
        description: &str,
        keyword: &str,
        synonyms: &[String],
        max_attempts: usize,
    ) -> MetaRetryResult {
        let matcher = KeywordMatcher::new(keyword, synonyms);
        let mut attempt_details = Vec::new();

        for attempt in 1..=max_attempts {
            let (candidate, _) = self.attempt(description, &matcher, attempt - 1);
            let validation = self.validate_with(&candidate, &matcher);
            debug!(
                "Meta description attempt {}: {} chars, valid={}",
                attempt, validation.length, validation.valid
            );
            attempt_details.push(MetaAttempt {
                attempt,
                candidate: candidate.clone(),
                valid: validation.valid,
                issues: validation.issues,
            });
            if validation.valid {
                return MetaRetryResult {
                    success: true,
                    meta_description: candidate,
                    attempts: attempt,
                    attempt_details,
                    used_fallback: false,
                };
            }
        }

        warn!(
            "Meta description correction failed after {} attempts, using fallback",
            max_attempts
        );
        MetaRetryResult {
            success: true,
            meta_description: self.fallback(&matcher),
            attempts: max_attempts,
            attempt_details,
            used_fallback: true,
        }
    }

    /// 1回分の修正。`variant` で補足文の開始位置をずらす。
    fn attempt(&self, description: &str, matcher: &KeywordMatcher, variant: usize) -> (String, Vec<String>) {
        let mut changes = Vec::new();
        let cleaned = normalize_whitespace(&strip_tags(description));
        if cleaned != description {
            changes.push("Removed markup and extra whitespace".to_string());
        }

        let keyword = self.usable_keyword(matcher);
        let mut text = cleaned;

        if !matcher.is_empty() && !matcher.contains(&text) {
            text = if text.is_empty() {
                format!("{}: a practical overview.", capitalize_first(&keyword))
            } else {
                format!("{}: {}", capitalize_first(&keyword), text)
            };
            changes.push(format!("Added focus keyword \"{}\"", keyword));
        }

        if char_len(&text) < self.min_length {
            let before = char_len(&text);
            text = self.expand(&text, &keyword, variant);
            changes.push(format!(
                "Expanded from {} to {} characters",
                before,
                char_len(&text)
            ));
        }

        if char_len(&text) > self.max_length {
            let before = char_len(&text);
            text = fit_length(&text, self.min_length, self.max_length);
            // 切り詰めでキーワードが失われた場合は先頭に付け直す
            if !matcher.is_empty() && !matcher.contains(&text) {
                text = fit_length(
                    &format!("{}: {}", capitalize_first(&keyword), text),
                    self.min_length,
                    self.max_length,
                );
            }
            changes.push(format!(
                "Truncated from {} to {} characters",
                before,
                char_len(&text)
            ));
        }

        (text, changes)
    }

    fn expand(&self, text: &str, keyword: &str, variant: usize) -> String {
        let mut result = text.to_string();
        if !result.is_empty() && !result.ends_with(['.', '!', '?']) {
            result.push('.');
        }
        let subject = if keyword.is_empty() { "this topic" } else { keyword };
        for i in 0..EXPANSION_CLAUSES.len() {
            if char_len(&result) >= self.min_length {
                break;
            }
            let clause = EXPANSION_CLAUSES[(i + variant) % EXPANSION_CLAUSES.len()].replace("{kw}", subject);
            if result.is_empty() {
                result = clause;
            } else {
                result = format!("{} {}", result, clause);
            }
        }
        result
    }

    /// テンプレートに収まるキーワード（長すぎる場合は最短の同義語）
    ///
    /// キーワードの後には区切り文字と終端のピリオドだけが残ればよい。
    fn usable_keyword(&self, matcher: &KeywordMatcher) -> String {
        let limit = self.max_length.saturating_sub(2);
        if char_len(matcher.keyword()) <= limit {
            matcher.keyword().to_string()
        } else if char_len(matcher.shortest_term()) <= limit {
            matcher.shortest_term().to_string()
        } else {
            truncate_at_word_boundary(matcher.shortest_term(), limit)
        }
    }

    /// 決定的なフォールバックテンプレート
    fn fallback(&self, matcher: &KeywordMatcher) -> String {
        let keyword = self.usable_keyword(matcher);
        let subject = if keyword.is_empty() {
            "This guide".to_string()
        } else {
            capitalize_first(&keyword)
        };
        let mut text = format!("{}: a complete guide with practical advice and expert tips.", subject);
        for filler in FALLBACK_FILLERS {
            if char_len(&text) >= self.min_length {
                break;
            }
            text = format!("{} {}", text, filler);
        }
        while char_len(&text) < self.min_length {
            text = format!("{} {}", text, FALLBACK_FILLERS[0]);
        }
        fit_length(&text, self.min_length, self.max_length)
    }
}

/// `[min, max]` に収まるように単語境界で切り詰め、末尾をピリオドで閉じる
fn fit_length(text: &str, min: usize, max: usize) -> String {
    let len = char_len(text);
    if len <= max {
        return text.to_string();
    }
    let budget = max.saturating_sub(1);
    let close = |s: String| {
        if s.ends_with(['.', '!', '?']) {
            s
        } else {
            format!("{}.", s)
        }
    };

    let trimmed = close(trim_dangling(&truncate_at_word_boundary(text, budget)));
    if (min..=max).contains(&char_len(&trimmed)) {
        return trimmed;
    }
    let plain = close(
        truncate_at_word_boundary(text, budget)
            .trim_end_matches([',', ';', ':', '-', ' '])
            .to_string(),
    );
    if (min..=max).contains(&char_len(&plain)) {
        return plain;
    }
    // 語境界が範囲内にない場合は文字単位で切る
    let hard: String = text.chars().take(budget).collect();
    close(hard.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corrector() -> MetaDescriptionCorrector {
        MetaDescriptionCorrector::default()
    }

    fn assert_valid(text: &str, keyword: &str) {
        let len = char_len(text);
        assert!((120..=156).contains(&len), "length {} for {:?}", len, text);
        assert!(text.to_lowercase().contains(&keyword.to_lowercase()), "{:?}", text);
    }

    #[test]
    fn test_validate_reports_length_and_keyword() {
        let v = corrector().validate("Too short.", "rust", &[]);
        assert!(!v.valid);
        assert!(!v.has_keyword);
        assert_eq!(v.issues.len(), 2);
    }

    #[test]
    fn test_auto_correct_short_description() {
        let result = corrector().auto_correct("A short note.", "rust programming", &[]);
        assert_valid(&result.corrected, "rust programming");
        assert!(result.corrected.starts_with("Rust programming: "));
        assert!(!result.changes.is_empty());
    }

    #[test]
    fn test_auto_correct_long_description() {
        let long = "Rust programming gives you memory safety without a garbage collector, and this article walks through ownership, borrowing, lifetimes, traits, generics, error handling, async code, and testing in detail.";
        let result = corrector().auto_correct(long, "rust programming", &[]);
        assert_valid(&result.corrected, "rust programming");
        assert!(result.corrected.ends_with('.'));
    }

    #[test]
    fn test_auto_correct_strips_markup() {
        let result = corrector().auto_correct("<p>Learn <b>rust</b> quickly</p>", "rust", &[]);
        assert!(!result.corrected.contains('<'));
        assert_valid(&result.corrected, "rust");
    }

    #[test]
    fn test_synonym_satisfies_keyword() {
        let text = "A friendly introduction to the Rust language covering ownership, borrowing, and traits, with practical examples for everyday programming work.";
        let v = corrector().validate(text, "rust programming", &["rust language".to_string()]);
        assert!(v.valid, "{:?}", v);
    }

    #[test]
    fn test_retry_returns_valid_result_for_empty_input() {
        let result = corrector().correct_with_retry("", "seo tips", &[], 3);
        assert!(result.success);
        assert!(!result.used_fallback);
        assert_eq!(result.attempts, 1);
        assert_valid(&result.meta_description, "seo tips");
    }

    #[test]
    fn test_zero_attempts_uses_fallback() {
        let result = corrector().correct_with_retry("anything", "seo tips", &[], 0);
        assert!(result.used_fallback);
        assert!(result.attempt_details.is_empty());
        assert_valid(&result.meta_description, "seo tips");
    }

    #[test]
    fn test_overlong_keyword_uses_shortest_synonym() {
        let phrase = "an extraordinarily long focus keyword phrase that by itself nearly fills the entire meta description budget";
        let keyword = format!("{} {}", phrase, phrase);
        let result = corrector().correct_with_retry("", &keyword, &["seo".to_string()], 0);
        assert_valid(&result.meta_description, "seo");
    }

    #[test]
    fn test_long_keyword_without_synonyms_still_fits() {
        let keyword = "sustainable urban vegetable gardening techniques for small apartment balconies with limited sunlight and strict building management rules";
        assert_eq!(char_len(keyword), 137);
        for attempts in [0, 3] {
            let result = corrector().correct_with_retry("", keyword, &[], attempts);
            assert_valid(&result.meta_description, keyword);
            assert!(corrector().validate(&result.meta_description, keyword, &[]).valid);
        }
    }

    #[test]
    fn test_fit_length_hard_cut() {
        let text = "x".repeat(300);
        let fitted = fit_length(&text, 120, 156);
        assert_eq!(char_len(&fitted), 156);
        assert!(fitted.ends_with('.'));
    }
}
