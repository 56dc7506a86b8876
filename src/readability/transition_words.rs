//! Transition Word Analyzer

use crate::content::text::lowercase_leading;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// つなぎ言葉（語・句）
pub const TRANSITION_WORDS: &[&str] = &[
    "accordingly",
    "additionally",
    "afterward",
    "also",
    "besides",
    "consequently",
    "finally",
    "first",
    "firstly",
    "furthermore",
    "hence",
    "however",
    "indeed",
    "instead",
    "likewise",
    "meanwhile",
    "moreover",
    "next",
    "nevertheless",
    "notably",
    "otherwise",
    "second",
    "secondly",
    "similarly",
    "specifically",
    "still",
    "then",
    "therefore",
    "thus",
    "ultimately",
    "above all",
    "after all",
    "as a result",
    "for example",
    "for instance",
    "in addition",
    "in contrast",
    "in fact",
    "in other words",
    "in short",
    "in summary",
    "on the other hand",
    "to summarize",
    "because",
    "since",
    "although",
    "unless",
];

/// 挿入時に順番に使うリード
const LEAD_INS: &[&str] = &[
    "Additionally",
    "Furthermore",
    "Moreover",
    "In addition",
    "Notably",
];

fn transition_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let alternatives = TRANSITION_WORDS
            .iter()
            .map(|w| regex::escape(w).replace(' ', r"\s+"))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives)).unwrap()
    })
}

/// つなぎ言葉の分析結果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransitionWordAnalysis {
    pub total_sentences: usize,
    /// つなぎ言葉を含む文のインデックス
    pub transition_sentences: Vec<usize>,
    /// 割合 (%)
    pub ratio: f64,
    pub min_ratio: f64,
    pub compliant: bool,
}

/// つなぎ言葉アナライザー
#[derive(Debug, Clone)]
pub struct TransitionWordAnalyzer {
    min_ratio: f64,
}

impl Default for TransitionWordAnalyzer {
    fn default() -> Self {
        Self::new(30.0)
    }
}

impl TransitionWordAnalyzer {
    pub fn new(min_ratio: f64) -> Self {
        Self { min_ratio }
    }

    pub fn has_transition(&self, sentence: &str) -> bool {
        transition_pattern().is_match(sentence)
    }

    pub fn analyze(&self, sentences: &[String]) -> TransitionWordAnalysis {
        let transition_sentences: Vec<usize> = sentences
            .iter()
            .enumerate()
            .filter(|(_, s)| self.has_transition(s))
            .map(|(i, _)| i)
            .collect();
        let total = sentences.len();
        // 空の本文は違反としない
        let ratio = if total == 0 {
            100.0
        } else {
            transition_sentences.len() as f64 / total as f64 * 100.0
        };
        TransitionWordAnalysis {
            total_sentences: total,
            transition_sentences,
            ratio,
            min_ratio: self.min_ratio,
            compliant: ratio >= self.min_ratio,
        }
    }

    /// 文頭にリードを付ける（`rotation` 番目のリードを使用）
    pub fn add_lead_in(&self, sentence: &str, rotation: usize) -> String {
        let lead = LEAD_INS[rotation % LEAD_INS.len()];
        format!("{}, {}", lead, lowercase_leading(sentence.trim()))
    }

    /// 必要数だけリードを挿入した文の列を返す
    ///
    /// 先頭文はそのまま残す。戻り値は (新しい文の列, 変更された文のインデックス)。
    pub fn inject(&self, sentences: &[String]) -> (Vec<String>, Vec<usize>) {
        let mut result = sentences.to_vec();
        let mut changed = Vec::new();
        let total = result.len();
        if total == 0 {
            return (result, changed);
        }

        let mut with_transition = result.iter().filter(|s| self.has_transition(s)).count();
        let needed = (self.min_ratio / 100.0 * total as f64).ceil() as usize;

        // 間隔を空けて候補を選ぶ（先頭以外）
        let candidates: Vec<usize> = (1..total).filter(|i| !self.has_transition(&result[*i])).collect();
        let mut rotation = 0;
        for (n, idx) in candidates.iter().enumerate() {
            if with_transition >= needed {
                break;
            }
            // 偶数番目を優先し、足りない場合は残りも使う
            if n % 2 == 1 && candidates.len() - n > needed - with_transition {
                continue;
            }
            result[*idx] = self.add_lead_in(&result[*idx], rotation);
            rotation += 1;
            with_transition += 1;
            changed.push(*idx);
        }

        // 先頭文しか候補がない場合
        if with_transition < needed && !self.has_transition(&result[0]) {
            result[0] = self.add_lead_in(&result[0], rotation);
            changed.push(0);
        }

        (result, changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_words_and_phrases() {
        let analyzer = TransitionWordAnalyzer::default();
        assert!(analyzer.has_transition("However, the plan changed."));
        assert!(analyzer.has_transition("The team, as a result, shipped early."));
        assert!(!analyzer.has_transition("The cat sat on the mat."));
        // 単語の一部には一致しない
        assert!(!analyzer.has_transition("Thenceforth nothing happened."));
    }

    #[test]
    fn test_inject_reaches_minimum_ratio() {
        let analyzer = TransitionWordAnalyzer::default();
        let sentences: Vec<String> = (0..10)
            .map(|i| format!("The team ships release number {}.", i))
            .collect();
        let (result, changed) = analyzer.inject(&sentences);
        let analysis = analyzer.analyze(&result);
        assert!(analysis.compliant, "ratio was {}", analysis.ratio);
        assert!(!changed.contains(&0));
        assert_eq!(result[1], "Additionally, the team ships release number 1.");
    }

    #[test]
    fn test_inject_on_compliant_text_is_noop() {
        let analyzer = TransitionWordAnalyzer::default();
        let sentences: Vec<String> = vec![
            "We plan.".into(),
            "However, we adapt.".into(),
            "Finally, we ship.".into(),
        ];
        let (result, changed) = analyzer.inject(&sentences);
        assert_eq!(result, sentences);
        assert!(changed.is_empty());
    }
}
