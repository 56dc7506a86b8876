//! Sentence Length Analyzer
//!
//! 長文（既定 20 語超）の検出と節境界での分割

use crate::content::text::{
    capitalize_first, count_words, starts_with_conjunction, starts_with_function_word,
};
use serde::{Deserialize, Serialize};

/// 接続詞と、分割後の文頭に置く接続語
const CONJUNCTION_SPLITS: &[(&str, &str)] = &[
    (", and ", "Additionally, "),
    (", but ", "However, "),
    (", yet ", "However, "),
    (", so ", "As a result, "),
    (", because ", "This is because "),
    (", which ", "This "),
    (", or ", "Alternatively, "),
];

/// 文長の分析結果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentenceLengthAnalysis {
    pub total_sentences: usize,
    /// 長文のインデックス
    pub long_sentences: Vec<usize>,
    /// 長文の割合 (%)
    pub ratio: f64,
    pub average_words: f64,
    pub max_words: usize,
    pub max_ratio: f64,
    pub compliant: bool,
}

/// 文長アナライザー
#[derive(Debug, Clone)]
pub struct SentenceLengthAnalyzer {
    max_words: usize,
    max_ratio: f64,
}

impl Default for SentenceLengthAnalyzer {
    fn default() -> Self {
        Self::new(20, 25.0)
    }
}

impl SentenceLengthAnalyzer {
    /// 長文の語数しきい値と許容割合 (%) を指定して作成
    pub fn new(max_words: usize, max_ratio: f64) -> Self {
        Self {
            max_words: max_words.max(1),
            max_ratio,
        }
    }

    /// 長文か
    pub fn is_long(&self, sentence: &str) -> bool {
        count_words(sentence) > self.max_words
    }

    /// 文の集合を分析
    pub fn analyze(&self, sentences: &[String]) -> SentenceLengthAnalysis {
        let counts: Vec<usize> = sentences.iter().map(|s| count_words(s)).collect();
        let long_sentences: Vec<usize> = counts
            .iter()
            .enumerate()
            .filter(|(_, c)| **c > self.max_words)
            .map(|(i, _)| i)
            .collect();
        let total = sentences.len();
        let ratio = if total == 0 {
            0.0
        } else {
            long_sentences.len() as f64 / total as f64 * 100.0
        };
        let average_words = if total == 0 {
            0.0
        } else {
            counts.iter().sum::<usize>() as f64 / total as f64
        };
        SentenceLengthAnalysis {
            total_sentences: total,
            long_sentences,
            ratio,
            average_words,
            max_words: self.max_words,
            max_ratio: self.max_ratio,
            compliant: ratio <= self.max_ratio,
        }
    }

    /// 長文を節境界で分割する
    ///
    /// 分割候補は セミコロン → カンマ + 接続詞 → カンマ → 中央の語境界 の順。
    /// 分割後の各部分も長い場合は再帰的に分割する。
    pub fn split(&self, sentence: &str) -> Vec<String> {
        self.split_inner(sentence.trim(), 0)
    }

    fn split_inner(&self, sentence: &str, depth: usize) -> Vec<String> {
        if !self.is_long(sentence) || depth > 6 {
            return vec![sentence.to_string()];
        }
        let Some((first, second)) = self.split_once(sentence) else {
            return vec![sentence.to_string()];
        };
        let mut parts = self.split_inner(&first, depth + 1);
        parts.extend(self.split_inner(&second, depth + 1));
        parts
    }

    fn split_once(&self, sentence: &str) -> Option<(String, String)> {
        let (body, terminal) = split_terminal(sentence);
        let terminal = if terminal.is_empty() { "." } else { terminal };
        let min_words = 3;

        // 候補: (分割位置, 区切りの長さ, 後半の接頭辞)
        let mut candidates: Vec<(usize, usize, &str)> = Vec::new();
        for (idx, _) in body.match_indices("; ") {
            candidates.push((idx, 2, ""));
        }
        for (pattern, lead) in CONJUNCTION_SPLITS {
            for (idx, _) in body.match_indices(pattern) {
                candidates.push((idx, pattern.len(), lead));
            }
        }

        let valid = |idx: usize, len: usize| {
            count_words(&body[..idx]) >= min_words && count_words(&body[idx + len..]) >= min_words
        };
        let middle = body.len() / 2;

        let best = candidates
            .iter()
            .filter(|(idx, len, _)| valid(*idx, *len))
            .min_by_key(|(idx, _, _)| idx.abs_diff(middle))
            .copied()
            .or_else(|| {
                body.match_indices(", ")
                    .map(|(idx, _)| (idx, 2, ""))
                    .filter(|(idx, len, _)| valid(*idx, *len))
                    .min_by_key(|(idx, _, _)| idx.abs_diff(middle))
            })
            .or_else(|| {
                // 中央に最も近い語境界（接続詞の前や機能語の後では切らない）
                body.match_indices(' ')
                    .map(|(idx, _)| (idx, 1, ""))
                    .filter(|(idx, len, _)| valid(*idx, *len))
                    .filter(|(idx, len, _)| clean_boundary(&body[..*idx], &body[idx + len..]))
                    .min_by_key(|(idx, _, _)| idx.abs_diff(middle))
            })?;

        let (idx, len, lead) = best;
        let first = format!("{}.", body[..idx].trim_end_matches([',', ';', ':']).trim_end());
        let rest = body[idx + len..].trim();
        let (lead, rest) = match conjunction_lead(rest) {
            Some((mapped, remainder)) if lead.is_empty() => (mapped, remainder),
            _ => (lead, rest),
        };
        let second = if lead.is_empty() {
            format!("{}{}", capitalize_first(rest), terminal)
        } else {
            format!("{}{}{}", lead, rest, terminal)
        };
        Some((first, second))
    }
}

fn clean_boundary(first: &str, rest: &str) -> bool {
    !starts_with_conjunction(rest)
        && !first
            .split_whitespace()
            .last()
            .is_some_and(starts_with_function_word)
}

/// 後半の先頭の等位接続詞を接続語に置き換える
fn conjunction_lead(rest: &str) -> Option<(&'static str, &str)> {
    let (word, remainder) = rest.split_once(' ')?;
    let lead = match word.to_lowercase().as_str() {
        "and" => "Additionally, ",
        "but" | "yet" => "However, ",
        "or" => "Alternatively, ",
        _ => return None,
    };
    Some((lead, remainder.trim_start()))
}

fn split_terminal(sentence: &str) -> (&str, &str) {
    let trimmed = sentence.trim_end();
    let body = trimmed.trim_end_matches(['.', '!', '?']);
    (body, &trimmed[body.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_long_sentence_ratio() {
        let analyzer = SentenceLengthAnalyzer::new(5, 25.0);
        let sentences: Vec<String> = vec![
            "Short one here.".into(),
            "This sentence has quite a few more words in it.".into(),
        ];
        let analysis = analyzer.analyze(&sentences);
        assert_eq!(analysis.long_sentences, vec![1]);
        assert_eq!(analysis.ratio, 50.0);
        assert!(!analysis.compliant);
    }

    #[test]
    fn test_split_at_conjunction_adds_transition() {
        let analyzer = SentenceLengthAnalyzer::new(10, 25.0);
        let parts = analyzer.split(
            "The first half of this sentence talks about planning, but the second half covers execution in detail.",
        );
        assert_eq!(
            parts,
            vec![
                "The first half of this sentence talks about planning.",
                "However, the second half covers execution in detail.",
            ]
        );
    }

    #[test]
    fn test_split_at_semicolon() {
        let analyzer = SentenceLengthAnalyzer::new(8, 25.0);
        let parts =
            analyzer.split("Teams plan their sprints on Monday mornings; they review results every Friday afternoon.");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1], "They review results every Friday afternoon.");
    }

    #[test]
    fn test_split_without_boundaries_still_shortens() {
        let analyzer = SentenceLengthAnalyzer::new(6, 25.0);
        let sentence = "one two three four five six seven eight nine ten eleven twelve thirteen fourteen.";
        let parts = analyzer.split(sentence);
        assert!(parts.len() >= 2);
        assert!(parts.iter().all(|p| !analyzer.is_long(p)));
    }

    #[test]
    fn test_midpoint_split_avoids_conjunction_fragments() {
        let analyzer = SentenceLengthAnalyzer::new(10, 25.0);
        let parts = analyzer.split(
            "The compute layer and the storage layers and the network protocols all changed during the long migration last year.",
        );
        assert!(parts.len() >= 2);
        for part in &parts {
            let first = part.split_whitespace().next().unwrap().to_lowercase();
            assert!(!matches!(first.as_str(), "and" | "or" | "but"), "{:?}", parts);
            let last = part.trim_end_matches('.').split_whitespace().last().unwrap().to_lowercase();
            assert!(!matches!(last.as_str(), "and" | "the" | "or"), "{:?}", parts);
        }
    }

    #[test]
    fn test_comma_split_maps_leading_conjunction() {
        let analyzer = SentenceLengthAnalyzer::new(8, 25.0);
        assert_eq!(conjunction_lead("and the rest"), Some(("Additionally, ", "the rest")));
        assert_eq!(conjunction_lead("Łódź grew"), None);
        let parts = analyzer.split("Teams ship on Monday; and they rest on Friday afternoon.");
        assert_eq!(
            parts,
            vec!["Teams ship on Monday.", "Additionally, they rest on Friday afternoon."]
        );
    }
}
