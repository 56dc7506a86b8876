//! Keyword Density Calculator / Optimizer
//!
//! 本文（見出しを除く）のキーワード密度と、見出しのキーワード使用率を計算・調整する。

use crate::adaptive::Thresholds;
use crate::content::text::{capitalize_first, count_words, lowercase_leading, trim_dangling};
use crate::content::{Document, KeywordMatcher};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// 密度を上げる際の文頭リード（`{kw}` はキーワード）
const LEAD_INS: &[&str] = &["With {kw}, ", "When it comes to {kw}, ", "For {kw}, ", "In terms of {kw}, "];

/// 密度を下げる際の置換語（一致した語数ごと。本文の単語数を変えない）
const NEUTRAL_REFERENCES: &[&[&str]] = &[
    &["it", "this"],
    &["this topic", "the subject"],
    &["this particular topic", "the subject itself"],
];

/// キーワードを外した見出しが空になった場合の汎用見出し
const GENERIC_HEADINGS: &[&str] = &[
    "Key Considerations",
    "Getting Started",
    "Practical Tips",
    "Common Questions",
    "Next Steps",
    "Best Practices",
    "Overview",
    "Final Thoughts",
];

/// 本文の変化量の上限（単語数比）
const MAX_WORD_CHANGE: f64 = 0.10;

/// 見出し修正後の目標使用率 (%)
const SUBHEADING_TARGET_RATIO: f64 = 50.0;

/// 密度レポート
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeywordDensityReport {
    pub body_words: usize,
    /// キーワード + 同義語の出現数
    pub occurrences: usize,
    /// 密度 (%)
    pub density: f64,
    pub heading_count: usize,
    pub headings_with_keyword: usize,
    /// 見出しのキーワード使用率 (%)
    pub subheading_ratio: f64,
}

/// 最適化の結果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DensityOptimization {
    pub content: String,
    pub optimized: bool,
    pub changes_made: Vec<String>,
}

impl DensityOptimization {
    fn unchanged(body: &str) -> Self {
        Self {
            content: body.to_string(),
            optimized: false,
            changes_made: Vec::new(),
        }
    }
}

/// キーワード密度オプティマイザー
#[derive(Debug, Clone)]
pub struct KeywordDensityOptimizer {
    min_density: f64,
    max_density: f64,
    subheading_max_ratio: f64,
}

impl Default for KeywordDensityOptimizer {
    fn default() -> Self {
        Self::from_thresholds(&Thresholds::default())
    }
}

impl KeywordDensityOptimizer {
    pub fn new(min_density: f64, max_density: f64, subheading_max_ratio: f64) -> Self {
        Self {
            min_density,
            max_density,
            subheading_max_ratio,
        }
    }

    pub fn from_thresholds(thresholds: &Thresholds) -> Self {
        Self::new(
            thresholds.keyword_density_min,
            thresholds.keyword_density_max,
            thresholds.subheading_keyword_max_ratio,
        )
    }

    /// 密度を計算
    pub fn calculate(&self, body: &str, keyword: &str, synonyms: &[String]) -> KeywordDensityReport {
        report(&Document::parse(body), &KeywordMatcher::new(keyword, synonyms))
    }

    pub fn density_in_range(&self, density: f64) -> bool {
        density >= self.min_density && density <= self.max_density
    }

    pub fn subheading_ratio_ok(&self, report: &KeywordDensityReport) -> bool {
        report.subheading_ratio <= self.subheading_max_ratio
    }

    /// 本文の密度を目標値に近づける
    ///
    /// 1回に1箇所ずつ変更し、単語数の変化は 10% 以内。結果が範囲内に入るか、
    /// 目標値に厳密に近づく場合のみ適用する。
    pub fn optimize_density(
        &self,
        body: &str,
        keyword: &str,
        synonyms: &[String],
        target: f64,
    ) -> DensityOptimization {
        let matcher = KeywordMatcher::new(keyword, synonyms);
        if matcher.is_empty() {
            return DensityOptimization::unchanged(body);
        }

        let doc = Document::parse(body);
        let initial = report(&doc, &matcher);
        if self.density_in_range(initial.density) {
            return DensityOptimization::unchanged(body);
        }

        let budget = ((initial.body_words as f64 * MAX_WORD_CHANGE).floor() as usize).max(1);
        let mut changes = Vec::new();
        let mut working = doc;

        if initial.density < self.min_density {
            if working.sentences().is_empty() {
                append_keyword_sentence(&mut working, &matcher, &mut changes);
            } else {
                self.increase(&mut working, &matcher, target, initial.body_words, budget, &mut changes);
            }
        } else {
            self.decrease(&mut working, &matcher, target, initial.body_words, budget, &mut changes);
        }

        let result = report(&working, &matcher);
        let closer = (result.density - target).abs() < (initial.density - target).abs();
        if changes.is_empty() || !(self.density_in_range(result.density) || closer) {
            debug!(
                "Keyword density change rejected: {:.2}% -> {:.2}% (target {:.2}%)",
                initial.density, result.density, target
            );
            return DensityOptimization::unchanged(body);
        }

        debug!(
            "Keyword density {:.2}% -> {:.2}% with {} changes",
            initial.density,
            result.density,
            changes.len()
        );
        DensityOptimization {
            content: working.render(),
            optimized: true,
            changes_made: changes,
        }
    }

    fn increase(
        &self,
        doc: &mut Document,
        matcher: &KeywordMatcher,
        target: f64,
        original_words: usize,
        budget: usize,
        changes: &mut Vec<String>,
    ) {
        let keyword = matcher.keyword().to_string();
        let mut rotation = 0;
        let mut unusable: Vec<String> = Vec::new();

        loop {
            let current = report(doc, matcher);
            if current.density >= target {
                break;
            }
            let candidates: Vec<(usize, String)> = doc
                .sentences()
                .into_iter()
                .filter(|(_, s)| !matcher.contains(s) && !unusable.contains(s))
                .collect();
            if candidates.is_empty() {
                break;
            }
            let (block_idx, sentence) = candidates[candidates.len() / 2].clone();

            // 予算内に収まるリードを選ぶ
            let used = current.body_words.saturating_sub(original_words);
            let lead = (0..LEAD_INS.len())
                .map(|i| LEAD_INS[(rotation + i) % LEAD_INS.len()].replace("{kw}", &keyword))
                .find(|lead| used + count_words(lead) <= budget);
            let Some(lead) = lead else { break };

            let rewritten = format!("{}{}", lead, lowercase_leading(&sentence));
            let mut candidate_doc = doc.clone();
            if !replace_in_block(&mut candidate_doc, block_idx, &sentence, &rewritten) {
                unusable.push(sentence);
                continue;
            }

            // 最低値を満たした後は、目標に近づく場合のみ追加する
            let next = report(&candidate_doc, matcher);
            if current.density >= self.min_density
                && ((next.density - target).abs() >= (current.density - target).abs()
                    || next.density > self.max_density)
            {
                break;
            }

            *doc = candidate_doc;
            rotation += 1;
            changes.push(format!("Added keyword lead-in: \"{}\"", rewritten));
        }
    }

    fn decrease(
        &self,
        doc: &mut Document,
        matcher: &KeywordMatcher,
        target: f64,
        original_words: usize,
        budget: usize,
        changes: &mut Vec<String>,
    ) {
        let mut rotation = 0;
        loop {
            let current = report(doc, matcher);
            if current.density <= target {
                break;
            }

            // 最後の出現から置換する（最初の出現は残す）
            let spans: Vec<(usize, usize, usize)> = doc
                .blocks
                .iter()
                .enumerate()
                .filter(|(_, b)| b.is_paragraph())
                .flat_map(|(idx, b)| {
                    matcher
                        .find_all(&b.text)
                        .into_iter()
                        .map(move |(s, e)| (idx, s, e))
                })
                .collect();
            if spans.len() <= 1 {
                break;
            }
            let Some(&(block_idx, start, end)) = spans.last() else {
                break;
            };

            let mut candidate_doc = doc.clone();
            let text = &candidate_doc.blocks[block_idx].text;
            let at_sentence_start = text[..start]
                .trim_end()
                .chars()
                .last()
                .map(|c| matches!(c, '.' | '!' | '?' | '>'))
                .unwrap_or(true);
            let matched_words = count_words(&text[start..end]);
            let possessive = ["'s", "\u{2019}s"]
                .iter()
                .find(|suffix| text[end..].starts_with(**suffix))
                .map(|suffix| suffix.len());
            let (reference, end) = match possessive {
                Some(len) if matched_words <= 1 => ("its", end + len),
                _ => (neutral_reference(matched_words, rotation), end),
            };
            let reference = if at_sentence_start {
                capitalize_first(reference)
            } else {
                reference.to_string()
            };
            let replaced = text[start..end].to_string();
            let new_text = format!("{}{}{}", &text[..start], reference, &text[end..]);
            candidate_doc.blocks[block_idx].text = new_text;

            let next = report(&candidate_doc, matcher);
            if next.body_words.abs_diff(original_words) > budget {
                break;
            }
            if current.density <= self.max_density
                && (next.density - target).abs() >= (current.density - target).abs()
            {
                break;
            }

            *doc = candidate_doc;
            rotation += 1;
            changes.push(format!("Replaced \"{}\" with \"{}\"", replaced, reference));
        }
    }

    /// 見出しのキーワード過剰使用を修正
    ///
    /// 使用率が上限を超える場合、後ろの見出しからキーワードを外して 50% 以下にする。
    /// 見出し数とブロック構造は変えない。
    pub fn optimize_subheadings(&self, body: &str, keyword: &str, synonyms: &[String]) -> DensityOptimization {
        let matcher = KeywordMatcher::new(keyword, synonyms);
        let mut doc = Document::parse(body);
        let initial = report(&doc, &matcher);
        if matcher.is_empty() || initial.heading_count == 0 || self.subheading_ratio_ok(&initial) {
            return DensityOptimization::unchanged(body);
        }

        let heading_indices: Vec<usize> = doc
            .blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_heading())
            .map(|(idx, _)| idx)
            .collect();

        let mut changes = Vec::new();
        // 後ろから処理し、先頭の見出しは最後に回す
        let order: Vec<usize> = heading_indices
            .iter()
            .skip(1)
            .rev()
            .chain(heading_indices.first())
            .copied()
            .collect();

        for idx in order {
            if report(&doc, &matcher).subheading_ratio <= SUBHEADING_TARGET_RATIO {
                break;
            }
            let original = doc.blocks[idx].text.clone();
            if !matcher.contains(&original) {
                continue;
            }
            let mut rewritten = capitalize_first(&trim_dangling(
                matcher
                    .remove_all(&original)
                    .trim_matches(|c: char| !c.is_alphanumeric()),
            ));
            let duplicate = doc
                .headings()
                .any(|h| h.text.eq_ignore_ascii_case(&rewritten));
            if count_words(&rewritten) == 0 || duplicate {
                rewritten = generic_heading(&doc, &matcher);
            }
            changes.push(format!("Rewrote heading \"{}\" as \"{}\"", original, rewritten));
            doc.blocks[idx].text = rewritten;
        }

        if changes.is_empty() {
            return DensityOptimization::unchanged(body);
        }
        DensityOptimization {
            content: doc.render(),
            optimized: true,
            changes_made: changes,
        }
    }
}

/// 本文とキーワードからレポートを作成
pub(crate) fn report(doc: &Document, matcher: &KeywordMatcher) -> KeywordDensityReport {
    let text = doc.body_text();
    let body_words = count_words(&text);
    let occurrences = matcher.count(&text);
    let density = if body_words == 0 {
        0.0
    } else {
        occurrences as f64 / body_words as f64 * 100.0
    };
    let heading_count = doc.heading_count();
    let headings_with_keyword = doc.headings().filter(|h| matcher.contains(&h.text)).count();
    let subheading_ratio = if heading_count == 0 {
        0.0
    } else {
        headings_with_keyword as f64 / heading_count as f64 * 100.0
    };
    KeywordDensityReport {
        body_words,
        occurrences,
        density,
        heading_count,
        headings_with_keyword,
        subheading_ratio,
    }
}

fn neutral_reference(words: usize, rotation: usize) -> &'static str {
    let options = NEUTRAL_REFERENCES[words.clamp(1, NEUTRAL_REFERENCES.len()) - 1];
    options[rotation % options.len()]
}

fn replace_in_block(doc: &mut Document, block_idx: usize, from: &str, to: &str) -> bool {
    let Some(block) = doc.blocks.get_mut(block_idx) else {
        return false;
    };
    if !block.text.contains(from) {
        return false;
    }
    block.text = block.text.replacen(from, to, 1);
    true
}

fn append_keyword_sentence(doc: &mut Document, matcher: &KeywordMatcher, changes: &mut Vec<String>) {
    let sentence = format!("This article focuses on {}.", matcher.keyword());
    let rendered = doc.render();
    let body = if rendered.trim().is_empty() {
        sentence.clone()
    } else {
        format!("{}\n\n{}", rendered.trim_end(), sentence)
    };
    *doc = Document::parse(&body);
    changes.push(format!("Appended keyword sentence: \"{}\"", sentence));
}

fn generic_heading(doc: &Document, matcher: &KeywordMatcher) -> String {
    GENERIC_HEADINGS
        .iter()
        .find(|g| !matcher.contains(g) && !doc.headings().any(|h| h.text.eq_ignore_ascii_case(g)))
        .map(|g| g.to_string())
        .unwrap_or_else(|| format!("Section {}", doc.heading_count() + 1))
}
