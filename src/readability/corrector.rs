//! Readability Corrector
//!
//! 受動態・長文・つなぎ言葉の3指標を反復的に修正する。
//! 段落ブロックのみを書き換え、見出しやその他の行は変更しない。

use super::passive_voice::{PassiveVoiceAnalysis, PassiveVoiceAnalyzer};
use super::sentence_length::{SentenceLengthAnalysis, SentenceLengthAnalyzer};
use super::transition_words::{TransitionWordAnalysis, TransitionWordAnalyzer};
use crate::adaptive::Thresholds;
use crate::content::text::count_words;
use crate::content::Document;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// 書き換え後に許容する単語数の最小比率
const MIN_WORD_RETENTION: f64 = 0.8;

/// 修正オプション
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadabilityOptions {
    pub passive_voice_max_ratio: f64,
    pub long_sentence_words: usize,
    pub long_sentence_max_ratio: f64,
    pub transition_word_min_ratio: f64,
}

impl Default for ReadabilityOptions {
    fn default() -> Self {
        Self::from_thresholds(&Thresholds::default())
    }
}

impl ReadabilityOptions {
    pub fn from_thresholds(thresholds: &Thresholds) -> Self {
        Self {
            passive_voice_max_ratio: thresholds.passive_voice_max_ratio,
            long_sentence_words: thresholds.long_sentence_words,
            long_sentence_max_ratio: thresholds.long_sentence_max_ratio,
            transition_word_min_ratio: thresholds.transition_word_min_ratio,
        }
    }
}

/// 3指標の分析結果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadabilityAnalysis {
    pub passive_voice: PassiveVoiceAnalysis,
    pub sentence_length: SentenceLengthAnalysis,
    pub transition_words: TransitionWordAnalysis,
}

impl ReadabilityAnalysis {
    pub fn compliant(&self) -> bool {
        self.passive_voice.compliant
            && self.sentence_length.compliant
            && self.transition_words.compliant
    }
}

/// 修正結果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadabilityCorrection {
    pub corrected_content: String,
    /// 反復番号（1始まり） → 変更内容
    pub changes_made: BTreeMap<usize, Vec<String>>,
    pub iterations: usize,
    pub final_analysis: ReadabilityAnalysis,
}

/// 可読性コレクター
#[derive(Debug, Clone)]
pub struct ReadabilityCorrector {
    passive: PassiveVoiceAnalyzer,
    sentence: SentenceLengthAnalyzer,
    transition: TransitionWordAnalyzer,
}

impl Default for ReadabilityCorrector {
    fn default() -> Self {
        Self::new(ReadabilityOptions::default())
    }
}

impl ReadabilityCorrector {
    pub fn new(options: ReadabilityOptions) -> Self {
        Self {
            passive: PassiveVoiceAnalyzer::new(options.passive_voice_max_ratio),
            sentence: SentenceLengthAnalyzer::new(
                options.long_sentence_words,
                options.long_sentence_max_ratio,
            ),
            transition: TransitionWordAnalyzer::new(options.transition_word_min_ratio),
        }
    }

    /// 本文を分析
    pub fn analyze(&self, body: &str) -> ReadabilityAnalysis {
        let sentences: Vec<String> = Document::parse(body)
            .sentences()
            .into_iter()
            .map(|(_, s)| s)
            .collect();
        self.analyze_sentences(&sentences)
    }

    fn analyze_sentences(&self, sentences: &[String]) -> ReadabilityAnalysis {
        ReadabilityAnalysis {
            passive_voice: self.passive.analyze(sentences),
            sentence_length: self.sentence.analyze(sentences),
            transition_words: self.transition.analyze(sentences),
        }
    }

    /// 可読性を修正
    ///
    /// 準拠済みの本文は変更しない。単語数が 20% 以上減る書き換えは破棄する。
    pub fn correct_readability(&self, body: &str, max_iterations: usize) -> ReadabilityCorrection {
        let original_words = count_words(body);
        let mut doc = Document::parse(body);
        let mut changes_made = BTreeMap::new();
        let mut iterations = 0;

        while iterations < max_iterations {
            let sentences = doc.sentences();
            let flat: Vec<String> = sentences.iter().map(|(_, s)| s.clone()).collect();
            let analysis = self.analyze_sentences(&flat);
            if analysis.compliant() {
                break;
            }

            let mut changes = Vec::new();
            let mut working = sentences;
            if !analysis.passive_voice.compliant {
                self.fix_passive(&mut working, &mut changes);
            }
            if !self.sentence.analyze(&texts(&working)).compliant {
                self.fix_long_sentences(&mut working, &mut changes);
            }
            if !self.transition.analyze(&texts(&working)).compliant {
                self.fix_transitions(&mut working, &mut changes);
            }

            if changes.is_empty() {
                break;
            }

            let candidate = rebuild(&doc, &working);
            let candidate_words = count_words(&candidate.render());
            if (candidate_words as f64) < original_words as f64 * MIN_WORD_RETENTION {
                debug!("Discarding readability rewrite: word count shrank too much");
                break;
            }

            iterations += 1;
            debug!("Readability iteration {}: {} changes", iterations, changes.len());
            changes_made.insert(iterations, changes);
            doc = candidate;
        }

        let corrected_content = if iterations == 0 {
            body.to_string()
        } else {
            doc.render()
        };
        let final_analysis = self.analyze(&corrected_content);
        ReadabilityCorrection {
            corrected_content,
            changes_made,
            iterations,
            final_analysis,
        }
    }

    fn fix_passive(&self, working: &mut [(usize, String)], changes: &mut Vec<String>) {
        for (_, sentence) in working.iter_mut() {
            if !self.passive.is_passive(sentence) {
                continue;
            }
            let rewritten = match self.passive.convert_to_active(sentence) {
                Some(active) if !self.passive.is_passive(&active) => active,
                _ => self.passive.neutralize(sentence),
            };
            if rewritten != *sentence {
                changes.push(format!("passive voice: \"{}\" -> \"{}\"", sentence, rewritten));
                *sentence = rewritten;
            }
        }
    }

    fn fix_long_sentences(&self, working: &mut Vec<(usize, String)>, changes: &mut Vec<String>) {
        let mut unsplittable: Vec<String> = Vec::new();
        loop {
            if self.sentence.analyze(&texts(working)).compliant {
                break;
            }
            // 最長の長文から分割する
            let Some(idx) = working
                .iter()
                .enumerate()
                .filter(|(_, (_, s))| self.sentence.is_long(s) && !unsplittable.contains(s))
                .max_by_key(|(i, (_, s))| (count_words(s), usize::MAX - i))
                .map(|(i, _)| i)
            else {
                break;
            };

            let (block, sentence) = working[idx].clone();
            let parts = self.sentence.split(&sentence);
            if parts.len() < 2 {
                unsplittable.push(sentence);
                continue;
            }
            changes.push(format!("split long sentence into {}: \"{}\"", parts.len(), sentence));
            working.splice(idx..=idx, parts.into_iter().map(|p| (block, p)));
        }
    }

    fn fix_transitions(&self, working: &mut [(usize, String)], changes: &mut Vec<String>) {
        let (injected, changed) = self.transition.inject(&texts(working));
        for idx in changed {
            changes.push(format!("added transition: \"{}\"", injected[idx]));
            working[idx].1 = injected[idx].clone();
        }
    }
}

fn texts(working: &[(usize, String)]) -> Vec<String> {
    working.iter().map(|(_, s)| s.clone()).collect()
}

/// 文の列から段落を再構築（変更のあった段落のみ）
fn rebuild(doc: &Document, working: &[(usize, String)]) -> Document {
    let original = doc.sentences();
    let mut result = doc.clone();
    for idx in doc.paragraph_indices() {
        let before: Vec<&String> = original.iter().filter(|(b, _)| *b == idx).map(|(_, s)| s).collect();
        let after: Vec<&String> = working.iter().filter(|(b, _)| *b == idx).map(|(_, s)| s).collect();
        if before != after {
            result.blocks[idx].text = after
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(" ");
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPLIANT: &str = "## Planning\n\
        We plan each sprint on Monday. However, plans change often. \
        The team reviews results on Friday. Therefore, every week ends with a demo.";

    #[test]
    fn test_compliant_text_is_unchanged() {
        let corrector = ReadabilityCorrector::default();
        let result = corrector.correct_readability(COMPLIANT, 3);
        assert_eq!(result.corrected_content, COMPLIANT);
        assert_eq!(result.iterations, 0);
        assert!(result.changes_made.is_empty());
        assert!(result.final_analysis.compliant());
    }

    #[test]
    fn test_corrects_all_three_metrics() {
        let body = "## Results\n\
            The report was reviewed by the team. \
            The results were published by the editors. \
            Our analysts collected data from dozens of regional offices during the spring quarter, and they compared the numbers against last year's figures to find trends. \
            The dashboard shows weekly totals. \
            Managers read it every morning. \
            Sales grew in every region.";
        let corrector = ReadabilityCorrector::default();
        let result = corrector.correct_readability(body, 3);

        assert!(result.iterations >= 1);
        assert!(result.final_analysis.compliant(), "{:?}", result.final_analysis);
        assert!(result.corrected_content.starts_with("## Results\n"));
        assert!(result.corrected_content.contains("The team reviewed the report."));
    }

    #[test]
    fn test_second_pass_makes_no_more_changes() {
        let body = "The report was reviewed by the team. \
            Our analysts collected data from dozens of regional offices during the spring quarter, and they compared the numbers against last year's figures to find trends. \
            The dashboard shows weekly totals. \
            Managers read it every morning.";
        let corrector = ReadabilityCorrector::default();
        let first = corrector.correct_readability(body, 3);
        let second = corrector.correct_readability(&first.corrected_content, 3);

        let count = |r: &ReadabilityCorrection| r.changes_made.values().map(Vec::len).sum::<usize>();
        assert!(count(&first) > 0);
        assert!(count(&second) <= count(&first));
        assert_eq!(second.final_analysis.compliant(), first.final_analysis.compliant());
    }

    #[test]
    fn test_rewrites_keep_meaning_and_casing() {
        let corrector = ReadabilityCorrector::default();
        let result = corrector.correct_readability(
            "Results are reviewed weekly. The plan was approved by the board of directors who met on Monday morning.",
            3,
        );
        let text = &result.corrected_content;
        assert!(text.contains("Results get reviewed weekly."), "{}", text);
        assert!(text.contains("the plan got approved by the board of directors"), "{}", text);
        assert!(!text.contains("we approved"), "{}", text);
        assert!(result.final_analysis.compliant(), "{:?}", result.final_analysis);
    }

    #[test]
    fn test_non_ascii_body() {
        let body = "## Poland\n\
            The city was renamed Łódź in the last century. \
            Kraków was visited by Zoë last spring. \
            The old market is still loved by locals.";
        let result = ReadabilityCorrector::default().correct_readability(body, 3);
        let text = &result.corrected_content;
        assert!(text.starts_with("## Poland\n"));
        assert!(text.contains("Łódź") && text.contains("Kraków") && text.contains("Zoë"));
        assert!(result.final_analysis.passive_voice.compliant, "{}", text);
    }

    #[test]
    fn test_headings_and_raw_lines_are_preserved() {
        let body = "# Title\n- list item was written\nThe page was written by Sam. It works.";
        let corrector = ReadabilityCorrector::default();
        let result = corrector.correct_readability(body, 3);
        let lines: Vec<&str> = result.corrected_content.lines().collect();
        assert_eq!(lines[0], "# Title");
        assert_eq!(lines[1], "- list item was written");
        assert!(!lines[2].contains("was written"));
    }

    #[test]
    fn test_empty_body() {
        let result = ReadabilityCorrector::default().correct_readability("", 3);
        assert_eq!(result.corrected_content, "");
        assert_eq!(result.iterations, 0);
    }
}
