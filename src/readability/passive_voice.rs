//! Passive Voice Analyzer
//!
//! 受動態（助動詞 + 過去分詞）の検出と能動態への書き換え

use crate::content::text::{capitalize_first, lowercase_leading, starts_with_function_word};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// 不規則動詞: (過去分詞, 過去形)
const IRREGULAR: &[(&str, &str)] = &[
    ("arisen", "arose"),
    ("begun", "began"),
    ("bought", "bought"),
    ("broken", "broke"),
    ("brought", "brought"),
    ("built", "built"),
    ("caught", "caught"),
    ("chosen", "chose"),
    ("done", "did"),
    ("drawn", "drew"),
    ("driven", "drove"),
    ("eaten", "ate"),
    ("fed", "fed"),
    ("felt", "felt"),
    ("forgotten", "forgot"),
    ("found", "found"),
    ("given", "gave"),
    ("grown", "grew"),
    ("held", "held"),
    ("hidden", "hid"),
    ("kept", "kept"),
    ("known", "knew"),
    ("laid", "laid"),
    ("led", "led"),
    ("left", "left"),
    ("lost", "lost"),
    ("made", "made"),
    ("meant", "meant"),
    ("paid", "paid"),
    ("put", "put"),
    ("read", "read"),
    ("said", "said"),
    ("seen", "saw"),
    ("sent", "sent"),
    ("set", "set"),
    ("shown", "showed"),
    ("sold", "sold"),
    ("spent", "spent"),
    ("spoken", "spoke"),
    ("stolen", "stole"),
    ("taken", "took"),
    ("taught", "taught"),
    ("thought", "thought"),
    ("told", "told"),
    ("understood", "understood"),
    ("won", "won"),
    ("worn", "wore"),
    ("written", "wrote"),
];

/// `-ed` で終わるが過去分詞ではない語
const ED_EXCEPTIONS: &[&str] = &[
    "red", "bed", "need", "seed", "speed", "feed", "breed", "shed", "hundred", "naked", "wicked",
    "sacred", "indeed", "embed", "proceed", "exceed", "succeed", "weed", "greed", "wed", "led",
];

const MODALS: &[&str] = &[
    "will", "would", "can", "could", "should", "must", "might", "may", "shall",
];

fn passive_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(am|is|are|was|were|be|been|being)\s+(?:(\w+ly|not|also|often|always|never|already|still|usually|then|now)\s+)?([a-z]+)\b",
        )
        .unwrap()
    })
}

fn is_participle(word: &str) -> bool {
    let lower = word.to_lowercase();
    if IRREGULAR.iter().any(|(p, _)| *p == lower) {
        return true;
    }
    lower.len() > 3 && lower.ends_with("ed") && !ED_EXCEPTIONS.contains(&lower.as_str())
}

fn past_tense(participle: &str) -> String {
    let lower = participle.to_lowercase();
    IRREGULAR
        .iter()
        .find(|(p, _)| *p == lower)
        .map(|(_, past)| past.to_string())
        .unwrap_or(lower)
}

/// 受動態の一致箇所
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassiveMatch {
    /// 助動詞（小文字）
    pub auxiliary: String,
    /// 助動詞の開始位置（バイト）
    pub aux_start: usize,
    /// 助動詞の終了位置（バイト）
    pub aux_end: usize,
    /// 副詞
    pub adverb: Option<String>,
    /// 過去分詞
    pub participle: String,
    /// 過去分詞の終了位置（バイト）
    pub participle_end: usize,
}

/// 受動態の分析結果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PassiveVoiceAnalysis {
    pub total_sentences: usize,
    /// 受動態を含む文のインデックス
    pub passive_sentences: Vec<usize>,
    /// 受動態の割合 (%)
    pub ratio: f64,
    pub max_ratio: f64,
    pub compliant: bool,
}

/// 受動態アナライザー
#[derive(Debug, Clone)]
pub struct PassiveVoiceAnalyzer {
    max_ratio: f64,
}

impl Default for PassiveVoiceAnalyzer {
    fn default() -> Self {
        Self::new(10.0)
    }
}

impl PassiveVoiceAnalyzer {
    /// 許容割合 (%) を指定して作成
    pub fn new(max_ratio: f64) -> Self {
        Self { max_ratio }
    }

    /// 文中の最初の受動態を検出
    pub fn find(&self, sentence: &str) -> Option<PassiveMatch> {
        passive_pattern().captures_iter(sentence).find_map(|caps| {
            let participle = caps.get(3)?;
            if !is_participle(participle.as_str()) {
                return None;
            }
            let aux = caps.get(1)?;
            Some(PassiveMatch {
                auxiliary: aux.as_str().to_lowercase(),
                aux_start: aux.start(),
                aux_end: aux.end(),
                adverb: caps.get(2).map(|m| m.as_str().to_string()),
                participle: participle.as_str().to_string(),
                participle_end: participle.end(),
            })
        })
    }

    /// 受動態を含むか
    pub fn is_passive(&self, sentence: &str) -> bool {
        self.find(sentence).is_some()
    }

    /// 文の集合を分析
    pub fn analyze(&self, sentences: &[String]) -> PassiveVoiceAnalysis {
        let passive_sentences: Vec<usize> = sentences
            .iter()
            .enumerate()
            .filter(|(_, s)| self.is_passive(s))
            .map(|(i, _)| i)
            .collect();
        let ratio = ratio(passive_sentences.len(), sentences.len());
        PassiveVoiceAnalysis {
            total_sentences: sentences.len(),
            passive_sentences,
            ratio,
            max_ratio: self.max_ratio,
            compliant: ratio <= self.max_ratio,
        }
    }

    /// 受動態を能動態に書き換える（構造が単純な場合のみ）
    pub fn convert_to_active(&self, sentence: &str) -> Option<String> {
        let found = self.find(sentence)?;
        let (body, terminal) = split_terminal(sentence);
        if found.participle_end > body.len() {
            return None;
        }

        let before = &body[..found.aux_start];
        let after = &body[found.participle_end..];
        let participle = found.participle.to_lowercase();
        let adverb = found
            .adverb
            .as_ref()
            .map(|a| format!("{} ", a.to_lowercase()))
            .unwrap_or_default();

        // 直前の語（has/have/had または助動詞）を取り出す
        let before_trimmed = before.trim_end();
        let (head, prev_word) = match before_trimmed.rfind(' ') {
            Some(idx) => (&before_trimmed[..idx], before_trimmed[idx + 1..].to_lowercase()),
            None => ("", before_trimmed.to_lowercase()),
        };

        let (subject_source, form) = match found.auxiliary.as_str() {
            "was" | "were" => (before_trimmed, Form::Past),
            "is" | "are" | "am" => (before_trimmed, Form::Present),
            "been" if matches!(prev_word.as_str(), "has" | "have" | "had") => {
                (head, Form::Perfect(prev_word == "had"))
            }
            "be" if MODALS.contains(&prev_word.as_str()) => (head, Form::Modal(prev_word.clone())),
            _ => return None,
        };

        let (lead, subject) = split_lead(subject_source)?;
        // 文頭の主語は小文字化できる場合のみ目的語に移す
        if lead.is_empty() && !movable_subject(&subject) {
            return None;
        }
        let object = objective_case(&subject);
        let (agent, rest) = match extract_agent(after) {
            Agent::Found { agent, rest } => (Some(agent), rest),
            Agent::Missing => (None, after.to_string()),
            // 長い動作主句を残したまま主語を補うと意味が変わる
            Agent::Unextractable => return None,
        };

        let active = match (form, agent) {
            (Form::Past, Some(agent)) => {
                format!("{} {}{} {}{}", agent, adverb, past_tense(&participle), object, rest)
            }
            (Form::Past, None) => {
                format!("we {}{} {}{}", adverb, past_tense(&participle), object, rest)
            }
            (Form::Present, Some(agent)) => format!(
                "{} {} {}{} {}{}",
                agent,
                has_or_have(&agent),
                adverb,
                participle,
                object,
                rest
            ),
            (Form::Present, None) => format!("we have {}{} {}{}", adverb, participle, object, rest),
            (Form::Perfect(past), agent) => {
                let agent = agent.unwrap_or_else(|| "we".to_string());
                let auxiliary = if past { "had" } else { has_or_have(&agent) };
                format!("{} {} {}{} {}{}", agent, auxiliary, adverb, participle, object, rest)
            }
            (Form::Modal(modal), Some(agent)) => {
                format!("{} {} get {} {}{}{}", agent, modal, object, adverb, participle, rest)
            }
            (Form::Modal(modal), None) => {
                format!("you {} get {} {}{}{}", modal, object, adverb, participle, rest)
            }
        };

        let active = if lead.is_empty() {
            capitalize_first(active.trim())
        } else {
            format!("{}{}", lead, active.trim())
        };
        Some(format!("{}{}", active, terminal))
    }

    /// get受動態への置き換え（最終手段）
    pub fn neutralize(&self, sentence: &str) -> String {
        let Some(found) = self.find(sentence) else {
            return sentence.to_string();
        };
        let replacement = match found.auxiliary.as_str() {
            "is" => "gets",
            "are" | "am" | "be" => "get",
            "was" | "were" => "got",
            "been" => "gotten",
            _ => "getting",
        };
        let original = &sentence[found.aux_start..found.aux_end];
        let replacement = if original.chars().next().map(char::is_uppercase).unwrap_or(false) {
            capitalize_first(replacement)
        } else {
            replacement.to_string()
        };
        format!(
            "{}{}{}",
            &sentence[..found.aux_start],
            replacement,
            &sentence[found.aux_end..]
        )
    }
}

#[derive(Debug, Clone)]
enum Form {
    Past,
    Present,
    /// true = had been
    Perfect(bool),
    Modal(String),
}

fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

fn split_terminal(sentence: &str) -> (&str, &str) {
    let trimmed = sentence.trim_end();
    let body = trimmed.trim_end_matches(['.', '!', '?']);
    (body, &trimmed[body.len()..])
}

/// 主語の前置き（カンマまで）と主語に分割
fn split_lead(source: &str) -> Option<(String, String)> {
    let (lead, subject) = match source.rfind(", ") {
        Some(idx) => (source[..idx + 2].to_string(), source[idx + 2..].trim().to_string()),
        None => (String::new(), source.trim().to_string()),
    };
    let words: Vec<&str> = subject.split_whitespace().collect();
    if words.is_empty() || words.len() > 8 {
        return None;
    }
    let last = words[words.len() - 1].to_lowercase();
    if matches!(last.as_str(), "that" | "which" | "who" | "what" | "where" | "when" | "and" | "or") {
        return None;
    }
    Some((lead, subject))
}

fn objective_case(subject: &str) -> String {
    match subject.to_lowercase().as_str() {
        "i" => "me".to_string(),
        "he" => "him".to_string(),
        "she" => "her".to_string(),
        "we" => "us".to_string(),
        "they" => "them".to_string(),
        "who" => "whom".to_string(),
        _ => lowercase_leading(subject),
    }
}

/// 主語の先頭が文頭由来の大文字だけか（固有名詞の可能性がある語は動かさない）
fn movable_subject(subject: &str) -> bool {
    let first = subject.split_whitespace().next().unwrap_or("");
    !first.chars().next().is_some_and(char::is_uppercase)
        || starts_with_function_word(subject)
        || matches!(first.to_lowercase().as_str(), "i" | "who")
}

#[derive(Debug, PartialEq)]
enum Agent {
    Found { agent: String, rest: String },
    Missing,
    /// `by` 句はあるが単純な名詞句ではない
    Unextractable,
}

/// `by ...` の動作主を取り出す
fn extract_agent(after: &str) -> Agent {
    let trimmed = after.trim_start();
    let Some(agent_part) = trimmed
        .get(..3)
        .filter(|prefix| prefix.eq_ignore_ascii_case("by "))
        .map(|_| &trimmed[3..])
    else {
        return Agent::Missing;
    };
    let end = agent_part.find([',', ';']).unwrap_or(agent_part.len());
    let agent = agent_part[..end].trim();
    if agent.is_empty() || agent.split_whitespace().count() > 6 {
        return Agent::Unextractable;
    }
    Agent::Found {
        agent: agent.to_string(),
        rest: agent_part[end..].to_string(),
    }
}

fn has_or_have(agent: &str) -> &'static str {
    let lower = agent.to_lowercase();
    let last = lower.split_whitespace().last().unwrap_or("");
    if matches!(last, "we" | "you" | "they" | "i")
        || (last.ends_with('s') && !last.ends_with("ss") && last.len() > 3)
    {
        "have"
    } else {
        "has"
    }
}
