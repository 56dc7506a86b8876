//! Title Optimization Engine & Uniqueness Validator
//!
//! コンテンツタイプ別のテンプレートからタイトルを生成し、
//! 長さ・キーワード位置・タイプ別パターン・一意性を検証する。

use crate::adaptive::Thresholds;
use crate::content::text::{char_len, normalize_whitespace, title_case, trim_dangling, truncate_at_word_boundary};
use crate::content::{ContentType, KeywordMatcher};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// 類似とみなす Jaccard 係数
pub const SIMILARITY_THRESHOLD: f64 = 0.8;

/// リスト記事で使う数
const LISTICLE_NUMBERS: &[u32] = &[5, 7, 10, 12, 15];

/// タイプ別テンプレート（`{kw}` はキーワード、`{n}` は数）
fn templates(content_type: ContentType) -> &'static [&'static str] {
    match content_type {
        ContentType::HowTo => &[
            "How to Master {kw}: A Step-by-Step Guide",
            "How to Get Started with {kw}",
            "{kw}: How to Do It Right",
            "How to Use {kw} Effectively",
            "{kw} Guide: Step-by-Step Instructions",
        ],
        ContentType::Listicle => &[
            "{n} {kw} Tips You Need to Know",
            "{n} Best {kw} Ideas to Try",
            "{kw}: {n} Proven Strategies",
            "{n} Ways to Improve Your {kw}",
            "Top {n} {kw} Mistakes to Avoid",
        ],
        ContentType::Comparison => &[
            "{kw} Compared: Which Option Is Best?",
            "{kw} vs Alternatives: An Honest Comparison",
            "Best {kw} Options Compared",
            "Comparing {kw}: Pros and Cons",
        ],
        ContentType::Review => &[
            "{kw} Review: Is It Worth It?",
            "An Honest {kw} Review",
            "{kw} Review: Pros, Cons, and Verdict",
        ],
        ContentType::Guide => &[
            "{kw}: The Complete Guide",
            "The Ultimate {kw} Guide",
            "{kw} Explained: A Beginner's Guide",
            "A Practical Guide to {kw}",
        ],
        ContentType::Tutorial => &[
            "{kw} Tutorial: Learn Step by Step",
            "{kw} Tutorial for Beginners",
            "Learn {kw}: A Hands-On Tutorial",
        ],
        ContentType::News => &[
            "{kw}: What's New This Year",
            "{kw} News: The Latest Updates",
            "Latest {kw} Updates You Should Know",
        ],
        ContentType::CaseStudy => &[
            "{kw} Case Study: Real Results",
            "{kw} in Practice: A Case Study",
            "{kw} Success Story: Results and Lessons",
        ],
        ContentType::Article => &[
            "{kw}: Everything You Need to Know",
            "Understanding {kw}",
            "Why {kw} Matters",
            "{kw}: Key Insights and Ideas",
        ],
    }
}

/// フォールバック用のラベル
fn fallback_label(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::HowTo | ContentType::Guide => "Guide",
        ContentType::Listicle => "Tips",
        ContentType::Comparison => "Comparison",
        ContentType::Review => "Review",
        ContentType::Tutorial => "Tutorial",
        ContentType::News => "News",
        ContentType::CaseStudy => "Case Study",
        ContentType::Article => "Insights",
    }
}

fn type_patterns() -> &'static HashMap<ContentType, Regex> {
    static PATTERNS: OnceLock<HashMap<ContentType, Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (ContentType::HowTo, r"(?i)\b(how|guide|step)\b"),
            (ContentType::Listicle, r"\d"),
            (
                ContentType::Comparison,
                r"(?i)\b(vs\.?|versus|compare|compared|comparing|comparison|best)\b",
            ),
            (ContentType::Review, r"(?i)\breview\b"),
            (ContentType::Guide, r"(?i)\bguide\b"),
            (ContentType::Tutorial, r"(?i)\b(tutorial|learn|step)\b"),
            (ContentType::News, r"(?i)\b(news|latest|new|updates?)\b"),
            (ContentType::CaseStudy, r"(?i)\b(case study|results|success)\b"),
        ]
        .into_iter()
        .filter_map(|(t, p)| Regex::new(p).ok().map(|r| (t, r)))
        .collect()
    })
}

/// タイトルがタイプ別のパターンに合うか（Article は常に合う）
pub fn matches_type_pattern(title: &str, content_type: ContentType) -> bool {
    type_patterns()
        .get(&content_type)
        .map(|p| p.is_match(title))
        .unwrap_or(true)
}

fn word_set(title: &str) -> HashSet<String> {
    title
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

/// 単語集合の Jaccard 係数
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let (a, b) = (word_set(a), word_set(b));
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

/// 一意性チェックの結果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UniquenessCheck {
    pub unique: bool,
    pub exact_match: bool,
    pub most_similar: Option<String>,
    pub similarity: f64,
}

/// 既存タイトルのレジストリ
#[derive(Debug, Clone, Default)]
pub struct TitleUniquenessValidator {
    titles: Vec<String>,
}

impl TitleUniquenessValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_titles<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            titles: titles.into_iter().map(Into::into).collect(),
        }
    }

    /// 完全一致（大文字小文字無視）と類似度をチェック
    pub fn check(&self, title: &str) -> UniquenessCheck {
        let normalized = normalize_whitespace(title);
        let exact_match = self
            .titles
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&normalized));
        let most_similar = self
            .titles
            .iter()
            .map(|t| (t, jaccard_similarity(t, &normalized)))
            .max_by(|a, b| a.1.total_cmp(&b.1));
        let (most_similar, similarity) = match most_similar {
            Some((t, s)) => (Some(t.clone()), s),
            None => (None, 0.0),
        };
        UniquenessCheck {
            unique: !exact_match && similarity < SIMILARITY_THRESHOLD,
            exact_match,
            most_similar,
            similarity,
        }
    }

    /// タイトルを登録（重複は登録しない）
    pub fn register(&mut self, title: &str) -> bool {
        let normalized = normalize_whitespace(title);
        if normalized.is_empty() || self.titles.iter().any(|t| t.eq_ignore_ascii_case(&normalized)) {
            return false;
        }
        self.titles.push(normalized);
        true
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    pub fn titles(&self) -> &[String] {
        &self.titles
    }
}

/// タイトル生成のパラメータ
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TitleParams {
    pub focus_keyword: String,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
}

fn default_max_attempts() -> usize {
    5
}

impl TitleParams {
    pub fn new(focus_keyword: impl Into<String>, content_type: ContentType) -> Self {
        Self {
            focus_keyword: focus_keyword.into(),
            content_type,
            target_audience: None,
            max_attempts: default_max_attempts(),
        }
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.target_audience = Some(audience.into());
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// 1回の生成試行
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TitleAttempt {
    pub title: String,
    pub valid: bool,
    pub issues: Vec<String>,
}

/// タイトル生成の結果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TitleResult {
    pub title: String,
    pub success: bool,
    pub attempts: usize,
    pub character_count: usize,
    pub all_attempts: Vec<TitleAttempt>,
    pub used_fallback: bool,
}

/// バリエーション生成のパラメータ
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VariationParams {
    pub focus_keyword: String,
    pub count: usize,
    /// 空の場合はすべてのタイプ
    #[serde(default)]
    pub content_types: Vec<ContentType>,
    #[serde(default)]
    pub target_audience: Option<String>,
}

/// コンテンツのバリエーション
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentVariation {
    pub title: String,
    pub content_type: ContentType,
    pub angle: String,
    pub focus_points: Vec<String>,
    pub character_count: usize,
}

/// 切り口: (名前, タイプ, 重点項目)
const ANGLES: &[(&str, ContentType, &[&str])] = &[
    ("beginner", ContentType::Guide, &["fundamentals", "common terms", "first steps"]),
    ("step_by_step", ContentType::HowTo, &["setup", "process", "checklist"]),
    ("list", ContentType::Listicle, &["quick wins", "key tips", "examples"]),
    ("comparison", ContentType::Comparison, &["alternatives", "pros and cons", "recommendations"]),
    ("review", ContentType::Review, &["features", "pricing", "verdict"]),
    ("hands_on", ContentType::Tutorial, &["exercises", "sample project", "troubleshooting"]),
    ("case_study", ContentType::CaseStudy, &["background", "approach", "results"]),
    ("news", ContentType::News, &["recent changes", "industry impact", "what to expect"]),
    ("overview", ContentType::Article, &["big picture", "benefits", "challenges"]),
];

/// タイトル修正の結果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TitleCorrection {
    pub title: String,
    pub changed: bool,
    pub reason: Option<String>,
}

/// タイトル最適化エンジン
#[derive(Debug, Clone)]
pub struct TitleEngine {
    max_length: usize,
    validator: TitleUniquenessValidator,
}

impl Default for TitleEngine {
    fn default() -> Self {
        Self::from_thresholds(&Thresholds::default())
    }
}

impl TitleEngine {
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length: max_length.max(10),
            validator: TitleUniquenessValidator::new(),
        }
    }

    pub fn from_thresholds(thresholds: &Thresholds) -> Self {
        Self::new(thresholds.title_max_length)
    }

    pub fn with_validator(mut self, validator: TitleUniquenessValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn validator(&self) -> &TitleUniquenessValidator {
        &self.validator
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// タイトルの問題点を列挙（一意性を含む）
    pub fn title_issues(&self, title: &str, keyword: &str, content_type: ContentType) -> Vec<String> {
        let matcher = KeywordMatcher::new(keyword, &[]);
        let mut issues = Vec::new();
        let length = char_len(title);
        if length > self.max_length {
            issues.push(format!("Title exceeds {} characters ({})", self.max_length, length));
        }
        match matcher.keyword_char_position(title) {
            Some(position) if position > length / 2 => {
                issues.push("Focus keyword appears in the second half of the title".to_string())
            }
            None if !matcher.is_empty() => {
                issues.push("Title does not contain the focus keyword".to_string())
            }
            _ => {}
        }
        if !matches_type_pattern(title, content_type) {
            issues.push(format!("Title does not match the {} pattern", content_type));
        }
        let uniqueness = self.validator.check(title);
        if uniqueness.exact_match {
            issues.push("Title duplicates an existing title".to_string());
        } else if !uniqueness.unique {
            issues.push(format!(
                "Title is too similar to \"{}\" ({:.2})",
                uniqueness.most_similar.unwrap_or_default(),
                uniqueness.similarity
            ));
        }
        issues
    }

    /// 最適化されたタイトルを生成
    ///
    /// テンプレートを順に試し、すべて失敗した場合は番号付きテンプレートにフォールバックする。
    /// 採用したタイトルはレジストリに登録する。
    pub fn generate_optimized_title(&mut self, params: &TitleParams) -> TitleResult {
        let keyword = title_case(&normalize_whitespace(&params.focus_keyword));
        let templates = templates(params.content_type);
        let mut all_attempts = Vec::new();

        for attempt in 0..params.max_attempts {
            let template = templates[attempt % templates.len()];
            let number = LISTICLE_NUMBERS[(attempt / templates.len() + attempt) % LISTICLE_NUMBERS.len()];
            let mut title = template
                .replace("{kw}", &keyword)
                .replace("{n}", &number.to_string());
            if let Some(audience) = params.target_audience.as_deref().map(str::trim) {
                let with_audience = format!("{} for {}", title, title_case(audience));
                if !audience.is_empty() && char_len(&with_audience) <= self.max_length {
                    title = with_audience;
                }
            }

            let issues = self.title_issues(&title, &params.focus_keyword, params.content_type);
            let valid = issues.is_empty();
            debug!("Title attempt {}: {:?} valid={}", attempt + 1, title, valid);
            all_attempts.push(TitleAttempt {
                title: title.clone(),
                valid,
                issues,
            });
            if valid {
                self.validator.register(&title);
                return TitleResult {
                    character_count: char_len(&title),
                    title,
                    success: true,
                    attempts: attempt + 1,
                    all_attempts,
                    used_fallback: false,
                };
            }
        }

        let title = self.fallback_title(&keyword, params.content_type);
        warn!(
            "Title generation exhausted {} attempts, using fallback {:?}",
            params.max_attempts, title
        );
        let success = {
            let matcher = KeywordMatcher::new(&params.focus_keyword, &[]);
            char_len(&title) <= self.max_length && (matcher.is_empty() || matcher.contains(&title))
        };
        self.validator.register(&title);
        TitleResult {
            character_count: char_len(&title),
            title,
            success,
            attempts: params.max_attempts,
            all_attempts,
            used_fallback: true,
        }
    }

    /// 番号付きフォールバック（完全一致しない番号を選ぶ）
    fn fallback_title(&self, keyword: &str, content_type: ContentType) -> String {
        let label = fallback_label(content_type);
        let build = |n: usize| {
            let suffix = format!(" {} #{}", label, n);
            let room = self.max_length.saturating_sub(char_len(&suffix));
            let head = trim_dangling(&truncate_at_word_boundary(keyword, room));
            normalize_whitespace(&format!("{}{}", head, suffix))
        };
        let limit = self.validator.len() + 2;
        (1..=limit)
            .map(&build)
            .find(|t| self.validator.check(t).unique)
            .or_else(|| (1..=limit).map(&build).find(|t| !self.validator.check(t).exact_match))
            .unwrap_or_else(|| build(limit + 1))
    }

    /// 複数の切り口でタイトルを生成
    ///
    /// 件数は切り口の数で頭打ち。各タイトルは個別に有効で、互いに一意。
    pub fn generate_content_variations(&mut self, params: &VariationParams) -> Vec<ContentVariation> {
        let angles: Vec<&(&str, ContentType, &[&str])> = ANGLES
            .iter()
            .filter(|(_, t, _)| params.content_types.is_empty() || params.content_types.contains(t))
            .collect();

        let mut variations = Vec::new();
        for (angle, content_type, focus_points) in angles.into_iter().take(params.count) {
            let mut title_params = TitleParams::new(params.focus_keyword.clone(), *content_type);
            title_params.target_audience = params.target_audience.clone();
            let result = self.generate_optimized_title(&title_params);
            variations.push(ContentVariation {
                character_count: result.character_count,
                title: result.title,
                content_type: *content_type,
                angle: angle.to_string(),
                focus_points: focus_points.iter().map(|p| p.to_string()).collect(),
            });
        }
        variations
    }

    /// 既存タイトルを修正
    ///
    /// 準拠しているタイトルはそのまま。キーワードを含む長すぎるタイトルは単語境界で
    /// 切り詰め、それ以外は新しく生成する。
    pub fn correct_title(&mut self, title: &str, keyword: &str, content_type: ContentType) -> TitleCorrection {
        let matcher = KeywordMatcher::new(keyword, &[]);
        let trimmed = normalize_whitespace(title);
        let has_keyword = matcher.is_empty() || matcher.contains(&trimmed);

        if !trimmed.is_empty() && has_keyword && char_len(&trimmed) <= self.max_length {
            return TitleCorrection {
                title: title.to_string(),
                changed: false,
                reason: None,
            };
        }

        if !trimmed.is_empty() && has_keyword {
            let shortened = trim_dangling(&truncate_at_word_boundary(&trimmed, self.max_length));
            if matcher.is_empty() || matcher.contains(&shortened) {
                return TitleCorrection {
                    title: shortened,
                    changed: true,
                    reason: Some(format!("Shortened to {} characters", self.max_length)),
                };
            }
        }

        let generated = self.generate_optimized_title(&TitleParams::new(keyword, content_type));
        TitleCorrection {
            title: generated.title,
            changed: true,
            reason: Some(if trimmed.is_empty() {
                "Generated missing title".to_string()
            } else if !has_keyword {
                "Regenerated title with focus keyword".to_string()
            } else {
                "Regenerated over-long title".to_string()
            }),
        }
    }
}
