//! Alt Text Accessibility Optimizer
//!
//! 代替テキストの検証・スコアリング・修正と、本文中の画像の代替テキスト書き換え。
//!
//! - 禁止フレーズ（"image of" など）とファイル名を除去
//! - 長さ（既定 10-125 文字）とキーワードを満たすように調整
//! - 汎用的な値（"image"、"photo" など）は説明文に置き換える

use crate::adaptive::Thresholds;
use crate::content::text::{
    capitalize_first, char_len, count_words, normalize_whitespace, strip_tags, trim_dangling,
    truncate_at_word_boundary, KeywordMatcher,
};
use regex::{Captures, NoExpand, Regex};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// 代替テキストに含めてはいけないフレーズ
pub const BANNED_PHRASES: &[&str] = &[
    "image of",
    "picture of",
    "photo of",
    "photograph of",
    "graphic of",
];

/// 説明になっていない汎用的な値
const GENERIC_ALT_VALUES: &[&str] = &[
    "image",
    "photo",
    "picture",
    "icon",
    "graphic",
    "img",
    "banner",
    "logo",
    "untitled",
    "screenshot",
    "thumbnail",
    "placeholder",
];

/// 短すぎる代替テキストに追加する補足
const PADDING: &str = "shown in a clear, detailed illustration";

fn banned_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:(?:an?|the)\s+)?(?:image|picture|photo|photograph|graphic)\s+of\s*").unwrap()
    })
}

fn filename_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)[\w./-]*[\w-]+\.(?:jpe?g|png|gif|svg|webp|bmp|avif)\b").unwrap())
}

fn html_img_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<img\b[^>]*>").unwrap())
}

fn alt_attr_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)\balt\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap())
}

fn src_attr_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)\bsrc\s*=\s*["']([^"']*)["']"#).unwrap())
}

fn markdown_img_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"!\[([^\]]*)\]\(([^)]*)\)").unwrap())
}

/// 代替テキストの構成
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AltTextStructure {
    Descriptive,
    ActionFocused,
    ContextFirst,
    KeywordFirst,
    Detailed,
    Concise,
}

impl AltTextStructure {
    pub const ALL: [AltTextStructure; 6] = [
        AltTextStructure::Descriptive,
        AltTextStructure::ActionFocused,
        AltTextStructure::ContextFirst,
        AltTextStructure::KeywordFirst,
        AltTextStructure::Detailed,
        AltTextStructure::Concise,
    ];

    fn template(&self) -> &'static str {
        match self {
            AltTextStructure::Descriptive => "{Kw} shown as a clear visual depicting {topic}",
            AltTextStructure::ActionFocused => "People applying {kw} while working on {topic}",
            AltTextStructure::ContextFirst => "{Topic} setting that highlights {kw}",
            AltTextStructure::KeywordFirst => "{Kw} explained through {topic}",
            AltTextStructure::Detailed => {
                "Detailed view of {kw} for {topic} with clearly labeled elements and balanced colors"
            }
            AltTextStructure::Concise => "{Kw} at a glance",
        }
    }

    /// テンプレートを展開
    pub fn render(&self, keyword: &str, topic: &str) -> String {
        let topic = if topic.trim().is_empty() { keyword } else { topic.trim() };
        self.template()
            .replace("{Kw}", &capitalize_first(keyword))
            .replace("{kw}", keyword)
            .replace("{Topic}", &capitalize_first(topic))
            .replace("{topic}", topic)
    }
}

/// 検証結果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AltTextValidation {
    pub valid: bool,
    pub length: usize,
    pub has_keyword: bool,
    pub banned_phrases: Vec<String>,
    pub issues: Vec<String>,
}

/// アクセシビリティスコア
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilityScore {
    /// 0-100
    pub score: u32,
    pub issues: Vec<String>,
}

/// 修正結果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AltTextOptimization {
    pub original: String,
    pub optimized: String,
    pub changes: Vec<String>,
    pub score: u32,
}

/// バリエーション
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AltTextVariation {
    pub alt_text: String,
    pub structure: AltTextStructure,
    pub score: u32,
}

/// 本文中の画像
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyImage {
    /// 代替テキスト（属性がない場合は None）
    pub alt: Option<String>,
    /// 画像のソース
    pub source: String,
}

/// 代替テキストオプティマイザー
#[derive(Debug, Clone)]
pub struct AltTextAccessibilityOptimizer {
    min_length: usize,
    max_length: usize,
}

impl Default for AltTextAccessibilityOptimizer {
    fn default() -> Self {
        Self::from_thresholds(&Thresholds::default())
    }
}

impl AltTextAccessibilityOptimizer {
    pub fn new(min_length: usize, max_length: usize) -> Self {
        let max_length = max_length.max(2);
        Self {
            min_length: min_length.min(max_length - 1),
            max_length,
        }
    }

    pub fn from_thresholds(thresholds: &Thresholds) -> Self {
        Self::new(thresholds.alt_text_min_length, thresholds.alt_text_max_length)
    }

    /// 検証
    pub fn validate(&self, alt: &str, keyword: &str, synonyms: &[String]) -> AltTextValidation {
        let matcher = KeywordMatcher::new(keyword, synonyms);
        let length = char_len(alt);
        let has_keyword = matcher.is_empty() || matcher.contains(alt);
        let banned = find_banned(alt);
        let mut issues = Vec::new();
        if alt.trim().is_empty() {
            issues.push("Alt text is missing".to_string());
        } else if length < self.min_length {
            issues.push(format!("Alt text is too short ({} < {})", length, self.min_length));
        } else if length > self.max_length {
            issues.push(format!("Alt text is too long ({} > {})", length, self.max_length));
        }
        if !has_keyword {
            issues.push("Alt text does not contain the focus keyword".to_string());
        }
        for phrase in &banned {
            issues.push(format!("Alt text contains \"{}\"", phrase));
        }
        AltTextValidation {
            valid: issues.is_empty(),
            length,
            has_keyword,
            banned_phrases: banned,
            issues,
        }
    }

    /// アクセシビリティスコア（0-100）
    pub fn score_accessibility(&self, alt: &str, keyword: &str, synonyms: &[String]) -> AccessibilityScore {
        let trimmed = alt.trim();
        if trimmed.is_empty() {
            return AccessibilityScore {
                score: 0,
                issues: vec!["Alt text is missing".to_string()],
            };
        }

        let matcher = KeywordMatcher::new(keyword, synonyms);
        let mut score: i32 = 100;
        let mut issues = Vec::new();
        let mut penalize = |points: i32, issue: String| {
            score -= points;
            issues.push(issue);
        };

        let length = char_len(trimmed);
        if length < self.min_length {
            penalize(30, format!("Too short ({} characters)", length));
        } else if length > self.max_length {
            penalize(25, format!("Too long ({} characters)", length));
        }
        for phrase in find_banned(trimmed) {
            penalize(20, format!("Redundant phrase \"{}\"", phrase));
        }
        if filename_pattern().is_match(trimmed) {
            penalize(30, "Contains a file name".to_string());
        }
        if is_generic(trimmed) {
            penalize(40, "Generic description".to_string());
        }
        if !matcher.is_empty() && !matcher.contains(trimmed) {
            penalize(15, "Missing focus keyword".to_string());
        }
        if count_words(trimmed) < 3 {
            penalize(10, "Too few words to describe the image".to_string());
        }

        AccessibilityScore {
            score: score.clamp(0, 100) as u32,
            issues,
        }
    }

    /// 代替テキストを修正（常に有効な結果を返す）
    pub fn optimize_alt_text(&self, alt: &str, keyword: &str, synonyms: &[String]) -> AltTextOptimization {
        let matcher = KeywordMatcher::new(keyword, synonyms);
        let keyword = self.usable_keyword(&matcher);
        let mut changes = Vec::new();

        let mut text = normalize_whitespace(&strip_tags(alt));
        if banned_pattern().is_match(&text) {
            text = normalize_whitespace(&banned_pattern().replace_all(&text, ""));
            changes.push("Removed redundant phrase".to_string());
        }
        if filename_pattern().is_match(&text) {
            text = normalize_whitespace(&filename_pattern().replace_all(&text, ""));
            changes.push("Removed file name".to_string());
        }
        text = text
            .trim_matches(|c: char| !c.is_alphanumeric() && c != ')' && c != '"')
            .to_string();

        if text.is_empty() || is_generic(&text) {
            text = AltTextStructure::Descriptive.render(&keyword, "");
            changes.push("Replaced generic description".to_string());
        }

        if !matcher.is_empty() && !matcher.contains(&text) {
            text = format!("{}: {}", capitalize_first(&keyword), text);
            changes.push(format!("Added focus keyword \"{}\"", keyword));
        }

        if char_len(&text) < self.min_length {
            text = format!("{} {}", text, PADDING);
            changes.push("Expanded short description".to_string());
        }

        if char_len(&text) > self.max_length {
            text = trim_dangling(&truncate_at_word_boundary(&text, self.max_length));
            if !matcher.is_empty() && !matcher.contains(&text) {
                let room = self.max_length.saturating_sub(char_len(&keyword) + 2);
                text = format!(
                    "{}: {}",
                    capitalize_first(&keyword),
                    trim_dangling(&truncate_at_word_boundary(&text, room))
                );
            }
            changes.push(format!("Shortened to {} characters", char_len(&text)));
        }

        // 極端に短い上限では単語境界で収まらないことがある
        if char_len(&text) > self.max_length {
            text = text.chars().take(self.max_length).collect::<String>().trim_end().to_string();
        }
        while char_len(&text) < self.min_length {
            text.push_str(" visual");
        }

        let text = capitalize_first(&text);
        let score = self.score_accessibility(&text, &keyword, synonyms).score;
        AltTextOptimization {
            original: alt.to_string(),
            optimized: text,
            changes,
            score,
        }
    }

    /// 構成の異なる代替テキストを生成（スコアの高い順）
    ///
    /// 件数は構成の種類数（6）で頭打ち。
    pub fn generate_accessible_variations(
        &self,
        keyword: &str,
        synonyms: &[String],
        topic: &str,
        count: usize,
    ) -> Vec<AltTextVariation> {
        let matcher = KeywordMatcher::new(keyword, synonyms);
        let keyword = self.usable_keyword(&matcher);
        let mut variations: Vec<AltTextVariation> = AltTextStructure::ALL
            .iter()
            .take(count)
            .map(|structure| {
                let optimized = self.optimize_alt_text(&structure.render(&keyword, topic), &keyword, synonyms);
                AltTextVariation {
                    alt_text: optimized.optimized,
                    structure: *structure,
                    score: optimized.score,
                }
            })
            .collect();
        variations.sort_by(|a, b| b.score.cmp(&a.score));
        variations
    }

    /// 上限に収まるキーワード
    fn usable_keyword(&self, matcher: &KeywordMatcher) -> String {
        let limit = self.max_length / 2;
        if char_len(matcher.keyword()) <= limit {
            matcher.keyword().to_string()
        } else if char_len(matcher.shortest_term()) <= limit {
            matcher.shortest_term().to_string()
        } else {
            truncate_at_word_boundary(matcher.shortest_term(), limit)
        }
    }

    /// 本文中の画像の代替テキストを修正
    ///
    /// 戻り値は (新しい本文, 変更内容)。
    pub fn rewrite_body_alt_texts(&self, body: &str, keyword: &str, synonyms: &[String]) -> (String, Vec<String>) {
        let mut changes = Vec::new();

        let html = html_img_pattern().replace_all(body, |caps: &Captures| {
            let tag = &caps[0];
            let current = alt_attr_pattern().captures(tag).map(|c| {
                c.get(1)
                    .or_else(|| c.get(2))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default()
            });
            let current_text = current.clone().unwrap_or_default();
            if self.validate(&current_text, keyword, synonyms).valid {
                return tag.to_string();
            }
            let optimized = self.optimize_alt_text(&current_text, keyword, synonyms).optimized;
            let escaped = optimized.replace('"', "&quot;");
            changes.push(format!("Image alt text: \"{}\" -> \"{}\"", current_text, optimized));
            let attribute = format!("alt=\"{}\"", escaped);
            match current {
                Some(_) => alt_attr_pattern()
                    .replace(tag, NoExpand(&attribute))
                    .into_owned(),
                // `<img` の直後に属性を挿入
                None => format!("{} {}{}", &tag[..4], attribute, &tag[4..]),
            }
        });

        let markdown = markdown_img_pattern().replace_all(&html, |caps: &Captures| {
            let current = &caps[1];
            if self.validate(current, keyword, synonyms).valid {
                return caps[0].to_string();
            }
            let optimized = self
                .optimize_alt_text(current, keyword, synonyms)
                .optimized
                .replace([']', '['], "");
            changes.push(format!("Image alt text: \"{}\" -> \"{}\"", current, optimized));
            format!("![{}]({})", optimized, &caps[2])
        });

        (markdown.into_owned(), changes)
    }
}

/// 本文中の画像を抽出（HTML の `<img>` と Markdown 画像）
pub fn extract_images(body: &str) -> Vec<BodyImage> {
    let mut images: Vec<BodyImage> = html_img_pattern()
        .find_iter(body)
        .map(|m| {
            let tag = m.as_str();
            let alt = alt_attr_pattern().captures(tag).map(|c| {
                c.get(1)
                    .or_else(|| c.get(2))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default()
            });
            let source = src_attr_pattern()
                .captures(tag)
                .map(|c| c[1].to_string())
                .unwrap_or_default();
            BodyImage { alt, source }
        })
        .collect();
    images.extend(markdown_img_pattern().captures_iter(body).map(|c| BodyImage {
        alt: Some(c[1].to_string()),
        source: c[2].to_string(),
    }));
    images
}

fn find_banned(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    BANNED_PHRASES
        .iter()
        .filter(|p| lower.contains(*p))
        .map(|p| p.to_string())
        .collect()
}

fn is_generic(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    GENERIC_ALT_VALUES.contains(&lower.as_str())
}
