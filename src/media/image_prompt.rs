//! Image Prompt Generator
//!
//! 画像生成器に渡すプロンプトと、対応する代替テキストを生成する。

use super::alt_text::{AltTextAccessibilityOptimizer, AltTextStructure};
use crate::content::text::{char_len, normalize_whitespace, trim_dangling, truncate_at_word_boundary};
use crate::content::{ImageAsset, KeywordMatcher};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// プロンプトの最大文字数
pub const MAX_PROMPT_LENGTH: usize = 500;

const QUALITY_DESCRIPTORS: &[&str] = &["high-quality", "professional", "detailed", "high-resolution"];

const STYLES: &[&str] = &[
    "photorealistic",
    "flat illustration",
    "isometric 3D",
    "minimalist",
    "editorial photography",
    "watercolor",
];

const COMPOSITIONS: &[&str] = &[
    "centered subject with a clean background",
    "wide establishing shot",
    "close-up detail shot",
    "rule-of-thirds layout",
    "overhead flat lay",
];

const LIGHTING: &[&str] = &[
    "soft natural light",
    "bright studio lighting",
    "warm golden hour light",
    "cool ambient light",
    "dramatic side lighting",
];

/// 同じ構成が繰り返される場合に代替テキストへ付ける視点
const VIEWS: &[&str] = &["in a wide view", "in close-up", "from above", "from the side"];

/// 生成できるバリエーションの最大数（スタイル・構図・照明の組み合わせが重複しない範囲）
pub const MAX_VARIATIONS: usize = 30;

/// ビジュアルの文脈
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct VisualContext {
    pub style: String,
    pub composition: String,
    pub lighting: String,
}

impl VisualContext {
    fn nth(index: usize) -> Self {
        Self {
            style: STYLES[index % STYLES.len()].to_string(),
            composition: COMPOSITIONS[index % COMPOSITIONS.len()].to_string(),
            lighting: LIGHTING[(index / COMPOSITIONS.len() + index) % LIGHTING.len()].to_string(),
        }
    }
}

/// プロンプトのメタデータ
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImagePromptMetadata {
    pub keyword: String,
    pub topic: String,
    pub quality: String,
    pub prompt_length: usize,
    pub alt_text_length: usize,
    pub accessibility_score: u32,
}

/// 画像プロンプト
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImagePrompt {
    pub prompt: String,
    pub alt_text: String,
    pub context: VisualContext,
    pub metadata: ImagePromptMetadata,
}

impl ImagePrompt {
    /// 記事レコードに添付する画像アセットに変換
    pub fn to_asset(&self) -> ImageAsset {
        ImageAsset {
            prompt: self.prompt.clone(),
            alt_text: self.alt_text.clone(),
        }
    }
}

/// 画像プロンプトジェネレーター
#[derive(Debug, Clone, Default)]
pub struct ImagePromptGenerator {
    alt_text: AltTextAccessibilityOptimizer,
}

impl ImagePromptGenerator {
    pub fn new(alt_text: AltTextAccessibilityOptimizer) -> Self {
        Self { alt_text }
    }

    /// 画像プロンプトを1件生成
    pub fn generate_image_prompt(&self, topic: &str, keyword: &str, synonyms: &[String]) -> ImagePrompt {
        self.build(topic, keyword, synonyms, 0)
    }

    /// 文脈の異なるプロンプトを `count` 件生成（最大 30 件）
    ///
    /// プロンプト・代替テキスト・文脈はそれぞれ互いに重複しない。
    pub fn generate_varied_image_prompts(
        &self,
        topic: &str,
        keyword: &str,
        synonyms: &[String],
        count: usize,
    ) -> Vec<ImagePrompt> {
        let mut prompts: Vec<ImagePrompt> = Vec::new();
        let mut used_alts: HashSet<String> = HashSet::new();
        for index in 0..count.min(MAX_VARIATIONS) {
            let mut prompt = self.build(topic, keyword, synonyms, index);
            if !used_alts.insert(prompt.alt_text.to_lowercase()) {
                // 切り詰めで重複した場合は番号で区別する
                let numbered = format!("{} {}", prompt.alt_text, index + 1);
                prompt.alt_text = self.alt_text.optimize_alt_text(&numbered, keyword, synonyms).optimized;
                used_alts.insert(prompt.alt_text.to_lowercase());
            }
            prompts.push(prompt);
        }
        prompts
    }

    fn build(&self, topic: &str, keyword: &str, synonyms: &[String], index: usize) -> ImagePrompt {
        let matcher = KeywordMatcher::new(keyword, synonyms);
        let keyword = matcher.keyword().to_string();
        let topic = normalize_whitespace(topic);
        let topic = if topic.is_empty() { keyword.clone() } else { topic };
        let context = VisualContext::nth(index);
        let quality = QUALITY_DESCRIPTORS[index % QUALITY_DESCRIPTORS.len()];

        let render = |topic: &str, keyword: &str| {
            format!(
                "A {} {} image illustrating {}, focused on {}, {}, {}.",
                quality, context.style, topic, keyword, context.composition, context.lighting
            )
        };

        // 長すぎる場合はトピック、次にキーワードを切り詰める
        let mut prompt = render(&topic, &keyword);
        if char_len(&prompt) > MAX_PROMPT_LENGTH {
            let overhead = char_len(&render("", &keyword));
            let room = MAX_PROMPT_LENGTH.saturating_sub(overhead);
            let short_topic = trim_dangling(&truncate_at_word_boundary(&topic, room));
            prompt = render(&short_topic, &keyword);
        }
        if char_len(&prompt) > MAX_PROMPT_LENGTH {
            let short_keyword = matcher.shortest_term().to_string();
            let overhead = char_len(&render("", &short_keyword));
            let room = MAX_PROMPT_LENGTH.saturating_sub(overhead);
            let short_topic = trim_dangling(&truncate_at_word_boundary(&topic, room));
            prompt = render(&short_topic, &short_keyword);
        }
        if char_len(&prompt) > MAX_PROMPT_LENGTH {
            prompt = truncate_at_word_boundary(&prompt, MAX_PROMPT_LENGTH);
        }

        let structure = AltTextStructure::ALL[index % AltTextStructure::ALL.len()];
        let mut alt_source = structure.render(&keyword, &topic);
        let repeat = index / AltTextStructure::ALL.len();
        if repeat > 0 {
            alt_source = format!("{} {}", alt_source, VIEWS[(repeat - 1) % VIEWS.len()]);
        }
        let alt = self.alt_text.optimize_alt_text(&alt_source, &keyword, synonyms);

        ImagePrompt {
            metadata: ImagePromptMetadata {
                keyword: keyword.clone(),
                topic: topic.clone(),
                quality: quality.to_string(),
                prompt_length: char_len(&prompt),
                alt_text_length: char_len(&alt.optimized),
                accessibility_score: alt.score,
            },
            prompt,
            alt_text: alt.optimized,
            context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_image_prompt() {
        let generator = ImagePromptGenerator::default();
        let prompt = generator.generate_image_prompt("home office setup", "ergonomic chair", &[]);
        assert_eq!(
            prompt.prompt,
            "A high-quality photorealistic image illustrating home office setup, focused on ergonomic chair, centered subject with a clean background, soft natural light."
        );
        assert!(prompt.alt_text.to_lowercase().contains("ergonomic chair"));
        assert!((10..=125).contains(&char_len(&prompt.alt_text)));
        assert_eq!(prompt.metadata.accessibility_score, 100);
    }

    #[test]
    fn test_long_topic_is_truncated() {
        let topic = "a very long topic description ".repeat(30);
        let prompt = ImagePromptGenerator::default().generate_image_prompt(&topic, "rust", &[]);
        assert!(char_len(&prompt.prompt) <= MAX_PROMPT_LENGTH);
        assert!(prompt.prompt.contains("focused on rust"));
    }

    #[test]
    fn test_varied_prompts_are_distinct() {
        let prompts = ImagePromptGenerator::default().generate_varied_image_prompts(
            "team meeting",
            "project planning",
            &[],
            30,
        );
        assert_eq!(prompts.len(), 30);
        let unique_prompts: HashSet<&str> = prompts.iter().map(|p| p.prompt.as_str()).collect();
        let unique_alts: HashSet<String> = prompts.iter().map(|p| p.alt_text.to_lowercase()).collect();
        let unique_contexts: HashSet<&VisualContext> = prompts.iter().map(|p| &p.context).collect();
        assert_eq!(unique_prompts.len(), 30);
        assert_eq!(unique_alts.len(), 30);
        assert_eq!(unique_contexts.len(), 30);
        for p in &prompts {
            assert!(p.alt_text.to_lowercase().contains("project planning"));
        }
    }

    #[test]
    fn test_count_is_capped() {
        let prompts = ImagePromptGenerator::default().generate_varied_image_prompts("x", "seo", &[], 100);
        assert_eq!(prompts.len(), MAX_VARIATIONS);
    }
}
