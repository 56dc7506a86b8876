//! Image Prompt & Alt-Text Accessibility
//!
//! 画像生成プロンプトと代替テキストの生成・検証

pub mod alt_text;
pub mod image_prompt;

pub use alt_text::{
    extract_images, AccessibilityScore, AltTextAccessibilityOptimizer, AltTextOptimization,
    AltTextStructure, AltTextValidation, AltTextVariation, BodyImage, BANNED_PHRASES,
};
pub use image_prompt::{
    ImagePrompt, ImagePromptGenerator, ImagePromptMetadata, VisualContext, MAX_PROMPT_LENGTH,
};
