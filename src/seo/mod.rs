//! SEO Analysis & Correction
//!
//! 問題検出、スコアリング、メタディスクリプション・キーワード密度・タイトルの修正

pub mod detector;
pub mod keyword_density;
pub mod meta_description;
pub mod scorer;
pub mod title;

pub use detector::IssueDetector;
pub use keyword_density::{DensityOptimization, KeywordDensityOptimizer, KeywordDensityReport};
pub use meta_description::{
    MetaAttempt, MetaCorrection, MetaDescriptionCorrector, MetaRetryResult, MetaValidation,
};
pub use scorer::{compliance_score, ValidationResult};
pub use title::{
    ContentVariation, TitleCorrection, TitleEngine, TitleParams, TitleResult,
    TitleUniquenessValidator, UniquenessCheck, VariationParams,
};
