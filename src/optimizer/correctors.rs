//! Issue Correctors
//!
//! 問題の種類ごとの修正器。ループマネージャーは現在の重要度の問題を
//! 担当する修正器だけを呼び出す。

use crate::adaptive::Thresholds;
use crate::content::scaffold::scaffold_body;
use crate::content::{ContentRecord, Issue, IssueType};
use crate::error::{Error, Result};
use crate::media::{AltTextAccessibilityOptimizer, ImagePromptGenerator};
use crate::readability::{ReadabilityCorrector, ReadabilityOptions};
use crate::seo::{KeywordDensityOptimizer, MetaDescriptionCorrector, TitleEngine, TitleUniquenessValidator};
use std::sync::Mutex;
use tracing::debug;

/// メタディスクリプション修正の最大試行回数
const META_MAX_ATTEMPTS: usize = 3;

/// 1回の修正で可読性修正器に許すパス数
const READABILITY_PASSES: usize = 3;

/// 修正リクエスト
#[derive(Debug, Clone, Copy)]
pub struct CorrectionRequest<'a> {
    /// この修正器が担当する、現在の重要度の問題
    pub issues: &'a [Issue],
    pub keyword: &'a str,
    pub synonyms: &'a [String],
    pub thresholds: &'a Thresholds,
}

impl CorrectionRequest<'_> {
    fn has(&self, issue_type: IssueType) -> bool {
        self.issues.iter().any(|i| i.issue_type == issue_type)
    }
}

/// 修正結果（常に完全なレコード）
#[derive(Debug, Clone, PartialEq)]
pub struct Correction {
    pub content: ContentRecord,
    pub changes: Vec<String>,
}

impl Correction {
    fn unchanged(content: &ContentRecord) -> Self {
        Self {
            content: content.clone(),
            changes: Vec::new(),
        }
    }
}

/// 修正器トレイト
pub trait Corrector: Send + Sync {
    /// ログに使うコンポーネント名
    fn name(&self) -> &'static str;

    /// この問題の種類を担当するか
    fn handles(&self, issue_type: IssueType) -> bool;

    /// 修正済みのレコードを返す（入力は変更しない）
    fn correct(&self, content: &ContentRecord, request: &CorrectionRequest<'_>) -> Result<Correction>;
}

/// 標準の修正器一式（適用順）
pub fn default_correctors() -> Vec<Box<dyn Corrector>> {
    vec![
        Box::new(BodyScaffoldCorrector),
        Box::new(TitleCorrector::default()),
        Box::new(MetaDescriptionFix),
        Box::new(KeywordDensityFix),
        Box::new(ReadabilityFix),
        Box::new(ImageFix),
    ]
}

/// 空の本文をスキャフォールドで置き換える
#[derive(Debug, Default)]
pub struct BodyScaffoldCorrector;

impl Corrector for BodyScaffoldCorrector {
    fn name(&self) -> &'static str {
        "body"
    }

    fn handles(&self, issue_type: IssueType) -> bool {
        issue_type == IssueType::BodyMissing
    }

    fn correct(&self, content: &ContentRecord, request: &CorrectionRequest<'_>) -> Result<Correction> {
        if !content.body.trim().is_empty() {
            return Ok(Correction::unchanged(content));
        }
        let mut next = content.clone();
        next.body = scaffold_body(request.keyword);
        Ok(Correction {
            content: next,
            changes: vec!["Generated body scaffold".to_string()],
        })
    }
}

/// タイトル修正（バッチ全体で一意性を保つ）
#[derive(Debug, Default)]
pub struct TitleCorrector {
    validator: Mutex<TitleUniquenessValidator>,
}

impl TitleCorrector {
    /// 既存タイトルを登録して作成
    pub fn with_validator(validator: TitleUniquenessValidator) -> Self {
        Self {
            validator: Mutex::new(validator),
        }
    }
}

impl Corrector for TitleCorrector {
    fn name(&self) -> &'static str {
        "title"
    }

    fn handles(&self, issue_type: IssueType) -> bool {
        matches!(
            issue_type,
            IssueType::TitleMissing | IssueType::TitleLength | IssueType::TitleKeyword
        )
    }

    fn correct(&self, content: &ContentRecord, request: &CorrectionRequest<'_>) -> Result<Correction> {
        let mut validator = self.validator.lock()?;
        let mut engine = TitleEngine::from_thresholds(request.thresholds).with_validator(validator.clone());
        let corrected = engine.correct_title(&content.title, request.keyword, content.content_type);
        *validator = engine.validator().clone();

        if !corrected.changed {
            return Ok(Correction::unchanged(content));
        }
        if corrected.title.trim().is_empty() {
            return Err(Error::corrector(self.name(), "title engine returned an empty title"));
        }
        let mut next = content.clone();
        next.title = corrected.title;
        Ok(Correction {
            content: next,
            changes: corrected.reason.into_iter().collect(),
        })
    }
}

/// メタディスクリプション修正（リトライ＋フォールバック）
#[derive(Debug, Default)]
pub struct MetaDescriptionFix;

impl Corrector for MetaDescriptionFix {
    fn name(&self) -> &'static str {
        "meta_description"
    }

    fn handles(&self, issue_type: IssueType) -> bool {
        matches!(
            issue_type,
            IssueType::MetaDescriptionMissing
                | IssueType::MetaDescriptionLength
                | IssueType::MetaDescriptionKeyword
        )
    }

    fn correct(&self, content: &ContentRecord, request: &CorrectionRequest<'_>) -> Result<Correction> {
        let corrector = MetaDescriptionCorrector::from_thresholds(request.thresholds);
        let result = corrector.correct_with_retry(
            &content.meta_description,
            request.keyword,
            request.synonyms,
            META_MAX_ATTEMPTS,
        );
        let validation = corrector.validate(&result.meta_description, request.keyword, request.synonyms);
        if !validation.valid {
            return Err(Error::corrector(
                self.name(),
                format!("corrected description is invalid: {}", validation.issues.join("; ")),
            ));
        }

        let mut next = content.clone();
        next.meta_description = result.meta_description;
        let change = if result.used_fallback {
            "Replaced meta description with fallback template".to_string()
        } else {
            format!("Corrected meta description in {} attempt(s)", result.attempts)
        };
        Ok(Correction {
            content: next,
            changes: vec![change],
        })
    }
}

/// 本文と見出しのキーワード密度修正
#[derive(Debug, Default)]
pub struct KeywordDensityFix;

impl Corrector for KeywordDensityFix {
    fn name(&self) -> &'static str {
        "keyword_density"
    }

    fn handles(&self, issue_type: IssueType) -> bool {
        matches!(
            issue_type,
            IssueType::KeywordDensity | IssueType::SubheadingOveroptimization
        )
    }

    fn correct(&self, content: &ContentRecord, request: &CorrectionRequest<'_>) -> Result<Correction> {
        let optimizer = KeywordDensityOptimizer::from_thresholds(request.thresholds);
        let mut body = content.body.clone();
        let mut changes = Vec::new();

        if request.has(IssueType::SubheadingOveroptimization) {
            let result = optimizer.optimize_subheadings(&body, request.keyword, request.synonyms);
            if result.optimized {
                body = result.content;
                changes.extend(result.changes_made);
            }
        }
        if request.has(IssueType::KeywordDensity) {
            let result = optimizer.optimize_density(
                &body,
                request.keyword,
                request.synonyms,
                request.thresholds.keyword_density_target,
            );
            if result.optimized {
                body = result.content;
                changes.extend(result.changes_made);
            }
        }

        let mut next = content.clone();
        next.body = body;
        Ok(Correction { content: next, changes })
    }
}

/// 可読性修正
#[derive(Debug, Default)]
pub struct ReadabilityFix;

impl Corrector for ReadabilityFix {
    fn name(&self) -> &'static str {
        "readability"
    }

    fn handles(&self, issue_type: IssueType) -> bool {
        matches!(
            issue_type,
            IssueType::PassiveVoice | IssueType::SentenceLength | IssueType::TransitionWords
        )
    }

    fn correct(&self, content: &ContentRecord, request: &CorrectionRequest<'_>) -> Result<Correction> {
        let corrector = ReadabilityCorrector::new(ReadabilityOptions::from_thresholds(request.thresholds));
        let result = corrector.correct_readability(&content.body, READABILITY_PASSES);
        debug!(
            "Readability correction ran {} pass(es), compliant={}",
            result.iterations,
            result.final_analysis.compliant()
        );

        let changes: Vec<String> = result.changes_made.into_values().flatten().collect();
        let mut next = content.clone();
        next.body = result.corrected_content;
        Ok(Correction { content: next, changes })
    }
}

/// 画像と代替テキストの修正
#[derive(Debug, Default)]
pub struct ImageFix;

impl Corrector for ImageFix {
    fn name(&self) -> &'static str {
        "image"
    }

    fn handles(&self, issue_type: IssueType) -> bool {
        matches!(issue_type, IssueType::ImageMissing | IssueType::AltText)
    }

    fn correct(&self, content: &ContentRecord, request: &CorrectionRequest<'_>) -> Result<Correction> {
        let alt_text = AltTextAccessibilityOptimizer::from_thresholds(request.thresholds);
        let mut next = content.clone();
        let mut changes = Vec::new();

        if request.has(IssueType::ImageMissing) && next.featured_image.is_none() {
            let topic = if next.title.trim().is_empty() {
                request.keyword
            } else {
                next.title.as_str()
            };
            let prompt = ImagePromptGenerator::new(alt_text.clone()).generate_image_prompt(
                topic,
                request.keyword,
                request.synonyms,
            );
            changes.push(format!("Planned featured image: {}", prompt.alt_text));
            next.featured_image = Some(prompt.to_asset());
        }

        if request.has(IssueType::AltText) {
            let (body, body_changes) = alt_text.rewrite_body_alt_texts(&next.body, request.keyword, request.synonyms);
            next.body = body;
            changes.extend(body_changes);

            if let Some(image) = next.featured_image.as_mut() {
                if !alt_text.validate(&image.alt_text, request.keyword, request.synonyms).valid {
                    let optimized = alt_text.optimize_alt_text(&image.alt_text, request.keyword, request.synonyms);
                    changes.push(format!("Rewrote featured image alt text: {}", optimized.optimized));
                    image.alt_text = optimized.optimized;
                }
            }
        }

        Ok(Correction { content: next, changes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seo::IssueDetector;

    fn request<'a>(issues: &'a [Issue], thresholds: &'a Thresholds) -> CorrectionRequest<'a> {
        CorrectionRequest {
            issues,
            keyword: "rust",
            synonyms: &[],
            thresholds,
        }
    }

    fn issues_of(content: &ContentRecord, issue_type: IssueType) -> Vec<Issue> {
        IssueDetector::default()
            .detect(content, "rust", &[])
            .into_iter()
            .filter(|i| i.issue_type == issue_type)
            .collect()
    }

    #[test]
    fn test_body_scaffold_fills_empty_body() {
        let thresholds = Thresholds::default();
        let content = ContentRecord::default();
        let issues = issues_of(&content, IssueType::BodyMissing);
        let correction = BodyScaffoldCorrector.correct(&content, &request(&issues, &thresholds)).unwrap();
        assert!(correction.content.body.contains("rust"));
        assert_eq!(correction.changes.len(), 1);
        assert!(content.body.is_empty());
    }

    #[test]
    fn test_meta_description_fix_is_valid() {
        let thresholds = Thresholds::default();
        let content = ContentRecord::default();
        let issues = issues_of(&content, IssueType::MetaDescriptionMissing);
        let correction = MetaDescriptionFix.correct(&content, &request(&issues, &thresholds)).unwrap();
        let validation = MetaDescriptionCorrector::default().validate(&correction.content.meta_description, "rust", &[]);
        assert!(validation.valid, "{:?}", validation.issues);
    }

    #[test]
    fn test_title_corrector_keeps_batch_unique() {
        let thresholds = Thresholds::default();
        let corrector = TitleCorrector::default();
        let content = ContentRecord::default();
        let issues = issues_of(&content, IssueType::TitleMissing);

        let first = corrector.correct(&content, &request(&issues, &thresholds)).unwrap();
        let second = corrector.correct(&content, &request(&issues, &thresholds)).unwrap();
        assert!(first.content.title.to_lowercase().contains("rust"));
        assert_ne!(first.content.title, second.content.title);
    }

    #[test]
    fn test_image_fix_plans_featured_image() {
        let thresholds = Thresholds::default();
        let content = ContentRecord::new("Rust Ownership Explained", "Rust is a language.");
        let issues = issues_of(&content, IssueType::ImageMissing);
        assert_eq!(issues.len(), 1);

        let correction = ImageFix.correct(&content, &request(&issues, &thresholds)).unwrap();
        let image = correction.content.featured_image.unwrap();
        assert!(image.prompt.contains("Rust Ownership Explained"));
        assert!(image.alt_text.to_lowercase().contains("rust"));
    }

    #[test]
    fn test_corrector_routing() {
        let correctors = default_correctors();
        let owners: Vec<&str> = [
            IssueType::BodyMissing,
            IssueType::TitleKeyword,
            IssueType::MetaDescriptionLength,
            IssueType::SubheadingOveroptimization,
            IssueType::TransitionWords,
            IssueType::AltText,
        ]
        .iter()
        .map(|t| {
            correctors
                .iter()
                .find(|c| c.handles(*t))
                .map(|c| c.name())
                .unwrap_or("none")
        })
        .collect();
        assert_eq!(
            owners,
            vec!["body", "title", "meta_description", "keyword_density", "readability", "image"]
        );
    }
}
