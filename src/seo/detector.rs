//! Issue Detector
//!
//! 記事レコードに対して SEO・可読性・画像のルールを評価し、問題を重要度付きで列挙する。

use super::keyword_density::{report, KeywordDensityOptimizer};
use crate::adaptive::Thresholds;
use crate::content::text::char_len;
use crate::content::{ContentRecord, Document, Issue, IssueType, KeywordMatcher, Severity};
use crate::media::{extract_images, AltTextAccessibilityOptimizer};
use crate::readability::{ReadabilityCorrector, ReadabilityOptions};
use tracing::debug;

/// 問題検出器
#[derive(Debug, Clone, Default)]
pub struct IssueDetector {
    thresholds: Thresholds,
}

impl IssueDetector {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// 問題を検出（critical → major → minor の順）
    ///
    /// 空の入力でも失敗せず、空の各フィールドは critical として報告する。
    pub fn detect(&self, content: &ContentRecord, keyword: &str, synonyms: &[String]) -> Vec<Issue> {
        let matcher = KeywordMatcher::new(keyword, synonyms);
        let title_matcher = KeywordMatcher::new(keyword, &[]);
        let mut issues = Vec::new();

        self.check_meta_description(content, &matcher, &mut issues);
        self.check_title(content, &title_matcher, &mut issues);
        if content.body.trim().is_empty() {
            issues.push(Issue::new(IssueType::BodyMissing, Severity::Critical, "Content body is empty"));
        } else {
            self.check_body(content, &matcher, &mut issues);
        }
        self.check_images(content, keyword, synonyms, &mut issues);

        issues.sort_by_key(|i| i.severity);
        debug!("Detected {} issues", issues.len());
        issues
    }

    fn check_meta_description(&self, content: &ContentRecord, matcher: &KeywordMatcher, issues: &mut Vec<Issue>) {
        let meta = content.meta_description.trim();
        if meta.is_empty() {
            issues.push(Issue::new(
                IssueType::MetaDescriptionMissing,
                Severity::Critical,
                "Meta description is missing",
            ));
            return;
        }

        let (min, max) = (self.thresholds.meta_min_length, self.thresholds.meta_max_length);
        let length = char_len(meta);
        if length < min || length > max {
            issues.push(
                Issue::new(
                    IssueType::MetaDescriptionLength,
                    Severity::Major,
                    format!("Meta description is {} characters (expected {}-{})", length, min, max),
                )
                .quantify("length", length as f64)
                .quantify("min", min as f64)
                .quantify("max", max as f64),
            );
        }
        if !matcher.is_empty() && !matcher.contains(meta) {
            issues.push(Issue::new(
                IssueType::MetaDescriptionKeyword,
                Severity::Major,
                "Meta description does not contain the focus keyword",
            ));
        }
    }

    fn check_title(&self, content: &ContentRecord, matcher: &KeywordMatcher, issues: &mut Vec<Issue>) {
        let title = content.title.trim();
        if title.is_empty() {
            issues.push(Issue::new(IssueType::TitleMissing, Severity::Critical, "Title is missing"));
            return;
        }

        let length = char_len(title);
        let max = self.thresholds.title_max_length;
        if length > max {
            issues.push(
                Issue::new(
                    IssueType::TitleLength,
                    Severity::Major,
                    format!("Title is {} characters (max {})", length, max),
                )
                .quantify("length", length as f64)
                .quantify("max", max as f64),
            );
        }
        if !matcher.is_empty() && !matcher.contains(title) {
            issues.push(Issue::new(
                IssueType::TitleKeyword,
                Severity::Critical,
                "Title does not contain the focus keyword",
            ));
        }
    }

    fn check_body(&self, content: &ContentRecord, matcher: &KeywordMatcher, issues: &mut Vec<Issue>) {
        let t = &self.thresholds;
        let doc = Document::parse(&content.body);

        if !matcher.is_empty() {
            let density = report(&doc, matcher);
            let optimizer = KeywordDensityOptimizer::from_thresholds(t);
            if !optimizer.density_in_range(density.density) {
                let needed = (t.keyword_density_target / 100.0 * density.body_words as f64).round()
                    - density.occurrences as f64;
                issues.push(
                    Issue::new(
                        IssueType::KeywordDensity,
                        Severity::Major,
                        format!(
                            "Keyword density is {:.2}% (expected {}-{}%)",
                            density.density, t.keyword_density_min, t.keyword_density_max
                        ),
                    )
                    .quantify("density", density.density)
                    .quantify("occurrences", density.occurrences as f64)
                    .quantify("needed", needed),
                );
            }
            if !optimizer.subheading_ratio_ok(&density) {
                issues.push(
                    Issue::new(
                        IssueType::SubheadingOveroptimization,
                        Severity::Major,
                        format!(
                            "{:.0}% of subheadings contain the focus keyword (max {}%)",
                            density.subheading_ratio, t.subheading_keyword_max_ratio
                        ),
                    )
                    .quantify("ratio", density.subheading_ratio),
                );
            }
        }

        let analysis = ReadabilityCorrector::new(ReadabilityOptions::from_thresholds(t)).analyze(&content.body);
        if !analysis.passive_voice.compliant {
            issues.push(
                Issue::new(
                    IssueType::PassiveVoice,
                    Severity::Major,
                    format!(
                        "{:.1}% of sentences use passive voice (max {}%)",
                        analysis.passive_voice.ratio, t.passive_voice_max_ratio
                    ),
                )
                .quantify("ratio", analysis.passive_voice.ratio),
            );
        }
        if !analysis.sentence_length.compliant {
            issues.push(
                Issue::new(
                    IssueType::SentenceLength,
                    Severity::Major,
                    format!(
                        "{:.1}% of sentences exceed {} words (max {}%)",
                        analysis.sentence_length.ratio, t.long_sentence_words, t.long_sentence_max_ratio
                    ),
                )
                .quantify("ratio", analysis.sentence_length.ratio),
            );
        }
        if !analysis.transition_words.compliant {
            issues.push(
                Issue::new(
                    IssueType::TransitionWords,
                    Severity::Minor,
                    format!(
                        "{:.1}% of sentences use transition words (min {}%)",
                        analysis.transition_words.ratio, t.transition_word_min_ratio
                    ),
                )
                .quantify("ratio", analysis.transition_words.ratio),
            );
        }
    }

    fn check_images(&self, content: &ContentRecord, keyword: &str, synonyms: &[String], issues: &mut Vec<Issue>) {
        let images = extract_images(&content.body);
        if images.is_empty() && content.featured_image.is_none() {
            issues.push(Issue::new(IssueType::ImageMissing, Severity::Major, "Content has no image"));
            return;
        }

        let alt_text = AltTextAccessibilityOptimizer::from_thresholds(&self.thresholds);
        let alts = images
            .iter()
            .map(|i| (i.source.as_str(), i.alt.as_deref().unwrap_or("")))
            .chain(
                content
                    .featured_image
                    .iter()
                    .map(|f| ("featured image", f.alt_text.as_str())),
            );
        for (source, alt) in alts {
            let validation = alt_text.validate(alt, keyword, synonyms);
            if !validation.valid {
                issues.push(
                    Issue::new(
                        IssueType::AltText,
                        Severity::Major,
                        format!("Alt text for {}: {}", source, validation.issues.join("; ")),
                    )
                    .quantify("length", validation.length as f64),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ImageAsset;
    use crate::seo::scorer::ValidationResult;

    fn types(issues: &[Issue]) -> Vec<IssueType> {
        issues.iter().map(|i| i.issue_type).collect()
    }

    #[test]
    fn test_empty_content_yields_critical_issues() {
        let issues = IssueDetector::default().detect(&ContentRecord::default(), "rust", &[]);
        let found = types(&issues);
        assert!(found.contains(&IssueType::MetaDescriptionMissing));
        assert!(found.contains(&IssueType::TitleMissing));
        assert!(found.contains(&IssueType::BodyMissing));
        assert!(found.contains(&IssueType::ImageMissing));
        assert!(!found.contains(&IssueType::KeywordDensity));
        assert_eq!(issues[0].severity, Severity::Critical);
        assert_eq!(ValidationResult::from_issues(issues).overall_score, 35.0);
    }

    #[test]
    fn test_title_and_meta_rules() {
        let content = ContentRecord::new(
            "A title that is far too long to be displayed fully in any search engine result page",
            "Body text.",
        )
        .with_meta_description("Short.");
        let issues = IssueDetector::default().detect(&content, "rust", &[]);
        let found = types(&issues);
        assert!(found.contains(&IssueType::TitleLength));
        assert!(found.contains(&IssueType::TitleKeyword));
        assert!(found.contains(&IssueType::MetaDescriptionLength));
        assert!(found.contains(&IssueType::MetaDescriptionKeyword));
    }

    #[test]
    fn test_alt_text_rules() {
        let body = "Rust is great.\n<img src=\"crab.png\" alt=\"photo of crab.png\">";
        let content = ContentRecord::new("Rust", body);
        let issues = IssueDetector::default().detect(&content, "rust", &[]);
        let alt_issues: Vec<&Issue> = issues.iter().filter(|i| i.issue_type == IssueType::AltText).collect();
        assert_eq!(alt_issues.len(), 1);
        assert!(!types(&issues).contains(&IssueType::ImageMissing));

        let featured = ContentRecord::new("Rust", "Rust is great.").with_featured_image(ImageAsset {
            prompt: "A crab".to_string(),
            alt_text: "Rust crab mascot on a desk".to_string(),
        });
        let issues = IssueDetector::default().detect(&featured, "rust", &[]);
        let found = types(&issues);
        assert!(!found.contains(&IssueType::ImageMissing));
        assert!(!found.contains(&IssueType::AltText));
    }

    #[test]
    fn test_issues_are_ordered_by_severity() {
        let content = ContentRecord::new("", "The plan was made. The code was written. It works.");
        let issues = IssueDetector::default().detect(&content, "rust", &[]);
        for pair in issues.windows(2) {
            assert!(pair[0].severity <= pair[1].severity);
        }
        assert!(types(&issues).contains(&IssueType::PassiveVoice));
        assert_eq!(issues.last().map(|i| i.severity), Some(Severity::Minor));
    }
}
