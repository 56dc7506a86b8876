//! Content Types
//!
//! 記事レコードと検出された問題（Issue）の型定義

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// コンテンツタイプ
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// ハウツー記事
    HowTo,
    /// リスト記事
    Listicle,
    /// 比較記事
    Comparison,
    /// レビュー
    Review,
    /// ガイド
    Guide,
    /// チュートリアル
    Tutorial,
    /// ニュース
    News,
    /// ケーススタディ
    CaseStudy,
    /// 一般記事
    #[default]
    Article,
}

impl ContentType {
    /// すべてのコンテンツタイプ
    pub const ALL: [ContentType; 9] = [
        ContentType::HowTo,
        ContentType::Listicle,
        ContentType::Comparison,
        ContentType::Review,
        ContentType::Guide,
        ContentType::Tutorial,
        ContentType::News,
        ContentType::CaseStudy,
        ContentType::Article,
    ];

    /// タイプ名を取得
    pub fn name(&self) -> &'static str {
        match self {
            ContentType::HowTo => "how_to",
            ContentType::Listicle => "listicle",
            ContentType::Comparison => "comparison",
            ContentType::Review => "review",
            ContentType::Guide => "guide",
            ContentType::Tutorial => "tutorial",
            ContentType::News => "news",
            ContentType::CaseStudy => "case_study",
            ContentType::Article => "article",
        }
    }

    /// 名前からタイプを解析（不明な場合は Article）
    pub fn parse(name: &str) -> Self {
        let normalized = name.trim().to_lowercase().replace(['-', ' '], "_");
        ContentType::ALL
            .iter()
            .copied()
            .find(|t| t.name() == normalized)
            .unwrap_or_default()
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 画像アセット（上流の画像生成器が描画するプロンプトと代替テキスト）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImageAsset {
    /// 画像生成プロンプト
    pub prompt: String,
    /// 代替テキスト
    pub alt_text: String,
}

/// 記事レコード
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    /// タイトル
    #[serde(default)]
    pub title: String,
    /// 本文（Markdown または HTML 行）
    #[serde(default, alias = "content")]
    pub body: String,
    /// 抜粋
    #[serde(default)]
    pub excerpt: String,
    /// メタディスクリプション
    #[serde(default)]
    pub meta_description: String,
    /// コンテンツタイプ
    #[serde(default, alias = "type")]
    pub content_type: ContentType,
    /// アイキャッチ画像
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<ImageAsset>,
}

impl ContentRecord {
    /// 新規レコードを作成
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            ..Default::default()
        }
    }

    /// 抜粋を設定
    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.excerpt = excerpt.into();
        self
    }

    /// メタディスクリプションを設定
    pub fn with_meta_description(mut self, meta: impl Into<String>) -> Self {
        self.meta_description = meta.into();
        self
    }

    /// コンテンツタイプを設定
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    /// アイキャッチ画像を設定
    pub fn with_featured_image(mut self, image: ImageAsset) -> Self {
        self.featured_image = Some(image);
        self
    }
}

/// 問題の重要度
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// 致命的
    Critical,
    /// 重大
    Major,
    /// 軽微
    Minor,
}

impl Severity {
    pub fn name(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Major => "major",
            Severity::Minor => "minor",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 問題の種類
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    MetaDescriptionMissing,
    MetaDescriptionLength,
    MetaDescriptionKeyword,
    TitleMissing,
    TitleLength,
    TitleKeyword,
    BodyMissing,
    KeywordDensity,
    SubheadingOveroptimization,
    PassiveVoice,
    SentenceLength,
    TransitionWords,
    ImageMissing,
    AltText,
}

impl IssueType {
    /// 問題を担当するコンポーネント名
    pub fn component(&self) -> &'static str {
        match self {
            IssueType::MetaDescriptionMissing
            | IssueType::MetaDescriptionLength
            | IssueType::MetaDescriptionKeyword => "meta_description",
            IssueType::TitleMissing | IssueType::TitleLength | IssueType::TitleKeyword => "title",
            IssueType::BodyMissing => "body",
            IssueType::KeywordDensity | IssueType::SubheadingOveroptimization => {
                "keyword_density"
            }
            IssueType::PassiveVoice | IssueType::SentenceLength | IssueType::TransitionWords => {
                "readability"
            }
            IssueType::ImageMissing | IssueType::AltText => "image",
        }
    }

    /// 手動オーバーライド用の安定したシグネチャ
    pub fn signature(&self) -> &'static str {
        match self {
            IssueType::MetaDescriptionMissing => "meta_description_missing",
            IssueType::MetaDescriptionLength => "meta_description_length",
            IssueType::MetaDescriptionKeyword => "meta_description_keyword",
            IssueType::TitleMissing => "title_missing",
            IssueType::TitleLength => "title_length",
            IssueType::TitleKeyword => "title_keyword",
            IssueType::BodyMissing => "body_missing",
            IssueType::KeywordDensity => "keyword_density",
            IssueType::SubheadingOveroptimization => "subheading_overoptimization",
            IssueType::PassiveVoice => "passive_voice",
            IssueType::SentenceLength => "sentence_length",
            IssueType::TransitionWords => "transition_words",
            IssueType::ImageMissing => "image_missing",
            IssueType::AltText => "alt_text",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.signature())
    }
}

/// 検出された問題
///
/// 検出器のみが生成し、生成後は変更されない。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// 種類
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    /// 重要度
    pub severity: Severity,
    /// メッセージ
    pub message: String,
    /// 数値の詳細（例: `{needed: 200}`）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantification: Option<BTreeMap<String, f64>>,
}

impl Issue {
    pub(crate) fn new(issue_type: IssueType, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            issue_type,
            severity,
            message: message.into(),
            quantification: None,
        }
    }

    pub(crate) fn quantify(mut self, key: &str, value: f64) -> Self {
        self.quantification
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), value);
        self
    }

    /// コンポーネント名
    pub fn component(&self) -> &'static str {
        self.issue_type.component()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_parse() {
        assert_eq!(ContentType::parse("how-to"), ContentType::HowTo);
        assert_eq!(ContentType::parse("Case Study"), ContentType::CaseStudy);
        assert_eq!(ContentType::parse("unknown"), ContentType::Article);
    }

    #[test]
    fn test_content_record_deserialize_aliases() {
        let json = r#"{"title":"T","content":"Body","metaDescription":"M","type":"listicle"}"#;
        let record: ContentRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.body, "Body");
        assert_eq!(record.meta_description, "M");
        assert_eq!(record.content_type, ContentType::Listicle);
        assert!(record.excerpt.is_empty());
    }

    #[test]
    fn test_issue_quantification() {
        let issue = Issue::new(IssueType::BodyMissing, Severity::Critical, "empty")
            .quantify("needed", 200.0);
        assert_eq!(issue.quantification.unwrap()["needed"], 200.0);
        assert_eq!(issue.issue_type.component(), "body");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical < Severity::Major);
        assert!(Severity::Major < Severity::Minor);
    }
}
