//! Adaptive Rule Store
//!
//! 検出器・補正器が参照する数値しきい値のストア。
//! 更新は単一のマージとして原子的に適用される。

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub const META_MIN_LENGTH: &str = "meta_min_length";
pub const META_MAX_LENGTH: &str = "meta_max_length";
pub const TITLE_MAX_LENGTH: &str = "title_max_length";
pub const KEYWORD_DENSITY_MIN: &str = "keyword_density_min";
pub const KEYWORD_DENSITY_MAX: &str = "keyword_density_max";
pub const KEYWORD_DENSITY_TARGET: &str = "keyword_density_target";
pub const SUBHEADING_KEYWORD_MAX_RATIO: &str = "subheading_keyword_max_ratio";
pub const PASSIVE_VOICE_MAX_RATIO: &str = "passive_voice_max_ratio";
pub const LONG_SENTENCE_WORDS: &str = "long_sentence_words";
pub const LONG_SENTENCE_MAX_RATIO: &str = "long_sentence_max_ratio";
pub const TRANSITION_WORD_MIN_RATIO: &str = "transition_word_min_ratio";
pub const ALT_TEXT_MIN_LENGTH: &str = "alt_text_min_length";
pub const ALT_TEXT_MAX_LENGTH: &str = "alt_text_max_length";
pub const ERROR_FREQUENCY_THRESHOLD: &str = "error_frequency_threshold";

const DEFAULT_RULES: &[(&str, f64)] = &[
    (META_MIN_LENGTH, 120.0),
    (META_MAX_LENGTH, 156.0),
    (TITLE_MAX_LENGTH, 66.0),
    (KEYWORD_DENSITY_MIN, 0.5),
    (KEYWORD_DENSITY_MAX, 2.5),
    (KEYWORD_DENSITY_TARGET, 1.5),
    (SUBHEADING_KEYWORD_MAX_RATIO, 75.0),
    (PASSIVE_VOICE_MAX_RATIO, 10.0),
    (LONG_SENTENCE_WORDS, 20.0),
    (LONG_SENTENCE_MAX_RATIO, 25.0),
    (TRANSITION_WORD_MIN_RATIO, 30.0),
    (ALT_TEXT_MIN_LENGTH, 10.0),
    (ALT_TEXT_MAX_LENGTH, 125.0),
    (ERROR_FREQUENCY_THRESHOLD, 10.0),
];

/// 適応ルール（名前付きの数値しきい値）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdaptiveRules(BTreeMap<String, f64>);

impl Default for AdaptiveRules {
    fn default() -> Self {
        Self(
            DEFAULT_RULES
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
        )
    }
}

impl AdaptiveRules {
    /// 値を取得
    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    /// 値を取得（存在しない場合はデフォルト）
    pub fn get_or(&self, key: &str, default: f64) -> f64 {
        self.get(key).unwrap_or(default)
    }

    /// すべてのルール
    pub fn as_map(&self) -> &BTreeMap<String, f64> {
        &self.0
    }

    /// 更新をマージ（数値でない値はキー単位で拒否）
    pub fn merge(&mut self, updates: &BTreeMap<String, Value>) -> RuleUpdateReport {
        let mut report = RuleUpdateReport::default();
        for (key, value) in updates {
            match value.as_f64() {
                Some(number) if number.is_finite() && !key.trim().is_empty() => {
                    self.0.insert(key.clone(), number);
                    report.applied.push(key.clone());
                }
                Some(_) => {
                    report
                        .rejected
                        .insert(key.clone(), "value must be finite with a non-empty key".to_string());
                }
                None => {
                    report
                        .rejected
                        .insert(key.clone(), format!("non-numeric value: {}", value));
                }
            }
        }
        report
    }
}

/// ルール更新の結果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleUpdateReport {
    /// 適用されたキー
    pub applied: Vec<String>,
    /// 拒否されたキーと理由
    pub rejected: BTreeMap<String, String>,
}

/// 1回の実行で使用するしきい値のスナップショット
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    pub meta_min_length: usize,
    pub meta_max_length: usize,
    pub title_max_length: usize,
    pub keyword_density_min: f64,
    pub keyword_density_max: f64,
    pub keyword_density_target: f64,
    pub subheading_keyword_max_ratio: f64,
    pub passive_voice_max_ratio: f64,
    pub long_sentence_words: usize,
    pub long_sentence_max_ratio: f64,
    pub transition_word_min_ratio: f64,
    pub alt_text_min_length: usize,
    pub alt_text_max_length: usize,
    pub error_frequency_threshold: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::from_rules(&AdaptiveRules::default())
    }
}

impl Thresholds {
    /// ルールからしきい値を構築
    ///
    /// 範囲が逆転しているペアはデフォルト値に戻す。
    pub fn from_rules(rules: &AdaptiveRules) -> Self {
        let defaults = AdaptiveRules::default();
        let value = |key: &str| {
            rules
                .get(key)
                .filter(|v| v.is_finite() && *v >= 0.0)
                .unwrap_or_else(|| defaults.get_or(key, 0.0))
        };
        let pair = |min_key: &str, max_key: &str| {
            let (min, max) = (value(min_key), value(max_key));
            if min < max {
                (min, max)
            } else {
                warn!(
                    "Adaptive rules {}={} / {}={} are inverted, using defaults",
                    min_key, min, max_key, max
                );
                (defaults.get_or(min_key, 0.0), defaults.get_or(max_key, 0.0))
            }
        };

        let (meta_min, meta_max) = pair(META_MIN_LENGTH, META_MAX_LENGTH);
        let (density_min, density_max) = pair(KEYWORD_DENSITY_MIN, KEYWORD_DENSITY_MAX);
        let (alt_min, alt_max) = pair(ALT_TEXT_MIN_LENGTH, ALT_TEXT_MAX_LENGTH);
        let target = value(KEYWORD_DENSITY_TARGET).clamp(density_min, density_max);

        Self {
            meta_min_length: meta_min as usize,
            meta_max_length: meta_max as usize,
            title_max_length: value(TITLE_MAX_LENGTH) as usize,
            keyword_density_min: density_min,
            keyword_density_max: density_max,
            keyword_density_target: target,
            subheading_keyword_max_ratio: value(SUBHEADING_KEYWORD_MAX_RATIO),
            passive_voice_max_ratio: value(PASSIVE_VOICE_MAX_RATIO),
            long_sentence_words: (value(LONG_SENTENCE_WORDS) as usize).max(1),
            long_sentence_max_ratio: value(LONG_SENTENCE_MAX_RATIO),
            transition_word_min_ratio: value(TRANSITION_WORD_MIN_RATIO),
            alt_text_min_length: alt_min as usize,
            alt_text_max_length: alt_max as usize,
            error_frequency_threshold: (value(ERROR_FREQUENCY_THRESHOLD) as u64).max(1),
        }
    }
}

/// ルールストアトレイト
pub trait RuleStore: Send + Sync {
    /// 現在のルールのスナップショット
    fn snapshot(&self) -> Result<AdaptiveRules>;

    /// 更新を原子的にマージして永続化
    fn merge(&self, updates: &BTreeMap<String, Value>) -> Result<RuleUpdateReport>;
}

/// メモリ内ルールストア（テスト用）
#[derive(Debug, Default)]
pub struct InMemoryRuleStore {
    rules: RwLock<AdaptiveRules>,
}

impl InMemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 初期ルールを指定して作成
    pub fn with_rules(rules: AdaptiveRules) -> Self {
        Self {
            rules: RwLock::new(rules),
        }
    }
}

impl RuleStore for InMemoryRuleStore {
    fn snapshot(&self) -> Result<AdaptiveRules> {
        Ok(self.rules.read()?.clone())
    }

    fn merge(&self, updates: &BTreeMap<String, Value>) -> Result<RuleUpdateReport> {
        let mut rules = self.rules.write()?;
        Ok(rules.merge(updates))
    }
}

/// JSONファイルで永続化するルールストア
#[derive(Debug)]
pub struct FileRuleStore {
    path: PathBuf,
    rules: RwLock<AdaptiveRules>,
}

impl FileRuleStore {
    /// ファイルを開く（存在しない場合はデフォルトで開始）
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let mut rules = AdaptiveRules::default();

        if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if !raw.trim().is_empty() {
                let stored: BTreeMap<String, Value> = serde_json::from_str(&raw)?;
                let report = rules.merge(&stored);
                if !report.rejected.is_empty() {
                    warn!(
                        "Ignored {} invalid rule(s) in {}",
                        report.rejected.len(),
                        path.display()
                    );
                }
            }
            debug!("Loaded adaptive rules from {}", path.display());
        }

        Ok(Self {
            path,
            rules: RwLock::new(rules),
        })
    }

    /// 永続化先のパス
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, rules: &AdaptiveRules) -> Result<()> {
        write_json_atomic(&self.path, rules)
    }
}

impl RuleStore for FileRuleStore {
    fn snapshot(&self) -> Result<AdaptiveRules> {
        Ok(self.rules.read()?.clone())
    }

    fn merge(&self, updates: &BTreeMap<String, Value>) -> Result<RuleUpdateReport> {
        let mut rules = self.rules.write()?;
        let mut next = rules.clone();
        let report = next.merge(updates);
        if !report.applied.is_empty() {
            self.persist(&next)?;
            *rules = next;
            info!(
                "Adaptive rules updated ({} applied, {} rejected)",
                report.applied.len(),
                report.rejected.len()
            );
        }
        Ok(report)
    }
}

/// 一時ファイルに書いてからリネームする
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    // 同時に書き込む場合も一時ファイルは衝突しない
    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, value)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| Error::RuleStore(format!("{}: {}", path.display(), e.error)))?;
    Ok(())
}
