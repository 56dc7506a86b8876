//! Error Handler
//!
//! 検証失敗の記録、発生統計、適応ルールの提案、手動オーバーライドの管理。
//! ルールストアとログシンクは注入される。

use super::log_sink::{ErrorLogEntry, LogSeverity, LogSink};
use super::rules::{write_json_atomic, AdaptiveRules, RuleStore, RuleUpdateReport, Thresholds};
use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// 手動オーバーライド
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManualOverride {
    pub component: String,
    pub error_signature: String,
    pub skip_validation: bool,
    pub reason: String,
    pub approved_by: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl ManualOverride {
    /// 新規オーバーライドを作成
    pub fn new(
        component: impl Into<String>,
        error_signature: impl Into<String>,
        reason: impl Into<String>,
        approved_by: impl Into<String>,
    ) -> Self {
        Self {
            component: component.into(),
            error_signature: error_signature.into(),
            skip_validation: true,
            reason: reason.into(),
            approved_by: approved_by.into(),
            created_at: Utc::now(),
        }
    }

    /// レジストリのキー
    pub fn key(&self) -> String {
        override_key(&self.component, &self.error_signature)
    }
}

fn override_key(component: &str, signature: &str) -> String {
    format!("{}:{}", component, signature)
}

/// エラー発生統計
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorStats {
    pub component: String,
    pub message: String,
    pub count: u64,
    pub first_occurrence: DateTime<Utc>,
    pub last_occurrence: DateTime<Utc>,
}

/// エクスポート形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl std::str::FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(Error::InvalidInput(format!("unknown export format: {}", other))),
        }
    }
}

/// CSVエクスポートのヘッダー
pub const CSV_HEADER: &str = "Timestamp,Component,Error,Severity,Context,Session ID,User ID";

/// エラーハンドラー
pub struct ErrorHandler {
    sink: Arc<dyn LogSink>,
    rules: Arc<dyn RuleStore>,
    /// (component, message) のハッシュをキーとする統計
    stats: Mutex<HashMap<String, ErrorStats>>,
    overrides: RwLock<HashMap<String, ManualOverride>>,
    stats_path: Option<PathBuf>,
    session_id: String,
    user_id: Option<String>,
}

impl ErrorHandler {
    /// 新規ハンドラーを作成
    pub fn new(sink: Arc<dyn LogSink>, rules: Arc<dyn RuleStore>) -> Self {
        Self {
            sink,
            rules,
            stats: Mutex::new(HashMap::new()),
            overrides: RwLock::new(HashMap::new()),
            stats_path: None,
            session_id: Uuid::new_v4().to_string(),
            user_id: None,
        }
    }

    /// 統計をJSONファイルに永続化（既存の統計を読み込む）
    pub fn with_stats_path<P: Into<PathBuf>>(mut self, path: P) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            if !raw.trim().is_empty() {
                let stored: Vec<ErrorStats> = serde_json::from_str(&raw)?;
                let stats = self.stats.get_mut()?;
                for entry in stored {
                    stats.insert(stat_key(&entry.component, &entry.message), entry);
                }
            }
        }
        self.stats_path = Some(path);
        Ok(self)
    }

    /// ユーザーIDを設定
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// セッションIDを設定
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn make_entry(
        &self,
        component: &str,
        error: &str,
        severity: LogSeverity,
        context: BTreeMap<String, Value>,
    ) -> ErrorLogEntry {
        ErrorLogEntry {
            timestamp: Utc::now(),
            component: component.to_string(),
            error: error.to_string(),
            severity,
            context,
            session_id: self.session_id.clone(),
            user_id: self.user_id.clone(),
        }
    }

    fn append(&self, entry: &ErrorLogEntry) -> Result<()> {
        match entry.severity {
            LogSeverity::Critical | LogSeverity::Error => {
                error!(component = %entry.component, "{}", entry.error)
            }
            LogSeverity::Warning => warn!(component = %entry.component, "{}", entry.error),
            LogSeverity::Info => debug!(component = %entry.component, "{}", entry.error),
        }
        self.sink.append(entry)
    }

    /// 検証失敗を記録
    ///
    /// 同一の (component, message) が頻度しきい値に達した時点で
    /// `adaptive_suggestion` エントリを1件追加する（提案のみで自動適用はしない）。
    pub fn log_validation_failure(
        &self,
        component: &str,
        message: &str,
        context: BTreeMap<String, Value>,
        severity: LogSeverity,
    ) -> Result<ErrorLogEntry> {
        let entry = self.make_entry(component, message, severity, context);
        self.append(&entry)?;

        let count = self.record_occurrence(component, message, entry.timestamp)?;
        let threshold = self.frequency_threshold();
        if count == threshold {
            self.emit_adaptive_suggestion(component, message, count)?;
        }

        Ok(entry)
    }

    fn frequency_threshold(&self) -> u64 {
        match self.rules.snapshot() {
            Ok(rules) => Thresholds::from_rules(&rules).error_frequency_threshold,
            Err(e) => {
                warn!("Rule store unavailable, using default threshold: {}", e);
                Thresholds::default().error_frequency_threshold
            }
        }
    }

    fn record_occurrence(&self, component: &str, message: &str, at: DateTime<Utc>) -> Result<u64> {
        let mut stats = self.stats.lock()?;
        let entry = stats
            .entry(stat_key(component, message))
            .or_insert_with(|| ErrorStats {
                component: component.to_string(),
                message: message.to_string(),
                count: 0,
                first_occurrence: at,
                last_occurrence: at,
            });
        entry.count += 1;
        entry.last_occurrence = at;
        let count = entry.count;

        // 古いスナップショットで上書きしないよう、ロックを保持したまま書き込む
        if let Some(path) = &self.stats_path {
            let snapshot: Vec<&ErrorStats> = stats.values().collect();
            write_json_atomic(path, &snapshot)?;
        }
        Ok(count)
    }

    fn emit_adaptive_suggestion(&self, component: &str, message: &str, count: u64) -> Result<()> {
        let suggestion = suggest_rule_change(component);
        info!(
            "💡 Recurring failure in {} ({} occurrences): {}",
            component, count, suggestion
        );
        let mut context = BTreeMap::new();
        context.insert("sourceComponent".to_string(), json!(component));
        context.insert("message".to_string(), json!(message));
        context.insert("count".to_string(), json!(count));
        context.insert("suggestion".to_string(), json!(suggestion));
        let entry = self.make_entry("adaptive_rules", "adaptive_suggestion", LogSeverity::Info, context);
        self.append(&entry)
    }

    /// 統計（件数の多い順）
    pub fn error_stats(&self) -> Result<Vec<ErrorStats>> {
        let mut stats: Vec<ErrorStats> = self.stats.lock()?.values().cloned().collect();
        stats.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.component.cmp(&b.component))
                .then_with(|| a.message.cmp(&b.message))
        });
        Ok(stats)
    }

    /// 現在の適応ルール
    pub fn adaptive_rules(&self) -> Result<AdaptiveRules> {
        self.rules.snapshot()
    }

    /// 現在のしきい値スナップショット
    pub fn thresholds(&self) -> Thresholds {
        match self.rules.snapshot() {
            Ok(rules) => Thresholds::from_rules(&rules),
            Err(e) => {
                warn!("Rule store unavailable, using default thresholds: {}", e);
                Thresholds::default()
            }
        }
    }

    /// 適応ルールを更新（マージ）し、監査ログに記録
    pub fn update_adaptive_rules(&self, updates: &BTreeMap<String, Value>) -> Result<RuleUpdateReport> {
        let report = self.rules.merge(updates)?;
        let mut context = BTreeMap::new();
        context.insert("applied".to_string(), json!(report.applied));
        context.insert("rejected".to_string(), json!(report.rejected));
        let entry = self.make_entry("adaptive_rules", "rules_updated", LogSeverity::Info, context);
        self.append(&entry)?;
        Ok(report)
    }

    /// 手動オーバーライドを追加
    pub fn add_manual_override(&self, manual_override: ManualOverride) -> Result<()> {
        let mut context = BTreeMap::new();
        context.insert("errorSignature".to_string(), json!(manual_override.error_signature));
        context.insert("skipValidation".to_string(), json!(manual_override.skip_validation));
        context.insert("reason".to_string(), json!(manual_override.reason));
        context.insert("approvedBy".to_string(), json!(manual_override.approved_by));
        let entry = self.make_entry(
            &manual_override.component,
            "manual_override_added",
            LogSeverity::Warning,
            context,
        );

        self.overrides
            .write()?
            .insert(manual_override.key(), manual_override);
        self.append(&entry)
    }

    /// 手動オーバーライドを取得
    pub fn get_manual_override(&self, component: &str, signature: &str) -> Result<Option<ManualOverride>> {
        Ok(self
            .overrides
            .read()?
            .get(&override_key(component, signature))
            .cloned())
    }

    /// 検証をスキップすべきか
    pub fn is_overridden(&self, component: &str, signature: &str) -> bool {
        match self.get_manual_override(component, signature) {
            Ok(found) => found.map(|o| o.skip_validation).unwrap_or(false),
            Err(e) => {
                warn!("Override registry unavailable: {}", e);
                false
            }
        }
    }

    /// 手動オーバーライドを削除（存在した場合のみ監査ログに記録）
    pub fn remove_manual_override(&self, component: &str, signature: &str) -> Result<Option<ManualOverride>> {
        let removed = self
            .overrides
            .write()?
            .remove(&override_key(component, signature));
        if let Some(ref removed) = removed {
            let mut context = BTreeMap::new();
            context.insert("errorSignature".to_string(), json!(removed.error_signature));
            let entry = self.make_entry(component, "manual_override_removed", LogSeverity::Warning, context);
            self.append(&entry)?;
        }
        Ok(removed)
    }

    /// 直近 `days` 日分のログをエクスポート
    pub fn export_logs(&self, format: ExportFormat, days: u32) -> Result<String> {
        let cutoff = Utc::now() - Duration::days(i64::from(days));
        let entries: Vec<ErrorLogEntry> = self
            .sink
            .entries()?
            .into_iter()
            .filter(|e| e.timestamp >= cutoff)
            .collect();

        match format {
            ExportFormat::Json => Ok(serde_json::to_string_pretty(&entries)?),
            ExportFormat::Csv => {
                let mut out = String::from(CSV_HEADER);
                out.push('\n');
                for entry in &entries {
                    let context = serde_json::to_string(&entry.context)?;
                    let row = [
                        entry.timestamp.to_rfc3339(),
                        entry.component.clone(),
                        entry.error.clone(),
                        entry.severity.name().to_string(),
                        context,
                        entry.session_id.clone(),
                        entry.user_id.clone().unwrap_or_default(),
                    ];
                    let row: Vec<String> = row.iter().map(|f| csv_field(f)).collect();
                    out.push_str(&row.join(","));
                    out.push('\n');
                }
                Ok(out)
            }
        }
    }

    /// 直近のログエントリ（このハンドラーのセッションのみ）
    pub fn session_entries(&self) -> Result<Vec<ErrorLogEntry>> {
        Ok(self
            .sink
            .entries()?
            .into_iter()
            .filter(|e| e.session_id == self.session_id)
            .collect())
    }
}

fn stat_key(component: &str, message: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(component.as_bytes());
    hasher.update([0u8]);
    hasher.update(message.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn suggest_rule_change(component: &str) -> &'static str {
    match component {
        "meta_description" => "review meta_min_length / meta_max_length for this content type",
        "title" => "review title_max_length or the title templates for this keyword",
        "keyword_density" => "review keyword_density_min / keyword_density_max",
        "readability" => {
            "review passive_voice_max_ratio, long_sentence_max_ratio and transition_word_min_ratio"
        }
        "image" => "review alt_text_min_length / alt_text_max_length",
        _ => "review the rule thresholds for this component or register a manual override",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adaptive::log_sink::InMemoryLogSink;
    use crate::adaptive::rules::InMemoryRuleStore;

    fn handler() -> (ErrorHandler, Arc<InMemoryLogSink>) {
        let sink = Arc::new(InMemoryLogSink::new());
        let handler = ErrorHandler::new(sink.clone(), Arc::new(InMemoryRuleStore::new()))
            .with_user_id("editor-1");
        (handler, sink)
    }

    #[test]
    fn test_log_validation_failure_updates_stats() {
        let (handler, sink) = handler();
        handler
            .log_validation_failure("title", "too long", BTreeMap::new(), LogSeverity::Warning)
            .unwrap();
        handler
            .log_validation_failure("title", "too long", BTreeMap::new(), LogSeverity::Warning)
            .unwrap();

        let stats = handler.error_stats().unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].count, 2);
        assert!(stats[0].first_occurrence <= stats[0].last_occurrence);

        let entries = sink.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].user_id.as_deref(), Some("editor-1"));
    }

    #[test]
    fn test_adaptive_suggestion_emitted_once_at_threshold() {
        let (handler, sink) = handler();
        for _ in 0..12 {
            handler
                .log_validation_failure(
                    "meta_description",
                    "length out of range",
                    BTreeMap::new(),
                    LogSeverity::Warning,
                )
                .unwrap();
        }

        let suggestions: Vec<ErrorLogEntry> = sink
            .entries()
            .unwrap()
            .into_iter()
            .filter(|e| e.error == "adaptive_suggestion")
            .collect();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].context["count"], json!(10));
        // 提案のみでルールは変更されない
        assert_eq!(handler.adaptive_rules().unwrap().get("meta_max_length"), Some(156.0));
    }

    #[test]
    fn test_manual_override_lifecycle_is_audited() {
        let (handler, sink) = handler();
        handler
            .add_manual_override(ManualOverride::new(
                "image",
                "image_missing",
                "text-only newsletter",
                "chief-editor",
            ))
            .unwrap();

        assert!(handler.is_overridden("image", "image_missing"));
        assert!(!handler.is_overridden("image", "alt_text"));

        let removed = handler.remove_manual_override("image", "image_missing").unwrap();
        assert!(removed.is_some());
        assert!(handler.get_manual_override("image", "image_missing").unwrap().is_none());
        // 存在しないキーの削除は記録しない
        assert!(handler.remove_manual_override("image", "image_missing").unwrap().is_none());

        let errors: Vec<String> = sink.entries().unwrap().into_iter().map(|e| e.error).collect();
        assert_eq!(errors, vec!["manual_override_added", "manual_override_removed"]);
    }

    #[test]
    fn test_export_csv_escapes_fields() {
        let (handler, _) = handler();
        let mut context = BTreeMap::new();
        context.insert("note".to_string(), json!("a, b"));
        handler
            .log_validation_failure("body", "missing \"intro\"", context, LogSeverity::Error)
            .unwrap();

        let csv = handler.export_logs(ExportFormat::Csv, 7).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER));
        let row = lines.next().unwrap();
        assert!(row.contains("\"missing \"\"intro\"\"\""));
        assert!(row.contains(",error,"));
    }

    #[test]
    fn test_export_json_filters_by_days() {
        let (handler, _) = handler();
        handler
            .log_validation_failure("title", "missing keyword", BTreeMap::new(), LogSeverity::Error)
            .unwrap();
        let json = handler.export_logs(ExportFormat::Json, 1).unwrap();
        let parsed: Vec<ErrorLogEntry> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_update_adaptive_rules_is_logged() {
        let (handler, sink) = handler();
        let mut updates = BTreeMap::new();
        updates.insert("title_max_length".to_string(), json!(70));
        updates.insert("bogus".to_string(), json!(true));

        let report = handler.update_adaptive_rules(&updates).unwrap();
        assert_eq!(report.applied, vec!["title_max_length"]);
        assert!(report.rejected.contains_key("bogus"));
        assert_eq!(handler.thresholds().title_max_length, 70);
        assert_eq!(sink.entries().unwrap()[0].error, "rules_updated");
    }

    #[test]
    fn test_export_format_parse() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!("xml".parse::<ExportFormat>().is_err());
    }
}
