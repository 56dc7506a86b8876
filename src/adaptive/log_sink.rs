//! Error Log Sink
//!
//! エラーログエントリの追記専用ストア（JSON Lines）

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// ログの重要度
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl LogSeverity {
    pub fn name(&self) -> &'static str {
        match self {
            LogSeverity::Info => "info",
            LogSeverity::Warning => "warning",
            LogSeverity::Error => "error",
            LogSeverity::Critical => "critical",
        }
    }
}

/// エラーログエントリ
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLogEntry {
    pub timestamp: DateTime<Utc>,
    pub component: String,
    pub error: String,
    pub severity: LogSeverity,
    #[serde(default)]
    pub context: BTreeMap<String, Value>,
    pub session_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// ログシンクトレイト
pub trait LogSink: Send + Sync {
    /// エントリを1件追記
    fn append(&self, entry: &ErrorLogEntry) -> Result<()>;

    /// すべてのエントリを読み出す
    fn entries(&self) -> Result<Vec<ErrorLogEntry>>;
}

/// メモリ内ログシンク（テスト用）
#[derive(Debug, Default)]
pub struct InMemoryLogSink {
    entries: Mutex<Vec<ErrorLogEntry>>,
}

impl InMemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LogSink for InMemoryLogSink {
    fn append(&self, entry: &ErrorLogEntry) -> Result<()> {
        self.entries.lock()?.push(entry.clone());
        Ok(())
    }

    fn entries(&self) -> Result<Vec<ErrorLogEntry>> {
        Ok(self.entries.lock()?.clone())
    }
}

/// JSON Lines ファイルログシンク
///
/// 1エントリ = 1行。書き込みはミューテックス下で1回の `write_all` に限定し、
/// 行が混在しないようにする。
#[derive(Debug)]
pub struct JsonLinesLogSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesLogSink {
    /// ログファイルを指定して作成（親ディレクトリは自動作成）
    pub fn new<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for JsonLinesLogSink {
    fn append(&self, entry: &ErrorLogEntry) -> Result<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock()?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| Error::LogSink(format!("{}: {}", self.path.display(), e)))?;
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }

    fn entries(&self) -> Result<Vec<ErrorLogEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let _guard = self.write_lock.lock()?;
        let reader = BufReader::new(fs::File::open(&self.path)?);
        let mut entries = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ErrorLogEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(
                    "Skipping malformed log line {} in {}: {}",
                    line_no + 1,
                    self.path.display(),
                    e
                ),
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(component: &str) -> ErrorLogEntry {
        ErrorLogEntry {
            timestamp: Utc::now(),
            component: component.to_string(),
            error: "length out of range".to_string(),
            severity: LogSeverity::Warning,
            context: BTreeMap::new(),
            session_id: "session".to_string(),
            user_id: None,
        }
    }

    #[test]
    fn test_json_lines_roundtrip() {
        let dir = tempdir().unwrap();
        let sink = JsonLinesLogSink::new(dir.path().join("logs/errors.jsonl")).unwrap();

        sink.append(&entry("meta_description")).unwrap();
        sink.append(&entry("title")).unwrap();

        let entries = sink.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].component, "title");

        let raw = std::fs::read_to_string(sink.path()).unwrap();
        assert_eq!(raw.lines().count(), 2);
        assert!(raw.contains("\"sessionId\""));
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("errors.jsonl");
        std::fs::write(&path, "not json\n").unwrap();

        let sink = JsonLinesLogSink::new(&path).unwrap();
        sink.append(&entry("body")).unwrap();
        assert_eq!(sink.entries().unwrap().len(), 1);
    }
}
