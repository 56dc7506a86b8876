//! File-backed store tests (concurrent appends, persistence across restarts)

use content_optimizer::adaptive::{
    ErrorHandler, ErrorLogEntry, ExportFormat, FileRuleStore, JsonLinesLogSink, LogSeverity, CSV_HEADER,
};
use content_optimizer::optimizer::{ContentOptimizer, OptimizerConfig};
use content_optimizer::{ContentRecord, IssueType};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

fn file_handler(dir: &Path) -> ErrorHandler {
    ErrorHandler::new(
        Arc::new(JsonLinesLogSink::new(dir.join("logs/error-log.jsonl")).unwrap()),
        Arc::new(FileRuleStore::open(dir.join("rules.json")).unwrap()),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends_do_not_interleave() {
    let dir = tempfile::tempdir().unwrap();
    let handler = Arc::new(file_handler(dir.path()));

    let mut tasks = Vec::new();
    for task in 0..8 {
        let handler = handler.clone();
        tasks.push(tokio::task::spawn_blocking(move || {
            for n in 0..25 {
                let mut context = BTreeMap::new();
                context.insert("n".to_string(), json!(n));
                handler
                    .log_validation_failure("title", &format!("task-{}", task), context, LogSeverity::Warning)
                    .unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let raw = std::fs::read_to_string(dir.path().join("logs/error-log.jsonl")).unwrap();
    let lines: Vec<&str> = raw.lines().collect();
    // 200件 + しきい値到達時の提案 8件
    assert_eq!(lines.len(), 208);
    for line in &lines {
        let _: ErrorLogEntry = serde_json::from_str(line).unwrap();
    }

    let stats = handler.error_stats().unwrap();
    assert_eq!(stats.len(), 8);
    assert!(stats.iter().all(|s| s.count == 25));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rule_merges_are_atomic() {
    let dir = tempfile::tempdir().unwrap();
    let handler = Arc::new(file_handler(dir.path()));

    let mut tasks = Vec::new();
    for n in 0..10 {
        let handler = handler.clone();
        tasks.push(tokio::task::spawn_blocking(move || {
            let mut updates = BTreeMap::new();
            updates.insert(format!("custom_rule_{}", n), json!(n));
            updates.insert("title_max_length".to_string(), json!(60));
            handler.update_adaptive_rules(&updates).unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let reopened = FileRuleStore::open(dir.path().join("rules.json")).unwrap();
    let rules = content_optimizer::adaptive::RuleStore::snapshot(&reopened).unwrap();
    for n in 0..10 {
        assert_eq!(rules.get(&format!("custom_rule_{}", n)), Some(n as f64));
    }
    assert_eq!(rules.get("title_max_length"), Some(60.0));
    assert_eq!(rules.get("meta_min_length"), Some(120.0));
}

#[test]
fn test_stats_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let stats_path = dir.path().join("stats.json");

    {
        let handler = file_handler(dir.path()).with_stats_path(&stats_path).unwrap();
        for _ in 0..3 {
            handler
                .log_validation_failure("meta_description", "too short", BTreeMap::new(), LogSeverity::Warning)
                .unwrap();
        }
    }

    let handler = file_handler(dir.path()).with_stats_path(&stats_path).unwrap();
    handler
        .log_validation_failure("meta_description", "too short", BTreeMap::new(), LogSeverity::Warning)
        .unwrap();
    let stats = handler.error_stats().unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].count, 4);
    assert!(stats[0].first_occurrence <= stats[0].last_occurrence);
}

#[test]
fn test_concurrent_logging_with_persisted_stats() {
    let dir = tempfile::tempdir().unwrap();
    let stats_path = dir.path().join("stats.json");
    let handler = Arc::new(file_handler(dir.path()).with_stats_path(&stats_path).unwrap());

    let threads: Vec<_> = (0..8)
        .map(|t| {
            let handler = handler.clone();
            std::thread::spawn(move || {
                (0..100)
                    .filter(|_| {
                        handler
                            .log_validation_failure("seo", &format!("thread-{}", t % 4), BTreeMap::new(), LogSeverity::Warning)
                            .is_err()
                    })
                    .count()
            })
        })
        .collect();
    let errors: usize = threads.into_iter().map(|t| t.join().unwrap()).sum();
    assert_eq!(errors, 0);

    // 最後に書かれたスナップショットがメモリ上の統計と一致する
    let reloaded = file_handler(dir.path()).with_stats_path(&stats_path).unwrap();
    let stats = reloaded.error_stats().unwrap();
    assert_eq!(stats.len(), 4);
    assert!(stats.iter().all(|s| s.count == 200));
    let leftovers = std::fs::read_dir(dir.path())
        .unwrap()
        .filter(|e| e.as_ref().unwrap().path().extension().map(|x| x != "json").unwrap_or(true))
        .filter(|e| e.as_ref().unwrap().path().is_file())
        .count();
    assert_eq!(leftovers, 0);
}

#[test]
fn test_rule_updates_change_detection() {
    let dir = tempfile::tempdir().unwrap();
    let handler = Arc::new(file_handler(dir.path()));
    let optimizer = ContentOptimizer::new(OptimizerConfig::default(), handler.clone()).unwrap();
    let content = ContentRecord::new("Rust Ownership Basics Explained Simply", "Rust is fun.");

    let before = optimizer.revalidate(&content, "rust", &[]);
    assert!(before.issues().all(|i| i.issue_type != IssueType::TitleLength));

    let mut updates = BTreeMap::new();
    updates.insert("title_max_length".to_string(), json!(20));
    updates.insert("meta_max_length".to_string(), json!("long"));
    let report = handler.update_adaptive_rules(&updates).unwrap();
    assert_eq!(report.applied, vec!["title_max_length".to_string()]);
    assert_eq!(report.rejected.len(), 1);

    let after = optimizer.revalidate(&content, "rust", &[]);
    assert!(after.issues().any(|i| i.issue_type == IssueType::TitleLength));
}

#[test]
fn test_export_from_file_sink() {
    let dir = tempfile::tempdir().unwrap();
    let handler = file_handler(dir.path()).with_user_id("editor-1");
    handler
        .log_validation_failure("image", "alt_text", BTreeMap::new(), LogSeverity::Warning)
        .unwrap();

    let csv = handler.export_logs(ExportFormat::Csv, 1).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some(CSV_HEADER));
    let row = lines.next().unwrap();
    assert!(row.contains("image"));
    assert!(row.ends_with("editor-1"));

    let json = handler.export_logs(ExportFormat::Json, 1).unwrap();
    let entries: Vec<ErrorLogEntry> = serde_json::from_str(&json).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].user_id.as_deref(), Some("editor-1"));
}
