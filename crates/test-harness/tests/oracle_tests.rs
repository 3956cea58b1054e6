//! Tests for the oracle module.

use std::collections::BTreeMap;
use std::path::PathBuf;

use replay_types::{Extents, LogEntry, LogLevel, Metadata, TaskResult, TaskStatus};
use test_harness::oracle::*;

fn result(status: TaskStatus, errors: &[&str], metadata: Metadata) -> TaskResult {
    let mut result = TaskResult::failed("task_oracle", "placeholder");
    result.status = status;
    result.errors = errors.iter().map(|e| e.to_string()).collect();
    result.metadata = metadata;
    result
}

fn one_body(extents: [f64; 3], volume: f64) -> Metadata {
    Metadata {
        vertex_count: 8,
        face_count: 12,
        volume,
        surface_area: 100.0,
        bounding_box: Extents {
            x: extents[0],
            y: extents[1],
            z: extents[2],
        },
        body_count: 1,
    }
}

// ── Status ──────────────────────────────────────────────────────────────────

#[test]
fn success_with_errors_is_inconsistent() {
    let r = result(TaskStatus::Success, &["Operation x: boom"], one_body([1.0; 3], 0.5));
    let verdict = check_status_consistency(&r);
    assert!(!verdict.passed, "{}", verdict.detail);
}

#[test]
fn partial_success_needs_errors() {
    let ok = result(TaskStatus::PartialSuccess, &["Export obj: nope"], one_body([1.0; 3], 0.5));
    assert!(check_status_consistency(&ok).passed);
    let bad = result(TaskStatus::PartialSuccess, &[], one_body([1.0; 3], 0.5));
    assert!(!check_status_consistency(&bad).passed);
}

#[test]
fn failed_results_carry_nothing() {
    let r = result(TaskStatus::Failed, &["malformed task"], Default::default());
    assert!(check_status_consistency(&r).passed);
    assert!(check_metadata_sanity(&r).passed);
    assert!(check_log_story(&r, &[]).passed);
}

// ── Metadata & artifacts ────────────────────────────────────────────────────

#[test]
fn volume_larger_than_its_box_fails() {
    let r = result(TaskStatus::Success, &[], one_body([1.0, 2.0, 3.0], 7.0));
    assert!(!check_metadata_sanity(&r).passed);
    let fine = result(TaskStatus::Success, &[], one_body([1.0, 2.0, 3.0], 5.5));
    let verdict = check_metadata_sanity(&fine);
    assert!(verdict.passed);
    assert_eq!(verdict.value, Some(5.5));
}

#[test]
fn missing_export_file_fails() {
    let mut r = result(TaskStatus::Success, &[], one_body([1.0; 3], 0.5));
    r.exports = BTreeMap::from([(
        "stl".to_string(),
        PathBuf::from("/nonexistent/task_oracle.stl"),
    )]);
    assert!(!check_exports_exist(&r).passed);
    assert!(!check_stl_extents(&r, 1e-3).passed);
}

#[test]
fn export_named_after_another_task_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("someone_else.stl");
    std::fs::write(&path, b"solid").unwrap();
    let mut r = result(TaskStatus::Success, &[], one_body([1.0; 3], 0.5));
    r.exports = BTreeMap::from([("stl".to_string(), path)]);
    let verdict = check_exports_exist(&r);
    assert!(!verdict.passed);
    assert!(verdict.detail.contains("not named after the task"));
}

#[test]
fn artifact_oracles_skip_absent_formats() {
    let r = result(TaskStatus::Success, &[], one_body([1.0; 3], 0.5));
    assert!(check_stl_extents(&r, 1e-3).passed);
    assert!(check_archive_bodies(&r).passed);
}

// ── Log ─────────────────────────────────────────────────────────────────────

#[test]
fn log_must_open_with_processing_and_report_completion() {
    let r = result(TaskStatus::Success, &[], one_body([1.0; 3], 0.5));
    let entry = |message: &str| LogEntry::new(LogLevel::Info, message);

    let good = vec![
        entry("Processing: create_part (behavior v0)"),
        entry("Executing operation: sketch"),
        entry("Task task_oracle completed!"),
        entry("Pausing for viewing..."),
    ];
    assert!(check_log_story(&r, &good).passed);

    let unfinished = vec![entry("Processing: create_part"), entry("Executing operation: sketch")];
    assert!(!check_log_story(&r, &unfinished).passed);

    let late = vec![
        entry("Processing: create_part"),
        entry("Task task_oracle completed!"),
        entry("Executing operation: extrude"),
    ];
    assert!(!check_log_story(&r, &late).passed);

    assert!(!check_log_story(&r, &[]).passed);
}

#[test]
fn run_all_collects_every_verdict() {
    let r = result(TaskStatus::Success, &["stray"], one_body([1.0; 3], 0.5));
    let verdicts = run_all_oracles(&r, &[]);
    assert_eq!(verdicts.len(), 6);
    let failed: Vec<&str> = verdicts
        .iter()
        .filter(|v| !v.passed)
        .map(|v| v.oracle_name.as_str())
        .collect();
    assert_eq!(failed, ["status_consistency", "log_story"]);
}
