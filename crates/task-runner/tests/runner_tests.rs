use std::path::{Path, PathBuf};
use std::time::Duration;

use approx::assert_relative_eq;
use cad_authority::{Fault, MockAuthority};
use replay_types::{LogLevel, TaskResult, TaskStatus};
use serde_json::{json, Value};
use task_engine::{compile_source, HandlerTable, BEHAVIOR_FORMAT};
use task_runner::*;
use tempfile::TempDir;

struct Shared {
    _dir: TempDir,
    config: RunnerConfig,
}

impl Shared {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = RunnerConfig::from_shared_dir(dir.path())
            .with_behavior_source(None)
            .with_viewing_pause(Duration::ZERO);
        config.ensure_dirs().unwrap();
        Self { _dir: dir, config }
    }

    fn with_pause(mut self, pause: Option<Duration>) -> Self {
        self.config.viewing_pause = pause;
        self
    }

    fn write_task(&self, name: &str, text: &str) -> PathBuf {
        let path = self.config.tasks_dir.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    fn write_json(&self, name: &str, task: Value) -> PathBuf {
        self.write_task(name, &task.to_string())
    }

    fn run(&self, mock: &mut MockAuthority, path: &Path) -> RunOutcome {
        self.run_with(&HandlerTable::builtin(), mock, path)
    }

    fn run_with(&self, table: &HandlerTable, mock: &mut MockAuthority, path: &Path) -> RunOutcome {
        let mut runner = TaskRunner::new(self.config.clone());
        runner.process_task_file(mock, table, path).unwrap()
    }

    fn stored_result(&self, task_id: &str) -> TaskResult {
        let text = std::fs::read_to_string(self.config.result_path(task_id)).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    fn log(&self) -> Vec<replay_types::LogEntry> {
        read_log(&self.config.log_file).unwrap()
    }
}

fn recorded(outcome: RunOutcome) -> TaskResult {
    match outcome {
        RunOutcome::Recorded(result) => result,
        other => panic!("expected a result, got {other:?}"),
    }
}

fn cylinder_task(id: &str, finish: Value) -> Value {
    json!({
        "task_id": id,
        "type": "create_part",
        "description": "Small cylinder",
        "operations": [
            {"type": "sketch", "geometry": "circle", "params": {"radius": 5}},
            {"type": "extrude", "distance": 10},
            finish,
        ],
        "export_formats": ["stl"],
    })
}

fn plate_ops(width: f64, thickness: f64) -> Vec<Value> {
    vec![
        json!({"type": "sketch", "geometry": "rectangle", "params": {"width": width, "height": width}}),
        json!({"type": "extrude", "distance": thickness}),
    ]
}

// ── Successful runs ─────────────────────────────────────────────────────────

#[test]
fn chamfered_cylinder_succeeds() {
    let shared = Shared::new();
    let path = shared.write_json(
        "task_0001.json",
        cylinder_task("task_0001", json!({"type": "chamfer", "edges": "all", "distance": 1})),
    );
    let mut mock = MockAuthority::new();

    let result = recorded(shared.run(&mut mock, &path));
    assert_eq!(result.status, TaskStatus::Success, "{:?}", result.errors);
    assert!(result.errors.is_empty());
    assert_eq!(result.metadata.body_count, 1);
    assert_relative_eq!(result.metadata.bounding_box.z, 10.0, epsilon = 1e-6);
    assert!(result.metadata.volume > 0.0);
    assert!(result.metadata.vertex_count > 0);
    assert!(result.metadata.face_count > 0);
    assert_eq!(result.behavior_version, Some(0));
    assert_eq!(result.interference_count, None);

    let stl = &result.exports["stl"];
    assert_eq!(stl, &shared.config.export_path("task_0001", "stl"));
    assert!(stl.exists());

    assert!(!path.exists(), "task file must be consumed");
    let stored = shared.stored_result("task_0001");
    assert_eq!(stored.status, TaskStatus::Success);
    assert_eq!(stored.exports, result.exports);
    assert_eq!(stored.metadata.body_count, 1);
    assert!(!mock.has_document(), "document must be closed");
}

#[test]
fn both_export_formats_are_written() {
    let shared = Shared::new();
    let mut task = cylinder_task("task_0002", json!({"type": "fillet", "radius": 1}));
    task["export_formats"] = json!(["STL", "f3d", "stl"]);
    let path = shared.write_json("task_0002.json", task);

    let result = recorded(shared.run(&mut MockAuthority::new(), &path));
    assert_eq!(result.status, TaskStatus::Success, "{:?}", result.errors);
    assert_eq!(result.exports.len(), 2);
    assert!(result.exports["stl"].exists());
    assert!(result.exports["f3d"].exists());
    assert!(result.exports["f3d"].to_string_lossy().ends_with("task_0002.f3d"));
}

#[test]
fn result_carries_the_table_version() {
    let shared = Shared::new();
    let table = compile_source(
        &format!(r#"{{"format": "{BEHAVIOR_FORMAT}", "schema_version": 1}}"#),
        3,
    )
    .unwrap();
    let path = shared.write_json("task_0003.json", cylinder_task("task_0003", json!({"type": "fillet"})));
    let result = recorded(shared.run_with(&table, &mut MockAuthority::new(), &path));
    assert_eq!(result.behavior_version, Some(3));
}

// ── Partial success ─────────────────────────────────────────────────────────

#[test]
fn oversized_hole_is_partial_and_still_exported() {
    let shared = Shared::new();
    let path = shared.write_json(
        "task_0010.json",
        cylinder_task(
            "task_0010",
            json!({"type": "hole", "center": [0, 0], "diameter": 1000}),
        ),
    );
    let result = recorded(shared.run(&mut MockAuthority::new(), &path));
    assert_eq!(result.status, TaskStatus::PartialSuccess);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("Operation hole:"), "{:?}", result.errors);
    assert_eq!(result.metadata.body_count, 1);
    assert_relative_eq!(result.metadata.bounding_box.z, 10.0, epsilon = 1e-6);
    assert_relative_eq!(result.metadata.bounding_box.x, 10.0, epsilon = 1e-6);
    assert!(result.exports["stl"].exists());
}

#[test]
fn unknown_operation_is_listed() {
    let shared = Shared::new();
    let path = shared.write_json(
        "task_0011.json",
        cylinder_task("task_0011", json!({"type": "frobnicate"})),
    );
    let result = recorded(shared.run(&mut MockAuthority::new(), &path));
    assert_eq!(result.status, TaskStatus::PartialSuccess);
    assert_eq!(
        result.errors,
        vec!["Operation frobnicate: Unknown operation type: frobnicate".to_string()]
    );
    assert_eq!(result.metadata.body_count, 1);
}

#[test]
fn unknown_export_format_is_recorded_per_format() {
    let shared = Shared::new();
    let mut task = cylinder_task("task_0012", json!({"type": "fillet"}));
    task["export_formats"] = json!(["obj", "stl"]);
    let path = shared.write_json("task_0012.json", task);

    let result = recorded(shared.run(&mut MockAuthority::new(), &path));
    assert_eq!(result.status, TaskStatus::PartialSuccess);
    assert_eq!(result.errors, vec!["Export obj: Unknown export format: obj".to_string()]);
    assert!(result.exports.contains_key("stl"));
    assert!(!result.exports.contains_key("obj"));
}

#[test]
fn empty_design_fails_its_stl_export_only() {
    let shared = Shared::new();
    let path = shared.write_json(
        "task_0013.json",
        json!({"task_id": "task_0013", "operations": []}),
    );
    let result = recorded(shared.run(&mut MockAuthority::new(), &path));
    assert_eq!(result.status, TaskStatus::PartialSuccess);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("Export stl:"));
    assert_eq!(result.metadata.body_count, 0);
    assert_eq!(result.metadata.bounding_box.z, 0.0);
}

// ── Task-level failures ─────────────────────────────────────────────────────

#[test]
fn malformed_json_fails_under_the_file_stem() {
    let shared = Shared::new();
    let path = shared.write_task("task_broken.json", "{ \"task_id\": ");
    let result = recorded(shared.run(&mut MockAuthority::new(), &path));
    assert_eq!(result.task_id, "task_broken");
    assert_eq!(result.status, TaskStatus::Failed);
    assert!(result.errors[0].starts_with("malformed task"), "{:?}", result.errors);
    assert!(shared.config.result_path("task_broken").exists());
    assert!(!path.exists());
}

#[test]
fn missing_id_fails_under_the_file_stem() {
    let shared = Shared::new();
    let path = shared.write_json("test_anon.json", json!({"type": "create_part"}));
    let result = recorded(shared.run(&mut MockAuthority::new(), &path));
    assert_eq!(result.task_id, "test_anon");
    assert_eq!(result.errors, vec!["task has no task_id".to_string()]);
    assert!(!path.exists());
}

#[test]
fn bad_field_types_fail_under_the_task_id() {
    let shared = Shared::new();
    let path = shared.write_json(
        "task_0020.json",
        json!({"task_id": "task_real", "operations": "extrude please"}),
    );
    let result = recorded(shared.run(&mut MockAuthority::new(), &path));
    assert_eq!(result.task_id, "task_real");
    assert_eq!(result.status, TaskStatus::Failed);
    assert!(shared.config.result_path("task_real").exists());
}

// ── Task ids as file names ──────────────────────────────────────────────────

#[test]
fn long_task_id_gets_a_capped_result_name() {
    let shared = Shared::new();
    let id = "task_".to_string() + &"x".repeat(300);
    let path = shared.write_json("task_0025.json", cylinder_task(&id, json!({"type": "fillet"})));

    let result = recorded(shared.run(&mut MockAuthority::new(), &path));
    assert_eq!(result.task_id, id);
    assert!(!path.exists());

    let stored_at = shared.config.result_path(&id);
    let name = stored_at.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.len() <= config::MAX_STEM_CHARS + "result_.json".len(), "{name}");
    assert_eq!(shared.stored_result(&id).task_id, id);
    assert!(result.exports["stl"].exists());
}

#[test]
fn parent_segments_in_the_id_stay_inside_the_shared_dirs() {
    let shared = Shared::new();
    let id = "../../escape";
    let path = shared.write_json("task_0026.json", cylinder_task(id, json!({"type": "fillet"})));

    let result = recorded(shared.run(&mut MockAuthority::new(), &path));
    let stored_at = shared.config.result_path(id);
    assert_eq!(stored_at.parent(), Some(shared.config.results_dir.as_path()));
    assert!(stored_at.exists());
    let stl = &result.exports["stl"];
    assert_eq!(stl.parent(), Some(shared.config.exports_dir.as_path()));
    assert!(stl.exists());

    let root = shared.config.results_dir.parent().unwrap();
    assert!(!root.join("escape.stl").exists());
    assert!(!root.parent().unwrap().join("escape.stl").exists());
}

#[test]
fn unwritable_result_still_consumes_the_task() {
    let shared = Shared::new();
    std::fs::remove_dir(&shared.config.results_dir).unwrap();
    std::fs::write(&shared.config.results_dir, "not a directory").unwrap();
    let path = shared.write_json("task_0027.json", cylinder_task("task_0027", json!({"type": "fillet"})));

    match shared.run(&mut MockAuthority::new(), &path) {
        RunOutcome::HostFailure { task_id, reason } => {
            assert_eq!(task_id.as_deref(), Some("task_0027"));
            assert!(reason.starts_with("result not written"), "{reason}");
        }
        other => panic!("expected an unrecorded task, got {other:?}"),
    }
    assert!(!path.exists(), "task file must be consumed");
    let artifact = std::fs::read_to_string(&shared.config.error_file).unwrap();
    assert!(artifact.contains("task_0027"));
    assert!(shared
        .log()
        .iter()
        .any(|e| e.level == LogLevel::Critical && e.message.contains("could not be written")));
}

#[test]
fn unwritable_failed_result_still_consumes_the_task() {
    let shared = Shared::new();
    std::fs::remove_dir(&shared.config.results_dir).unwrap();
    std::fs::write(&shared.config.results_dir, "").unwrap();
    let path = shared.write_task("task_0028.json", "{ broken");

    let outcome = shared.run(&mut MockAuthority::new(), &path);
    assert!(matches!(outcome, RunOutcome::HostFailure { .. }), "{outcome:?}");
    assert!(!path.exists());
}

// ── Host failures ───────────────────────────────────────────────────────────

#[test]
fn host_fatal_writes_the_error_artifact_instead_of_a_result() {
    let shared = Shared::new();
    let path = shared.write_json("task_0030.json", cylinder_task("task_0030", json!({"type": "fillet"})));
    let mut mock = MockAuthority::new();
    mock.inject_fault("extrude", Fault::HostFatal);

    match shared.run(&mut mock, &path) {
        RunOutcome::HostFailure { task_id, reason } => {
            assert_eq!(task_id.as_deref(), Some("task_0030"));
            assert!(reason.contains("extrude"), "{reason}");
        }
        other => panic!("expected host failure, got {other:?}"),
    }
    let artifact = std::fs::read_to_string(&shared.config.error_file).unwrap();
    assert!(artifact.contains("task_0030"));
    assert!(!shared.config.result_path("task_0030").exists());
    assert!(!path.exists());
    assert!(!mock.has_document());

    let log = shared.log();
    assert!(log.iter().any(|e| e.level == LogLevel::Critical));
}

#[test]
fn panic_inside_the_authority_is_a_host_failure() {
    let shared = Shared::new();
    let path = shared.write_json("task_0031.json", cylinder_task("task_0031", json!({"type": "fillet"})));
    let mut mock = MockAuthority::new();
    mock.inject_fault("export", Fault::Panic);

    match shared.run(&mut mock, &path) {
        RunOutcome::HostFailure { reason, .. } => {
            assert!(reason.starts_with("panic:"), "{reason}");
            assert!(reason.contains("export"));
        }
        other => panic!("expected host failure, got {other:?}"),
    }
    assert!(shared.config.error_file.exists());
    assert!(!shared.config.result_path("task_0031").exists());
}

#[test]
fn host_fatal_while_opening_the_document_settles_the_task() {
    let shared = Shared::new();
    let path = shared.write_json("task_0032.json", cylinder_task("task_0032", json!({"type": "fillet"})));
    let mut mock = MockAuthority::new();
    mock.inject_fault("new_document", Fault::HostFatal);

    let outcome = shared.run(&mut mock, &path);
    assert!(matches!(outcome, RunOutcome::HostFailure { .. }));
    assert_eq!(mock.documents_opened(), 0);
    assert!(!path.exists());
}

// ── Assemblies ──────────────────────────────────────────────────────────────

fn assembly(id: &str, arm_offset: [f64; 3]) -> Value {
    let mut ops = vec![json!({"type": "create_component", "name": "Base"})];
    ops.extend(plate_ops(20.0, 10.0));
    ops.push(json!({"type": "create_component", "name": "Arm"}));
    ops.extend(plate_ops(10.0, 10.0));
    ops.push(json!({"type": "transform_component", "name": "Arm", "offset": arm_offset}));
    json!({"task_id": id, "type": "create_assembly", "operations": ops})
}

#[test]
fn overlapping_components_are_reported_as_a_warning() {
    let shared = Shared::new();
    let path = shared.write_json("task_0040.json", assembly("task_0040", [0.0, 0.0, 0.0]));
    let result = recorded(shared.run(&mut MockAuthority::new(), &path));
    assert_eq!(result.status, TaskStatus::Success, "{:?}", result.errors);
    assert_eq!(result.interference_count, Some(1));
    assert_eq!(result.metadata.body_count, 2);

    let log = shared.log();
    assert!(log.iter().any(|e| e.level == LogLevel::Warning
        && e.message == "Found 1 interference(s) between components"));
}

#[test]
fn separated_components_do_not_interfere() {
    let shared = Shared::new();
    let path = shared.write_json("task_0041.json", assembly("task_0041", [0.0, 0.0, 50.0]));
    let result = recorded(shared.run(&mut MockAuthority::new(), &path));
    assert_eq!(result.interference_count, Some(0));
    assert_relative_eq!(result.metadata.bounding_box.z, 60.0, epsilon = 1e-6);
    assert_relative_eq!(result.metadata.bounding_box.x, 20.0, epsilon = 1e-6);
}

// ── Log stream & viewing pause ──────────────────────────────────────────────

#[test]
fn log_stream_tells_the_task_story() {
    let shared = Shared::new();
    let path = shared.write_json(
        "task_0050.json",
        cylinder_task("task_0050", json!({"type": "chamfer"})),
    );
    shared.run(&mut MockAuthority::new(), &path);

    let log = shared.log();
    let messages: Vec<&str> = log.iter().map(|e| e.message.as_str()).collect();
    assert!(messages[0].starts_with("Processing: create_part"));
    assert_eq!(messages[1], "Goal: Small cylinder");
    assert!(messages.contains(&"Executing operation: chamfer"));
    assert!(messages.contains(&"Task task_0050 completed!"));
    assert!(!messages.contains(&"Pausing for viewing..."));
    assert!(log.iter().all(|e| e.task_id.as_deref() == Some("task_0050")));
}

#[test]
fn viewing_pause_pumps_events_in_slices() {
    let shared = Shared::new().with_pause(Some(Duration::from_millis(250)));
    let path = shared.write_json("task_0051.json", cylinder_task("task_0051", json!({"type": "fillet"})));
    let mut mock = MockAuthority::new();
    shared.run(&mut mock, &path);

    assert!(mock.events_pumped() >= 3, "pumped {}", mock.events_pumped());
    assert!(shared
        .log()
        .iter()
        .any(|e| e.message == "Pausing for viewing..."));
}

#[test]
fn viewing_pause_defaults_to_the_table_tuning() {
    let shared = Shared::new().with_pause(None);
    let table = compile_source(
        &format!(
            r#"{{"format": "{BEHAVIOR_FORMAT}", "schema_version": 1, "tuning": {{"viewing_pause_secs": 0.15}}}}"#
        ),
        1,
    )
    .unwrap();
    let path = shared.write_json("task_0052.json", cylinder_task("task_0052", json!({"type": "fillet"})));
    let mut mock = MockAuthority::new();
    shared.run_with(&table, &mut mock, &path);
    assert!(mock.events_pumped() >= 2, "pumped {}", mock.events_pumped());
}

#[test]
fn zero_pause_still_pumps_once() {
    let mut mock = MockAuthority::new();
    pump_for(&mut mock, Duration::ZERO);
    assert_eq!(mock.events_pumped(), 1);
}
