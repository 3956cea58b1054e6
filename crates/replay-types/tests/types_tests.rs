use replay_types::*;
use serde_json::json;

// ── Task parsing ────────────────────────────────────────────────────────

#[test]
fn task_defaults_follow_orchestrator_files() {
    let task = Task::from_json(r#"{"task_id": "task_0001", "operations": []}"#).unwrap();
    assert_eq!(task.id, "task_0001");
    assert_eq!(task.kind, "unknown");
    assert_eq!(task.description, "No description");
    assert_eq!(task.export_formats, vec!["stl".to_string()]);
    assert!(task.target_dimensions.is_none());
    assert!(!task.is_assembly());
}

#[test]
fn task_accepts_id_and_kind_aliases() {
    let task = Task::from_json(r#"{"id": "abc", "kind": "create_assembly"}"#).unwrap();
    assert_eq!(task.id, "abc");
    assert_eq!(task.kind, "create_assembly");
    assert!(task.is_assembly());
}

#[test]
fn task_missing_id_is_rejected() {
    let err = Task::from_json(r#"{"type": "create_part", "operations": []}"#);
    assert!(err.is_err(), "task without an id must not parse");
}

#[test]
fn export_formats_are_deduplicated_in_order() {
    let task =
        Task::from_json(r#"{"task_id": "t", "export_formats": ["f3d", "STL", "f3d", "stl"]}"#)
            .unwrap();
    assert_eq!(task.export_formats, vec!["f3d".to_string(), "stl".to_string()]);
}

#[test]
fn operations_keep_unknown_fields() {
    let task = Task::from_json(
        r#"{"task_id": "t", "operations": [
            {"type": "extrude", "distance": 12.5, "operation": "cut"},
            {"type": "teleport", "where": "moon"},
            {"distance": 3}
        ]}"#,
    )
    .unwrap();

    assert_eq!(task.operations.len(), 3);
    assert_eq!(task.operations[0].kind, "extrude");
    assert_eq!(task.operations[0].params["distance"], json!(12.5));
    assert_eq!(task.operations[1].kind, "teleport");
    assert_eq!(task.operations[2].kind, "", "missing type stays empty");
}

#[test]
fn raw_operation_decodes_typed_params() {
    #[derive(serde::Deserialize)]
    struct Extrude {
        distance: f64,
        #[serde(default)]
        operation: Option<String>,
    }

    let op = RawOperation::new("extrude", json!({"distance": 4.0}));
    let decoded: Extrude = op.decode().unwrap();
    assert_eq!(decoded.distance, 4.0);
    assert!(decoded.operation.is_none());

    let bad = RawOperation::new("extrude", json!({"distance": "far"}));
    assert!(bad.decode::<Extrude>().is_err());
}

#[test]
fn target_dimensions_are_partial() {
    let task =
        Task::from_json(r#"{"task_id": "t", "target_dimensions": {"z": 10.0}}"#).unwrap();
    let dims = task.target_dimensions.unwrap();
    assert_eq!(dims.z, Some(10.0));
    assert_eq!(dims.x, None);
}

// ── Results ─────────────────────────────────────────────────────────────

#[test]
fn status_follows_error_list() {
    assert_eq!(TaskStatus::from_errors(&[]), TaskStatus::Success);
    assert_eq!(
        TaskStatus::from_errors(&["Operation hole: boom".to_string()]),
        TaskStatus::PartialSuccess
    );
}

#[test]
fn failed_result_serializes_snake_case_status() {
    let result = TaskResult::failed("task_9", "Task parse error: missing task_id");
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["status"], json!("failed"));
    assert_eq!(value["task_id"], json!("task_9"));
    assert_eq!(value["errors"].as_array().unwrap().len(), 1);
    assert!(value.get("interference_count").is_none());
    assert_eq!(TaskResult::file_name("task_9"), "result_task_9.json");
}

#[test]
fn log_levels_serialize_uppercase() {
    let entry = LogEntry::new(LogLevel::Warning, "careful");
    let value = serde_json::to_value(&entry).unwrap();
    assert_eq!(value["level"], json!("WARNING"));
    assert_eq!(value["operation"], json!(null));
    assert!(LogLevel::Critical > LogLevel::Error);
}

// ── Connection points ───────────────────────────────────────────────────

#[test]
fn mating_table_is_directional() {
    let hole = ConnectionPoint::new(ConnectionKind::ThreadedHole, [0.0; 3], "Plate");
    let bolt = ConnectionPoint::new(ConnectionKind::Bolt, [0.0; 3], "Bolt");
    let screw = ConnectionPoint::new(ConnectionKind::Screw, [0.0; 3], "Screw");
    let face = ConnectionPoint::new(ConnectionKind::FlatFace, [0.0; 3], "Base");

    assert!(hole.can_mate_with(&bolt));
    assert!(bolt.can_mate_with(&hole));
    assert!(hole.can_mate_with(&screw));
    assert!(!screw.can_mate_with(&hole), "screw has no outgoing mates");
    assert!(!hole.can_mate_with(&face));
    assert!(hole.id.starts_with("threaded_hole_"));
}

#[test]
fn proposals_pair_shafts_with_bores_as_revolute() {
    let points = vec![
        ConnectionPoint::new(ConnectionKind::Shaft, [0.0, 0.0, 0.0], "Shaft1"),
        ConnectionPoint::new(ConnectionKind::Bore, [0.0, 0.0, 5.0], "Gear1"),
        ConnectionPoint::new(ConnectionKind::FlatFace, [0.0, 0.0, 0.0], "Base"),
        ConnectionPoint::new(ConnectionKind::FlatFace, [0.0, 0.0, 0.0], "Base"),
        ConnectionPoint::new(ConnectionKind::FlatFace, [0.0, 0.0, 0.0], "Lid"),
    ];

    let proposals = propose_joints(&points);
    assert_eq!(proposals.len(), 2);
    assert_eq!(proposals[0].component_1, "Shaft1");
    assert_eq!(proposals[0].component_2, "Gear1");
    assert_eq!(proposals[0].joint_type, JointKind::Revolute);
    assert_eq!(proposals[1].component_1, "Base");
    assert_eq!(proposals[1].component_2, "Lid");
    assert_eq!(proposals[1].joint_type, JointKind::Rigid);

    let op = proposals[0].to_operation();
    assert_eq!(op.kind, "create_joint");
    assert_eq!(op.params["joint_type"], json!("revolute"));
}
