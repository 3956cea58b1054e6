//! Helper functions: error type, operation constructors, id generation.

use std::path::PathBuf;

use serde_json::{json, Map, Value};
use task_runner::RunnerError;
use uuid::Uuid;

// ── Error Type ──────────────────────────────────────────────────────────────

/// Unified error type for the test harness.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("I/O error on {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("runner error: {0}")]
    Runner(#[from] RunnerError),

    #[error("no result recorded for {task_id}")]
    NoResult { task_id: String },

    #[error("assertion failed: {detail}")]
    AssertionFailed { detail: String },

    #[error("oracle failure ({oracle}): {detail}")]
    OracleFailure { oracle: String, detail: String },

    #[error("artifact error: {reason}")]
    Artifact { reason: String },
}

impl HarnessError {
    pub(crate) fn io(path: impl Into<PathBuf>, e: std::io::Error) -> Self {
        HarnessError::Io {
            path: path.into(),
            reason: e.to_string(),
        }
    }

    pub(crate) fn assertion(detail: impl Into<String>) -> Self {
        HarnessError::AssertionFailed {
            detail: detail.into(),
        }
    }
}

// ── Operation Constructors ──────────────────────────────────────────────────

/// An operation object: `{"type": kind, ...params}`.
///
/// Non-object `params` are ignored.
pub fn op(kind: &str, params: Value) -> Value {
    let mut object = Map::new();
    object.insert("type".to_string(), Value::String(kind.to_string()));
    if let Value::Object(params) = params {
        object.extend(params);
    }
    Value::Object(object)
}

/// A sketch of one geometry family on the XY plane.
pub fn sketch(geometry: &str, params: Value) -> Value {
    op("sketch", json!({"geometry": geometry, "params": params}))
}

/// A sketch on a named plane.
pub fn sketch_on(plane: &str, geometry: &str, params: Value) -> Value {
    op(
        "sketch",
        json!({"plane": plane, "geometry": geometry, "params": params}),
    )
}

/// New-body extrusion of the last sketch.
pub fn extrude(distance_mm: f64) -> Value {
    op("extrude", json!({"distance": distance_mm}))
}

/// A rectangle sketch followed by its extrusion.
pub fn block(width: f64, height: f64, thickness: f64) -> Vec<Value> {
    vec![
        sketch("rectangle", json!({"width": width, "height": height})),
        extrude(thickness),
    ]
}

/// A circle sketch followed by its extrusion.
pub fn cylinder(radius: f64, height: f64) -> Vec<Value> {
    vec![sketch("circle", json!({"radius": radius})), extrude(height)]
}

// ── Ids ─────────────────────────────────────────────────────────────────────

/// `task_<prefix>_<8 hex chars>`, unique per call.
pub fn unique_task_id(prefix: &str) -> String {
    let simple = Uuid::new_v4().simple().to_string();
    format!("task_{}_{}", prefix, &simple[..8])
}
