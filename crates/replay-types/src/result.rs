use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Every operation and export succeeded.
    Success,
    /// A result was produced but some operations or exports failed.
    PartialSuccess,
    /// The task itself could not be run (parse or document failure).
    Failed,
}

impl TaskStatus {
    /// Status of a task that ran to completion with the given errors.
    pub fn from_errors(errors: &[String]) -> Self {
        if errors.is_empty() {
            TaskStatus::Success
        } else {
            TaskStatus::PartialSuccess
        }
    }
}

/// Axis-aligned extents of the finished design, in millimetres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Extents {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Quantitative descriptors of the finished design.
///
/// Lengths are millimetres, `volume` is mm³ and `surface_area` is mm².
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub vertex_count: u64,
    /// Triangle count of the display meshes.
    pub face_count: u64,
    pub volume: f64,
    pub surface_area: f64,
    pub bounding_box: Extents,
    pub body_count: usize,
}

/// The record written once per task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub status: TaskStatus,
    /// Export format → written file.
    pub exports: BTreeMap<String, PathBuf>,
    pub metadata: Metadata,
    /// Wall-clock seconds spent executing operations.
    pub execution_time: f64,
    pub errors: Vec<String>,
    pub timestamp: DateTime<Utc>,
    /// Version of the handler table that executed the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior_version: Option<u32>,
    /// Number of interfering body pairs, assemblies only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interference_count: Option<usize>,
}

impl TaskResult {
    /// Minimal record for a task that could not be run at all.
    pub fn failed(task_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Failed,
            exports: BTreeMap::new(),
            metadata: Metadata::default(),
            execution_time: 0.0,
            errors: vec![error.into()],
            timestamp: Utc::now(),
            behavior_version: None,
            interference_count: None,
        }
    }

    /// File name of the result record for a task id.
    pub fn file_name(task_id: &str) -> String {
        format!("result_{}.json", task_id)
    }
}
