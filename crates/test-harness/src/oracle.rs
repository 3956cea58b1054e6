//! Verification oracles: pure checks over a stored result, its artifacts
//! and its log entries.
//!
//! Each oracle returns an `OracleVerdict` with diagnostic detail instead of
//! panicking, so one pass collects every failure.

use cad_authority::archive::read_archive;
use cad_authority::stl::inspect_binary_stl;
use replay_types::{LogEntry, TaskResult, TaskStatus};
use task_runner::config::artifact_stem;

/// The result of a single oracle check.
#[derive(Debug, Clone)]
pub struct OracleVerdict {
    pub oracle_name: String,
    pub passed: bool,
    pub detail: String,
    pub value: Option<f64>,
}

impl OracleVerdict {
    fn pass(name: &str, detail: String) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed: true,
            detail,
            value: None,
        }
    }

    fn pass_val(name: &str, detail: String, value: f64) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed: true,
            detail,
            value: Some(value),
        }
    }

    fn fail(name: &str, detail: String) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed: false,
            detail,
            value: None,
        }
    }
}

// ── Result Oracles ──────────────────────────────────────────────────────────

/// `success` iff no errors; `failed` results carry no exports or geometry.
pub fn check_status_consistency(result: &TaskResult) -> OracleVerdict {
    let name = "status_consistency";
    match result.status {
        TaskStatus::Success if result.errors.is_empty() => {
            OracleVerdict::pass(name, "success with no errors".to_string())
        }
        TaskStatus::PartialSuccess if !result.errors.is_empty() => OracleVerdict::pass(
            name,
            format!("partial_success with {} error(s)", result.errors.len()),
        ),
        TaskStatus::Failed if result.exports.is_empty() && result.metadata.body_count == 0 => {
            OracleVerdict::pass(name, "failed with an empty record".to_string())
        }
        status => OracleVerdict::fail(
            name,
            format!(
                "{:?} with {} error(s), {} export(s), {} bodies",
                status,
                result.errors.len(),
                result.exports.len(),
                result.metadata.body_count
            ),
        ),
    }
}

/// Every listed export exists and is named after the task.
pub fn check_exports_exist(result: &TaskResult) -> OracleVerdict {
    let name = "exports_exist";
    for (format, path) in &result.exports {
        if !path.exists() {
            return OracleVerdict::fail(name, format!("{format}: {} is missing", path.display()));
        }
        let stem_matches = path
            .file_stem()
            .is_some_and(|stem| stem.to_string_lossy() == artifact_stem(&result.task_id));
        if !stem_matches {
            return OracleVerdict::fail(
                name,
                format!("{format}: {} is not named after the task", path.display()),
            );
        }
    }
    OracleVerdict::pass(name, format!("{} export(s) on disk", result.exports.len()))
}

/// Body count, volume and extents agree with each other.
pub fn check_metadata_sanity(result: &TaskResult) -> OracleVerdict {
    let name = "metadata_sanity";
    let m = &result.metadata;
    let extents = [m.bounding_box.x, m.bounding_box.y, m.bounding_box.z];
    if m.body_count == 0 {
        return if m.volume == 0.0 && extents.iter().all(|e| *e == 0.0) {
            OracleVerdict::pass(name, "no bodies, empty metadata".to_string())
        } else {
            OracleVerdict::fail(name, "no bodies but non-zero volume or extents".to_string())
        };
    }
    if m.volume <= 0.0 || m.surface_area <= 0.0 {
        return OracleVerdict::fail(
            name,
            format!("{} bodies but volume {} and area {}", m.body_count, m.volume, m.surface_area),
        );
    }
    let box_volume: f64 = extents.iter().product();
    if m.body_count == 1 && m.volume > box_volume * (1.0 + 1e-6) {
        return OracleVerdict::fail(
            name,
            format!("volume {:.3} exceeds bounding box {:.3}", m.volume, box_volume),
        );
    }
    OracleVerdict::pass_val(
        name,
        format!("{} bodies, volume {:.3}mm³", m.body_count, m.volume),
        m.volume,
    )
}

// ── Artifact Oracles ────────────────────────────────────────────────────────

/// The STL covers the same box as the reported extents.
pub fn check_stl_extents(result: &TaskResult, tol: f64) -> OracleVerdict {
    let name = "stl_extents";
    let Some(path) = result.exports.get("stl") else {
        return OracleVerdict::pass(name, "no STL export".to_string());
    };
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => return OracleVerdict::fail(name, format!("{}: {}", path.display(), e)),
    };
    let (triangles, bbox) = match inspect_binary_stl(&bytes) {
        Ok(inspected) => inspected,
        Err(e) => return OracleVerdict::fail(name, e.to_string()),
    };
    let stl = bbox.extents();
    let reported = [
        result.metadata.bounding_box.x,
        result.metadata.bounding_box.y,
        result.metadata.bounding_box.z,
    ];
    for axis in 0..3 {
        if (stl[axis] - reported[axis]).abs() > tol {
            return OracleVerdict::fail(
                name,
                format!(
                    "axis {}: STL spans {:.4}, metadata says {:.4}",
                    axis, stl[axis], reported[axis]
                ),
            );
        }
    }
    OracleVerdict::pass_val(
        name,
        format!("{} triangles within tolerance", triangles),
        triangles as f64,
    )
}

/// The native archive holds as many bodies as the metadata counts.
pub fn check_archive_bodies(result: &TaskResult) -> OracleVerdict {
    let name = "archive_bodies";
    let Some(path) = result.exports.get("f3d") else {
        return OracleVerdict::pass(name, "no archive export".to_string());
    };
    let archive = match std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|text| read_archive(&text).map_err(|e| e.to_string()))
    {
        Ok(archive) => archive,
        Err(e) => return OracleVerdict::fail(name, e),
    };
    let bodies: usize = archive.components.iter().map(|c| c.bodies.len()).sum();
    if bodies == result.metadata.body_count {
        OracleVerdict::pass_val(
            name,
            format!("{} components, {} bodies", archive.components.len(), bodies),
            bodies as f64,
        )
    } else {
        OracleVerdict::fail(
            name,
            format!(
                "archive has {} bodies, metadata counts {}",
                bodies, result.metadata.body_count
            ),
        )
    }
}

// ── Log Oracles ─────────────────────────────────────────────────────────────

/// The task's log opens with "Processing:" and, for a run task, reports
/// completion after every operation entry.
pub fn check_log_story(result: &TaskResult, entries: &[LogEntry]) -> OracleVerdict {
    let name = "log_story";
    if result.status == TaskStatus::Failed {
        return OracleVerdict::pass(name, "task never ran".to_string());
    }
    let Some(first) = entries.first() else {
        return OracleVerdict::fail(name, "no log entries for the task".to_string());
    };
    if !first.message.starts_with("Processing:") {
        return OracleVerdict::fail(name, format!("first entry is {:?}", first.message));
    }
    let completed = format!("Task {} completed!", result.task_id);
    let Some(done) = entries.iter().position(|e| e.message == completed) else {
        return OracleVerdict::fail(name, format!("missing {completed:?}"));
    };
    if let Some(late) = entries[done..]
        .iter()
        .find(|e| e.message.starts_with("Executing operation"))
    {
        return OracleVerdict::fail(name, format!("{:?} after completion", late.message));
    }
    OracleVerdict::pass(name, format!("{} entries in order", entries.len()))
}

/// Run every oracle that applies to a stored result.
pub fn run_all_oracles(result: &TaskResult, entries: &[LogEntry]) -> Vec<OracleVerdict> {
    vec![
        check_status_consistency(result),
        check_exports_exist(result),
        check_metadata_sanity(result),
        check_stl_extents(result, 1e-3),
        check_archive_bodies(result),
        check_log_story(result, entries),
    ]
}
