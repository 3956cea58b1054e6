//! Plain-text task reports.
//!
//! Reports are natural language, not JSON, so a failing scenario can print
//! the whole story of a task in one assertion message.

use std::fmt;

use replay_types::{LogEntry, LogLevel, Metadata, TaskResult, TaskStatus};

use crate::oracle::OracleVerdict;

/// Everything worth knowing about one settled task.
pub struct ResultReport {
    pub task_id: String,
    pub status: TaskStatus,
    pub behavior_version: Option<u32>,
    pub metadata: Metadata,
    pub exports: Vec<(String, String)>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub interference_count: Option<usize>,
    pub oracle_results: Vec<OracleVerdict>,
}

impl ResultReport {
    pub fn new(result: &TaskResult, log: &[LogEntry], oracle_results: Vec<OracleVerdict>) -> Self {
        Self {
            task_id: result.task_id.clone(),
            status: result.status,
            behavior_version: result.behavior_version,
            metadata: result.metadata.clone(),
            exports: result
                .exports
                .iter()
                .map(|(format, path)| (format.clone(), path.display().to_string()))
                .collect(),
            errors: result.errors.clone(),
            warnings: log
                .iter()
                .filter(|e| e.level == LogLevel::Warning)
                .map(|e| e.message.clone())
                .collect(),
            interference_count: result.interference_count,
            oracle_results,
        }
    }

    pub fn all_oracles_passed(&self) -> bool {
        self.oracle_results.iter().all(|v| v.passed)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("=== Task {} ===\n\n", self.task_id));

        let version = self
            .behavior_version
            .map(|v| format!("behavior v{v}"))
            .unwrap_or_else(|| "not run".to_string());
        out.push_str(&format!("Status: {:?} ({})\n", self.status, version));

        let m = &self.metadata;
        out.push_str(&format!(
            "Geometry: {} bodies, {} vertices, {} triangles\n",
            m.body_count, m.vertex_count, m.face_count
        ));
        out.push_str(&format!(
            "  volume {:.3}mm³, area {:.3}mm², extents {:.3} x {:.3} x {:.3}mm\n",
            m.volume, m.surface_area, m.bounding_box.x, m.bounding_box.y, m.bounding_box.z
        ));
        if let Some(count) = self.interference_count {
            out.push_str(&format!("  interference: {count} pair(s)\n"));
        }

        out.push_str(&format!("\nExports ({}):\n", self.exports.len()));
        for (format, path) in &self.exports {
            out.push_str(&format!("  {format}: {path}\n"));
        }

        if self.errors.is_empty() {
            out.push_str("\nErrors: none\n");
        } else {
            out.push_str(&format!("\nErrors ({}):\n", self.errors.len()));
            for error in &self.errors {
                out.push_str(&format!("  - {error}\n"));
            }
        }
        if !self.warnings.is_empty() {
            out.push_str(&format!("\nWarnings ({}):\n", self.warnings.len()));
            for warning in &self.warnings {
                out.push_str(&format!("  - {warning}\n"));
            }
        }

        let passed = self.oracle_results.iter().filter(|v| v.passed).count();
        out.push_str(&format!(
            "\nOracles ({}/{} passed):\n",
            passed,
            self.oracle_results.len()
        ));
        for verdict in &self.oracle_results {
            let mark = if verdict.passed { "PASS" } else { "FAIL" };
            out.push_str(&format!(
                "  [{}] {}: {}\n",
                mark, verdict.oracle_name, verdict.detail
            ));
        }
        out
    }
}

impl fmt::Display for ResultReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}
