use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Log stream file name inside the shared directory.
pub const LOG_FILE_NAME: &str = "fusion_logs.jsonl";
/// Host error artifact file name inside the shared directory.
pub const ERROR_FILE_NAME: &str = "host_error.txt";
/// Behavior source file name inside the shared directory.
pub const BEHAVIOR_FILE_NAME: &str = "behavior.json";
/// Longest file stem derived from a task id.
pub const MAX_STEM_CHARS: usize = 120;

/// Where the runner reads tasks and writes everything else.
///
/// Passed to the runner at construction; nothing is read from process-wide
/// state.
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    pub tasks_dir: PathBuf,
    pub results_dir: PathBuf,
    pub exports_dir: PathBuf,
    /// Append-only JSON-lines log stream.
    pub log_file: PathBuf,
    /// Written instead of a result when the host fails.
    pub error_file: PathBuf,
    /// Behavior source watched by the live loader. `None` keeps the
    /// built-in handler table for the whole session.
    pub behavior_source: Option<PathBuf>,
    pub poll_interval: Duration,
    /// Overrides the viewing pause from the active handler table.
    pub viewing_pause: Option<Duration>,
}

impl RunnerConfig {
    /// The standard layout under one shared directory:
    /// `tasks/`, `results/`, `exports/` plus the log, error and behavior
    /// files at the top level.
    pub fn from_shared_dir(shared: impl AsRef<Path>) -> Self {
        let shared = shared.as_ref();
        Self {
            tasks_dir: shared.join("tasks"),
            results_dir: shared.join("results"),
            exports_dir: shared.join("exports"),
            log_file: shared.join(LOG_FILE_NAME),
            error_file: shared.join(ERROR_FILE_NAME),
            behavior_source: Some(shared.join(BEHAVIOR_FILE_NAME)),
            poll_interval: Duration::from_secs(1),
            viewing_pause: None,
        }
    }

    pub fn with_behavior_source(mut self, path: Option<PathBuf>) -> Self {
        self.behavior_source = path;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_viewing_pause(mut self, pause: Duration) -> Self {
        self.viewing_pause = Some(pause);
        self
    }

    /// Create every directory the runner writes into.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        for dir in [&self.tasks_dir, &self.results_dir, &self.exports_dir] {
            std::fs::create_dir_all(dir)?;
        }
        for file in [&self.log_file, &self.error_file] {
            if let Some(parent) = file.parent() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    /// Result file for a task id.
    pub fn result_path(&self, task_id: &str) -> PathBuf {
        self.results_dir
            .join(replay_types::TaskResult::file_name(&artifact_stem(task_id)))
    }

    /// Export artifact for a task id and file extension.
    pub fn export_path(&self, task_id: &str, extension: &str) -> PathBuf {
        self.exports_dir
            .join(format!("{}.{}", artifact_stem(task_id), extension))
    }
}

/// File stem for the artifacts of a task.
///
/// Only ASCII letters, digits, `-`, `_` and `.` survive; anything else
/// becomes `_`. Leading dots are dropped so the stem never names a parent
/// or hidden entry, and the stem is capped at [`MAX_STEM_CHARS`]. An id
/// with nothing usable left maps to `unnamed`.
pub fn artifact_stem(task_id: &str) -> String {
    let mapped: String = task_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem: String = mapped
        .trim_start_matches('.')
        .chars()
        .take(MAX_STEM_CHARS)
        .collect();
    if stem.is_empty() {
        "unnamed".to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_layout() {
        let config = RunnerConfig::from_shared_dir("/srv/shared");
        assert_eq!(config.tasks_dir, PathBuf::from("/srv/shared/tasks"));
        assert_eq!(
            config.result_path("task_01"),
            PathBuf::from("/srv/shared/results/result_task_01.json")
        );
        assert_eq!(
            config.export_path("task_01", "stl"),
            PathBuf::from("/srv/shared/exports/task_01.stl")
        );
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.viewing_pause, None);
    }

    #[test]
    fn ordinary_ids_keep_their_names() {
        assert_eq!(artifact_stem("task_20240101_ab12"), "task_20240101_ab12");
        assert_eq!(artifact_stem("test-7.v2"), "test-7.v2");
    }

    #[test]
    fn ids_cannot_leave_their_directory() {
        let config = RunnerConfig::from_shared_dir("/srv/shared");
        assert_eq!(artifact_stem("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(artifact_stem(".."), "unnamed");
        assert_eq!(artifact_stem(""), "unnamed");
        assert_eq!(artifact_stem("a/b\\c d"), "a_b_c_d");
        assert_eq!(
            config.result_path("../x"),
            PathBuf::from("/srv/shared/results/result__x.json")
        );
        assert_eq!(
            config.export_path("/abs/x", "stl"),
            PathBuf::from("/srv/shared/exports/_abs_x.stl")
        );
    }

    #[test]
    fn long_ids_are_capped() {
        let id = "t".repeat(300);
        assert_eq!(artifact_stem(&id).len(), MAX_STEM_CHARS);
        let at_cap = "u".repeat(MAX_STEM_CHARS);
        assert_eq!(artifact_stem(&at_cap), at_cap);
    }
}
