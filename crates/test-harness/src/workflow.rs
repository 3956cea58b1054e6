//! Fluent task scripting and a throwaway shared directory to run tasks in.
//!
//! `Workspace` drives the real host path: tasks are written as files, the
//! behavior loader is polled before each one and results are read back from
//! disk, never taken from memory.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use cad_authority::MockAuthority;
use replay_types::{LogEntry, LogLevel, TaskResult, TaskStatus};
use serde_json::{json, Value};
use task_runner::{
    read_log, BehaviorLoader, FileSource, Host, PendingTasks, RunOutcome, RunnerConfig,
    TaskRunner,
};
use tempfile::TempDir;

use crate::assertions;
use crate::helpers::{self, HarnessError};
use crate::oracle::{self, OracleVerdict};
use crate::report::ResultReport;

// ── TaskBuilder ─────────────────────────────────────────────────────────────

/// Builds the JSON of one task file.
#[derive(Debug, Clone)]
pub struct TaskBuilder {
    id: String,
    kind: String,
    description: Option<String>,
    operations: Vec<Value>,
    export_formats: Option<Vec<String>>,
}

impl TaskBuilder {
    pub fn new(id: &str, kind: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: kind.to_string(),
            description: None,
            operations: Vec::new(),
            export_formats: None,
        }
    }

    /// A `create_part` task.
    pub fn part(id: &str) -> Self {
        Self::new(id, "create_part")
    }

    /// A `create_assembly` task. Interference is checked after it runs.
    pub fn assembly(id: &str) -> Self {
        Self::new(id, "create_assembly")
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Append one operation.
    pub fn op(mut self, kind: &str, params: Value) -> Self {
        self.operations.push(helpers::op(kind, params));
        self
    }

    /// Append ready-made operation objects.
    pub fn ops(mut self, operations: impl IntoIterator<Item = Value>) -> Self {
        self.operations.extend(operations);
        self
    }

    pub fn sketch(self, geometry: &str, params: Value) -> Self {
        let sketch = helpers::sketch(geometry, params);
        self.ops([sketch])
    }

    pub fn extrude(self, distance_mm: f64) -> Self {
        self.ops([helpers::extrude(distance_mm)])
    }

    pub fn exports(mut self, formats: &[&str]) -> Self {
        self.export_formats = Some(formats.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn to_json(&self) -> Value {
        let mut task = json!({
            "task_id": self.id,
            "type": self.kind,
            "operations": self.operations,
        });
        if let Some(description) = &self.description {
            task["description"] = json!(description);
        }
        if let Some(formats) = &self.export_formats {
            task["export_formats"] = json!(formats);
        }
        task
    }

    /// Write `<dir>/<id>.json`.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, HarnessError> {
        let path = dir.join(format!("{}.json", self.id));
        let text = serde_json::to_string_pretty(&self.to_json()).map_err(|e| {
            HarnessError::Artifact {
                reason: e.to_string(),
            }
        })?;
        std::fs::write(&path, text).map_err(|e| HarnessError::io(&path, e))?;
        Ok(path)
    }
}

// ── Workspace ───────────────────────────────────────────────────────────────

/// A temporary shared directory with a host and a mock authority.
pub struct Workspace {
    _dir: TempDir,
    config: RunnerConfig,
    host: Host<FileSource>,
    authority: MockAuthority,
    saves: u64,
}

impl Workspace {
    /// Fresh directories, no viewing pause, built-in behavior.
    pub fn new() -> Result<Self, HarnessError> {
        let dir = tempfile::tempdir().map_err(|e| HarnessError::io(std::env::temp_dir(), e))?;
        let config = RunnerConfig::from_shared_dir(dir.path())
            .with_poll_interval(Duration::from_millis(10))
            .with_viewing_pause(Duration::ZERO);
        config
            .ensure_dirs()
            .map_err(|e| HarnessError::io(dir.path(), e))?;

        let behavior = config
            .behavior_source
            .clone()
            .unwrap_or_else(|| dir.path().join(task_runner::config::BEHAVIOR_FILE_NAME));
        let host = Host::new(
            TaskRunner::new(config.clone()),
            BehaviorLoader::new(FileSource::new(behavior)),
            PendingTasks::new(),
        );
        Ok(Self {
            _dir: dir,
            config,
            host,
            authority: MockAuthority::new(),
            saves: 0,
        })
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// The authority, e.g. to inject faults before the next task.
    pub fn authority(&mut self) -> &mut MockAuthority {
        &mut self.authority
    }

    pub fn host(&self) -> &Host<FileSource> {
        &self.host
    }

    pub fn active_behavior_version(&self) -> u32 {
        self.host.loader().active_version()
    }

    /// Save a behavior source. Every save gets a strictly newer stamp.
    pub fn save_behavior(&mut self, text: &str) -> Result<(), HarnessError> {
        let path = self.host.loader().source().path().to_path_buf();
        std::fs::write(&path, text).map_err(|e| HarnessError::io(&path, e))?;
        self.saves += 1;
        let stamp = SystemTime::now() + Duration::from_secs(self.saves);
        File::options()
            .write(true)
            .open(&path)
            .and_then(|file| file.set_modified(stamp))
            .map_err(|e| HarnessError::io(&path, e))
    }

    /// Place a task file in the tasks directory without running it.
    pub fn submit(&self, task: &TaskBuilder) -> Result<PathBuf, HarnessError> {
        task.write_to(&self.config.tasks_dir)
    }

    /// Place raw text as a task file.
    pub fn submit_raw(&self, file_name: &str, text: &str) -> Result<PathBuf, HarnessError> {
        let path = self.config.tasks_dir.join(file_name);
        std::fs::write(&path, text).map_err(|e| HarnessError::io(&path, e))?;
        Ok(path)
    }

    /// Run every waiting task.
    pub fn run_pending(&mut self) -> Result<Vec<RunOutcome>, HarnessError> {
        Ok(self.host.run_pending(&mut self.authority)?)
    }

    /// Submit one task and run it.
    pub fn run(&mut self, task: &TaskBuilder) -> Result<ScenarioRun, HarnessError> {
        self.submit(task)?;
        let outcomes = self.run_pending()?;
        let outcome = outcomes
            .into_iter()
            .find(|o| match o {
                RunOutcome::Recorded(result) => result.task_id == task.id(),
                RunOutcome::HostFailure { task_id, .. } => task_id.as_deref() == Some(task.id()),
            })
            .ok_or_else(|| HarnessError::NoResult {
                task_id: task.id().to_string(),
            })?;
        let log = self.task_log(task.id())?;
        Ok(ScenarioRun {
            task_id: task.id().to_string(),
            outcome,
            log,
        })
    }

    /// The stored result of a task, read from the results directory.
    pub fn result(&self, task_id: &str) -> Result<TaskResult, HarnessError> {
        let path = self.config.result_path(task_id);
        let text = std::fs::read_to_string(&path).map_err(|_| HarnessError::NoResult {
            task_id: task_id.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| HarnessError::Artifact {
            reason: format!("{}: {}", path.display(), e),
        })
    }

    /// Every entry of the log stream so far.
    pub fn log(&self) -> Result<Vec<LogEntry>, HarnessError> {
        match read_log(&self.config.log_file) {
            Ok(entries) => Ok(entries),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(HarnessError::io(&self.config.log_file, e)),
        }
    }

    fn task_log(&self, task_id: &str) -> Result<Vec<LogEntry>, HarnessError> {
        Ok(self
            .log()?
            .into_iter()
            .filter(|e| e.task_id.as_deref() == Some(task_id))
            .collect())
    }

    /// Whether a host error artifact was written.
    pub fn host_error(&self) -> Option<String> {
        std::fs::read_to_string(&self.config.error_file).ok()
    }
}

// ── ScenarioRun ─────────────────────────────────────────────────────────────

/// One settled task with its log entries.
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    pub task_id: String,
    pub outcome: RunOutcome,
    pub log: Vec<LogEntry>,
}

impl ScenarioRun {
    pub fn result(&self) -> Result<&TaskResult, HarnessError> {
        self.outcome.result().ok_or_else(|| HarnessError::NoResult {
            task_id: self.task_id.clone(),
        })
    }

    pub fn is_host_failure(&self) -> bool {
        matches!(self.outcome, RunOutcome::HostFailure { .. })
    }

    pub fn assert_status(&self, expected: TaskStatus) -> Result<&Self, HarnessError> {
        assertions::assert_status(self.result()?, expected, &self.task_id)?;
        Ok(self)
    }

    pub fn assert_no_errors(&self) -> Result<&Self, HarnessError> {
        assertions::assert_error_count(self.result()?, 0, &self.task_id)?;
        Ok(self)
    }

    pub fn assert_error_count(&self, expected: usize) -> Result<&Self, HarnessError> {
        assertions::assert_error_count(self.result()?, expected, &self.task_id)?;
        Ok(self)
    }

    /// Some recorded error starts with `prefix`.
    pub fn assert_error(&self, prefix: &str) -> Result<&Self, HarnessError> {
        assertions::assert_error_prefix(self.result()?, prefix, &self.task_id)?;
        Ok(self)
    }

    pub fn assert_body_count(&self, expected: usize) -> Result<&Self, HarnessError> {
        assertions::assert_body_count(self.result()?, expected, &self.task_id)?;
        Ok(self)
    }

    /// Bounding box extents in millimetres.
    pub fn assert_extents(&self, expected: [f64; 3], tol: f64) -> Result<&Self, HarnessError> {
        assertions::assert_extents(self.result()?, expected, tol, &self.task_id)?;
        Ok(self)
    }

    pub fn assert_logged(&self, level: LogLevel, needle: &str) -> Result<&Self, HarnessError> {
        assertions::assert_logged(&self.log, level, needle, &self.task_id)?;
        Ok(self)
    }

    /// Run every oracle and fail on the first verdict that did not pass.
    pub fn assert_oracles(&self) -> Result<&Self, HarnessError> {
        for verdict in self.oracles()? {
            if !verdict.passed {
                return Err(HarnessError::OracleFailure {
                    oracle: verdict.oracle_name,
                    detail: verdict.detail,
                });
            }
        }
        Ok(self)
    }

    pub fn oracles(&self) -> Result<Vec<OracleVerdict>, HarnessError> {
        Ok(oracle::run_all_oracles(self.result()?, &self.log))
    }

    pub fn report(&self) -> Result<ResultReport, HarnessError> {
        let result = self.result()?;
        Ok(ResultReport::new(
            result,
            &self.log,
            oracle::run_all_oracles(result, &self.log),
        ))
    }
}
