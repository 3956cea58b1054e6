//! One task, start to finish.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use cad_authority::AuthorityBundle;
use chrono::Utc;
use replay_types::{Task, TaskResult, TaskStatus};
use serde_json::Value;
use task_engine::{DesignContext, HandlerTable, Interpreter, Journal};
use tracing::{info, instrument, warn};

use crate::config::RunnerConfig;
use crate::errors::{HostFailure, RunnerError, TaskError};
use crate::export::export_all;
use crate::log_stream::JsonlLog;
use crate::metadata::{check_interference, gather_metadata};

/// Slice of the viewing pause between two event pumps.
const PUMP_SLICE: Duration = Duration::from_millis(100);

/// How a task file was settled.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// A result file was written (any status).
    Recorded(TaskResult),
    /// The host failed, or the result could not be stored. The error
    /// artifact was written instead of a result.
    HostFailure {
        task_id: Option<String>,
        reason: String,
    },
}

impl RunOutcome {
    pub fn result(&self) -> Option<&TaskResult> {
        match self {
            RunOutcome::Recorded(result) => Some(result),
            RunOutcome::HostFailure { .. } => None,
        }
    }
}

/// Runs task files against an authority and writes their results.
pub struct TaskRunner {
    config: RunnerConfig,
    log: JsonlLog,
}

impl TaskRunner {
    pub fn new(config: RunnerConfig) -> Self {
        let log = JsonlLog::new(config.log_file.clone());
        Self { config, log }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Journal for messages that belong to no task.
    pub fn journal(&mut self) -> Journal<'_> {
        Journal::new(&mut self.log)
    }

    /// Read, execute, export and measure one task file, write its result
    /// and delete the task file.
    ///
    /// Every task file is consumed exactly once, whatever happens to it.
    #[instrument(skip_all, fields(task_file = %task_file.display()))]
    pub fn process_task_file(
        &mut self,
        kb: &mut dyn AuthorityBundle,
        table: &HandlerTable,
        task_file: &Path,
    ) -> Result<RunOutcome, RunnerError> {
        let task = match load_task(task_file) {
            Ok(task) => task,
            Err(e) => return self.reject(task_file, e),
        };

        {
            let mut journal = Journal::for_task(&mut self.log, task.id.clone());
            journal.info(format!(
                "Processing: {} (behavior v{})",
                task.kind, table.version
            ));
            journal.info(format!("Goal: {}", task.description));
        }

        let root_name = root_component_name(&task);
        let design = match DesignContext::open(&mut *kb, &root_name) {
            Ok(design) => design,
            Err(e) if e.is_host_fatal() => {
                return self.host_failure(task_file, Some(&task.id), &HostFailure::from(e))
            }
            Err(e) => {
                let error = TaskError::Document {
                    reason: e.to_string(),
                };
                return self.reject(task_file, error);
            }
        };

        let executed = panic::catch_unwind(AssertUnwindSafe(|| {
            self.execute(&mut *kb, table, &task, design)
        }));
        let settled = match executed {
            Ok(Ok(result)) => self.record(task_file, result),
            Ok(Err(failure)) => self.host_failure(task_file, Some(&task.id), &failure),
            Err(payload) => {
                let failure = HostFailure {
                    reason: format!("panic: {}", panic_message(payload.as_ref())),
                };
                self.host_failure(task_file, Some(&task.id), &failure)
            }
        };

        self.view_and_close(kb, table, &task.id);
        settled
    }

    /// Run the operations, export and measure.
    fn execute(
        &mut self,
        kb: &mut dyn AuthorityBundle,
        table: &HandlerTable,
        task: &Task,
        design: DesignContext,
    ) -> Result<TaskResult, HostFailure> {
        let started = Instant::now();
        let journal = Journal::for_task(&mut self.log, task.id.clone());
        let mut interpreter = Interpreter::new(&mut *kb, table, journal, design);
        let run = interpreter.run(&task.operations);
        let (design, _) = interpreter.finish();
        let mut errors = run?;
        let execution_time = started.elapsed().as_secs_f64();

        let mut journal = Journal::for_task(&mut self.log, task.id.clone());
        let exports = export_all(
            &mut *kb,
            &task.id,
            &task.export_formats,
            &self.config,
            &mut journal,
        )?;
        errors.extend(exports.errors);

        let metadata = gather_metadata(kb.as_introspect(), &design);
        journal.info(format!(
            "Metadata: {} bodies, volume {:.3}mm³, extents {:.3} x {:.3} x {:.3}mm",
            metadata.body_count,
            metadata.volume,
            metadata.bounding_box.x,
            metadata.bounding_box.y,
            metadata.bounding_box.z
        ));

        let interference_count = if task.is_assembly() {
            Some(check_interference(&mut *kb, &design, &mut journal)?)
        } else {
            None
        };

        Ok(TaskResult {
            task_id: task.id.clone(),
            status: TaskStatus::from_errors(&errors),
            exports: exports.files,
            metadata,
            execution_time,
            errors,
            timestamp: Utc::now(),
            behavior_version: Some(table.version),
            interference_count,
        })
    }

    /// Write the result and consume the task.
    fn record(&mut self, task_file: &Path, result: TaskResult) -> Result<RunOutcome, RunnerError> {
        if let Err(e) = self.write_result(&result) {
            return self.unrecorded(task_file, &result.task_id, &e);
        }
        consume(task_file)?;
        let mut journal = Journal::for_task(&mut self.log, result.task_id.clone());
        if !result.errors.is_empty() {
            journal.warn(format!("{} error(s) recorded", result.errors.len()));
        }
        journal.info(format!("Task {} completed!", result.task_id));
        info!(task = %result.task_id, status = ?result.status, "result written");
        Ok(RunOutcome::Recorded(result))
    }

    /// A task that could not be run: write a minimal failed result.
    fn reject(&mut self, task_file: &Path, error: TaskError) -> Result<RunOutcome, RunnerError> {
        let task_id = error
            .task_id()
            .map(str::to_string)
            .unwrap_or_else(|| file_stem(task_file));
        Journal::for_task(&mut self.log, task_id.clone())
            .error(format!("Error processing task: {error}"));
        let result = TaskResult::failed(task_id, error.to_string());
        if let Err(e) = self.write_result(&result) {
            return self.unrecorded(task_file, &result.task_id, &e);
        }
        consume(task_file)?;
        Ok(RunOutcome::Recorded(result))
    }

    /// The result file could not be written. The task is still consumed so
    /// the tasks queued behind it run.
    fn unrecorded(
        &mut self,
        task_file: &Path,
        task_id: &str,
        error: &RunnerError,
    ) -> Result<RunOutcome, RunnerError> {
        let failure = HostFailure {
            reason: format!("result not written: {error}"),
        };
        self.abandon(
            task_file,
            Some(task_id),
            format!("Result of task {task_id} could not be written: {error}"),
            &failure,
        )
    }

    fn host_failure(
        &mut self,
        task_file: &Path,
        task_id: Option<&str>,
        failure: &HostFailure,
    ) -> Result<RunOutcome, RunnerError> {
        let label = task_id.unwrap_or("<unknown>");
        let message = format!("Task {label} aborted by host failure: {failure}");
        self.abandon(task_file, task_id, message, failure)
    }

    /// Log CRITICAL, write the error artifact and consume the task.
    fn abandon(
        &mut self,
        task_file: &Path,
        task_id: Option<&str>,
        message: String,
        failure: &HostFailure,
    ) -> Result<RunOutcome, RunnerError> {
        let label = task_id.unwrap_or("<unknown>");
        let mut journal = match task_id {
            Some(id) => Journal::for_task(&mut self.log, id),
            None => Journal::new(&mut self.log),
        };
        journal.critical(message);
        drop(journal);

        let text = format!("{} task {}: {}\n", Utc::now().to_rfc3339(), label, failure);
        // Already logged by write_file; the task is consumed regardless.
        let _ = write_file(&self.config.error_file, text.as_bytes());
        consume(task_file)?;
        Ok(RunOutcome::HostFailure {
            task_id: task_id.map(str::to_string),
            reason: failure.reason.clone(),
        })
    }

    fn write_result(&self, result: &TaskResult) -> Result<(), RunnerError> {
        let path = self.config.result_path(&result.task_id);
        let json = serde_json::to_string_pretty(result).map_err(|e| RunnerError::Write {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        write_file(&path, json.as_bytes())
    }

    /// Hold the finished design on screen, then close it unsaved.
    fn view_and_close(&mut self, kb: &mut dyn AuthorityBundle, table: &HandlerTable, task_id: &str) {
        let pause = self.config.viewing_pause.unwrap_or_else(|| {
            Duration::try_from_secs_f64(table.tuning.viewing_pause_secs).unwrap_or(Duration::ZERO)
        });
        let mut journal = Journal::for_task(&mut self.log, task_id);
        if !pause.is_zero() {
            journal.info("Pausing for viewing...");
        }
        pump_for(kb, pause);
        if let Err(e) = kb.close_document() {
            journal.warn(format!("Failed to close document: {e}"));
        }
    }
}

/// Pump host events until `pause` has passed, at least once.
pub fn pump_for(kb: &mut dyn AuthorityBundle, pause: Duration) {
    let deadline = Instant::now() + pause;
    loop {
        kb.pump_events();
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(PUMP_SLICE.min(deadline - now));
    }
}

/// Root component name: the task type and the last four characters of
/// the task id.
pub fn root_component_name(task: &Task) -> String {
    let chars: Vec<char> = task.id.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("{}_{}", task.kind, tail)
}

/// Parse a task file, keeping apart the ways it can be unusable.
pub fn load_task(path: &Path) -> Result<Task, TaskError> {
    let text = std::fs::read_to_string(path).map_err(|e| TaskError::Unreadable {
        reason: e.to_string(),
    })?;
    let value: Value = serde_json::from_str(&text).map_err(|e| TaskError::Malformed {
        reason: e.to_string(),
        task_id: None,
    })?;
    let Some(object) = value.as_object() else {
        return Err(TaskError::Malformed {
            reason: "a task must be a JSON object".to_string(),
            task_id: None,
        });
    };
    if !object.contains_key("task_id") && !object.contains_key("id") {
        return Err(TaskError::MissingId);
    }
    let task_id = object
        .get("task_id")
        .or_else(|| object.get("id"))
        .and_then(Value::as_str)
        .map(str::to_string);
    serde_json::from_value(value).map_err(|e| TaskError::Malformed {
        reason: e.to_string(),
        task_id,
    })
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Delete a processed task file. Already gone is fine.
fn consume(task_file: &Path) -> Result<(), RunnerError> {
    match std::fs::remove_file(task_file) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(RunnerError::Consume {
            path: task_file.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), RunnerError> {
    let write = || -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes)
    };
    write().map_err(|e| {
        warn!(path = %path.display(), error = %e, "write failed");
        RunnerError::Write {
            path: PathBuf::from(path),
            reason: e.to_string(),
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, kind: &str) -> Task {
        Task::from_json(&format!(r#"{{"task_id": "{id}", "type": "{kind}"}}"#)).unwrap()
    }

    #[test]
    fn root_name_uses_id_tail() {
        assert_eq!(root_component_name(&task("task_20240101_ab12", "create_part")), "create_part_ab12");
        assert_eq!(root_component_name(&task("x9", "create_part")), "create_part_x9");
    }

    #[test]
    fn load_task_distinguishes_failures() {
        let dir = tempfile::tempdir().unwrap();
        let write = |name: &str, text: &str| {
            let path = dir.path().join(name);
            std::fs::write(&path, text).unwrap();
            path
        };

        let broken = write("task_a.json", "{ not json");
        assert!(matches!(
            load_task(&broken),
            Err(TaskError::Malformed { task_id: None, .. })
        ));

        let anonymous = write("task_b.json", r#"{"type": "create_part"}"#);
        assert_eq!(load_task(&anonymous), Err(TaskError::MissingId));

        let bad_ops = write("task_c.json", r#"{"task_id": "t_c", "operations": 7}"#);
        let err = load_task(&bad_ops).unwrap_err();
        assert_eq!(err.task_id(), Some("t_c"));

        let missing = dir.path().join("task_gone.json");
        assert!(matches!(load_task(&missing), Err(TaskError::Unreadable { .. })));
    }

    #[test]
    fn panic_payloads_are_readable() {
        let payload = panic::catch_unwind(|| panic!("boom {}", 7)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom 7");
    }
}
