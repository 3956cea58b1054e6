//! The host loop: the only place the authority is touched.
//!
//! Events arrive from the monitor thread. Before each one the behavior
//! loader is polled, so a reload lands between tasks and never during one.

use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;

use cad_authority::AuthorityBundle;
use tracing::{debug, error, info};

use crate::config::RunnerConfig;
use crate::errors::RunnerError;
use crate::monitor::{list_tasks, HostEvent, PendingTasks};
use crate::reload::{BehaviorLoader, BehaviorSource, FileSource, NoSource, ReloadOutcome};
use crate::runner::{RunOutcome, TaskRunner};

/// The behavior source named by a config, boxed for the host.
pub fn behavior_source(config: &RunnerConfig) -> Box<dyn BehaviorSource + Send> {
    match &config.behavior_source {
        Some(path) => Box::new(FileSource::new(path.clone())),
        None => Box::new(NoSource),
    }
}

pub struct Host<S> {
    runner: TaskRunner,
    loader: BehaviorLoader<S>,
    pending: PendingTasks,
}

impl<S: BehaviorSource> Host<S> {
    pub fn new(runner: TaskRunner, loader: BehaviorLoader<S>, pending: PendingTasks) -> Self {
        Self {
            runner,
            loader,
            pending,
        }
    }

    pub fn runner(&self) -> &TaskRunner {
        &self.runner
    }

    pub fn loader(&self) -> &BehaviorLoader<S> {
        &self.loader
    }

    /// Shared with the monitor so a queued task is not announced twice.
    pub fn pending(&self) -> &PendingTasks {
        &self.pending
    }

    /// Poll the behavior source and report what happened to the log stream.
    pub fn reload(&mut self) -> ReloadOutcome {
        let outcome = self.loader.poll();
        let mut journal = self.runner.journal();
        match &outcome {
            ReloadOutcome::Unchanged => {}
            ReloadOutcome::Committed { version } => {
                journal.info(format!("Behavior reloaded: version {version} active"));
            }
            ReloadOutcome::Rejected { reason } => {
                journal.error(format!(
                    "Behavior reload rejected, keeping version {}: {}",
                    self.loader.active_version(),
                    reason
                ));
            }
            ReloadOutcome::RolledBack { version, reason } => {
                journal.error(format!(
                    "Behavior version {} rolled back to {}: {}",
                    version,
                    self.loader.active_version(),
                    reason
                ));
            }
        }
        outcome
    }

    /// Handle one monitor event. Returns the outcome of a processed task.
    pub fn handle(
        &mut self,
        event: HostEvent,
        kb: &mut dyn AuthorityBundle,
    ) -> Result<Option<RunOutcome>, RunnerError> {
        self.reload();
        match event {
            HostEvent::Tick => Ok(None),
            HostEvent::TaskReady(path) => {
                let outcome = self.run_task(&path, kb);
                self.pending.release(&path);
                outcome
            }
        }
    }

    /// Serve events until every sender is gone. Returns the number of task
    /// files settled.
    pub fn run(&mut self, events: &Receiver<HostEvent>, kb: &mut dyn AuthorityBundle) -> usize {
        info!("host loop started");
        let mut settled = 0;
        for event in events.iter() {
            match self.handle(event, kb) {
                Ok(Some(_)) => settled += 1,
                Ok(None) => {}
                Err(e) => error!(error = %e, "task could not be settled"),
            }
        }
        info!(settled, "host loop stopped");
        settled
    }

    /// Process every task currently waiting, oldest first.
    pub fn run_pending(
        &mut self,
        kb: &mut dyn AuthorityBundle,
    ) -> Result<Vec<RunOutcome>, RunnerError> {
        let dir = self.runner.config().tasks_dir.clone();
        let tasks = list_tasks(&dir).map_err(|e| RunnerError::List {
            path: dir.clone(),
            reason: e.to_string(),
        })?;
        let mut outcomes = Vec::with_capacity(tasks.len());
        for path in tasks {
            self.reload();
            if let Some(outcome) = self.run_task(&path, kb)? {
                outcomes.push(outcome);
            }
        }
        Ok(outcomes)
    }

    fn run_task(
        &mut self,
        path: &Path,
        kb: &mut dyn AuthorityBundle,
    ) -> Result<Option<RunOutcome>, RunnerError> {
        if !path.exists() {
            debug!(path = %path.display(), "task vanished before it ran");
            return Ok(None);
        }
        let table = self.loader.active();
        self.runner
            .process_task_file(kb, table, path)
            .map(Some)
    }
}

/// Paths of the task files a host would process next.
pub fn waiting_tasks(config: &RunnerConfig) -> Vec<PathBuf> {
    list_tasks(&config.tasks_dir).unwrap_or_default()
}
