//! Background task monitor.
//!
//! Lists the tasks directory on a fixed interval and reports to the host
//! loop over a channel. It never touches the authority.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

/// Messages from the monitor to the host loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// The oldest waiting task file.
    TaskReady(PathBuf),
    /// Sent once per interval.
    Tick,
}

/// Whether a file name is a task the runner should pick up.
pub fn is_task_file(name: &str) -> bool {
    (name.starts_with("task_") || name.starts_with("test_")) && name.ends_with(".json")
}

/// Every task file in `dir`, sorted by file name.
pub fn list_tasks(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut tasks: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|entry| entry.file_name().to_str().is_some_and(is_task_file))
        .map(|entry| entry.path())
        .collect();
    tasks.sort();
    Ok(tasks)
}

/// Task paths sent to the host and not yet processed.
#[derive(Debug, Clone, Default)]
pub struct PendingTasks(Arc<Mutex<HashSet<PathBuf>>>);

impl PendingTasks {
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mark `path` queued. False if it already was.
    pub fn claim(&self, path: &Path) -> bool {
        self.set().insert(path.to_path_buf())
    }

    pub fn release(&self, path: &Path) {
        self.set().remove(path);
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.set().contains(path)
    }

    pub fn len(&self) -> usize {
        self.set().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle to the running monitor thread.
pub struct Monitor {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Monitor {
    /// Start watching `tasks_dir`. The thread ends when stopped or when the
    /// receiving side of `events` is dropped.
    pub fn spawn(
        tasks_dir: PathBuf,
        interval: Duration,
        events: Sender<HostEvent>,
        pending: PendingTasks,
    ) -> io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("task-monitor".to_string())
            .spawn(move || watch(&tasks_dir, interval, &events, &pending, &flag))?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Ask the thread to finish and wait for it.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("task monitor thread panicked");
            }
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn watch(
    dir: &Path,
    interval: Duration,
    events: &Sender<HostEvent>,
    pending: &PendingTasks,
    stop: &AtomicBool,
) {
    debug!(dir = %dir.display(), ?interval, "task monitor started");
    while !stop.load(Ordering::Relaxed) {
        match list_tasks(dir) {
            Ok(tasks) => {
                if let Some(oldest) = tasks.into_iter().next() {
                    if pending.claim(&oldest) && events.send(HostEvent::TaskReady(oldest)).is_err() {
                        break;
                    }
                }
            }
            Err(e) => debug!(dir = %dir.display(), error = %e, "cannot list tasks"),
        }
        if events.send(HostEvent::Tick).is_err() {
            break;
        }
        thread::sleep(interval);
    }
    debug!("task monitor stopped");
}
