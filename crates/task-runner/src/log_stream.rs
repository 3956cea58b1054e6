//! The orchestrator-facing JSON-lines log.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use replay_types::LogEntry;
use task_engine::LogSink;
use tracing::warn;

/// Appends one JSON object per line and flushes after each, so the file can
/// be tailed while a task runs.
#[derive(Debug)]
pub struct JsonlLog {
    path: PathBuf,
    file: Option<File>,
}

impl JsonlLog {
    /// The file is opened on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&mut self, entry: &LogEntry) -> io::Result<()> {
        let line = serde_json::to_string(entry)?;
        let mut file = match self.file.take() {
            Some(file) => file,
            None => OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?,
        };
        writeln!(file, "{line}")?;
        file.flush()?;
        self.file = Some(file);
        Ok(())
    }
}

impl LogSink for JsonlLog {
    fn append(&mut self, entry: &LogEntry) {
        // A failed write drops the handle; the next entry reopens the file.
        if let Err(e) = self.write_line(entry) {
            warn!(path = %self.path.display(), error = %e, "log stream write failed");
        }
    }
}

/// Read every entry of a log stream. Lines that do not parse are skipped.
pub fn read_log(path: &Path) -> io::Result<Vec<LogEntry>> {
    let text = std::fs::read_to_string(path)?;
    Ok(text
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}
