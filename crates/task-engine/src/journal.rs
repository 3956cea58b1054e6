//! Execution journal.
//!
//! Every message the engine reports goes through a [`Journal`], which stamps
//! it with the current task and operation, hands it to a [`LogSink`] (the
//! orchestrator's JSON-lines stream in production) and mirrors it to
//! `tracing` at the matching level.

use replay_types::{LogEntry, LogLevel};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

/// Destination for log entries.
pub trait LogSink {
    fn append(&mut self, entry: &LogEntry);
}

/// Sink that keeps every entry in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub entries: Vec<LogEntry>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries at `level`, in order.
    pub fn at_level(&self, level: LogLevel) -> Vec<&LogEntry> {
        self.entries.iter().filter(|e| e.level == level).collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries.iter().any(|e| e.message.contains(needle))
    }
}

impl LogSink for MemorySink {
    fn append(&mut self, entry: &LogEntry) {
        self.entries.push(entry.clone());
    }
}

/// Sink that drops everything. `tracing` still sees each entry.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl LogSink for NullSink {
    fn append(&mut self, _entry: &LogEntry) {}
}

/// Stamps log entries with task and operation before writing them.
pub struct Journal<'s> {
    sink: &'s mut dyn LogSink,
    task_id: Option<String>,
    operation: Option<String>,
}

impl<'s> Journal<'s> {
    pub fn new(sink: &'s mut dyn LogSink) -> Self {
        Self {
            sink,
            task_id: None,
            operation: None,
        }
    }

    pub fn for_task(sink: &'s mut dyn LogSink, task_id: impl Into<String>) -> Self {
        Self {
            sink,
            task_id: Some(task_id.into()),
            operation: None,
        }
    }

    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }

    pub fn operation(&self) -> Option<&str> {
        self.operation.as_deref()
    }

    pub fn set_operation(&mut self, operation: Option<&str>) {
        self.operation = operation.map(str::to_string);
    }

    pub fn log(&mut self, level: LogLevel, message: impl Into<String>, context: Map<String, Value>) {
        let mut entry = LogEntry::new(level, message);
        entry.operation = self.operation.clone();
        entry.task_id = self.task_id.clone();
        entry.context = context;

        let task = entry.task_id.as_deref().unwrap_or("-");
        let op = entry.operation.as_deref().unwrap_or("-");
        match level {
            LogLevel::Debug => debug!(task, op, "{}", entry.message),
            LogLevel::Info => info!(task, op, "{}", entry.message),
            LogLevel::Warning => warn!(task, op, "{}", entry.message),
            LogLevel::Error => error!(task, op, "{}", entry.message),
            LogLevel::Critical => error!(task, op, critical = true, "{}", entry.message),
        }
        self.sink.append(&entry);
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message, Map::new());
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Info, message, Map::new());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message, Map::new());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Error, message, Map::new());
    }

    pub fn critical(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Critical, message, Map::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_carry_task_and_operation() {
        let mut sink = MemorySink::new();
        {
            let mut journal = Journal::for_task(&mut sink, "task_7");
            journal.info("opening");
            journal.set_operation(Some("extrude"));
            journal.warn("thin wall");
        }
        assert_eq!(sink.entries.len(), 2);
        assert_eq!(sink.entries[0].operation, None);
        assert_eq!(sink.entries[1].operation.as_deref(), Some("extrude"));
        assert_eq!(sink.entries[1].task_id.as_deref(), Some("task_7"));
        assert_eq!(sink.at_level(LogLevel::Warning).len(), 1);
    }

    #[test]
    fn context_is_kept() {
        let mut sink = MemorySink::new();
        let mut context = Map::new();
        context.insert("count".to_string(), Value::from(3));
        Journal::new(&mut sink).log(LogLevel::Debug, "pattern", context);
        assert_eq!(sink.entries[0].context["count"], 3);
    }
}
