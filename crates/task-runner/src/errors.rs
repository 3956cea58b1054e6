use std::path::PathBuf;

use cad_authority::AuthorityError;

/// Reasons a task could not be run at all. Each yields a `failed` result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TaskError {
    #[error("failed to read task file: {reason}")]
    Unreadable { reason: String },

    #[error("malformed task: {reason}")]
    Malformed {
        reason: String,
        /// Id recovered from the raw JSON, if any.
        task_id: Option<String>,
    },

    #[error("task has no task_id")]
    MissingId,

    #[error("failed to create document: {reason}")]
    Document { reason: String },
}

impl TaskError {
    /// The task id, when it could be read despite the error.
    pub fn task_id(&self) -> Option<&str> {
        match self {
            TaskError::Malformed { task_id, .. } => task_id.as_deref(),
            _ => None,
        }
    }
}

/// Failure of one export format. Recorded, never fatal on its own.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Unknown export format: {format}")]
    UnknownFormat { format: String },

    #[error("cannot create {path}: {reason}")]
    Directory { path: PathBuf, reason: String },

    #[error(transparent)]
    Authority(#[from] AuthorityError),
}

/// Failures of the runner's own file handling.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("failed to write {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("failed to remove task file {path}: {reason}")]
    Consume { path: PathBuf, reason: String },

    #[error("failed to list {path}: {reason}")]
    List { path: PathBuf, reason: String },
}

/// The host application failed mid-task. Nothing more is attempted for the
/// task and no result is written.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{reason}")]
pub struct HostFailure {
    pub reason: String,
}

impl From<AuthorityError> for HostFailure {
    fn from(e: AuthorityError) -> Self {
        HostFailure {
            reason: e.to_string(),
        }
    }
}

impl From<task_engine::OperationError> for HostFailure {
    fn from(e: task_engine::OperationError) -> Self {
        HostFailure {
            reason: e.to_string(),
        }
    }
}
