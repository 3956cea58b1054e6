use cad_authority::AuthorityError;
use profile_synth::SynthError;
use thiserror::Error;

/// Why a single operation could not be carried out.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("Unknown operation type: {kind}")]
    UnknownOperation { kind: String },

    #[error("invalid parameters: {reason}")]
    InvalidParams { reason: String },

    #[error("no {what} available in component '{component}'")]
    Missing {
        what: &'static str,
        component: String,
    },

    #[error("{what} index {index} out of range ({count} available)")]
    OutOfRange {
        what: &'static str,
        index: i64,
        count: usize,
    },

    #[error("resolution failed: {reason}")]
    ResolutionFailed { reason: String },

    #[error("Component not found: {name}")]
    UnknownComponent { name: String },

    #[error("invalid component name '{name}': {reason}")]
    ComponentName { name: String, reason: String },

    #[error(transparent)]
    Synth(#[from] SynthError),

    #[error(transparent)]
    Authority(#[from] AuthorityError),
}

impl OperationError {
    /// Whether the host itself failed, so the task must stop.
    pub fn is_host_fatal(&self) -> bool {
        matches!(self, OperationError::Authority(e) if e.is_host_fatal())
    }

    /// The geometry name is not bound to any synthesizer.
    pub fn is_unknown_geometry(&self) -> bool {
        matches!(self, OperationError::Synth(SynthError::UnknownFamily { .. }))
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        OperationError::InvalidParams {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for OperationError {
    fn from(e: serde_json::Error) -> Self {
        OperationError::InvalidParams {
            reason: e.to_string(),
        }
    }
}
