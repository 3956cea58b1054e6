use thiserror::Error;

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("Unknown geometry type: {name}")]
    UnknownFamily { name: String },

    #[error("Invalid {family} parameters: {reason}")]
    InvalidParams { family: &'static str, reason: String },

    #[error("Degenerate {family}: {reason}")]
    Degenerate { family: &'static str, reason: String },
}

impl SynthError {
    pub(crate) fn degenerate(family: &'static str, reason: impl Into<String>) -> Self {
        SynthError::Degenerate {
            family,
            reason: reason.into(),
        }
    }
}
