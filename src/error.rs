//! Crate-wide error type.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecallError {
    #[error("unknown address: {0}")]
    UnknownAddress(String),

    #[error("cyclic chunk definition: {0}")]
    CyclicChunkDefinition(String),

    #[error("invalid activation {value} at {key}")]
    InvalidActivation { key: String, value: f64 },

    #[error("duplicate address: {0}")]
    DuplicateAddress(String),

    #[error("invalid chunk: {0}")]
    InvalidChunk(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, RecallError>;

impl RecallError {
    /// Errors a driver may absorb as a "no response" outcome.
    pub fn is_stimulus_failure(&self) -> bool {
        matches!(
            self,
            RecallError::UnknownAddress(_) | RecallError::InvalidActivation { .. }
        )
    }
}
