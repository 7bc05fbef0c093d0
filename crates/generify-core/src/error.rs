//! Error types for the inference engine

use thiserror::Error;

/// Errors surfaced by the analysis pipeline.
///
/// Cancellation is the only hard stop the engine itself raises, and it is a
/// normal outcome rather than a failure: no partial edits exist, since text
/// edits are only planned after solving completes. Everything else (bad
/// bindings, unimportable choices) degrades locally instead of erroring.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The progress host requested cancellation.
    #[error("analysis cancelled by host")]
    Cancelled,
}

impl InferenceError {
    /// True when the error is a host cancellation rather than a failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, InferenceError::Cancelled)
    }
}
