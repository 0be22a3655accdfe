//! Saga error types.

use thiserror::Error;

/// Errors raised by the saga state machine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SagaError {
    /// A step status string did not match the step-status vocabulary.
    #[error("Unknown step status: {0}")]
    UnknownStepStatus(String),

    /// A saga status string did not match the saga-status vocabulary.
    #[error("Unknown saga status: {0}")]
    UnknownSagaStatus(String),

    /// A command kind string was neither `REQUEST` nor `CANCEL`.
    #[error("Unknown command kind: {0}")]
    UnknownCommandKind(String),

    /// A saga definition was declared without any step.
    #[error("Saga definition '{0}' has no steps")]
    EmptySequence(String),

    /// A step name appears more than once in a sequence.
    #[error("Step '{0}' appears more than once in the sequence")]
    DuplicateStep(String),
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
