use thiserror::Error;

/// Errors raised while turning raw stream messages into typed events.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The message body is not a valid payload.
    #[error("Failed to decode payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// The message carries no correlation key.
    #[error("Message has no key")]
    MissingKey,

    /// A required header is absent.
    #[error("Message has no '{0}' header")]
    MissingHeader(&'static str),

    /// A header or key is present but unusable.
    #[error("Invalid '{name}': {reason}")]
    InvalidField { name: &'static str, reason: String },

    /// The underlying transport failed to deliver a message.
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;
