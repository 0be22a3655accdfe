//! Domain error types.

use thiserror::Error;

/// Errors that can occur while handling reservation data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    /// A reservation status string did not match any known status.
    #[error("Unknown reservation status: {0}")]
    UnknownReservationStatus(String),
}
