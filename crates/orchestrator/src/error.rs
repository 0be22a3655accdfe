use common::ReservationId;
use store::StoreError;
use thiserror::Error;

/// Errors surfaced by the orchestrator.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// No reservation exists with the requested id.
    #[error("Reservation not found: {0}")]
    ReservationNotFound(ReservationId),

    /// The unit of work failed and was rolled back.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for orchestrator operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;
