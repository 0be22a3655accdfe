use common::{ReservationId, SagaId};
use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The saga row changed since it was loaded.
    #[error(
        "Concurrency conflict for saga {saga_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        saga_id: SagaId,
        expected: i64,
        actual: i64,
    },

    /// The saga was not found.
    #[error("Saga not found: {0}")]
    SagaNotFound(SagaId),

    /// The reservation was not found.
    #[error("Reservation not found: {0}")]
    ReservationNotFound(ReservationId),

    /// The event id is already recorded in the consumption ledger.
    #[error("Event already consumed: {0}")]
    DuplicateEvent(String),

    /// A persisted row could not be decoded.
    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    /// A failure injected by the in-memory store.
    #[error("Injected failure: {0}")]
    Injected(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
