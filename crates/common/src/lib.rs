//! Identifier types shared across the reservation saga crates.

pub mod types;

pub use types::{ReservationId, SagaId};
