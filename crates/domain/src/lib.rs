//! Domain layer for hotel room reservations.
//!
//! This crate provides:
//! - The `Reservation` aggregate the room reservation saga drives to a terminal status
//! - The command and read view exposed over HTTP
//! - The result payloads published by the room booking and payment participants

pub mod error;
pub mod participant;
pub mod reservation;

pub use error::DomainError;
pub use participant::{BookingEventPayload, BookingStatus, PaymentEventPayload, PaymentStatus};
pub use reservation::{Reservation, ReservationCommand, ReservationStatus, ReservationView};
