//! Orchestrator for the room reservation saga.
//!
//! The [`ReservationController`] starts a saga for every new reservation and
//! moves it forward or backward as participant results arrive. Each request
//! and each inbound event is handled inside one store unit of work.

pub mod config;
pub mod controller;
pub mod error;

pub use config::OrchestratorConfig;
pub use controller::{ReservationController, StartedReservation, StepOutcome};
pub use error::{OrchestratorError, Result};
