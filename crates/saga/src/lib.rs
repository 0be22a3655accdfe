//! Orchestrator-side saga state machine.
//!
//! A saga walks a fixed [`StepSequence`] forward while participants report
//! success, and backward (compensating) as soon as one of them fails:
//!
//! ```text
//! room-booking ──► payment ──► (done, COMPLETED)
//!      ▲              │
//!      └── CANCEL ◄───┘ payment FAILED (ABORTING ──► ABORTED)
//! ```
//!
//! This crate is pure: it computes transitions and the commands they imply,
//! persistence and delivery live in the `store` and `orchestrator` crates.

pub mod definition;
pub mod error;
pub mod room_reservation;
pub mod state;
pub mod status;
pub mod step;

pub use definition::SagaDefinition;
pub use error::{Result, SagaError};
pub use state::{CommandKind, PAYLOAD_TYPE_KEY, Payload, SagaState, StepCommand, Transition};
pub use status::{SagaStatus, StepStatus, derive_status};
pub use step::{Step, StepSequence};
