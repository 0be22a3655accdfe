//! Transactional persistence for the saga orchestrator.
//!
//! Every piece of state the orchestrator touches while handling one request
//! or one inbound event goes through a single [`UnitOfWork`]: the saga row,
//! the reservation, the outbox command and the consumption ledger marker are
//! committed together or not at all.

pub mod error;
pub mod ledger;
pub mod memory;
pub mod outbox;
pub mod postgres;
pub mod repository;
pub mod store;

pub use error::{Result, StoreError};
pub use ledger::{ConsumptionLedger, ConsumptionRecord};
pub use memory::{InMemoryStore, InMemoryUnitOfWork};
pub use outbox::{OutboxEvent, OutboxWriter};
pub use postgres::{PgUnitOfWork, PostgresStore};
pub use repository::{ReservationRepository, SagaRepository};
pub use store::{Store, UnitOfWork};
