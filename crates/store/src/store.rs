use async_trait::async_trait;

use crate::Result;
use crate::ledger::ConsumptionLedger;
use crate::outbox::OutboxWriter;
use crate::repository::{ReservationRepository, SagaRepository};

/// One connection-bound transaction.
///
/// Nothing written through a unit of work is visible to others until
/// [`commit`](UnitOfWork::commit). Dropping it without committing rolls
/// everything back.
#[async_trait]
pub trait UnitOfWork:
    SagaRepository + ReservationRepository + OutboxWriter + ConsumptionLedger + Send
{
    /// Makes every write of this unit of work durable.
    async fn commit(self) -> Result<()>;
}

/// Core trait for store implementations.
///
/// All implementations must be thread-safe (Send + Sync); units of work are
/// the only way to read or write data.
#[async_trait]
pub trait Store: Send + Sync {
    type Unit: UnitOfWork + 'static;

    /// Opens a new unit of work.
    async fn begin(&self) -> Result<Self::Unit>;
}
