//! Saga and reservation repositories, scoped to a unit of work.

use async_trait::async_trait;
use common::{ReservationId, SagaId};
use domain::{Reservation, ReservationStatus, ReservationView};
use saga::SagaState;

use crate::Result;

#[async_trait]
pub trait SagaRepository: Send {
    /// Inserts a new saga.
    async fn insert_saga(&mut self, saga: &SagaState) -> Result<()>;

    /// Overwrites a saga's mutable columns.
    ///
    /// With `expected_version` set, the write only succeeds if the stored
    /// version still equals it, otherwise `ConcurrencyConflict` is returned.
    /// Without it the row is overwritten unconditionally.
    async fn update_saga(&mut self, saga: &SagaState, expected_version: Option<i64>)
    -> Result<()>;

    /// Loads a saga, locking it for the rest of the unit of work.
    async fn find_saga(&mut self, id: SagaId) -> Result<Option<SagaState>>;
}

#[async_trait]
pub trait ReservationRepository: Send {
    async fn insert_reservation(&mut self, reservation: &Reservation) -> Result<()>;

    async fn update_reservation_status(
        &mut self,
        id: ReservationId,
        status: ReservationStatus,
    ) -> Result<()>;

    async fn find_reservation(&mut self, id: ReservationId) -> Result<Option<ReservationView>>;
}
