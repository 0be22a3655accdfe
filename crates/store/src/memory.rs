use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::{ReservationId, SagaId};
use domain::{Reservation, ReservationStatus, ReservationView};
use saga::SagaState;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    ConsumptionLedger, ConsumptionRecord, OutboxEvent, OutboxWriter, ReservationRepository,
    Result, SagaRepository, Store, StoreError, UnitOfWork,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    sagas: HashMap<SagaId, SagaState>,
    reservations: HashMap<ReservationId, Reservation>,
    outbox: Vec<OutboxEvent>,
    eventlog: HashMap<String, ConsumptionRecord>,
}

#[derive(Debug, Default)]
struct Faults {
    fail_reservation_updates: AtomicBool,
    fail_outbox_writes: AtomicBool,
}

/// In-memory store implementation for testing.
///
/// Units of work are fully serialized: a unit of work holds the lock over
/// every table until it is committed or dropped. Its writes are staged as a
/// delta that is merged into the shared tables on commit.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<Faults>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every reservation status update fail until reset.
    pub fn set_fail_reservation_updates(&self, fail: bool) {
        self.faults
            .fail_reservation_updates
            .store(fail, Ordering::SeqCst);
    }

    /// Makes every outbox write fail until reset.
    pub fn set_fail_outbox_writes(&self, fail: bool) {
        self.faults.fail_outbox_writes.store(fail, Ordering::SeqCst);
    }

    /// Returns the committed outbox rows in insertion order.
    pub async fn outbox_events(&self) -> Vec<OutboxEvent> {
        self.tables.lock().await.outbox.clone()
    }

    /// Returns the committed state of a saga.
    pub async fn saga(&self, id: SagaId) -> Option<SagaState> {
        self.tables.lock().await.sagas.get(&id).cloned()
    }

    /// Returns the number of committed sagas.
    pub async fn saga_count(&self) -> usize {
        self.tables.lock().await.sagas.len()
    }

    /// Returns the committed state of a reservation.
    pub async fn reservation(&self, id: ReservationId) -> Option<Reservation> {
        self.tables.lock().await.reservations.get(&id).cloned()
    }

    /// Returns the number of committed consumption records.
    pub async fn consumed_count(&self) -> usize {
        self.tables.lock().await.eventlog.len()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    type Unit = InMemoryUnitOfWork;

    async fn begin(&self) -> Result<InMemoryUnitOfWork> {
        let guard = self.tables.clone().lock_owned().await;
        Ok(InMemoryUnitOfWork {
            guard,
            staged: Tables::default(),
            faults: self.faults.clone(),
        })
    }
}

/// Unit of work over an [`InMemoryStore`].
///
/// Reads see the staged rows first, then the committed ones.
pub struct InMemoryUnitOfWork {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
    faults: Arc<Faults>,
}

impl InMemoryUnitOfWork {
    fn staged_saga(&mut self, id: SagaId) -> Option<&mut SagaState> {
        if !self.staged.sagas.contains_key(&id) {
            let committed = self.guard.sagas.get(&id)?.clone();
            self.staged.sagas.insert(id, committed);
        }
        self.staged.sagas.get_mut(&id)
    }

    fn staged_reservation(&mut self, id: ReservationId) -> Option<&mut Reservation> {
        if !self.staged.reservations.contains_key(&id) {
            let committed = self.guard.reservations.get(&id)?.clone();
            self.staged.reservations.insert(id, committed);
        }
        self.staged.reservations.get_mut(&id)
    }

    fn consumed(&self, event_id: &str) -> bool {
        self.staged.eventlog.contains_key(event_id) || self.guard.eventlog.contains_key(event_id)
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn commit(self) -> Result<()> {
        let Self {
            mut guard, staged, ..
        } = self;
        guard.sagas.extend(staged.sagas);
        guard.reservations.extend(staged.reservations);
        guard.outbox.extend(staged.outbox);
        guard.eventlog.extend(staged.eventlog);
        Ok(())
    }
}

#[async_trait]
impl SagaRepository for InMemoryUnitOfWork {
    async fn insert_saga(&mut self, saga: &SagaState) -> Result<()> {
        self.staged.sagas.insert(saga.id(), saga.clone());
        Ok(())
    }

    async fn update_saga(
        &mut self,
        saga: &SagaState,
        expected_version: Option<i64>,
    ) -> Result<()> {
        let stored = self
            .staged_saga(saga.id())
            .ok_or(StoreError::SagaNotFound(saga.id()))?;

        if let Some(expected) = expected_version
            && stored.version() != expected
        {
            return Err(StoreError::ConcurrencyConflict {
                saga_id: saga.id(),
                expected,
                actual: stored.version(),
            });
        }

        *stored = saga.clone();
        Ok(())
    }

    async fn find_saga(&mut self, id: SagaId) -> Result<Option<SagaState>> {
        Ok(self
            .staged
            .sagas
            .get(&id)
            .or_else(|| self.guard.sagas.get(&id))
            .cloned())
    }
}

#[async_trait]
impl ReservationRepository for InMemoryUnitOfWork {
    async fn insert_reservation(&mut self, reservation: &Reservation) -> Result<()> {
        self.staged
            .reservations
            .insert(reservation.id, reservation.clone());
        Ok(())
    }

    async fn update_reservation_status(
        &mut self,
        id: ReservationId,
        status: ReservationStatus,
    ) -> Result<()> {
        if self.faults.fail_reservation_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Injected(format!(
                "reservation {id} status update"
            )));
        }

        let reservation = self
            .staged_reservation(id)
            .ok_or(StoreError::ReservationNotFound(id))?;
        reservation.status = status;
        Ok(())
    }

    async fn find_reservation(&mut self, id: ReservationId) -> Result<Option<ReservationView>> {
        Ok(self
            .staged
            .reservations
            .get(&id)
            .or_else(|| self.guard.reservations.get(&id))
            .map(Reservation::view))
    }
}

#[async_trait]
impl OutboxWriter for InMemoryUnitOfWork {
    async fn persist_outbox(&mut self, event: &OutboxEvent) -> Result<()> {
        if self.faults.fail_outbox_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Injected(format!("outbox write {}", event.id)));
        }
        self.staged.outbox.push(event.clone());
        Ok(())
    }
}

#[async_trait]
impl ConsumptionLedger for InMemoryUnitOfWork {
    async fn is_consumed(&mut self, event_id: &str) -> Result<bool> {
        Ok(self.consumed(event_id))
    }

    async fn consume(&mut self, event_id: &str) -> Result<()> {
        if self.consumed(event_id) {
            return Err(StoreError::DuplicateEvent(event_id.to_string()));
        }
        self.staged
            .eventlog
            .insert(event_id.to_string(), ConsumptionRecord::new(event_id));
        Ok(())
    }
}
