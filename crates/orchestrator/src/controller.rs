//! Reservation saga controller.

use std::sync::Arc;

use common::{ReservationId, SagaId};
use domain::{Reservation, ReservationCommand, ReservationStatus, ReservationView};
use ingest::{StepEvent, StepPayload};
use saga::{SagaState, SagaStatus, StepStatus, Transition};
use store::{
    ConsumptionLedger, OutboxEvent, OutboxWriter, ReservationRepository, SagaRepository, Store,
    StoreError, UnitOfWork,
};
use tokio::sync::mpsc;

use crate::config::OrchestratorConfig;
use crate::error::{OrchestratorError, Result};

/// Identifiers of a freshly started reservation saga.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartedReservation {
    pub reservation_id: ReservationId,
    pub saga_id: SagaId,
}

/// What handling one participant result did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The event id was already consumed; nothing changed.
    Duplicate,
    /// No saga matches the correlation id; nothing changed.
    UnknownSaga,
    /// The saga had already terminated and terminated sagas are configured
    /// to ignore results; the event was only consumed.
    Terminated,
    /// The result was applied and the saga is now in `saga_status`.
    Applied { saga_status: SagaStatus },
}

/// Drives room reservation sagas.
///
/// Holds no state of its own besides the store handle and the immutable
/// configuration; it can be cloned freely and shared across tasks.
pub struct ReservationController<S: Store> {
    store: S,
    config: Arc<OrchestratorConfig>,
}

impl<S: Store + Clone> Clone for ReservationController<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S: Store> ReservationController<S> {
    /// Creates a new controller.
    pub fn new(store: S, config: Arc<OrchestratorConfig>) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Stores a pending reservation and starts its saga.
    ///
    /// The reservation, the saga and the request for the first step are
    /// committed together; on any failure none of them is persisted.
    #[tracing::instrument(skip(self, cmd), fields(hotel_id = cmd.hotel_id, room_id = cmd.room_id))]
    pub async fn create_saga(&self, cmd: ReservationCommand) -> Result<StartedReservation> {
        let reservation = Reservation::new(cmd);
        let definition = &self.config.definition;
        let first_step = definition.steps().first().clone();
        let payload = reservation.to_payload();

        let saga = SagaState::create(definition.saga_type(), payload.clone(), first_step.clone());
        let request = OutboxEvent::new(
            saga.id().to_string(),
            first_step.as_str(),
            saga::CommandKind::Request,
            payload,
        );

        let mut uow = self.store.begin().await?;
        uow.insert_reservation(&reservation).await?;
        uow.insert_saga(&saga).await?;
        uow.persist_outbox(&request).await?;
        uow.commit().await?;

        metrics::counter!("saga_started_total").increment(1);
        tracing::info!(
            reservation_id = %reservation.id,
            saga_id = %saga.id(),
            step = %first_step,
            "saga started"
        );

        Ok(StartedReservation {
            reservation_id: reservation.id,
            saga_id: saga.id(),
        })
    }

    /// Applies one participant result to the saga it is correlated with.
    ///
    /// Runs in a single unit of work: the saga update, any follow-up command,
    /// the reservation's terminal status and the ledger marker for `event_id`
    /// commit together. On error nothing is committed and the event stays
    /// unconsumed, so a redelivery retries it.
    #[tracing::instrument(skip(self), fields(saga_status = tracing::field::Empty))]
    pub async fn on_step_event(
        &self,
        correlation_id: &str,
        event_id: &str,
        status: StepStatus,
    ) -> Result<StepOutcome> {
        metrics::counter!("saga_step_events_total").increment(1);

        let mut uow = self.store.begin().await?;

        if uow.is_consumed(event_id).await? {
            metrics::counter!("saga_step_events_duplicate_total").increment(1);
            tracing::debug!("event already applied");
            return Ok(StepOutcome::Duplicate);
        }

        let saga = match correlation_id.parse::<SagaId>() {
            Ok(saga_id) => uow.find_saga(saga_id).await?,
            Err(_) => None,
        };
        let Some(mut saga) = saga else {
            metrics::counter!("saga_step_events_unknown_total").increment(1);
            tracing::warn!("no saga for event");
            return Ok(StepOutcome::UnknownSaga);
        };

        if self.config.ignore_terminated_results && saga.current_step().is_none() {
            tracing::info!(saga_status = %saga.saga_status(), "saga already terminated");
            if !mark_consumed(&mut uow, event_id).await? {
                return Ok(StepOutcome::Duplicate);
            }
            uow.commit().await?;
            return Ok(StepOutcome::Terminated);
        }

        let loaded_version = saga.version();
        let transition = saga.apply_step_result(self.config.definition.steps(), status);

        if let Some(cmd) = transition.command() {
            uow.persist_outbox(&OutboxEvent::for_command(saga.id(), cmd))
                .await?;
        }

        saga.increment_version();
        let expected_version = self.config.optimistic_locking.then_some(loaded_version);
        uow.update_saga(&saga, expected_version).await?;

        self.update_reservation_status(&mut uow, &saga).await?;

        if !mark_consumed(&mut uow, event_id).await? {
            return Ok(StepOutcome::Duplicate);
        }
        uow.commit().await?;

        let saga_status = saga.saga_status();
        tracing::Span::current().record("saga_status", saga_status.as_str());
        match saga_status {
            SagaStatus::Completed => metrics::counter!("saga_completed_total").increment(1),
            SagaStatus::Aborted => metrics::counter!("saga_aborted_total").increment(1),
            SagaStatus::Started | SagaStatus::Aborting => {}
        }
        match transition {
            Transition::Advance(ref cmd) | Transition::Compensate(ref cmd) => tracing::info!(
                saga_id = %saga.id(),
                step = %cmd.step,
                command = %cmd.kind,
                "saga moved"
            ),
            Transition::Exhausted => tracing::info!(saga_id = %saga.id(), "saga finished"),
            Transition::Recorded => tracing::debug!(saga_id = %saga.id(), "step status recorded"),
        }

        Ok(StepOutcome::Applied { saga_status })
    }

    async fn update_reservation_status(&self, uow: &mut S::Unit, saga: &SagaState) -> Result<()> {
        let status = match saga.saga_status() {
            SagaStatus::Completed => ReservationStatus::Succeeded,
            SagaStatus::Aborted => ReservationStatus::Failed,
            SagaStatus::Started | SagaStatus::Aborting => return Ok(()),
        };

        let Some(reservation_id) = Reservation::id_from_payload(saga.payload()) else {
            tracing::warn!(saga_id = %saga.id(), "saga payload carries no reservation id");
            return Ok(());
        };

        uow.update_reservation_status(reservation_id, status).await?;
        Ok(())
    }

    /// Returns the current view of a reservation.
    #[tracing::instrument(skip(self))]
    pub async fn get_reservation(&self, id: ReservationId) -> Result<ReservationView> {
        let mut uow = self.store.begin().await?;
        uow.find_reservation(id)
            .await?
            .ok_or(OrchestratorError::ReservationNotFound(id))
    }

    /// Feeds every event from an ingestion stage into [`on_step_event`](Self::on_step_event).
    ///
    /// Events are handled one at a time in arrival order. Failures are only
    /// logged; the loop ends when the stage closes its channel.
    pub async fn run_ingestion<T: StepPayload>(&self, mut events: mpsc::Receiver<StepEvent<T>>) {
        while let Some(event) = events.recv().await {
            if let Err(e) = self
                .on_step_event(&event.correlation_id, &event.event_id, event.step_status())
                .await
            {
                tracing::error!(
                    correlation_id = %event.correlation_id,
                    event_id = %event.event_id,
                    error = %e,
                    "failed to apply step event"
                );
            }
        }
    }
}

/// Records `event_id` in the ledger.
///
/// Returns false if a concurrent unit of work recorded it first; the caller
/// must then drop its unit of work without committing.
async fn mark_consumed<U: UnitOfWork>(uow: &mut U, event_id: &str) -> Result<bool> {
    match uow.consume(event_id).await {
        Ok(()) => Ok(true),
        Err(StoreError::DuplicateEvent(_)) => {
            metrics::counter!("saga_step_events_duplicate_total").increment(1);
            tracing::debug!("event applied concurrently");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}
