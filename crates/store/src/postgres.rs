use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use common::{ReservationId, SagaId};
use domain::{Reservation, ReservationStatus, ReservationView};
use saga::{Payload, SagaState, Step, StepStatus};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    ConsumptionLedger, OutboxEvent, OutboxWriter, ReservationRepository, Result, SagaRepository,
    Store, StoreError, UnitOfWork,
};

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    type Unit = PgUnitOfWork;

    async fn begin(&self) -> Result<PgUnitOfWork> {
        Ok(PgUnitOfWork {
            tx: self.pool.begin().await?,
        })
    }
}

/// Unit of work over one PostgreSQL transaction.
///
/// sqlx rolls the transaction back when it is dropped uncommitted.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

fn row_to_saga(row: PgRow) -> Result<SagaState> {
    let payload: Payload = serde_json::from_value(row.try_get("payload")?)?;
    let step_status: BTreeMap<Step, StepStatus> =
        serde_json::from_value(row.try_get("step_status")?)?;
    let current_step: String = row.try_get("current_step")?;
    let saga_status: String = row.try_get("saga_status")?;

    Ok(SagaState::restore(
        SagaId::from_uuid(row.try_get::<Uuid, _>("id")?),
        row.try_get("version")?,
        row.try_get("type")?,
        payload,
        (!current_step.is_empty()).then(|| Step::new(current_step)),
        step_status,
        saga_status
            .parse()
            .map_err(|e: saga::SagaError| StoreError::CorruptRow(e.to_string()))?,
    ))
}

fn row_to_view(row: PgRow) -> Result<ReservationView> {
    let status: String = row.try_get("status")?;

    Ok(ReservationView {
        id: ReservationId::from_uuid(row.try_get::<Uuid, _>("id")?),
        hotel_id: row.try_get("hotel_id")?,
        room_id: row.try_get("room_id")?,
        guest_id: row.try_get("guest_id")?,
        status: status
            .parse()
            .map_err(|e: domain::DomainError| StoreError::CorruptRow(e.to_string()))?,
    })
}

fn current_step_column(saga: &SagaState) -> &str {
    saga.current_step().map(Step::as_str).unwrap_or_default()
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl SagaRepository for PgUnitOfWork {
    async fn insert_saga(&mut self, saga: &SagaState) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sagastate (id, version, type, payload, current_step, step_status, saga_status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(saga.id().as_uuid())
        .bind(saga.version())
        .bind(saga.saga_type())
        .bind(serde_json::to_value(saga.payload())?)
        .bind(current_step_column(saga))
        .bind(serde_json::to_value(saga.step_status())?)
        .bind(saga.saga_status().as_str())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn update_saga(
        &mut self,
        saga: &SagaState,
        expected_version: Option<i64>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE sagastate
            SET version = $1, payload = $2, current_step = $3, step_status = $4, saga_status = $5
            WHERE id = $6 AND ($7::BIGINT IS NULL OR version = $7)
            "#,
        )
        .bind(saga.version())
        .bind(serde_json::to_value(saga.payload())?)
        .bind(current_step_column(saga))
        .bind(serde_json::to_value(saga.step_status())?)
        .bind(saga.saga_status().as_str())
        .bind(saga.id().as_uuid())
        .bind(expected_version)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        let actual: Option<i64> = sqlx::query_scalar("SELECT version FROM sagastate WHERE id = $1")
            .bind(saga.id().as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;

        match (actual, expected_version) {
            (Some(actual), Some(expected)) => Err(StoreError::ConcurrencyConflict {
                saga_id: saga.id(),
                expected,
                actual,
            }),
            _ => Err(StoreError::SagaNotFound(saga.id())),
        }
    }

    async fn find_saga(&mut self, id: SagaId) -> Result<Option<SagaState>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, version, type, payload, current_step, step_status, saga_status
            FROM sagastate
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(row_to_saga).transpose()
    }
}

#[async_trait]
impl ReservationRepository for PgUnitOfWork {
    async fn insert_reservation(&mut self, reservation: &Reservation) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reservation (id, hotel_id, room_id, start_date, end_date, status, guest_id, payment_due, credit_card_no)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(reservation.id.as_uuid())
        .bind(reservation.hotel_id)
        .bind(reservation.room_id)
        .bind(&reservation.start_date)
        .bind(&reservation.end_date)
        .bind(reservation.status.as_str())
        .bind(reservation.guest_id)
        .bind(reservation.payment_due)
        .bind(&reservation.credit_card_no)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn update_reservation_status(
        &mut self,
        id: ReservationId,
        status: ReservationStatus,
    ) -> Result<()> {
        let result = sqlx::query("UPDATE reservation SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ReservationNotFound(id));
        }
        Ok(())
    }

    async fn find_reservation(&mut self, id: ReservationId) -> Result<Option<ReservationView>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, hotel_id, room_id, guest_id, status
            FROM reservation
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(row_to_view).transpose()
    }
}

#[async_trait]
impl OutboxWriter for PgUnitOfWork {
    async fn persist_outbox(&mut self, event: &OutboxEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO outboxevent (id, timestamp, aggregatetype, aggregateid, type, payload)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event.id)
        .bind(event.timestamp)
        .bind(&event.aggregate_type)
        .bind(&event.aggregate_id)
        .bind(event.event_type.as_str())
        .bind(serde_json::to_value(&event.payload)?)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ConsumptionLedger for PgUnitOfWork {
    async fn is_consumed(&mut self, event_id: &str) -> Result<bool> {
        let consumed: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM eventlog WHERE event_id = $1)")
                .bind(event_id)
                .fetch_one(&mut *self.tx)
                .await?;

        if consumed {
            tracing::debug!(event_id, "event already consumed");
        }
        Ok(consumed)
    }

    async fn consume(&mut self, event_id: &str) -> Result<()> {
        sqlx::query("INSERT INTO eventlog (event_id, issued_on) VALUES ($1, $2)")
            .bind(event_id)
            .bind(Utc::now())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    return StoreError::DuplicateEvent(event_id.to_string());
                }
                StoreError::Database(e)
            })?;

        Ok(())
    }
}
