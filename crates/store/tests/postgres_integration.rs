//! PostgreSQL integration tests
//!
//! These tests need Docker and share one PostgreSQL container. Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use common::{ReservationId, SagaId};
use domain::{Reservation, ReservationCommand, ReservationStatus};
use saga::{CommandKind, Payload, SagaState, SagaStatus, StepStatus, room_reservation};
use sqlx::PgPool;
use store::{
    ConsumptionLedger, OutboxEvent, OutboxWriter, PostgresStore, ReservationRepository,
    SagaRepository, Store, StoreError, UnitOfWork,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresStore::new(temp_pool.clone())
                .run_migrations()
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE sagastate, outboxevent, eventlog, reservation")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

fn reservation() -> Reservation {
    Reservation::new(ReservationCommand {
        hotel_id: 7,
        room_id: 701,
        start_date: "2026-12-20".into(),
        end_date: "2026-12-27".into(),
        guest_id: 99,
        payment_due: 120_000,
        credit_card_no: "5500000000000004".into(),
    })
}

fn saga_for(reservation: &Reservation) -> SagaState {
    SagaState::create(
        room_reservation::SAGA_TYPE,
        reservation.to_payload(),
        room_reservation::room_booking(),
    )
}

async fn outbox_count(store: &PostgresStore) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM outboxevent")
        .fetch_one(store.pool())
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "requires docker"]
async fn saga_roundtrip_preserves_all_columns() {
    let store = get_test_store().await;
    let r = reservation();
    let mut saga = saga_for(&r);

    let mut uow = store.begin().await.unwrap();
    uow.insert_saga(&saga).await.unwrap();
    uow.commit().await.unwrap();

    saga.apply_step_result(room_reservation::definition().steps(), StepStatus::Succeeded);
    saga.increment_version();

    let mut uow = store.begin().await.unwrap();
    uow.update_saga(&saga, None).await.unwrap();
    uow.commit().await.unwrap();

    let mut uow = store.begin().await.unwrap();
    let loaded = uow.find_saga(saga.id()).await.unwrap().unwrap();
    assert_eq!(loaded, saga);
    assert_eq!(loaded.current_step(), Some(&room_reservation::payment()));
    assert_eq!(loaded.saga_status(), SagaStatus::Started);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn terminated_saga_has_empty_current_step() {
    let store = get_test_store().await;
    let mut saga = saga_for(&reservation());
    saga.apply_step_result(room_reservation::definition().steps(), StepStatus::Failed);

    let mut uow = store.begin().await.unwrap();
    uow.insert_saga(&saga).await.unwrap();
    let loaded = uow.find_saga(saga.id()).await.unwrap().unwrap();
    assert_eq!(loaded.current_step(), None);
    assert_eq!(loaded.saga_status(), SagaStatus::Aborted);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn missing_saga_is_none() {
    let store = get_test_store().await;
    let mut uow = store.begin().await.unwrap();
    assert!(uow.find_saga(SagaId::new()).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn optimistic_version_check() {
    let store = get_test_store().await;
    let saga = saga_for(&reservation());

    let mut uow = store.begin().await.unwrap();
    uow.insert_saga(&saga).await.unwrap();

    let mut next = saga.clone();
    next.increment_version();
    uow.update_saga(&next, Some(1)).await.unwrap();

    let err = uow.update_saga(&next, Some(1)).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::ConcurrencyConflict {
            expected: 1,
            actual: 2,
            ..
        }
    ));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn ledger_deduplicates_event_ids() {
    let store = get_test_store().await;

    let mut uow = store.begin().await.unwrap();
    assert!(!uow.is_consumed("evt-1").await.unwrap());
    uow.consume("evt-1").await.unwrap();
    uow.commit().await.unwrap();

    let mut uow = store.begin().await.unwrap();
    assert!(uow.is_consumed("evt-1").await.unwrap());
    let err = uow.consume("evt-1").await.unwrap_err();
    assert!(matches!(err, StoreError::DuplicateEvent(_)));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn reservation_status_update_and_view() {
    let store = get_test_store().await;
    let r = reservation();

    let mut uow = store.begin().await.unwrap();
    uow.insert_reservation(&r).await.unwrap();
    uow.update_reservation_status(r.id, ReservationStatus::Succeeded)
        .await
        .unwrap();
    uow.commit().await.unwrap();

    let mut uow = store.begin().await.unwrap();
    let view = uow.find_reservation(r.id).await.unwrap().unwrap();
    assert_eq!(view.status, ReservationStatus::Succeeded);
    assert_eq!(view.room_id, 701);

    assert!(uow.find_reservation(ReservationId::new()).await.unwrap().is_none());
    assert!(matches!(
        uow.update_reservation_status(ReservationId::new(), ReservationStatus::Failed)
            .await,
        Err(StoreError::ReservationNotFound(_))
    ));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn uncommitted_unit_of_work_rolls_back() {
    let store = get_test_store().await;
    let r = reservation();
    let saga = saga_for(&r);

    {
        let mut uow = store.begin().await.unwrap();
        uow.insert_reservation(&r).await.unwrap();
        uow.insert_saga(&saga).await.unwrap();
        uow.persist_outbox(&OutboxEvent::new(
            saga.id().to_string(),
            room_reservation::STEP_ROOM_BOOKING,
            CommandKind::Request,
            Payload::new(),
        ))
        .await
        .unwrap();
    }

    assert_eq!(outbox_count(&store).await, 0);
    let mut uow = store.begin().await.unwrap();
    assert!(uow.find_saga(saga.id()).await.unwrap().is_none());
    assert!(uow.find_reservation(r.id).await.unwrap().is_none());
}
