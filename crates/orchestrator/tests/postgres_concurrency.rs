//! Concurrent step events against PostgreSQL
//!
//! These tests need Docker and share one PostgreSQL container. Run with:
//!
//! ```bash
//! cargo test -p orchestrator --test postgres_concurrency -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use common::SagaId;
use domain::{ReservationCommand, ReservationStatus};
use orchestrator::{OrchestratorConfig, ReservationController, StartedReservation, StepOutcome};
use saga::{SagaState, SagaStatus, StepStatus, room_reservation};
use sqlx::PgPool;
use store::{PostgresStore, SagaRepository, Store};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

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

async fn get_controller() -> ReservationController<PostgresStore> {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(8)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE sagastate, outboxevent, eventlog, reservation")
        .execute(&pool)
        .await
        .unwrap();

    ReservationController::new(
        PostgresStore::new(pool),
        Arc::new(OrchestratorConfig::default()),
    )
}

async fn start(controller: &ReservationController<PostgresStore>) -> StartedReservation {
    controller
        .create_saga(ReservationCommand {
            hotel_id: 9,
            room_id: 912,
            start_date: "2027-01-10".into(),
            end_date: "2027-01-14".into(),
            guest_id: 64,
            payment_due: 88_000,
            credit_card_no: "4000000000000077".into(),
        })
        .await
        .unwrap()
}

async fn load_saga(controller: &ReservationController<PostgresStore>, id: SagaId) -> SagaState {
    let mut uow = controller.store().begin().await.unwrap();
    uow.find_saga(id).await.unwrap().unwrap()
}

async fn outbox_count(controller: &ReservationController<PostgresStore>, step: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM outboxevent WHERE aggregatetype = $1")
        .bind(step)
        .fetch_one(controller.store().pool())
        .await
        .unwrap()
}

async fn eventlog_count(controller: &ReservationController<PostgresStore>) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM eventlog")
        .fetch_one(controller.store().pool())
        .await
        .unwrap()
}

async fn deliver_concurrently(
    controller: &ReservationController<PostgresStore>,
    saga_id: SagaId,
    event_ids: &[&str],
) -> Vec<StepOutcome> {
    let mut handles = Vec::new();
    for event_id in event_ids {
        let controller = controller.clone();
        let saga_id = saga_id.to_string();
        let event_id = event_id.to_string();
        handles.push(tokio::spawn(async move {
            controller
                .on_step_event(&saga_id, &event_id, StepStatus::Succeeded)
                .await
                .unwrap()
        }));
    }

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }
    outcomes
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires docker"]
async fn same_event_delivered_concurrently_applies_once() {
    let controller = get_controller().await;
    let started = start(&controller).await;

    let outcomes =
        deliver_concurrently(&controller, started.saga_id, &["rb-1", "rb-1", "rb-1", "rb-1"])
            .await;

    let applied = outcomes
        .iter()
        .filter(|o| matches!(o, StepOutcome::Applied { .. }))
        .count();
    assert_eq!(applied, 1);
    assert!(
        outcomes
            .iter()
            .all(|o| matches!(o, StepOutcome::Applied { .. } | StepOutcome::Duplicate))
    );

    assert_eq!(outbox_count(&controller, "payment").await, 1);
    assert_eq!(eventlog_count(&controller).await, 1);

    let saga = load_saga(&controller, started.saga_id).await;
    assert_eq!(saga.version(), 2);
    assert_eq!(saga.current_step(), Some(&room_reservation::payment()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires docker"]
async fn concurrent_successes_for_one_step_request_payment_once() {
    let controller = get_controller().await;
    let started = start(&controller).await;

    let outcomes = deliver_concurrently(&controller, started.saga_id, &["rb-a", "rb-b"]).await;

    // The row lock serializes both units of work: the second one sees the
    // saga already at payment and completes it instead of advancing again.
    assert!(
        outcomes
            .iter()
            .all(|o| matches!(o, StepOutcome::Applied { .. }))
    );
    assert_eq!(outbox_count(&controller, "payment").await, 1);
    assert_eq!(outbox_count(&controller, "room-booking").await, 1);
    assert_eq!(eventlog_count(&controller).await, 2);

    let saga = load_saga(&controller, started.saga_id).await;
    assert_eq!(saga.version(), 3);
    assert_eq!(saga.saga_status(), SagaStatus::Completed);
    assert_eq!(
        controller
            .get_reservation(started.reservation_id)
            .await
            .unwrap()
            .status,
        ReservationStatus::Succeeded
    );
}

#[tokio::test]
#[ignore = "requires docker"]
async fn terminated_saga_restarts_on_success() {
    let controller = get_controller().await;
    let started = start(&controller).await;
    let id = started.saga_id.to_string();

    controller
        .on_step_event(&id, "rb-1", StepStatus::Failed)
        .await
        .unwrap();
    let outcome = controller
        .on_step_event(&id, "rb-2", StepStatus::Succeeded)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        StepOutcome::Applied {
            saga_status: SagaStatus::Started
        }
    );

    let saga = load_saga(&controller, started.saga_id).await;
    assert_eq!(saga.version(), 3);
    assert_eq!(saga.current_step(), Some(&room_reservation::room_booking()));
    assert_eq!(
        saga.status_of(&saga::Step::new("")),
        Some(StepStatus::Succeeded)
    );
    assert_eq!(outbox_count(&controller, "room-booking").await, 2);
}
