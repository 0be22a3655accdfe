//! Reservation service entry point.

use std::sync::Arc;

use api::config::{Config, LogFormat};
use metrics_exporter_prometheus::PrometheusHandle;
use orchestrator::{OrchestratorConfig, ReservationController};
use sqlx::postgres::PgPoolOptions;
use store::{InMemoryStore, PostgresStore, Store};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[cfg(feature = "kafka")]
fn start_ingestion<S: Store + Clone + 'static>(
    controller: ReservationController<S>,
    config: &Config,
    cancel: CancellationToken,
) -> Vec<tokio::task::JoinHandle<()>> {
    api::ingestion::spawn_kafka(controller, &config.kafka, cancel)
        .expect("failed to subscribe to participant result streams")
}

#[cfg(not(feature = "kafka"))]
fn start_ingestion<S: Store + Clone + 'static>(
    _controller: ReservationController<S>,
    _config: &Config,
    _cancel: CancellationToken,
) -> Vec<tokio::task::JoinHandle<()>> {
    tracing::warn!("built without the kafka feature, participant results are not consumed");
    Vec::new()
}

async fn serve<S: Store + Clone + 'static>(
    store: S,
    config: &Config,
    metrics_handle: PrometheusHandle,
) {
    let orchestrator_config = Arc::new(
        OrchestratorConfig::default()
            .with_optimistic_locking(config.optimistic_locking)
            .with_ignore_terminated_results(config.ignore_terminated_results),
    );
    let state = api::create_state(store, orchestrator_config);

    // Ingestion stages stop on shutdown; in-flight units of work finish first.
    let cancel = CancellationToken::new();
    let stages = start_ingestion(state.controller.clone(), config, cancel.clone());

    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting reservation service");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    cancel.cancel();
    for stage in stages {
        if let Err(e) = stage.await {
            tracing::error!(error = %e, "ingestion task failed");
        }
    }

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Pick the store and run
    match config.database_url.as_deref() {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(url)
                .await
                .expect("failed to connect to PostgreSQL");
            let store = PostgresStore::new(pool);
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL store");
            serve(store, &config, metrics_handle).await;
        }
        None => {
            tracing::warn!(
                "DATABASE_URL not set, using in-memory store; nothing survives a restart"
            );
            serve(InMemoryStore::new(), &config, metrics_handle).await;
        }
    }
}
