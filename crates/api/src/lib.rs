//! HTTP surface and process wiring for the reservation saga service.
//!
//! Provides the reservation endpoints, the participant result ingestion
//! stages, structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod ingestion;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use orchestrator::{OrchestratorConfig, ReservationController};
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::reservations::AppState;

/// Creates the Axum application router with all routes and shared state.
///
/// Reservation routes are served both under `/api/v1` and at the root.
pub fn create_app<S: Store + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/reservations", post(routes::reservations::create::<S>))
        .route("/reservations/{id}", get(routes::reservations::get::<S>))
        .route("/api/v1/reservations", post(routes::reservations::create::<S>))
        .route("/api/v1/reservations/{id}", get(routes::reservations::get::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state around `store`.
pub fn create_state<S: Store>(store: S, config: Arc<OrchestratorConfig>) -> Arc<AppState<S>> {
    Arc::new(AppState {
        controller: ReservationController::new(store, config),
    })
}
