//! Reservation endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header::{LOCATION, RETRY_AFTER};
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri};
use common::ReservationId;
use domain::{ReservationCommand, ReservationView};
use orchestrator::ReservationController;
use serde::Serialize;
use store::Store;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub controller: ReservationController<S>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationAcceptedResponse {
    pub reservation_id: String,
}

/// POST /reservations: accept a reservation and start its saga.
///
/// Answers `202 Accepted` right away; the reservation stays `PENDING` until
/// the saga terminates. `Location` points at the new resource.
#[tracing::instrument(skip(state, payload))]
pub async fn create<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    uri: Uri,
    payload: Result<Json<ReservationCommand>, JsonRejection>,
) -> Result<(StatusCode, HeaderMap, Json<ReservationAcceptedResponse>), ApiError> {
    let Json(cmd) = payload.map_err(|e| {
        tracing::debug!(error = %e, "rejected reservation body");
        ApiError::BadRequest("Malformed JSON".to_string())
    })?;

    let started = state.controller.create_saga(cmd).await?;
    let reservation_id = started.reservation_id.to_string();

    let location = format!("{}/{}", uri.path().trim_end_matches('/'), reservation_id);
    let mut headers = HeaderMap::new();
    headers.insert(
        LOCATION,
        HeaderValue::from_str(&location).map_err(|e| ApiError::Internal(e.to_string()))?,
    );
    headers.insert(RETRY_AFTER, HeaderValue::from_static("0.5"));

    Ok((
        StatusCode::ACCEPTED,
        headers,
        Json(ReservationAcceptedResponse { reservation_id }),
    ))
}

/// GET /reservations/{id}: current view of a reservation.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ReservationView>, ApiError> {
    let id: ReservationId = id
        .parse()
        .map_err(|_| ApiError::NotFound("Reservation not found".to_string()))?;

    let view = state.controller.get_reservation(id).await?;
    Ok(Json(view))
}
