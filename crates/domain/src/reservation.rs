//! The reservation aggregate.

use std::str::FromStr;

use common::ReservationId;
use saga::{CommandKind, PAYLOAD_TYPE_KEY, Payload};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::DomainError;

/// Lifecycle of a reservation.
///
/// ```text
/// Pending ──┬──► Succeeded
///           └──► Failed
/// ```
///
/// Only the orchestrator moves a reservation out of `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    /// The saga is still running.
    #[default]
    Pending,
    /// Room booked and paid (terminal state).
    Succeeded,
    /// The saga aborted and was rolled back (terminal state).
    Failed,
}

impl ReservationStatus {
    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReservationStatus::Succeeded | ReservationStatus::Failed)
    }

    /// Returns the status name as stored and transmitted.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "PENDING",
            ReservationStatus::Succeeded => "SUCCEEDED",
            ReservationStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ReservationStatus::Pending),
            "SUCCEEDED" => Ok(ReservationStatus::Succeeded),
            "FAILED" => Ok(ReservationStatus::Failed),
            other => Err(DomainError::UnknownReservationStatus(other.to_string())),
        }
    }
}

/// Request to reserve a room for a guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationCommand {
    pub hotel_id: i64,
    pub room_id: i64,
    pub start_date: String,
    pub end_date: String,
    pub guest_id: i64,
    pub payment_due: i64,
    pub credit_card_no: String,
}

/// A guest's reservation of a hotel room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    #[serde(rename = "reservationId")]
    pub id: ReservationId,
    pub hotel_id: i64,
    pub room_id: i64,
    pub start_date: String,
    pub end_date: String,
    pub status: ReservationStatus,
    pub guest_id: i64,
    pub payment_due: i64,
    pub credit_card_no: String,
}

impl Reservation {
    /// Creates a new pending reservation from a command.
    pub fn new(cmd: ReservationCommand) -> Self {
        Self {
            id: ReservationId::new(),
            hotel_id: cmd.hotel_id,
            room_id: cmd.room_id,
            start_date: cmd.start_date,
            end_date: cmd.end_date,
            status: ReservationStatus::Pending,
            guest_id: cmd.guest_id,
            payment_due: cmd.payment_due,
            credit_card_no: cmd.credit_card_no,
        }
    }

    /// Serializes the reservation into the document carried by the saga,
    /// tagged as a `REQUEST` for the participants.
    pub fn to_payload(&self) -> Payload {
        let mut payload = Payload::new();
        payload.insert("reservationId".into(), json!(self.id));
        payload.insert("hotelId".into(), json!(self.hotel_id));
        payload.insert("roomId".into(), json!(self.room_id));
        payload.insert("startDate".into(), json!(self.start_date));
        payload.insert("endDate".into(), json!(self.end_date));
        payload.insert("status".into(), json!(self.status));
        payload.insert("guestId".into(), json!(self.guest_id));
        payload.insert("paymentDue".into(), json!(self.payment_due));
        payload.insert("creditCardNo".into(), json!(self.credit_card_no));
        payload.insert(
            PAYLOAD_TYPE_KEY.into(),
            json!(CommandKind::Request.as_str()),
        );
        payload
    }

    /// Reads the reservation id embedded in a saga payload.
    pub fn id_from_payload(payload: &Payload) -> Option<ReservationId> {
        payload
            .get("reservationId")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
    }

    /// Returns the externally visible view of this reservation.
    pub fn view(&self) -> ReservationView {
        ReservationView {
            id: self.id,
            hotel_id: self.hotel_id,
            room_id: self.room_id,
            guest_id: self.guest_id,
            status: self.status,
        }
    }
}

/// Read model returned by `GET /reservations/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationView {
    #[serde(rename = "reservationId")]
    pub id: ReservationId,
    pub hotel_id: i64,
    pub room_id: i64,
    pub guest_id: i64,
    pub status: ReservationStatus,
}
