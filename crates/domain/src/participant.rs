//! Result payloads published by the saga participants.
//!
//! Each participant answers a command with a small JSON document holding
//! its local outcome, e.g. `{"status": "BOOKED"}`.

use serde::{Deserialize, Serialize};

/// Outcome reported by the room booking service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Booked,
    Rejected,
    Cancelled,
}

/// Room booking result message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingEventPayload {
    pub status: BookingStatus,
}

/// Outcome reported by the payment service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Requested,
    Completed,
    Failed,
    Cancelled,
}

/// Payment result message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEventPayload {
    pub status: PaymentStatus,
}
