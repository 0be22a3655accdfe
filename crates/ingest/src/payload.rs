//! Participant payload kinds and their mapping onto saga step statuses.

use domain::{BookingEventPayload, BookingStatus, PaymentEventPayload, PaymentStatus};
use saga::StepStatus;
use serde::de::DeserializeOwned;

use crate::envelope::StepEvent;
use crate::error::Result;

/// A participant result payload the ingestion pipeline can decode.
///
/// The pipeline is written once against this trait; each participant only
/// provides how its body is decoded and how its local outcome maps onto the
/// saga vocabulary.
pub trait StepPayload: DeserializeOwned + Send + 'static {
    /// Decodes a message body. JSON by default.
    fn decode(raw: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(raw)?)
    }

    /// Maps the participant outcome onto a step status.
    fn step_status(&self) -> StepStatus;
}

/// A decoded room booking result.
pub type BookingEvent = StepEvent<BookingEventPayload>;

/// A decoded payment result.
pub type PaymentEvent = StepEvent<PaymentEventPayload>;

impl StepPayload for BookingEventPayload {
    fn step_status(&self) -> StepStatus {
        match self.status {
            BookingStatus::Booked => StepStatus::Succeeded,
            BookingStatus::Rejected => StepStatus::Failed,
            BookingStatus::Cancelled => StepStatus::Compensated,
        }
    }
}

impl StepPayload for PaymentEventPayload {
    fn step_status(&self) -> StepStatus {
        match self.status {
            // The payment service reports REQUESTED once the charge is accepted.
            PaymentStatus::Requested | PaymentStatus::Completed => StepStatus::Succeeded,
            PaymentStatus::Failed => StepStatus::Failed,
            PaymentStatus::Cancelled => StepStatus::Compensated,
        }
    }
}
