//! Idempotent consumption ledger.
//!
//! Delivery is at-least-once. An inbound event id is recorded here in the
//! same transaction as the effects of processing it, so a record means the
//! event has been applied and a redelivery must be skipped. Checking and
//! recording outside that transaction voids the guarantee.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Marker for an inbound event that has been durably applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionRecord {
    pub event_id: String,
    pub issued_on: DateTime<Utc>,
}

impl ConsumptionRecord {
    pub fn new(event_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            issued_on: Utc::now(),
        }
    }
}

/// Deduplicates inbound events within the caller's transaction.
#[async_trait]
pub trait ConsumptionLedger: Send {
    /// Returns true if `event_id` has already been applied.
    async fn is_consumed(&mut self, event_id: &str) -> Result<bool>;

    /// Records `event_id` as applied.
    ///
    /// Fails with `DuplicateEvent` if it is already recorded.
    async fn consume(&mut self, event_id: &str) -> Result<()>;
}
