//! Transactional outbox.
//!
//! Commands for participants are never published directly. They are written
//! as outbox rows inside the same transaction as the state change that caused
//! them; a change-data-capture relay outside this system turns committed rows
//! into stream messages. Rows are never updated or deleted from here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::SagaId;
use saga::{CommandKind, Payload, StepCommand};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Result;

/// One command to be delivered downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Correlates the event with its saga instance.
    pub aggregate_id: String,
    /// Stream discriminator, the name of the step being commanded.
    pub aggregate_type: String,
    #[serde(rename = "type")]
    pub event_type: CommandKind,
    pub payload: Payload,
}

impl OutboxEvent {
    /// Creates a new outbox event with a fresh id and the current time.
    pub fn new(
        aggregate_id: impl Into<String>,
        aggregate_type: impl Into<String>,
        event_type: CommandKind,
        payload: Payload,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            aggregate_id: aggregate_id.into(),
            aggregate_type: aggregate_type.into(),
            event_type,
            payload,
        }
    }

    /// Builds the outbox row for a saga step command.
    pub fn for_command(saga_id: SagaId, cmd: &StepCommand) -> Self {
        Self::new(
            saga_id.to_string(),
            cmd.step.as_str(),
            cmd.kind,
            cmd.payload.clone(),
        )
    }
}

/// Writes outbox rows using the caller's open transaction, never its own.
#[async_trait]
pub trait OutboxWriter: Send {
    async fn persist_outbox(&mut self, event: &OutboxEvent) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use saga::room_reservation;

    #[test]
    fn test_for_command_addresses_step_stream() {
        let saga_id = SagaId::new();
        let cmd = StepCommand {
            step: room_reservation::payment(),
            kind: CommandKind::Request,
            payload: Payload::new(),
        };

        let event = OutboxEvent::for_command(saga_id, &cmd);
        assert_eq!(event.aggregate_id, saga_id.to_string());
        assert_eq!(event.aggregate_type, "payment");
        assert_eq!(event.event_type, CommandKind::Request);
    }

    #[test]
    fn test_events_get_unique_ids() {
        let a = OutboxEvent::new("a", "payment", CommandKind::Cancel, Payload::new());
        let b = OutboxEvent::new("a", "payment", CommandKind::Cancel, Payload::new());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_serialized_field_names() {
        let event = OutboxEvent::new("saga", "room-booking", CommandKind::Cancel, Payload::new());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["aggregateId"], "saga");
        assert_eq!(json["aggregateType"], "room-booking");
        assert_eq!(json["type"], "CANCEL");
    }
}
