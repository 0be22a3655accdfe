//! Typed ingestion of participant result streams.
//!
//! An [`Ingester`] pulls [`RawMessage`]s from one [`MessageSource`], decodes
//! each into a [`StepEvent`] for a payload kind implementing [`StepPayload`]
//! and hands the typed events to the orchestrator through a bounded channel.
//! Messages that cannot be decoded are logged and dropped.

pub mod envelope;
pub mod error;
pub mod ingester;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod payload;
pub mod source;

pub use envelope::{EVENT_ID_HEADER, RawMessage, StepEvent};
pub use error::{IngestError, Result};
pub use ingester::Ingester;
#[cfg(feature = "kafka")]
pub use kafka::{KafkaSource, KafkaSourceConfig};
pub use payload::{BookingEvent, PaymentEvent, StepPayload};
pub use source::{ChannelSource, MessageSource};
