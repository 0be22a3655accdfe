//! Kafka transport for participant result streams.

use async_trait::async_trait;
use chrono::DateTime;
use rdkafka::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::{Headers, Message};
use tracing::info;

use crate::envelope::RawMessage;
use crate::error::{IngestError, Result};
use crate::source::MessageSource;

/// Connection settings for one subscribed topic.
#[derive(Debug, Clone)]
pub struct KafkaSourceConfig {
    pub bootstrap_servers: String,
    pub group_id: String,
    pub topic: String,
}

impl KafkaSourceConfig {
    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", &self.bootstrap_servers);
        config.set("group.id", &self.group_id);
        config.set("auto.offset.reset", "earliest");
        // Offsets are committed periodically, independent of whether the
        // controller committed its unit of work. A result whose unit of work
        // failed is only redelivered if the process stops before the next
        // auto commit; the ledger keeps redelivered results idempotent.
        config.set("enable.auto.commit", "true");
        config
    }
}

/// A consumer-group subscription to a single topic.
pub struct KafkaSource {
    consumer: StreamConsumer,
}

impl KafkaSource {
    /// Creates the consumer and subscribes it to the configured topic.
    pub fn new(config: &KafkaSourceConfig) -> Result<Self> {
        let consumer: StreamConsumer = config
            .client_config()
            .create()
            .map_err(|e| IngestError::Transport(format!("Failed to create consumer: {e}")))?;

        consumer
            .subscribe(&[config.topic.as_str()])
            .map_err(|e| IngestError::Transport(format!("Failed to subscribe: {e}")))?;

        info!(
            bootstrap_servers = %config.bootstrap_servers,
            group_id = %config.group_id,
            topic = %config.topic,
            "Subscribed to Kafka topic"
        );

        Ok(Self { consumer })
    }
}

#[async_trait]
impl MessageSource for KafkaSource {
    async fn next_message(&mut self) -> Option<Result<RawMessage>> {
        let message = match self.consumer.recv().await {
            Ok(message) => message,
            Err(e) => return Some(Err(IngestError::Transport(e.to_string()))),
        };

        let headers = message
            .headers()
            .map(|headers| {
                headers
                    .iter()
                    .map(|h| (h.key.to_string(), h.value.unwrap_or_default().to_vec()))
                    .collect()
            })
            .unwrap_or_default();

        Some(Ok(RawMessage {
            key: message.key().map(<[u8]>::to_vec),
            value: message.payload().unwrap_or_default().to_vec(),
            headers,
            timestamp: message
                .timestamp()
                .to_millis()
                .and_then(DateTime::from_timestamp_millis),
        }))
    }
}
