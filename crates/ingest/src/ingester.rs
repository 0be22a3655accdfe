use std::marker::PhantomData;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::envelope::StepEvent;
use crate::payload::StepPayload;
use crate::source::MessageSource;

/// Ingestion stage for one participant result stream.
///
/// Runs as its own task, reading messages sequentially from `source` and
/// handing typed events downstream through a bounded channel. A message
/// that cannot be decoded is logged and dropped; it is never retried.
pub struct Ingester<T, S> {
    stream: String,
    source: S,
    buffer: usize,
    _payload: PhantomData<fn() -> T>,
}

impl<T, S> Ingester<T, S>
where
    T: StepPayload,
    S: MessageSource,
{
    /// Creates a stage named `stream` over `source` with a handoff buffer of one.
    pub fn new(stream: impl Into<String>, source: S) -> Self {
        Self {
            stream: stream.into(),
            source,
            buffer: 1,
            _payload: PhantomData,
        }
    }

    /// Sets the size of the handoff buffer.
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }

    /// Starts the stage.
    ///
    /// The returned receiver closes once the source ends or `cancel` fires;
    /// the source is dropped at that point, releasing its subscription.
    pub fn spawn(self, cancel: CancellationToken) -> (mpsc::Receiver<StepEvent<T>>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(self.buffer);
        let handle = tokio::spawn(self.run(tx, cancel));
        (rx, handle)
    }

    async fn run(mut self, tx: mpsc::Sender<StepEvent<T>>, cancel: CancellationToken) {
        info!(stream = %self.stream, "ingestion started");

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => break,
                next = self.source.next_message() => next,
            };

            let raw = match next {
                Some(Ok(raw)) => raw,
                Some(Err(e)) => {
                    warn!(stream = %self.stream, error = %e, "failed to read message");
                    continue;
                }
                None => break,
            };

            let event = match StepEvent::<T>::from_raw(&raw) {
                Ok(event) => event,
                Err(e) => {
                    warn!(stream = %self.stream, error = %e, "dropping message");
                    metrics::counter!("ingest_messages_dropped_total", "stream" => self.stream.clone())
                        .increment(1);
                    continue;
                }
            };

            debug!(
                stream = %self.stream,
                event_id = %event.event_id,
                correlation_id = %event.correlation_id,
                "event received"
            );

            tokio::select! {
                _ = cancel.cancelled() => break,
                sent = tx.send(event) => {
                    if sent.is_err() {
                        debug!(stream = %self.stream, "receiver dropped");
                        break;
                    }
                }
            }
        }

        info!(stream = %self.stream, "ingestion stopped");
    }
}
