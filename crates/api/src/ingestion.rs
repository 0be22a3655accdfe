//! Wiring between participant result streams and the controller.

use ingest::{Ingester, MessageSource, StepPayload};
use orchestrator::ReservationController;
use store::Store;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Starts one ingestion stage over `source` and the loop applying its events.
///
/// The returned task ends once the stage stops, either because the source
/// ended or because `cancel` fired. Events already handed over are still
/// applied before it ends.
pub fn spawn_stage<S, T, M>(
    controller: ReservationController<S>,
    stream: &str,
    source: M,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    S: Store + Clone + 'static,
    T: StepPayload,
    M: MessageSource,
{
    let buffer = controller.config().ingest_buffer;
    let (events, stage) = Ingester::<T, M>::new(stream, source)
        .with_buffer(buffer)
        .spawn(cancel);
    let stream = stream.to_string();

    tokio::spawn(async move {
        controller.run_ingestion(events).await;
        if let Err(e) = stage.await {
            tracing::error!(%stream, error = %e, "ingestion stage panicked");
        }
    })
}

/// Subscribes to both participant result streams over Kafka.
#[cfg(feature = "kafka")]
pub fn spawn_kafka<S>(
    controller: ReservationController<S>,
    config: &crate::config::KafkaConfig,
    cancel: CancellationToken,
) -> ingest::Result<Vec<JoinHandle<()>>>
where
    S: Store + Clone + 'static,
{
    use domain::{BookingEventPayload, PaymentEventPayload};
    use ingest::{KafkaSource, KafkaSourceConfig};

    let source = |stream: &crate::config::StreamConfig| {
        KafkaSource::new(&KafkaSourceConfig {
            bootstrap_servers: config.bootstrap_servers.clone(),
            group_id: stream.group_id.clone(),
            topic: stream.topic.clone(),
        })
    };

    Ok(vec![
        spawn_stage::<S, BookingEventPayload, _>(
            controller.clone(),
            saga::room_reservation::STEP_ROOM_BOOKING,
            source(&config.room_booking)?,
            cancel.clone(),
        ),
        spawn_stage::<S, PaymentEventPayload, _>(
            controller,
            saga::room_reservation::STEP_PAYMENT,
            source(&config.payment)?,
            cancel,
        ),
    ])
}
