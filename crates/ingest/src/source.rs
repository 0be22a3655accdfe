use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::envelope::RawMessage;
use crate::error::Result;

/// One subscribed stream of raw messages.
///
/// Messages are read one at a time, in stream order.
#[async_trait]
pub trait MessageSource: Send + 'static {
    /// Waits for the next message.
    ///
    /// Returns `None` once the stream has ended. A transport error is
    /// reported as `Some(Err(_))` and does not end the stream.
    async fn next_message(&mut self) -> Option<Result<RawMessage>>;
}

/// In-process source fed through a channel.
///
/// Used by tests and by anything that already holds raw messages.
pub struct ChannelSource {
    rx: mpsc::Receiver<RawMessage>,
}

impl ChannelSource {
    /// Creates a source and the sender that feeds it.
    ///
    /// The source ends once every sender is dropped.
    pub fn new(buffer: usize) -> (mpsc::Sender<RawMessage>, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (tx, Self { rx })
    }
}

#[async_trait]
impl MessageSource for ChannelSource {
    async fn next_message(&mut self) -> Option<Result<RawMessage>> {
        self.rx.recv().await.map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_source_yields_in_order_then_ends() {
        let (tx, mut source) = ChannelSource::new(4);
        tx.send(RawMessage::new("a", "1")).await.unwrap();
        tx.send(RawMessage::new("b", "2")).await.unwrap();
        drop(tx);

        let first = source.next_message().await.unwrap().unwrap();
        let second = source.next_message().await.unwrap().unwrap();
        assert_eq!(first.key.as_deref(), Some("a".as_bytes()));
        assert_eq!(second.value, b"2");
        assert!(source.next_message().await.is_none());
    }
}
