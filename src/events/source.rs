use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, info};

use super::error::PublishError;

/// A subscription delivering raw message payloads one at a time.
pub trait MessageSource: Send + Sync {
    /// Waits for the next payload. `None` once the subscription has ended or was unsubscribed.
    fn next_message(&self) -> impl std::future::Future<Output = Option<Vec<u8>>> + Send;

    /// Stops delivery of new messages. Idempotent.
    fn unsubscribe(&self) -> impl std::future::Future<Output = ()> + Send;

    /// Releases the underlying connection, discarding anything still buffered. Idempotent.
    fn drain(&self) -> impl std::future::Future<Output = ()> + Send;
}

/// Creates a bounded subscription channel.
///
/// The publisher side is handed to whatever receives pushes from the bus; the source side
/// is read by the consumer loop.
pub fn channel(capacity: usize) -> (ChannelPublisher, ChannelSource) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let (stop_tx, stop_rx) = watch::channel(false);

    (
        ChannelPublisher {
            tx,
            stopped: stop_rx.clone(),
        },
        ChannelSource {
            rx: Mutex::new(rx),
            stop_tx,
            stop_rx,
        },
    )
}

/// Feeding side of [`channel`].
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    tx: mpsc::Sender<Vec<u8>>,
    stopped: watch::Receiver<bool>,
}

impl ChannelPublisher {
    /// Enqueues a payload, waiting for capacity if the channel is full.
    pub async fn publish(&self, payload: Vec<u8>) -> Result<(), PublishError> {
        if self.is_closed() {
            return Err(PublishError::Closed);
        }
        self.tx.send(payload).await.map_err(|_| PublishError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        *self.stopped.borrow() || self.tx.is_closed()
    }
}

/// [`MessageSource`] backed by a bounded `tokio::sync::mpsc` channel.
#[derive(Debug)]
pub struct ChannelSource {
    rx: Mutex<mpsc::Receiver<Vec<u8>>>,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
}

impl ChannelSource {
    pub fn is_unsubscribed(&self) -> bool {
        *self.stop_rx.borrow()
    }
}

impl MessageSource for ChannelSource {
    async fn next_message(&self) -> Option<Vec<u8>> {
        let mut stop = self.stop_rx.clone();
        if *stop.borrow_and_update() {
            return None;
        }

        let mut rx = self.rx.lock().await;
        tokio::select! {
            biased;
            _ = stop.wait_for(|stopped| *stopped) => None,
            message = rx.recv() => message,
        }
    }

    async fn unsubscribe(&self) {
        if !self.stop_tx.send_replace(true) {
            info!("Unsubscribed from submission events");
        }
    }

    async fn drain(&self) {
        self.stop_tx.send_replace(true);

        let mut rx = self.rx.lock().await;
        rx.close();
        let mut discarded = 0usize;
        while rx.try_recv().is_ok() {
            discarded += 1;
        }
        debug!(discarded, "Subscription channel drained");
    }
}
