use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::detector::Detector;
use super::error::DetectionError;
use super::outcome::ConsumerStats;
use crate::embedding::Embedder;
use crate::events::{MessageSource, decode_event};
use crate::submissions::SubmissionStore;
use crate::vectordb::EmbeddingStore;

/// Requests a [`Consumer`] to stop after the message it is currently processing.
#[derive(Debug, Clone)]
pub struct ConsumerStop {
    tx: Arc<watch::Sender<bool>>,
}

impl ConsumerStop {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Sequential consumption loop: one message is fully processed before the next is read.
pub struct Consumer<E, V, S, M> {
    detector: Arc<Detector<E, V, S>>,
    source: Arc<M>,
    stop_tx: Arc<watch::Sender<bool>>,
}

impl<E, V, S, M> Consumer<E, V, S, M>
where
    E: Embedder,
    V: EmbeddingStore,
    S: SubmissionStore,
    M: MessageSource,
{
    pub fn new(detector: Arc<Detector<E, V, S>>, source: Arc<M>) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            detector,
            source,
            stop_tx: Arc::new(stop_tx),
        }
    }

    pub fn stop_handle(&self) -> ConsumerStop {
        ConsumerStop {
            tx: Arc::clone(&self.stop_tx),
        }
    }

    /// Runs until the subscription ends or a stop is requested.
    ///
    /// Malformed messages and per-submission failures are logged and skipped. Returns `Err`
    /// only for fatal errors.
    pub async fn run(&self) -> Result<ConsumerStats, DetectionError> {
        let mut stop = self.stop_tx.subscribe();
        let mut stats = ConsumerStats::default();
        info!("Submission consumer started");

        loop {
            if *stop.borrow_and_update() {
                info!("Submission consumer stop requested");
                break;
            }

            // Stop only interrupts the wait for a message, never a message in flight.
            let message = tokio::select! {
                biased;
                _ = stop.wait_for(|stopped| *stopped) => continue,
                message = self.source.next_message() => message,
            };

            let Some(bytes) = message else {
                info!("Subscription ended");
                break;
            };
            stats.received += 1;

            let event = match decode_event(&bytes) {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, bytes = bytes.len(), "Dropping malformed submission event");
                    stats.malformed += 1;
                    continue;
                }
            };
            debug!(submission_id = %event.submission_id, "Submission event received");

            match self
                .detector
                .process_submission(&event.submission_id, &event.tenant_id, &event.course_id)
                .await
            {
                Ok(outcome) => stats.record(&outcome),
                Err(e) => {
                    error!(fatal = true, error = %e, "fatal: submission consumer stopping");
                    return Err(e);
                }
            }
        }

        info!(
            received = stats.received,
            malformed = stats.malformed,
            scored = stats.scored,
            flagged = stats.flagged,
            "Submission consumer stopped"
        );
        Ok(stats)
    }
}
