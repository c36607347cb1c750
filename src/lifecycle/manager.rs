use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::error::{LifecycleError, LifecycleResult};
use super::types::ConsumerExit;
use crate::detection::{Consumer, ConsumerStats, ConsumerStop, DetectionError};
use crate::embedding::Embedder;
use crate::events::MessageSource;
use crate::submissions::SubmissionStore;
use crate::vectordb::EmbeddingStore;

type ConsumerTask = JoinHandle<Result<ConsumerStats, DetectionError>>;

/// Owns the consumer task and tears the pipeline down in order.
///
/// Shutdown: stop the consumer and unsubscribe, wait for the in-flight message, drain the
/// subscription, close the database pool.
pub struct LifecycleManager<M, S> {
    source: Arc<M>,
    submissions: Arc<S>,
    consumer: Mutex<Option<(ConsumerStop, ConsumerTask)>>,
    consumer_started: AtomicBool,
    consumer_done: Arc<Notify>,
    shutdown_initiated: AtomicBool,
}

impl<M, S> LifecycleManager<M, S>
where
    M: MessageSource + 'static,
    S: SubmissionStore + 'static,
{
    pub fn new(source: Arc<M>, submissions: Arc<S>) -> Self {
        Self {
            source,
            submissions,
            consumer: Mutex::new(None),
            consumer_started: AtomicBool::new(false),
            consumer_done: Arc::new(Notify::new()),
            shutdown_initiated: AtomicBool::new(false),
        }
    }

    /// Returns `true` if shutdown has been initiated.
    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_initiated.load(Ordering::Acquire)
    }

    /// Spawns the consumer loop. Only one consumer may be started.
    pub fn start_consumer<E, V>(&self, consumer: Consumer<E, V, S, M>) -> LifecycleResult<()>
    where
        E: Embedder + 'static,
        V: EmbeddingStore + 'static,
    {
        // Held until the task is stored: shutdown takes this lock after setting its flag, so
        // it either sees the task or this call sees the flag.
        let mut slot = self.consumer.lock();
        if self.is_shutdown_initiated() {
            return Err(LifecycleError::ShutdownInitiated);
        }
        if self.consumer_started.swap(true, Ordering::AcqRel) {
            return Err(LifecycleError::ConsumerAlreadyStarted);
        }

        let stop = consumer.stop_handle();
        let done = Arc::clone(&self.consumer_done);
        let task = tokio::spawn(async move {
            let result = consumer.run().await;
            // notify_one keeps a permit, so a waiter arriving late still wakes.
            done.notify_one();
            result
        });

        *slot = Some((stop, task));
        Ok(())
    }

    /// Resolves once the consumer task has returned, for any reason.
    ///
    /// Never resolves if no consumer was started.
    pub async fn consumer_finished(&self) {
        self.consumer_done.notified().await;
    }

    /// Runs the shutdown sequence once. Later calls return `None` and do nothing.
    pub async fn shutdown(&self) -> Option<ConsumerExit> {
        if self.shutdown_initiated.swap(true, Ordering::AcqRel) {
            return None;
        }
        info!("Shutdown initiated");

        let consumer = self.consumer.lock().take();
        if let Some((stop, _)) = &consumer {
            stop.stop();
        }
        self.source.unsubscribe().await;

        let exit = match consumer {
            None => ConsumerExit::NotStarted,
            Some((_, task)) => match task.await {
                Ok(Ok(stats)) => ConsumerExit::Finished(stats),
                Ok(Err(e)) => ConsumerExit::Fatal(e),
                Err(e) => {
                    error!(error = %e, "Consumer task aborted");
                    ConsumerExit::Aborted {
                        reason: e.to_string(),
                    }
                }
            },
        };
        info!("In-flight work finished");

        self.source.drain().await;
        self.submissions.close().await;
        info!("Shutdown complete");

        Some(exit)
    }
}
