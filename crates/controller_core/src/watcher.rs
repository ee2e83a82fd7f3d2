//! Background ingestion: runs an event source and feeds its events to a sink.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use journal_watch::EventSource;
use shared::events::JournalEvent;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const INGEST_QUEUE_DEPTH: usize = 256;

/// Receives events on the watcher task, one at a time and in stream order.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn deliver(&self, event: JournalEvent);
}

struct RunningWatcher {
    cancel: CancellationToken,
    producer: JoinHandle<()>,
    ingest: JoinHandle<()>,
}

pub struct WatcherLifecycle {
    running: Option<RunningWatcher>,
    grace: Duration,
}

impl WatcherLifecycle {
    pub fn new(grace: Duration) -> Self {
        Self {
            running: None,
            grace,
        }
    }

    /// True while the ingestion task is alive. A source that errors out ends it.
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|watcher| !watcher.ingest.is_finished())
    }

    /// Spawns the source and the ingestion loop. Returns false if already running.
    pub fn start(&mut self, source: Arc<dyn EventSource>, sink: Arc<dyn EventSink>) -> bool {
        if self.is_running() {
            return false;
        }

        let cancel = CancellationToken::new();
        let (tx, mut rx) = mpsc::channel::<JournalEvent>(INGEST_QUEUE_DEPTH);

        let description = source.describe();
        let producer_cancel = cancel.clone();
        let producer = tokio::spawn(async move {
            if let Err(error) = source.run(tx, producer_cancel).await {
                error!(%error, "watcher: event source stopped with error");
            }
        });

        let ingest_cancel = cancel.clone();
        let ingest = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = ingest_cancel.cancelled() => break,
                    next = rx.recv() => match next {
                        Some(event) => sink.deliver(event).await,
                        None => break,
                    },
                }
            }
            debug!("watcher: ingestion loop finished");
        });

        info!(source = %description, "watcher: started");
        self.running = Some(RunningWatcher {
            cancel,
            producer,
            ingest,
        });
        true
    }

    /// Cancels cooperatively and waits up to the grace period; aborts only after that.
    /// Returns false when there was nothing to stop.
    pub async fn stop(&mut self) -> bool {
        let Some(mut watcher) = self.running.take() else {
            return false;
        };

        watcher.cancel.cancel();
        let drained = tokio::time::timeout(self.grace, async {
            let _ = (&mut watcher.producer).await;
            let _ = (&mut watcher.ingest).await;
        })
        .await;

        if drained.is_err() {
            warn!(grace = ?self.grace, "watcher: did not stop in time, aborting tasks");
            watcher.producer.abort();
            watcher.ingest.abort();
        } else {
            info!("watcher: stopped");
        }
        true
    }
}
