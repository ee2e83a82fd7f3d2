//! Journal watching: turns the game's append-only journal into typed events.

use anyhow::Result;
use async_trait::async_trait;
use shared::events::JournalEvent;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

mod parser;
mod tailer;

pub use parser::parse_line;
pub use tailer::{newest_journal, JournalFileReplay, JournalTailer, DEFAULT_POLL_INTERVAL};

/// Producer of journal events.
///
/// Implementations push events into `sink` in stream order and return once
/// `cancel` fires or the sink is closed. Cancellation is only observed
/// between events, never part-way through one.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn run(&self, sink: mpsc::Sender<JournalEvent>, cancel: CancellationToken) -> Result<()>;

    fn describe(&self) -> String {
        "event source".to_string()
    }
}

/// Replays a fixed list of events, then idles until cancelled.
pub struct VecEventSource {
    events: Vec<JournalEvent>,
}

impl VecEventSource {
    pub fn new(events: Vec<JournalEvent>) -> Self {
        Self { events }
    }
}

#[async_trait]
impl EventSource for VecEventSource {
    async fn run(&self, sink: mpsc::Sender<JournalEvent>, cancel: CancellationToken) -> Result<()> {
        for event in &self.events {
            if !forward(&sink, &cancel, event.clone()).await {
                return Ok(());
            }
        }
        cancel.cancelled().await;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{} recorded events", self.events.len())
    }
}

/// Sends one event unless cancelled first. Returns false when the caller should stop.
pub(crate) async fn forward(
    sink: &mpsc::Sender<JournalEvent>,
    cancel: &CancellationToken,
    event: JournalEvent,
) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        sent = sink.send(event) => sent.is_ok(),
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
