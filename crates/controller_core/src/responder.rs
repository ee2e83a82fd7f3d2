//! Pluggable subscribers and the dispatch loop that feeds them.

use std::{panic::AssertUnwindSafe, sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use futures::FutureExt;
use shared::events::JournalEvent;
use thiserror::Error;

use crate::state::ControllerState;

/// A subscriber that reacts to dispatched events without owning canonical state.
///
/// Every responder receives every event and decides for itself which variants
/// matter. `state` is the post-merge snapshot for that event.
#[async_trait]
pub trait Responder: Send + Sync {
    fn name(&self) -> &str;

    async fn start(&self) -> Result<()> {
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }

    async fn handle(&self, event: &JournalEvent, state: &ControllerState) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResponderId(pub u64);

#[derive(Debug, Error)]
pub enum ResponderError {
    #[error("responder {name} failed: {source}")]
    Failed {
        name: String,
        source: anyhow::Error,
    },
    #[error("responder {name} panicked")]
    Panicked { name: String },
    #[error("responder {name} did not finish within {timeout:?}")]
    TimedOut { name: String, timeout: Duration },
}

impl ResponderError {
    pub fn responder(&self) -> &str {
        match self {
            Self::Failed { name, .. } | Self::Panicked { name } | Self::TimedOut { name, .. } => {
                name
            }
        }
    }
}

/// Append-only, ordered list of responders.
#[derive(Default)]
pub struct ResponderRegistry {
    next_id: u64,
    entries: Vec<(ResponderId, Arc<dyn Responder>)>,
}

impl ResponderRegistry {
    pub fn register(&mut self, responder: Arc<dyn Responder>) -> ResponderId {
        let id = ResponderId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, responder));
        id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registration-ordered handles, cloned so callers can dispatch without holding the registry.
    pub fn responders(&self) -> Vec<Arc<dyn Responder>> {
        self.entries
            .iter()
            .map(|(_, responder)| Arc::clone(responder))
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|(_, responder)| responder.name().to_string())
            .collect()
    }
}

async fn isolated<F>(name: &str, limit: Duration, fut: F) -> Result<(), ResponderError>
where
    F: std::future::Future<Output = Result<()>>,
{
    match tokio::time::timeout(limit, AssertUnwindSafe(fut).catch_unwind()).await {
        Ok(Ok(Ok(()))) => Ok(()),
        Ok(Ok(Err(source))) => Err(ResponderError::Failed {
            name: name.to_string(),
            source,
        }),
        Ok(Err(_)) => Err(ResponderError::Panicked {
            name: name.to_string(),
        }),
        Err(_) => Err(ResponderError::TimedOut {
            name: name.to_string(),
            timeout: limit,
        }),
    }
}

/// Delivers `event` to each responder in order. A failing, panicking or
/// stalled responder is reported and the remaining responders still run.
pub async fn dispatch(
    responders: &[Arc<dyn Responder>],
    event: &JournalEvent,
    state: &ControllerState,
    limit: Duration,
) -> Vec<ResponderError> {
    let mut failures = Vec::new();
    for responder in responders {
        if let Err(err) = isolated(responder.name(), limit, responder.handle(event, state)).await {
            failures.push(err);
        }
    }
    failures
}

pub async fn start_all(responders: &[Arc<dyn Responder>], limit: Duration) -> Vec<ResponderError> {
    let mut failures = Vec::new();
    for responder in responders {
        if let Err(err) = isolated(responder.name(), limit, responder.start()).await {
            failures.push(err);
        }
    }
    failures
}

pub async fn stop_all(responders: &[Arc<dyn Responder>], limit: Duration) -> Vec<ResponderError> {
    let mut failures = Vec::new();
    for responder in responders {
        if let Err(err) = isolated(responder.name(), limit, responder.stop()).await {
            failures.push(err);
        }
    }
    failures
}
