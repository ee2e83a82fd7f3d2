use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use shared::{domain::DEFAULT_TITLE, events::JournalEvent};
use tokio::process::Command;
use tracing::info;

use crate::{responder::Responder, state::ControllerState};

#[async_trait]
pub trait SpeechSink: Send + Sync {
    async fn say(&self, phrase: &str) -> Result<()>;
}

/// Writes phrases to the log under the `speech` target.
pub struct LogSpeechSink;

#[async_trait]
impl SpeechSink for LogSpeechSink {
    async fn say(&self, phrase: &str) -> Result<()> {
        info!(target: "speech", phrase, "say");
        Ok(())
    }
}

/// Runs an external synthesizer (e.g. `espeak`) with the phrase as its only argument.
pub struct CommandSpeechSink {
    program: String,
}

impl CommandSpeechSink {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl SpeechSink for CommandSpeechSink {
    async fn say(&self, phrase: &str) -> Result<()> {
        let status = Command::new(&self.program)
            .arg(phrase)
            .kill_on_drop(true)
            .status()
            .await
            .with_context(|| format!("failed to run speech command '{}'", self.program))?;
        if !status.success() {
            bail!("speech command '{}' exited with {status}", self.program);
        }
        Ok(())
    }
}

/// What to say for `event`, given the post-merge state. `None` means stay quiet.
pub fn phrase_for(event: &JournalEvent, state: &ControllerState) -> Option<String> {
    let title = state.title().unwrap_or(DEFAULT_TITLE);
    match event {
        JournalEvent::Jumped { system, .. } => {
            let system = system.trim();
            let visits = state
                .current_star_system
                .as_ref()
                .filter(|s| s.name == system)
                .map(|s| s.visits)
                .unwrap_or(0);
            let tail = match visits {
                0 | 1 => "First visit.".to_string(),
                n => format!("Visit number {n}."),
            };
            Some(format!("Welcome to {system}, {title}. {tail}"))
        }
        JournalEvent::EnteredSupercruise { .. } => Some("Entering supercruise.".to_string()),
        JournalEvent::EnteredNormalSpace { body: Some(body), .. } => {
            Some(format!("Dropping to normal space near {body}."))
        }
        JournalEvent::EnteredNormalSpace { body: None, .. } => None,
        JournalEvent::Docked { station, .. } => Some(format!("Docked at {station}, {title}.")),
        JournalEvent::Undocked { .. } => None,
    }
}

pub struct SpeechResponder {
    sink: Arc<dyn SpeechSink>,
    active: AtomicBool,
}

impl SpeechResponder {
    pub fn new(sink: Arc<dyn SpeechSink>) -> Self {
        Self {
            sink,
            active: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Responder for SpeechResponder {
    fn name(&self) -> &str {
        "speech"
    }

    async fn start(&self) -> Result<()> {
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn handle(&self, event: &JournalEvent, state: &ControllerState) -> Result<()> {
        if !self.active.load(Ordering::SeqCst) {
            return Ok(());
        }
        let Some(phrase) = phrase_for(event, state) else {
            return Ok(());
        };
        self.sink.say(&phrase).await
    }
}
