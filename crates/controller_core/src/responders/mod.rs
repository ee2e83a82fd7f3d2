//! Built-in responders registered when the controller starts.

use std::sync::Arc;

use tracing::{info, warn};

use crate::{config::ControllerConfig, responder::Responder};

mod event_log;
mod speech;
mod star_map;

pub use event_log::EventLogResponder;
pub use speech::{phrase_for, CommandSpeechSink, LogSpeechSink, SpeechResponder, SpeechSink};
pub use star_map::{StarMapResponder, StarMapUpload};

/// The default responder set for `config`, in dispatch order.
pub fn default_responders(config: &ControllerConfig) -> Vec<Arc<dyn Responder>> {
    let mut responders: Vec<Arc<dyn Responder>> = vec![Arc::new(EventLogResponder)];

    if config.speech_enabled {
        let sink: Arc<dyn SpeechSink> = match config.speech_command.as_deref() {
            Some(program) if !program.trim().is_empty() => {
                Arc::new(CommandSpeechSink::new(program.trim()))
            }
            _ => Arc::new(LogSpeechSink),
        };
        responders.push(Arc::new(SpeechResponder::new(sink)));
    }

    match config.star_map_credentials() {
        Some(credentials) => match StarMapResponder::new(credentials) {
            Ok(responder) => responders.push(Arc::new(responder)),
            Err(error) => warn!(%error, "star map: upload disabled, invalid configuration"),
        },
        None => info!("star map: upload disabled, credentials not configured"),
    }

    responders
}

#[cfg(test)]
#[path = "../tests/responders_tests.rs"]
mod tests;
