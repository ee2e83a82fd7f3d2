use anyhow::Result;
use async_trait::async_trait;
use shared::events::JournalEvent;
use tracing::info;

use crate::{responder::Responder, state::ControllerState};

pub struct EventLogResponder;

#[async_trait]
impl Responder for EventLogResponder {
    fn name(&self) -> &str {
        "event_log"
    }

    async fn handle(&self, event: &JournalEvent, state: &ControllerState) -> Result<()> {
        info!(
            kind = event.kind(),
            at = %event.timestamp(),
            system = state.current_star_system.as_ref().map(|s| s.name.as_str()),
            environment = ?state.environment,
            title = state.title(),
            "event dispatched"
        );
        Ok(())
    }
}
