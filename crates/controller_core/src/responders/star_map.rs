use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use shared::events::JournalEvent;
use tracing::debug;
use url::Url;

use crate::{config::StarMapCredentials, responder::Responder, state::ControllerState};

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Body posted to the star map service for each jump.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StarMapUpload {
    pub commander_name: String,
    pub api_key: String,
    pub system_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    pub date_visited: DateTime<Utc>,
}

/// Uploads every jump to a remote star map.
pub struct StarMapResponder {
    http: Client,
    endpoint: Url,
    commander: String,
    api_key: String,
}

impl StarMapResponder {
    pub fn new(credentials: StarMapCredentials) -> Result<Self> {
        let endpoint = Url::parse(&credentials.url)
            .with_context(|| format!("invalid star map url '{}'", credentials.url))?;
        let http = Client::builder().timeout(UPLOAD_TIMEOUT).build()?;
        Ok(Self {
            http,
            endpoint,
            commander: credentials.commander,
            api_key: credentials.api_key,
        })
    }

    fn upload_for(&self, event: &JournalEvent, state: &ControllerState) -> Option<StarMapUpload> {
        let JournalEvent::Jumped {
            timestamp, system, ..
        } = event
        else {
            return None;
        };
        let system = system.trim();
        let coordinates = state
            .current_star_system
            .as_ref()
            .filter(|s| s.name == system)
            .and_then(|s| s.coordinates);
        Some(StarMapUpload {
            commander_name: self.commander.clone(),
            api_key: self.api_key.clone(),
            system_name: system.to_string(),
            x: coordinates.map(|c| c.x),
            y: coordinates.map(|c| c.y),
            z: coordinates.map(|c| c.z),
            date_visited: *timestamp,
        })
    }
}

#[async_trait]
impl Responder for StarMapResponder {
    fn name(&self) -> &str {
        "star_map"
    }

    async fn handle(&self, event: &JournalEvent, state: &ControllerState) -> Result<()> {
        let Some(upload) = self.upload_for(event, state) else {
            return Ok(());
        };

        self.http
            .post(self.endpoint.clone())
            .json(&upload)
            .send()
            .await?
            .error_for_status()
            .with_context(|| format!("star map rejected jump to '{}'", upload.system_name))?;
        debug!(system = %upload.system_name, "star map: jump uploaded");
        Ok(())
    }
}
