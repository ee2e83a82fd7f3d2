use std::{path::PathBuf, time::Duration};

use journal_watch::DEFAULT_POLL_INTERVAL;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://./data/star_systems.db";
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Everything the controller needs to wire its collaborators.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub database_url: String,
    pub journal_dir: Option<PathBuf>,
    /// Replays a recorded journal once instead of tailing `journal_dir`.
    pub replay_file: Option<PathBuf>,
    pub poll_interval: Duration,
    pub profile_url: Option<String>,
    pub profile_token: Option<String>,
    pub star_map_url: Option<String>,
    pub star_map_commander: Option<String>,
    pub star_map_api_key: Option<String>,
    pub speech_enabled: bool,
    pub speech_command: Option<String>,
    pub home_system: Option<String>,
    pub home_station: Option<String>,
    pub dispatch_timeout: Duration,
    pub shutdown_grace: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.into(),
            journal_dir: None,
            replay_file: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            profile_url: None,
            profile_token: None,
            star_map_url: None,
            star_map_commander: None,
            star_map_api_key: None,
            speech_enabled: false,
            speech_command: None,
            home_system: None,
            home_station: None,
            dispatch_timeout: DEFAULT_DISPATCH_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarMapCredentials {
    pub url: String,
    pub commander: String,
    pub api_key: String,
}

impl ControllerConfig {
    /// All three star-map settings must be present and non-blank.
    pub fn star_map_credentials(&self) -> Option<StarMapCredentials> {
        let present = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Some(StarMapCredentials {
            url: present(&self.star_map_url)?,
            commander: present(&self.star_map_commander)?,
            api_key: present(&self.star_map_api_key)?,
        })
    }
}
