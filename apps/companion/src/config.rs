use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use controller_core::ControllerConfig;
use serde::Deserialize;

pub const DEFAULT_SETTINGS_FILE: &str = "companion.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database_url: String,
    pub journal_dir: Option<PathBuf>,
    pub replay_file: Option<PathBuf>,
    pub poll_interval_ms: u64,
    pub profile_url: Option<String>,
    pub profile_token: Option<String>,
    pub star_map_url: Option<String>,
    pub star_map_commander: Option<String>,
    pub star_map_api_key: Option<String>,
    pub speech_enabled: bool,
    pub speech_command: Option<String>,
    pub home_system: Option<String>,
    pub home_station: Option<String>,
    pub dispatch_timeout_secs: u64,
    pub shutdown_grace_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let controller = ControllerConfig::default();
        Self {
            database_url: controller.database_url,
            journal_dir: None,
            replay_file: None,
            poll_interval_ms: controller.poll_interval.as_millis() as u64,
            profile_url: None,
            profile_token: None,
            star_map_url: None,
            star_map_commander: None,
            star_map_api_key: None,
            speech_enabled: false,
            speech_command: None,
            home_system: None,
            home_station: None,
            dispatch_timeout_secs: controller.dispatch_timeout.as_secs(),
            shutdown_grace_secs: controller.shutdown_grace.as_secs(),
        }
    }
}

/// Keys accepted in the settings file. Anything absent keeps its default.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileSettings {
    database_url: Option<String>,
    journal_dir: Option<PathBuf>,
    replay_file: Option<PathBuf>,
    poll_interval_ms: Option<u64>,
    profile_url: Option<String>,
    profile_token: Option<String>,
    star_map_url: Option<String>,
    star_map_commander: Option<String>,
    star_map_api_key: Option<String>,
    speech_enabled: Option<bool>,
    speech_command: Option<String>,
    home_system: Option<String>,
    home_station: Option<String>,
    dispatch_timeout_secs: Option<u64>,
    shutdown_grace_secs: Option<u64>,
}

/// Defaults, then the settings file, then the process environment.
///
/// A missing file is fine when no explicit path was given; an explicit path
/// that cannot be read, or a file that does not parse, is an error.
pub fn load_settings(explicit_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let path = explicit_path.unwrap_or_else(|| Path::new(DEFAULT_SETTINGS_FILE));
    match fs::read_to_string(path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid settings file '{}'", path.display()))?,
        Err(error) if explicit_path.is_some() => {
            return Err(error)
                .with_context(|| format!("failed to read settings file '{}'", path.display()));
        }
        Err(_) => {}
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

pub fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file: FileSettings = toml::from_str(raw)?;

    if let Some(v) = file.database_url {
        settings.database_url = v;
    }
    if let Some(v) = file.journal_dir {
        settings.journal_dir = Some(v);
    }
    if let Some(v) = file.replay_file {
        settings.replay_file = Some(v);
    }
    if let Some(v) = file.poll_interval_ms {
        settings.poll_interval_ms = v;
    }
    if let Some(v) = file.profile_url {
        settings.profile_url = Some(v);
    }
    if let Some(v) = file.profile_token {
        settings.profile_token = Some(v);
    }
    if let Some(v) = file.star_map_url {
        settings.star_map_url = Some(v);
    }
    if let Some(v) = file.star_map_commander {
        settings.star_map_commander = Some(v);
    }
    if let Some(v) = file.star_map_api_key {
        settings.star_map_api_key = Some(v);
    }
    if let Some(v) = file.speech_enabled {
        settings.speech_enabled = v;
    }
    if let Some(v) = file.speech_command {
        settings.speech_command = Some(v);
    }
    if let Some(v) = file.home_system {
        settings.home_system = Some(v);
    }
    if let Some(v) = file.home_station {
        settings.home_station = Some(v);
    }
    if let Some(v) = file.dispatch_timeout_secs {
        settings.dispatch_timeout_secs = v;
    }
    if let Some(v) = file.shutdown_grace_secs {
        settings.shutdown_grace_secs = v;
    }

    Ok(())
}

/// Looks up `COMPANION_<KEY>` and then `APP__<KEY>`; the latter wins when both are set.
fn lookup(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    env(&format!("APP__{key}")).or_else(|| env(&format!("COMPANION_{key}")))
}

pub fn apply_env(settings: &mut Settings, env: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup(&env, "DATABASE_URL").or_else(|| env("DATABASE_URL")) {
        settings.database_url = v;
    }
    if let Some(v) = lookup(&env, "JOURNAL_DIR") {
        settings.journal_dir = Some(PathBuf::from(v));
    }
    if let Some(v) = lookup(&env, "REPLAY_FILE") {
        settings.replay_file = Some(PathBuf::from(v));
    }
    if let Some(v) = lookup(&env, "POLL_INTERVAL_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.poll_interval_ms = parsed;
        }
    }
    if let Some(v) = lookup(&env, "PROFILE_URL") {
        settings.profile_url = Some(v);
    }
    if let Some(v) = lookup(&env, "PROFILE_TOKEN") {
        settings.profile_token = Some(v);
    }
    if let Some(v) = lookup(&env, "STAR_MAP_URL") {
        settings.star_map_url = Some(v);
    }
    if let Some(v) = lookup(&env, "STAR_MAP_COMMANDER") {
        settings.star_map_commander = Some(v);
    }
    if let Some(v) = lookup(&env, "STAR_MAP_API_KEY") {
        settings.star_map_api_key = Some(v);
    }
    if let Some(v) = lookup(&env, "SPEECH_ENABLED") {
        if let Some(parsed) = parse_flag(&v) {
            settings.speech_enabled = parsed;
        }
    }
    if let Some(v) = lookup(&env, "SPEECH_COMMAND") {
        settings.speech_command = Some(v);
    }
    if let Some(v) = lookup(&env, "HOME_SYSTEM") {
        settings.home_system = Some(v);
    }
    if let Some(v) = lookup(&env, "HOME_STATION") {
        settings.home_station = Some(v);
    }
    if let Some(v) = lookup(&env, "DISPATCH_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.dispatch_timeout_secs = parsed;
        }
    }
    if let Some(v) = lookup(&env, "SHUTDOWN_GRACE_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.shutdown_grace_secs = parsed;
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        return format!("sqlite://{}", path.replace('\\', "/"));
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

impl Settings {
    pub fn into_controller_config(self) -> ControllerConfig {
        ControllerConfig {
            database_url: normalize_database_url(&self.database_url),
            journal_dir: self.journal_dir,
            replay_file: self.replay_file,
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            profile_url: self.profile_url,
            profile_token: self.profile_token,
            star_map_url: self.star_map_url,
            star_map_commander: self.star_map_commander,
            star_map_api_key: self.star_map_api_key,
            speech_enabled: self.speech_enabled,
            speech_command: self.speech_command,
            home_system: self.home_system,
            home_station: self.home_station,
            dispatch_timeout: Duration::from_secs(self.dispatch_timeout_secs.max(1)),
            shutdown_grace: Duration::from_secs(self.shutdown_grace_secs),
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
