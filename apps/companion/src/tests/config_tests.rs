use std::collections::HashMap;

use super::*;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
    assert_eq!(
        normalize_database_url("sqlite:data\\visits.db"),
        "sqlite://data/visits.db"
    );
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
    assert_eq!(normalize_database_url("  "), Settings::default().database_url);
}

#[test]
fn file_values_override_defaults() {
    let mut settings = Settings::default();
    apply_file(
        &mut settings,
        r#"
            journal_dir = "/games/journal"
            speech_enabled = true
            home_system = "Sol"
            poll_interval_ms = 250
        "#,
    )
    .expect("valid file");

    assert_eq!(settings.journal_dir, Some(PathBuf::from("/games/journal")));
    assert!(settings.speech_enabled);
    assert_eq!(settings.home_system.as_deref(), Some("Sol"));
    assert_eq!(settings.poll_interval_ms, 250);
    assert_eq!(settings.database_url, Settings::default().database_url);
}

#[test]
fn unknown_or_mistyped_file_keys_are_rejected() {
    let mut settings = Settings::default();
    assert!(apply_file(&mut settings, "journal_directory = \"x\"").is_err());
    assert!(apply_file(&mut settings, "speech_enabled = \"maybe\"").is_err());
}

#[test]
fn environment_overrides_file_and_app_prefix_wins() {
    let mut settings = Settings::default();
    apply_file(&mut settings, "home_system = \"Sol\"").expect("valid file");
    apply_env(
        &mut settings,
        env_from(&[
            ("COMPANION_HOME_SYSTEM", "Lave"),
            ("COMPANION_DATABASE_URL", "sqlite://./companion.db"),
            ("APP__DATABASE_URL", "sqlite://./app.db"),
            ("COMPANION_SPEECH_ENABLED", "yes"),
            ("COMPANION_DISPATCH_TIMEOUT_SECS", "not-a-number"),
        ]),
    );

    assert_eq!(settings.home_system.as_deref(), Some("Lave"));
    assert_eq!(settings.database_url, "sqlite://./app.db");
    assert!(settings.speech_enabled);
    assert_eq!(
        settings.dispatch_timeout_secs,
        Settings::default().dispatch_timeout_secs
    );
}

#[test]
fn explicit_missing_settings_file_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    assert!(load_settings(Some(&dir.path().join("absent.toml"))).is_err());
}

#[test]
fn explicit_settings_file_is_loaded() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("companion.toml");
    fs::write(&path, "home_station = \"Galileo\"\n").expect("write settings");

    let settings = load_settings(Some(&path)).expect("settings");
    assert_eq!(settings.home_station.as_deref(), Some("Galileo"));
}

#[test]
fn controller_config_carries_every_setting() {
    let settings = Settings {
        database_url: "./visits.db".into(),
        journal_dir: Some(PathBuf::from("/journal")),
        poll_interval_ms: 0,
        star_map_url: Some("https://map.example/api".into()),
        star_map_commander: Some("Jameson".into()),
        star_map_api_key: Some("k3y".into()),
        speech_enabled: true,
        home_system: Some("Sol".into()),
        dispatch_timeout_secs: 3,
        shutdown_grace_secs: 0,
        ..Settings::default()
    };

    let config = settings.into_controller_config();
    assert_eq!(config.database_url, "sqlite://./visits.db");
    assert_eq!(config.journal_dir, Some(PathBuf::from("/journal")));
    assert_eq!(config.poll_interval, Duration::from_millis(1));
    assert_eq!(config.dispatch_timeout, Duration::from_secs(3));
    assert_eq!(config.shutdown_grace, Duration::ZERO);
    assert!(config.speech_enabled);
    assert_eq!(config.home_system.as_deref(), Some("Sol"));
    assert!(config.star_map_credentials().is_some());
}
