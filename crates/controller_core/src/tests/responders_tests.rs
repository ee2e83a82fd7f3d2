use super::*;

use anyhow::Result;
use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::{TimeZone, Utc};
use shared::{
    domain::{Commander, Coordinates, StarSystem, Superpower},
    events::JournalEvent,
};
use tokio::{net::TcpListener, sync::Mutex};

use crate::{config::StarMapCredentials, state::ControllerState};

#[derive(Default)]
struct RecordingSink {
    phrases: Mutex<Vec<String>>,
}

#[async_trait]
impl SpeechSink for RecordingSink {
    async fn say(&self, phrase: &str) -> Result<()> {
        self.phrases.lock().await.push(phrase.to_string());
        Ok(())
    }
}

fn state_in(system: &str, visits: u32, title: Option<&str>) -> ControllerState {
    let mut star_system = StarSystem::new(system);
    star_system.visits = visits;
    star_system.coordinates = Some(Coordinates::new(-1.5, 2.0, 40.25));
    ControllerState {
        commander: title.map(|title| {
            let mut commander = Commander::new("Jameson");
            commander.title = title.to_string();
            commander
        }),
        current_star_system: Some(star_system),
        ..ControllerState::default()
    }
}

fn jumped(system: &str) -> JournalEvent {
    JournalEvent::Jumped {
        timestamp: Utc.with_ymd_and_hms(3301, 1, 5, 12, 0, 0).unwrap(),
        system: system.to_string(),
        coordinates: None,
        allegiance: Some(Superpower::Federation),
    }
}

#[test]
fn jump_phrases_count_visits_and_use_title() {
    assert_eq!(
        phrase_for(&jumped("Sol"), &state_in("Sol", 1, Some("Cadet"))).as_deref(),
        Some("Welcome to Sol, Cadet. First visit.")
    );
    assert_eq!(
        phrase_for(&jumped("Sol"), &state_in("Sol", 4, None)).as_deref(),
        Some("Welcome to Sol, Commander. Visit number 4.")
    );
}

#[test]
fn padded_jump_name_matches_the_merged_system() {
    assert_eq!(
        phrase_for(&jumped("  Sol "), &state_in("Sol", 3, None)).as_deref(),
        Some("Welcome to Sol, Commander. Visit number 3.")
    );
}

#[test]
fn quiet_events_have_no_phrase() {
    let state = state_in("Sol", 1, None);
    let undocked = JournalEvent::Undocked {
        timestamp: Utc::now(),
        station: "Galileo".into(),
    };
    let dropped_nowhere = JournalEvent::EnteredNormalSpace {
        timestamp: Utc::now(),
        system: Some("Sol".into()),
        body: None,
    };
    assert_eq!(phrase_for(&undocked, &state), None);
    assert_eq!(phrase_for(&dropped_nowhere, &state), None);

    let dropped_near = JournalEvent::EnteredNormalSpace {
        timestamp: Utc::now(),
        system: Some("Sol".into()),
        body: Some("Earth".into()),
    };
    assert_eq!(
        phrase_for(&dropped_near, &state).as_deref(),
        Some("Dropping to normal space near Earth.")
    );
}

#[tokio::test]
async fn speech_responder_is_silent_outside_start_and_stop() {
    let sink = Arc::new(RecordingSink::default());
    let responder = SpeechResponder::new(sink.clone());
    let state = state_in("Sol", 1, Some("Cadet"));
    let docked = JournalEvent::Docked {
        timestamp: Utc::now(),
        system: Some("Sol".into()),
        station: "Galileo".into(),
    };

    responder.handle(&docked, &state).await.expect("handle");
    responder.start().await.expect("start");
    responder.handle(&docked, &state).await.expect("handle");
    responder.stop().await.expect("stop");
    responder.handle(&docked, &state).await.expect("handle");

    assert_eq!(
        *sink.phrases.lock().await,
        vec!["Docked at Galileo, Cadet.".to_string()]
    );
}

#[test]
fn default_set_follows_configuration() {
    let names = |config: &ControllerConfig| -> Vec<String> {
        default_responders(config)
            .iter()
            .map(|responder| responder.name().to_string())
            .collect()
    };

    assert_eq!(names(&ControllerConfig::default()), vec!["event_log"]);

    let full = ControllerConfig {
        speech_enabled: true,
        star_map_url: Some("http://127.0.0.1:9/api/jumps".into()),
        star_map_commander: Some("Jameson".into()),
        star_map_api_key: Some("k3y".into()),
        ..ControllerConfig::default()
    };
    assert_eq!(names(&full), vec!["event_log", "speech", "star_map"]);

    let blank_key = ControllerConfig {
        star_map_api_key: Some("   ".into()),
        ..full.clone()
    };
    assert_eq!(names(&blank_key), vec!["event_log", "speech"]);

    let bad_url = ControllerConfig {
        star_map_url: Some("not a url".into()),
        ..full
    };
    assert_eq!(names(&bad_url), vec!["event_log", "speech"]);
}

#[derive(Clone)]
struct StarMapServer {
    status: StatusCode,
    uploads: Arc<Mutex<Vec<serde_json::Value>>>,
}

async fn record_upload(
    State(server): State<StarMapServer>,
    Json(body): Json<serde_json::Value>,
) -> StatusCode {
    server.uploads.lock().await.push(body);
    server.status
}

async fn spawn_star_map(status: StatusCode) -> (StarMapResponder, StarMapServer) {
    let server = StarMapServer {
        status,
        uploads: Arc::new(Mutex::new(Vec::new())),
    };
    let app = Router::new()
        .route("/api/jumps", post(record_upload))
        .with_state(server.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    let responder = StarMapResponder::new(StarMapCredentials {
        url: format!("http://{addr}/api/jumps"),
        commander: "Jameson".into(),
        api_key: "k3y".into(),
    })
    .expect("responder");
    (responder, server)
}

#[tokio::test]
async fn star_map_uploads_jumps_with_coordinates() {
    let (responder, server) = spawn_star_map(StatusCode::OK).await;

    responder
        .handle(&jumped("Sol"), &state_in("Sol", 1, None))
        .await
        .expect("upload");

    let uploads = server.uploads.lock().await;
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0]["commanderName"], "Jameson");
    assert_eq!(uploads[0]["apiKey"], "k3y");
    assert_eq!(uploads[0]["systemName"], "Sol");
    assert_eq!(uploads[0]["x"], -1.5);
    assert_eq!(uploads[0]["z"], 40.25);
    assert!(uploads[0]["dateVisited"]
        .as_str()
        .is_some_and(|date| date.starts_with("3301-01-05T12:00:00")));
}

#[tokio::test]
async fn star_map_uses_trimmed_name_for_padded_jumps() {
    let (responder, server) = spawn_star_map(StatusCode::OK).await;

    responder
        .handle(&jumped(" Sol  "), &state_in("Sol", 1, None))
        .await
        .expect("upload");

    let uploads = server.uploads.lock().await;
    assert_eq!(uploads[0]["systemName"], "Sol");
    assert_eq!(uploads[0]["y"], 2.0);
}

#[tokio::test]
async fn star_map_ignores_everything_but_jumps() {
    let (responder, server) = spawn_star_map(StatusCode::OK).await;
    let supercruise = JournalEvent::EnteredSupercruise {
        timestamp: Utc::now(),
        system: Some("Sol".into()),
    };

    responder
        .handle(&supercruise, &state_in("Sol", 1, None))
        .await
        .expect("ignored");
    assert!(server.uploads.lock().await.is_empty());
}

#[tokio::test]
async fn star_map_rejection_is_an_error() {
    let (responder, _server) = spawn_star_map(StatusCode::INTERNAL_SERVER_ERROR).await;

    let error = responder
        .handle(&jumped("Sol"), &state_in("Sol", 1, None))
        .await
        .expect_err("rejected");
    assert!(error.to_string().contains("Sol"));
}

#[cfg(unix)]
#[tokio::test]
async fn command_sink_reports_exit_status() {
    CommandSpeechSink::new("true")
        .say("hello")
        .await
        .expect("true succeeds");
    assert!(CommandSpeechSink::new("false").say("hello").await.is_err());
    assert!(CommandSpeechSink::new("/nonexistent/speech-synth")
        .say("hello")
        .await
        .is_err());
}
