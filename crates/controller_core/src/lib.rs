//! State controller: owns canonical session state, merges journal events into
//! it and fans the results out to responders.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use journal_watch::{EventSource, JournalFileReplay, JournalTailer};
use profile_api::{HttpProfileClient, MissingProfileClient, ProfileClient};
use shared::{
    domain::{Commander, Coordinates, Environment, Module, Ship, StarSystem, Station, Superpower},
    events::JournalEvent,
};
use storage::{InMemoryStarSystemRepository, StarSystemRepository, Storage};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, error, info, warn};

pub mod cache;
pub mod config;
mod instance;
pub mod responder;
pub mod responders;
pub mod state;
pub mod title;
pub mod watcher;

pub use cache::StarSystemCache;
pub use config::{ControllerConfig, StarMapCredentials};
pub use instance::ControllerCell;
pub use responder::{Responder, ResponderError, ResponderId, ResponderRegistry};
pub use state::ControllerState;
pub use watcher::{EventSink, WatcherLifecycle};

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// An event as delivered to listeners, with the state it produced.
#[derive(Debug, Clone)]
pub struct DispatchedEvent {
    pub event: JournalEvent,
    pub state: Arc<ControllerState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileRefresh {
    Replaced,
    Cleared,
    Unchanged,
}

struct Lifecycle {
    running: bool,
    defaults_registered: bool,
    watcher: WatcherLifecycle,
}

pub struct Controller {
    config: ControllerConfig,
    systems: StarSystemCache,
    profile_client: Arc<dyn ProfileClient>,
    event_source: Option<Arc<dyn EventSource>>,
    state: RwLock<ControllerState>,
    // Serializes every state mutation; readers only ever take `state`.
    write_gate: Mutex<()>,
    responders: RwLock<ResponderRegistry>,
    // Serializes start and stop; `lifecycle` is only held for bookkeeping.
    transition: Mutex<()>,
    lifecycle: Mutex<Lifecycle>,
    events: broadcast::Sender<DispatchedEvent>,
}

impl Controller {
    /// A controller with no external services: in-memory systems, no profile, no watcher.
    pub fn new(config: ControllerConfig) -> Arc<Self> {
        Self::new_with_dependencies(
            config,
            Arc::new(InMemoryStarSystemRepository::new()),
            Arc::new(MissingProfileClient),
            None,
        )
    }

    pub fn new_with_dependencies(
        config: ControllerConfig,
        repository: Arc<dyn StarSystemRepository>,
        profile_client: Arc<dyn ProfileClient>,
        event_source: Option<Arc<dyn EventSource>>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let grace = config.shutdown_grace;
        Arc::new(Self {
            config,
            systems: StarSystemCache::new(repository),
            profile_client,
            event_source,
            state: RwLock::new(ControllerState::default()),
            write_gate: Mutex::new(()),
            responders: RwLock::new(ResponderRegistry::default()),
            transition: Mutex::new(()),
            lifecycle: Mutex::new(Lifecycle {
                running: false,
                defaults_registered: false,
                watcher: WatcherLifecycle::new(grace),
            }),
            events,
        })
    }

    /// Wires real collaborators from `config`. Never fails: each collaborator
    /// that cannot be set up is replaced by a degraded stand-in and logged.
    pub async fn initialize(config: ControllerConfig) -> Arc<Self> {
        let repository: Arc<dyn StarSystemRepository> =
            match Storage::new(&config.database_url).await {
                Ok(storage) => Arc::new(storage),
                Err(error) => {
                    error!(
                        database_url = %config.database_url,
                        %error,
                        "failed to open star system database; visits will not persist this session"
                    );
                    Arc::new(InMemoryStarSystemRepository::new())
                }
            };

        let profile_client: Arc<dyn ProfileClient> = match config.profile_url.as_deref() {
            Some(url) => match HttpProfileClient::new(url, config.profile_token.clone()) {
                Ok(client) => Arc::new(client),
                Err(error) => {
                    warn!(%error, "profile: disabled, invalid service configuration");
                    Arc::new(MissingProfileClient)
                }
            },
            None => {
                info!("profile: disabled, no service url configured");
                Arc::new(MissingProfileClient)
            }
        };

        let event_source = Self::event_source_for(&config).await;
        Self::new_with_dependencies(config, repository, profile_client, event_source)
    }

    async fn event_source_for(config: &ControllerConfig) -> Option<Arc<dyn EventSource>> {
        if let Some(path) = &config.replay_file {
            return Some(Arc::new(JournalFileReplay::new(path.clone())));
        }

        let Some(dir) = &config.journal_dir else {
            warn!("watcher: disabled, no journal directory configured");
            return None;
        };
        match tokio::fs::metadata(dir).await {
            Ok(meta) if meta.is_dir() => Some(Arc::new(
                JournalTailer::new(dir.clone()).with_poll_interval(config.poll_interval),
            )),
            Ok(_) => {
                warn!(dir = %dir.display(), "watcher: disabled, journal path is not a directory");
                None
            }
            Err(error) => {
                warn!(dir = %dir.display(), %error, "watcher: disabled, journal directory unreadable");
                None
            }
        }
    }

    /// The process-wide controller, initialized from `config` on first use.
    /// Later callers get the same instance and their `config` is ignored.
    pub async fn instance(config: &ControllerConfig) -> Arc<Self> {
        instance::GLOBAL
            .get_or_init(|| Self::initialize(config.clone()))
            .await
    }

    pub fn try_instance() -> Option<Arc<Self>> {
        instance::GLOBAL.get()
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Refreshes the profile, resolves home, registers the default responders
    /// (once per controller), runs their start hooks and launches the watcher.
    /// Calling it while running does nothing.
    pub async fn start(self: &Arc<Self>) {
        let _transition = self.transition.lock().await;
        if self.lifecycle.lock().await.running {
            debug!("controller: start ignored, already running");
            return;
        }

        self.refresh_profile().await;
        self.resolve_home().await;

        let register_defaults = !self.lifecycle.lock().await.defaults_registered;
        if register_defaults {
            for responder in responders::default_responders(&self.config) {
                self.register_responder(responder).await;
            }
            self.lifecycle.lock().await.defaults_registered = true;
        }

        let registered = self.responders.read().await.responders();
        for failure in responder::start_all(&registered, self.config.dispatch_timeout).await {
            warn!(responder = failure.responder(), error = %failure, "responder failed to start");
        }

        let mut lifecycle = self.lifecycle.lock().await;
        match &self.event_source {
            Some(source) => {
                let sink: Arc<dyn EventSink> = Arc::clone(self) as Arc<dyn EventSink>;
                lifecycle.watcher.start(Arc::clone(source), sink);
            }
            None => info!("controller: running without a journal watcher"),
        }

        lifecycle.running = true;
        info!(responders = registered.len(), "controller: started");
    }

    /// Stops the watcher, then runs every responder's stop hook. Safe to call
    /// repeatedly and before `start`; returns once the watcher tasks are gone.
    pub async fn stop(&self) {
        let _transition = self.transition.lock().await;
        let (mut watcher, was_running) = {
            let mut lifecycle = self.lifecycle.lock().await;
            let idle = WatcherLifecycle::new(self.config.shutdown_grace);
            (std::mem::replace(&mut lifecycle.watcher, idle), lifecycle.running)
        };
        watcher.stop().await;

        if !was_running {
            debug!("controller: stop ignored, not running");
            return;
        }

        let registered = self.responders.read().await.responders();
        for failure in responder::stop_all(&registered, self.config.dispatch_timeout).await {
            warn!(responder = failure.responder(), error = %failure, "responder failed to stop");
        }
        self.lifecycle.lock().await.running = false;
        info!("controller: stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.lifecycle.lock().await.running
    }

    pub async fn is_watching(&self) -> bool {
        self.lifecycle.lock().await.watcher.is_running()
    }

    pub async fn register_responder(&self, responder: Arc<dyn Responder>) -> ResponderId {
        let name = responder.name().to_string();
        let id = self.responders.write().await.register(responder);
        debug!(responder = %name, id = id.0, "controller: responder registered");
        id
    }

    pub async fn responder_names(&self) -> Vec<String> {
        self.responders.read().await.names()
    }

    /// Listener channel beyond the responder registry; receives every event after responders ran.
    pub fn subscribe_events(&self) -> broadcast::Receiver<DispatchedEvent> {
        self.events.subscribe()
    }

    /// Merges `event` into state, persists what changed, then hands the event
    /// and a post-merge snapshot to every responder in registration order.
    pub async fn handle_event(&self, event: JournalEvent) {
        let snapshot = {
            let _gate = self.write_gate.lock().await;
            self.merge(&event).await;
            Arc::new(self.state.read().await.clone())
        };

        let registered = self.responders.read().await.responders();
        let failures =
            responder::dispatch(&registered, &event, &snapshot, self.config.dispatch_timeout).await;
        for failure in failures {
            warn!(
                responder = failure.responder(),
                kind = event.kind(),
                error = %failure,
                "responder failed to handle event"
            );
        }

        let _ = self.events.send(DispatchedEvent {
            event,
            state: snapshot,
        });
    }

    async fn merge(&self, event: &JournalEvent) {
        match event {
            JournalEvent::Jumped {
                system,
                coordinates,
                allegiance,
                ..
            } => self.merge_jump(system, *coordinates, *allegiance).await,
            JournalEvent::EnteredSupercruise { .. } => {
                self.state.write().await.environment = Environment::Supercruise;
            }
            JournalEvent::EnteredNormalSpace { .. } => {
                self.state.write().await.environment = Environment::NormalSpace;
            }
            JournalEvent::Docked { .. } | JournalEvent::Undocked { .. } => {}
        }
    }

    async fn merge_jump(
        &self,
        system: &str,
        coordinates: Option<Coordinates>,
        allegiance: Option<Superpower>,
    ) {
        let name = system.trim();
        if name.is_empty() {
            warn!("jump event without a system name; skipping merge");
            return;
        }

        let already_here = self
            .state
            .read()
            .await
            .current_star_system
            .as_ref()
            .is_some_and(|current| current.name == name);
        if already_here {
            debug!(system = name, "jump into current system; state unchanged");
            return;
        }

        let mut record = match self.systems.get_or_create(name).await {
            Ok(record) => record,
            Err(error) => {
                warn!(system = name, %error, "failed to resolve star system; skipping merge");
                return;
            }
        };
        if record.coordinates.is_none() {
            record.coordinates = coordinates;
        }
        if allegiance.is_some() {
            record.allegiance = allegiance;
        }
        record.visits = record.visits.saturating_add(1);
        record.last_visit = Some(Utc::now());

        if let Err(error) = self.systems.save(&record).await {
            error!(system = name, %error, "failed to persist star system visit");
        }

        let mut state = self.state.write().await;
        state.last_star_system = state.current_star_system.take();
        state.current_star_system = Some(record.clone());
        state.refresh_system(&record);
        state.environment = Environment::Supercruise;
        state.recompute_title();
        info!(
            system = name,
            visits = record.visits,
            title = state.title(),
            "jumped"
        );
    }

    /// Replaces the profile-derived fields from a fresh snapshot. An absent
    /// snapshot clears them; a failed fetch leaves them as they were.
    pub async fn refresh_profile(&self) -> ProfileRefresh {
        let fetched = self.profile_client.fetch_profile().await;
        let _gate = self.write_gate.lock().await;

        let outcome = match fetched {
            Ok(Some(profile)) => {
                let current = match profile
                    .current_star_system
                    .as_deref()
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                {
                    Some(name) => match self.systems.get_or_create(name).await {
                        Ok(system) => Some(system),
                        Err(error) => {
                            warn!(system = name, %error, "profile: failed to resolve current system");
                            None
                        }
                    },
                    None => None,
                };

                let mut state = self.state.write().await;
                state.commander = Some(profile.commander);
                state.ship = profile.ship;
                state.stored_ships = profile.stored_ships;
                state.outfitting = profile.outfitting;
                state.current_star_system = current;
                ProfileRefresh::Replaced
            }
            Ok(None) => {
                self.state.write().await.clear_profile();
                ProfileRefresh::Cleared
            }
            Err(error) => {
                warn!(%error, "profile: refresh failed; keeping current profile state");
                ProfileRefresh::Unchanged
            }
        };

        let mut state = self.state.write().await;
        state.recompute_title();
        info!(
            outcome = ?outcome,
            commander = state.commander.as_ref().map(|c| c.name.as_str()),
            title = state.title(),
            "profile refreshed"
        );
        outcome
    }

    /// Resolves the configured home system and, within it, the home station by name.
    async fn resolve_home(&self) {
        let Some(home) = self
            .config
            .home_system
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
        else {
            return;
        };

        let _gate = self.write_gate.lock().await;
        let system = match self.systems.get_or_create(home).await {
            Ok(system) => system,
            Err(error) => {
                warn!(system = home, %error, "failed to resolve home system");
                return;
            }
        };
        let station = self
            .config
            .home_station
            .as_deref()
            .and_then(|name| system.station(name.trim()).cloned());
        if self.config.home_station.is_some() && station.is_none() {
            debug!(system = home, "home station not known in home system");
        }

        let mut state = self.state.write().await;
        state.home_star_system = Some(system);
        state.home_station = station;
    }

    pub async fn snapshot(&self) -> ControllerState {
        self.state.read().await.clone()
    }

    pub async fn commander(&self) -> Option<Commander> {
        self.state.read().await.commander.clone()
    }

    pub async fn ship(&self) -> Option<Ship> {
        self.state.read().await.ship.clone()
    }

    pub async fn stored_ships(&self) -> Vec<Ship> {
        self.state.read().await.stored_ships.clone()
    }

    pub async fn outfitting(&self) -> Vec<Module> {
        self.state.read().await.outfitting.clone()
    }

    pub async fn current_star_system(&self) -> Option<StarSystem> {
        self.state.read().await.current_star_system.clone()
    }

    pub async fn last_star_system(&self) -> Option<StarSystem> {
        self.state.read().await.last_star_system.clone()
    }

    pub async fn environment(&self) -> Environment {
        self.state.read().await.environment
    }

    pub async fn home_star_system(&self) -> Option<StarSystem> {
        self.state.read().await.home_star_system.clone()
    }

    pub async fn home_station(&self) -> Option<Station> {
        self.state.read().await.home_station.clone()
    }
}

#[async_trait]
impl EventSink for Controller {
    async fn deliver(&self, event: JournalEvent) {
        self.handle_event(event).await;
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
