use shared::domain::{Commander, Environment, Module, Ship, StarSystem, Station};

use crate::title::derive_title;

/// Canonical session state. Only the controller writes it; everyone else sees clones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerState {
    pub commander: Option<Commander>,
    pub ship: Option<Ship>,
    pub stored_ships: Vec<Ship>,
    pub outfitting: Vec<Module>,
    pub current_star_system: Option<StarSystem>,
    pub last_star_system: Option<StarSystem>,
    pub environment: Environment,
    pub home_star_system: Option<StarSystem>,
    pub home_station: Option<Station>,
}

impl ControllerState {
    pub fn recompute_title(&mut self) {
        let current = self.current_star_system.as_ref();
        if let Some(commander) = self.commander.as_mut() {
            commander.title = derive_title(commander, current);
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.commander.as_ref().map(|c| c.title.as_str())
    }

    /// Replaces every held copy of `system` (matched by name) with the latest record.
    pub(crate) fn refresh_system(&mut self, system: &StarSystem) {
        for slot in [
            &mut self.current_star_system,
            &mut self.last_star_system,
            &mut self.home_star_system,
        ] {
            if let Some(held) = slot.as_mut() {
                if held.name == system.name {
                    *held = system.clone();
                }
            }
        }
    }

    pub(crate) fn clear_profile(&mut self) {
        self.commander = None;
        self.ship = None;
        self.stored_ships.clear();
        self.current_star_system = None;
        self.outfitting.clear();
    }
}
