use shared::domain::{Commander, StarSystem, Superpower, DEFAULT_TITLE};

/// Ratings strictly above these earn the faction title inside that faction's space.
pub const FEDERATION_TITLE_THRESHOLD: u32 = 1;
pub const EMPIRE_TITLE_THRESHOLD: u32 = 3;

pub fn derive_title(commander: &Commander, system: Option<&StarSystem>) -> String {
    match system.and_then(|s| s.allegiance) {
        Some(Superpower::Federation) if commander.federation_rating > FEDERATION_TITLE_THRESHOLD => {
            commander.federation_rank().to_string()
        }
        Some(Superpower::Empire) if commander.empire_rating > EMPIRE_TITLE_THRESHOLD => {
            commander.empire_rank().to_string()
        }
        _ => DEFAULT_TITLE.to_string(),
    }
}
