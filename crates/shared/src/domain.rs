use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Superpower {
    Federation,
    Empire,
    Alliance,
    Independent,
}

impl Superpower {
    /// Lenient parse of allegiance strings as they appear in journal and profile payloads.
    pub fn from_journal(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "federation" => Some(Self::Federation),
            "empire" => Some(Self::Empire),
            "alliance" => Some(Self::Alliance),
            "independent" => Some(Self::Independent),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Federation => "federation",
            Self::Empire => "empire",
            Self::Alliance => "alliance",
            Self::Independent => "independent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    NormalSpace,
    Supercruise,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Coordinates {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

const FEDERATION_RANKS: [&str; 15] = [
    "None",
    "Recruit",
    "Cadet",
    "Midshipman",
    "Petty Officer",
    "Chief Petty Officer",
    "Warrant Officer",
    "Ensign",
    "Lieutenant",
    "Lieutenant Commander",
    "Post Commander",
    "Post Captain",
    "Rear Admiral",
    "Vice Admiral",
    "Admiral",
];

const EMPIRE_RANKS: [&str; 15] = [
    "None", "Outsider", "Serf", "Master", "Squire", "Knight", "Lord", "Baron", "Viscount",
    "Count", "Earl", "Marquis", "Duke", "Prince", "King",
];

/// Rank name for a Federation navy rating. Ratings past the table clamp to the top rank.
pub fn federation_rank(rating: u32) -> &'static str {
    FEDERATION_RANKS[(rating as usize).min(FEDERATION_RANKS.len() - 1)]
}

/// Rank name for an Imperial navy rating. Ratings past the table clamp to the top rank.
pub fn empire_rank(rating: u32) -> &'static str {
    EMPIRE_RANKS[(rating as usize).min(EMPIRE_RANKS.len() - 1)]
}

pub const DEFAULT_TITLE: &str = "Commander";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commander {
    pub name: String,
    #[serde(default)]
    pub federation_rating: u32,
    #[serde(default)]
    pub empire_rating: u32,
    #[serde(default)]
    pub alliance_rating: u32,
    /// Derived on every relevant event; never read back from a profile.
    #[serde(skip, default = "default_title")]
    pub title: String,
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

impl Commander {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            federation_rating: 0,
            empire_rating: 0,
            alliance_rating: 0,
            title: default_title(),
        }
    }

    pub fn federation_rank(&self) -> &'static str {
        federation_rank(self.federation_rating)
    }

    pub fn empire_rank(&self) -> &'static str {
        empire_rank(self.empire_rating)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allegiance: Option<Superpower>,
}

impl Station {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            allegiance: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarSystem {
    pub name: String,
    pub coordinates: Option<Coordinates>,
    pub allegiance: Option<Superpower>,
    pub visits: u32,
    pub last_visit: Option<DateTime<Utc>>,
    pub stations: Vec<Station>,
}

impl StarSystem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            coordinates: None,
            allegiance: None,
            visits: 0,
            last_visit: None,
            stations: Vec::new(),
        }
    }

    pub fn station(&self, name: &str) -> Option<&Station> {
        self.stations.iter().find(|station| station.name == name)
    }

    /// Adds the station if no station with that name is known yet.
    pub fn add_station(&mut self, station: Station) -> bool {
        if self.station(&station.name).is_some() {
            return false;
        }
        self.stations.push(station);
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub slot: String,
    pub name: String,
    #[serde(default)]
    pub class: u8,
    #[serde(default)]
    pub grade: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ship {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ident: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub star_system: Option<String>,
    #[serde(default)]
    pub modules: Vec<Module>,
}

/// Point-in-time snapshot returned by the remote profile service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub commander: Commander,
    #[serde(default)]
    pub ship: Option<Ship>,
    #[serde(default)]
    pub stored_ships: Vec<Ship>,
    #[serde(default)]
    pub current_star_system: Option<String>,
    #[serde(default)]
    pub outfitting: Vec<Module>,
}
