use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Coordinates, Superpower};

/// Facts extracted from the game's telemetry stream, one variant per handled kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum JournalEvent {
    Jumped {
        timestamp: DateTime<Utc>,
        system: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        coordinates: Option<Coordinates>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        allegiance: Option<Superpower>,
    },
    EnteredSupercruise {
        timestamp: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        system: Option<String>,
    },
    EnteredNormalSpace {
        timestamp: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        system: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<String>,
    },
    Docked {
        timestamp: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        system: Option<String>,
        station: String,
    },
    Undocked {
        timestamp: DateTime<Utc>,
        station: String,
    },
}

impl JournalEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Jumped { timestamp, .. }
            | Self::EnteredSupercruise { timestamp, .. }
            | Self::EnteredNormalSpace { timestamp, .. }
            | Self::Docked { timestamp, .. }
            | Self::Undocked { timestamp, .. } => *timestamp,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Jumped { .. } => "jumped",
            Self::EnteredSupercruise { .. } => "entered_supercruise",
            Self::EnteredNormalSpace { .. } => "entered_normal_space",
            Self::Docked { .. } => "docked",
            Self::Undocked { .. } => "undocked",
        }
    }

    pub fn jumped(system: impl Into<String>, coordinates: Option<Coordinates>) -> Self {
        Self::Jumped {
            timestamp: Utc::now(),
            system: system.into(),
            coordinates,
            allegiance: None,
        }
    }
}
