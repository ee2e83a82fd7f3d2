use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::{
    domain::{Coordinates, Superpower},
    error::JournalParseError,
    events::JournalEvent,
};

#[derive(Debug, Deserialize)]
struct RawJournalLine {
    timestamp: Option<String>,
    event: Option<String>,
    #[serde(rename = "StarSystem")]
    star_system: Option<String>,
    #[serde(rename = "StarPos")]
    star_pos: Option<Vec<f64>>,
    #[serde(rename = "SystemAllegiance")]
    system_allegiance: Option<String>,
    #[serde(rename = "Body")]
    body: Option<String>,
    #[serde(rename = "StationName")]
    station_name: Option<String>,
}

/// Parses one journal line.
///
/// Blank lines and event names we do not track yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<JournalEvent>, JournalParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let raw: RawJournalLine = serde_json::from_str(line)?;
    let event = raw
        .event
        .clone()
        .filter(|name| !name.is_empty())
        .ok_or(JournalParseError::MissingEventName)?;

    if !matches!(
        event.as_str(),
        "FSDJump" | "SupercruiseEntry" | "SupercruiseExit" | "Docked" | "Undocked"
    ) {
        return Ok(None);
    }

    let timestamp = parse_timestamp(&event, raw.timestamp.as_deref())?;
    let parsed = match event.as_str() {
        "FSDJump" => JournalEvent::Jumped {
            timestamp,
            system: required(&event, "StarSystem", raw.star_system)?,
            coordinates: coordinates(&event, raw.star_pos)?,
            allegiance: raw
                .system_allegiance
                .as_deref()
                .and_then(Superpower::from_journal),
        },
        "SupercruiseEntry" => JournalEvent::EnteredSupercruise {
            timestamp,
            system: non_empty(raw.star_system),
        },
        "SupercruiseExit" => JournalEvent::EnteredNormalSpace {
            timestamp,
            system: non_empty(raw.star_system),
            body: non_empty(raw.body),
        },
        "Docked" => JournalEvent::Docked {
            timestamp,
            system: non_empty(raw.star_system),
            station: required(&event, "StationName", raw.station_name)?,
        },
        _ => JournalEvent::Undocked {
            timestamp,
            station: required(&event, "StationName", raw.station_name)?,
        },
    };

    Ok(Some(parsed))
}

fn parse_timestamp(event: &str, raw: Option<&str>) -> Result<DateTime<Utc>, JournalParseError> {
    let raw = raw.ok_or_else(|| JournalParseError::MissingField {
        event: event.to_string(),
        field: "timestamp",
    })?;
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| JournalParseError::InvalidTimestamp {
            event: event.to_string(),
            raw: raw.to_string(),
        })
}

fn required(
    event: &str,
    field: &'static str,
    value: Option<String>,
) -> Result<String, JournalParseError> {
    non_empty(value).ok_or_else(|| JournalParseError::MissingField {
        event: event.to_string(),
        field,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn coordinates(
    event: &str,
    star_pos: Option<Vec<f64>>,
) -> Result<Option<Coordinates>, JournalParseError> {
    match star_pos.as_deref() {
        None => Ok(None),
        Some([x, y, z]) => Ok(Some(Coordinates::new(*x, *y, *z))),
        Some(_) => Err(JournalParseError::InvalidField {
            event: event.to_string(),
            field: "StarPos",
        }),
    }
}
