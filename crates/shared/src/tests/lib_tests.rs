use crate::{
    domain::{empire_rank, federation_rank, Commander, Profile, StarSystem, Station, Superpower},
    events::JournalEvent,
};

#[test]
fn rank_tables_clamp_out_of_range_ratings() {
    assert_eq!(federation_rank(2), "Cadet");
    assert_eq!(empire_rank(4), "Squire");
    assert_eq!(federation_rank(99), "Admiral");
    assert_eq!(empire_rank(99), "King");
}

#[test]
fn superpower_parse_is_case_insensitive() {
    assert_eq!(Superpower::from_journal("Federation"), Some(Superpower::Federation));
    assert_eq!(Superpower::from_journal(" EMPIRE "), Some(Superpower::Empire));
    assert_eq!(Superpower::from_journal("Thargoid"), None);
}

#[test]
fn station_names_are_unique_within_a_system() {
    let mut system = StarSystem::new("Sol");
    assert!(system.add_station(Station::new("Galileo")));
    assert!(!system.add_station(Station::new("Galileo")));
    assert_eq!(system.stations.len(), 1);
    assert!(system.station("Galileo").is_some());
    assert!(system.station("Abraham Lincoln").is_none());
}

#[test]
fn profile_payload_ignores_title_and_defaults_missing_fields() {
    let raw = r#"{
        "commander": {"name": "Jameson", "federation_rating": 3, "title": "Admiral"},
        "current_star_system": "Shinrarta Dezhra"
    }"#;
    let profile: Profile = serde_json::from_str(raw).expect("profile");
    assert_eq!(profile.commander, {
        let mut commander = Commander::new("Jameson");
        commander.federation_rating = 3;
        commander
    });
    assert_eq!(profile.commander.title, "Commander");
    assert!(profile.ship.is_none());
    assert!(profile.stored_ships.is_empty());
}

#[test]
fn journal_event_serializes_with_tagged_kind() {
    let event = JournalEvent::jumped("Alpha", None);
    let value = serde_json::to_value(&event).expect("json");
    assert_eq!(value["type"], "jumped");
    assert_eq!(value["payload"]["system"], "Alpha");
    assert_eq!(event.kind(), "jumped");
}
