use super::*;
use storage::InMemoryStarSystemRepository;

#[tokio::test]
async fn added_station_is_persisted_with_its_system() {
    let repository = InMemoryStarSystemRepository::new();

    add_station(&repository, "Sol", "Galileo", Some("Federation"))
        .await
        .expect("add station");
    add_station(&repository, "Sol", "Galileo", None)
        .await
        .expect("add again");

    let sol = repository
        .load_star_system("Sol")
        .await
        .expect("load")
        .expect("system created");
    assert_eq!(sol.stations.len(), 1);
    assert_eq!(
        sol.station("Galileo").and_then(|s| s.allegiance),
        Some(Superpower::Federation)
    );
}

#[tokio::test]
async fn blank_station_or_unknown_allegiance_is_rejected() {
    let repository = InMemoryStarSystemRepository::new();

    assert!(add_station(&repository, "Sol", "  ", None).await.is_err());
    assert!(add_station(&repository, "Sol", "Galileo", Some("Guardians"))
        .await
        .is_err());
    assert!(repository.is_empty().await);
}

#[tokio::test]
async fn station_survives_sqlite_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!(
        "sqlite://{}",
        dir.path().join("systems.db").to_string_lossy().replace('\\', "/")
    );

    {
        let storage = Storage::new(&url).await.expect("open");
        add_station(&storage, "Sol", "Galileo", None)
            .await
            .expect("add station");
    }

    let storage = Storage::new(&url).await.expect("reopen");
    let sol = storage
        .load_star_system("Sol")
        .await
        .expect("load")
        .expect("system");
    assert!(sol.station("Galileo").is_some());
}
