use std::sync::Arc;

use storage::{StarSystemRepository, Storage};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_get_or_create_yields_single_record() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("systems.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));
    let storage = Arc::new(Storage::new(&database_url).await.expect("db"));

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let storage = Arc::clone(&storage);
        tasks.push(tokio::spawn(async move {
            storage.get_or_create_star_system("Sagittarius A*").await
        }));
    }

    for task in tasks {
        let system = task.await.expect("join").expect("lookup");
        assert_eq!(system.name, "Sagittarius A*");
    }

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM star_systems WHERE name = ?")
        .bind("Sagittarius A*")
        .fetch_one(storage.pool())
        .await
        .expect("count");
    assert_eq!(count, 1);
}

#[tokio::test]
async fn records_survive_reopen() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("systems.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    {
        let storage = Storage::new(&database_url).await.expect("db");
        let mut system = storage
            .get_or_create_star_system("Maia")
            .await
            .expect("create");
        system.visits = 3;
        storage.save_star_system(&system).await.expect("save");
        storage.pool().close().await;
    }

    let reopened = Storage::new(&database_url).await.expect("reopen");
    let system = reopened
        .load_star_system("Maia")
        .await
        .expect("load")
        .expect("present");
    assert_eq!(system.visits, 3);
}
