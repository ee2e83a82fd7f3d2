use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use storage::InMemoryStarSystemRepository;

#[derive(Default)]
struct SlowCountingRepository {
    inner: InMemoryStarSystemRepository,
    creates: AtomicUsize,
    fail_saves: bool,
}

#[async_trait]
impl StarSystemRepository for SlowCountingRepository {
    async fn get_or_create_star_system(&self, name: &str) -> Result<StarSystem> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.inner.get_or_create_star_system(name).await
    }

    async fn save_star_system(&self, system: &StarSystem) -> Result<()> {
        if self.fail_saves {
            anyhow::bail!("disk full");
        }
        self.inner.save_star_system(system).await
    }

    async fn load_star_system(&self, name: &str) -> Result<Option<StarSystem>> {
        self.inner.load_star_system(name).await
    }

    async fn list_star_systems(&self) -> Result<Vec<StarSystem>> {
        self.inner.list_star_systems().await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_lookups_hit_repository_once() {
    let repository = Arc::new(SlowCountingRepository::default());
    let cache = Arc::new(StarSystemCache::new(repository.clone()));

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let cache = Arc::clone(&cache);
        tasks.push(tokio::spawn(async move { cache.get_or_create("Alpha").await }));
    }
    for task in tasks {
        assert_eq!(task.await.expect("join").expect("lookup").name, "Alpha");
    }

    assert_eq!(repository.creates.load(Ordering::SeqCst), 1);
    assert_eq!(cache.len().await, 1);
}

#[tokio::test]
async fn saved_record_becomes_the_cached_record() {
    let repository = Arc::new(SlowCountingRepository::default());
    let cache = StarSystemCache::new(repository.clone());

    let mut system = cache.get_or_create("Beta").await.expect("lookup");
    system.visits = 7;
    cache.save(&system).await.expect("save");

    assert_eq!(cache.get_or_create("Beta").await.expect("lookup").visits, 7);
    assert_eq!(
        repository
            .load_star_system("Beta")
            .await
            .expect("load")
            .map(|s| s.visits),
        Some(7)
    );
    assert_eq!(repository.creates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_save_still_updates_cache() {
    let repository = Arc::new(SlowCountingRepository {
        fail_saves: true,
        ..Default::default()
    });
    let cache = StarSystemCache::new(repository);

    let mut system = cache.get_or_create("Gamma").await.expect("lookup");
    system.visits = 1;
    assert!(cache.save(&system).await.is_err());
    assert_eq!(cache.cached("Gamma").await.map(|s| s.visits), Some(1));
    assert!(!cache.is_empty().await);
}
