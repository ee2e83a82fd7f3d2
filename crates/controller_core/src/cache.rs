use std::{collections::HashMap, sync::Arc};

use anyhow::Result;
use shared::domain::StarSystem;
use storage::StarSystemRepository;
use tokio::sync::Mutex;

/// Identity map in front of the repository: one record per name for the controller's lifetime.
pub struct StarSystemCache {
    repository: Arc<dyn StarSystemRepository>,
    systems: Mutex<HashMap<String, StarSystem>>,
}

impl StarSystemCache {
    pub fn new(repository: Arc<dyn StarSystemRepository>) -> Self {
        Self {
            repository,
            systems: Mutex::new(HashMap::new()),
        }
    }

    /// The lock is held across the repository call so concurrent first lookups create once.
    pub async fn get_or_create(&self, name: &str) -> Result<StarSystem> {
        let mut guard = self.systems.lock().await;
        if let Some(system) = guard.get(name) {
            return Ok(system.clone());
        }

        let system = self.repository.get_or_create_star_system(name).await?;
        guard.insert(name.to_string(), system.clone());
        Ok(system)
    }

    /// Persists `system` and makes it the cached record. The cache is updated even
    /// when the write fails so in-session state keeps moving.
    pub async fn save(&self, system: &StarSystem) -> Result<()> {
        let mut guard = self.systems.lock().await;
        let result = self.repository.save_star_system(system).await;
        guard.insert(system.name.clone(), system.clone());
        result
    }

    pub async fn cached(&self, name: &str) -> Option<StarSystem> {
        self.systems.lock().await.get(name).cloned()
    }

    pub async fn len(&self) -> usize {
        self.systems.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.systems.lock().await.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/cache_tests.rs"]
mod tests;
