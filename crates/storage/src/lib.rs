use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::domain::{Coordinates, StarSystem, Station, Superpower};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use tokio::sync::Mutex;

/// Lookup-or-create and persistence contract for star-system records, keyed by name.
#[async_trait]
pub trait StarSystemRepository: Send + Sync {
    /// Returns the record for `name`, creating an empty one on first reference.
    /// Repeated calls with the same name return the same logical record.
    async fn get_or_create_star_system(&self, name: &str) -> Result<StarSystem>;
    async fn save_star_system(&self, system: &StarSystem) -> Result<()>;
    async fn load_star_system(&self, name: &str) -> Result<Option<StarSystem>>;
    async fn list_star_systems(&self) -> Result<Vec<StarSystem>>;
}

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn load_stations(&self, system_name: &str) -> Result<Vec<Station>> {
        let rows = sqlx::query(
            "SELECT name, allegiance FROM stations WHERE system_name = ? ORDER BY name ASC",
        )
        .bind(system_name)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| Station {
                name: r.get::<String, _>(0),
                allegiance: r
                    .get::<Option<String>, _>(1)
                    .as_deref()
                    .and_then(Superpower::from_journal),
            })
            .collect())
    }
}

fn star_system_from_row(row: &SqliteRow) -> StarSystem {
    let coordinates = match (
        row.get::<Option<f64>, _>("x"),
        row.get::<Option<f64>, _>("y"),
        row.get::<Option<f64>, _>("z"),
    ) {
        (Some(x), Some(y), Some(z)) => Some(Coordinates::new(x, y, z)),
        _ => None,
    };

    StarSystem {
        name: row.get::<String, _>("name"),
        coordinates,
        allegiance: row
            .get::<Option<String>, _>("allegiance")
            .as_deref()
            .and_then(Superpower::from_journal),
        visits: row.get::<i64, _>("visits").clamp(0, u32::MAX as i64) as u32,
        last_visit: row.get::<Option<DateTime<Utc>>, _>("last_visit"),
        stations: Vec::new(),
    }
}

fn ensure_valid_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("star system name must not be empty");
    }
    Ok(())
}

#[async_trait]
impl StarSystemRepository for Storage {
    async fn get_or_create_star_system(&self, name: &str) -> Result<StarSystem> {
        ensure_valid_name(name)?;
        sqlx::query("INSERT INTO star_systems (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
            .bind(name)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to create star system '{name}'"))?;

        self.load_star_system(name)
            .await?
            .ok_or_else(|| anyhow!("star system '{name}' vanished after insert"))
    }

    async fn save_star_system(&self, system: &StarSystem) -> Result<()> {
        ensure_valid_name(&system.name)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO star_systems (name, x, y, z, allegiance, visits, last_visit, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
             ON CONFLICT(name) DO UPDATE SET
                x = excluded.x,
                y = excluded.y,
                z = excluded.z,
                allegiance = excluded.allegiance,
                visits = excluded.visits,
                last_visit = excluded.last_visit,
                updated_at = CURRENT_TIMESTAMP",
        )
        .bind(&system.name)
        .bind(system.coordinates.map(|c| c.x))
        .bind(system.coordinates.map(|c| c.y))
        .bind(system.coordinates.map(|c| c.z))
        .bind(system.allegiance.map(|a| a.as_str()))
        .bind(i64::from(system.visits))
        .bind(system.last_visit)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("failed to save star system '{}'", system.name))?;

        for station in &system.stations {
            sqlx::query(
                "INSERT INTO stations (system_name, name, allegiance) VALUES (?, ?, ?)
                 ON CONFLICT(system_name, name) DO UPDATE SET allegiance = excluded.allegiance",
            )
            .bind(&system.name)
            .bind(&station.name)
            .bind(station.allegiance.map(|a| a.as_str()))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn load_star_system(&self, name: &str) -> Result<Option<StarSystem>> {
        let row = sqlx::query(
            "SELECT name, x, y, z, allegiance, visits, last_visit FROM star_systems WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut system = star_system_from_row(&row);
        system.stations = self.load_stations(&system.name).await?;
        Ok(Some(system))
    }

    async fn list_star_systems(&self) -> Result<Vec<StarSystem>> {
        let rows = sqlx::query(
            "SELECT name, x, y, z, allegiance, visits, last_visit
             FROM star_systems
             ORDER BY lower(name) ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut systems = Vec::with_capacity(rows.len());
        for row in rows {
            let mut system = star_system_from_row(&row);
            system.stations = self.load_stations(&system.name).await?;
            systems.push(system);
        }
        Ok(systems)
    }
}

/// Process-local repository used when the database cannot be opened.
#[derive(Default)]
pub struct InMemoryStarSystemRepository {
    systems: Mutex<HashMap<String, StarSystem>>,
}

impl InMemoryStarSystemRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.systems.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.systems.lock().await.is_empty()
    }
}

#[async_trait]
impl StarSystemRepository for InMemoryStarSystemRepository {
    async fn get_or_create_star_system(&self, name: &str) -> Result<StarSystem> {
        ensure_valid_name(name)?;
        let mut guard = self.systems.lock().await;
        Ok(guard
            .entry(name.to_string())
            .or_insert_with(|| StarSystem::new(name))
            .clone())
    }

    async fn save_star_system(&self, system: &StarSystem) -> Result<()> {
        ensure_valid_name(&system.name)?;
        self.systems
            .lock()
            .await
            .insert(system.name.clone(), system.clone());
        Ok(())
    }

    async fn load_star_system(&self, name: &str) -> Result<Option<StarSystem>> {
        Ok(self.systems.lock().await.get(name).cloned())
    }

    async fn list_star_systems(&self) -> Result<Vec<StarSystem>> {
        let mut systems: Vec<StarSystem> = self.systems.lock().await.values().cloned().collect();
        systems.sort_by_key(|system| system.name.to_lowercase());
        Ok(systems)
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
