use anyhow::{bail, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use shared::domain::{Coordinates, StarSystem, Station, Superpower};
use storage::{StarSystemRepository, Storage};

#[derive(Parser, Debug)]
#[command(about = "Inspect and edit the star system visit database")]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/star_systems.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every known system, alphabetically.
    List,
    Show {
        name: String,
    },
    /// Record a visit by hand, optionally filling in coordinates.
    Visit {
        name: String,
        #[arg(long, allow_hyphen_values = true)]
        x: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        y: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        z: Option<f64>,
    },
    /// Record a station in a system so it can be used as the home station.
    AddStation {
        system: String,
        station: String,
        /// federation, empire, alliance or independent
        #[arg(long)]
        allegiance: Option<String>,
    },
}

/// Adds `station` to `system`, creating the system if needed. A known station keeps its record.
async fn add_station(
    repository: &dyn StarSystemRepository,
    system: &str,
    station: &str,
    allegiance: Option<&str>,
) -> Result<StarSystem> {
    let station = station.trim();
    if station.is_empty() {
        bail!("station name must not be empty");
    }
    let allegiance = match allegiance {
        Some(raw) => match Superpower::from_journal(raw) {
            Some(parsed) => Some(parsed),
            None => bail!("unknown allegiance '{raw}'"),
        },
        None => None,
    };

    let mut record = repository.get_or_create_star_system(system.trim()).await?;
    record.add_station(Station {
        name: station.to_string(),
        allegiance,
    });
    repository.save_star_system(&record).await?;
    Ok(record)
}

fn summary(system: &StarSystem) -> String {
    let last_visit = system
        .last_visit
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| "never".to_string());
    format!(
        "{} visits={} last_visit={}",
        system.name, system.visits, last_visit
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::List => {
            for system in storage.list_star_systems().await? {
                println!("{}", summary(&system));
            }
        }
        Command::Show { name } => {
            let Some(system) = storage.load_star_system(&name).await? else {
                bail!("unknown star system '{name}'");
            };
            println!("{}", summary(&system));
            match system.coordinates {
                Some(c) => println!("coordinates: {} {} {}", c.x, c.y, c.z),
                None => println!("coordinates: unknown"),
            }
            if let Some(allegiance) = system.allegiance {
                println!("allegiance: {}", allegiance.as_str());
            }
            for station in &system.stations {
                println!("station: {}", station.name);
            }
        }
        Command::Visit { name, x, y, z } => {
            let mut system = storage.get_or_create_star_system(&name).await?;
            match (x, y, z) {
                (Some(x), Some(y), Some(z)) => {
                    system.coordinates = Some(Coordinates::new(x, y, z));
                }
                (None, None, None) => {}
                _ => bail!("--x, --y and --z must be given together"),
            }
            system.visits = system.visits.saturating_add(1);
            system.last_visit = Some(Utc::now());
            storage.save_star_system(&system).await?;
            println!("{}", summary(&system));
        }
        Command::AddStation {
            system,
            station,
            allegiance,
        } => {
            let record = add_station(&storage, &system, &station, allegiance.as_deref()).await?;
            println!("{} stations={}", record.name, record.stations.len());
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
