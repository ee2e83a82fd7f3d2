use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use controller_core::Controller;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;

use config::load_settings;

#[derive(Parser, Debug)]
#[command(about = "Follows the game journal and keeps the commander's session state")]
struct Args {
    /// Settings file; defaults to ./companion.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    journal_dir: Option<PathBuf>,
    #[arg(long)]
    database_url: Option<String>,
    /// Replay a recorded journal file instead of tailing the journal directory.
    #[arg(long)]
    replay: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(dir) = args.journal_dir {
        settings.journal_dir = Some(dir);
    }
    if let Some(url) = args.database_url {
        settings.database_url = url;
    }
    if let Some(path) = args.replay {
        settings.replay_file = Some(path);
    }

    let controller = Controller::instance(&settings.into_controller_config()).await;
    controller.start().await;
    info!("companion running; press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    controller.stop().await;

    if let Some(system) = controller.current_star_system().await {
        info!(system = %system.name, visits = system.visits, "last known location");
    }
    Ok(())
}
