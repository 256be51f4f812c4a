use anyhow::{Context, Result};
use chrono::Utc;
use scintel_harvester::config::{Config, DEFAULT_CONFIG_PATH};
use scintel_harvester::Harvester;
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  scintel-harvester [config.toml]    Run one harvest and publish the snapshot");
    eprintln!("  scintel-harvester --help           Show this message");
    eprintln!();
    eprintln!("Environment overrides:");
    eprintln!("  SCINTEL_DATA_DIR, SCINTEL_FETCH_TIMEOUT, SCINTEL_FDA_API_KEY, SCINTEL_USER_AGENT");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("scintel=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut config = match args.get(1).map(|s| s.as_str()) {
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config file '{path}'"))?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("Failed to load config file '{DEFAULT_CONFIG_PATH}'"))?,
        None => {
            tracing::info!("No config file found, using built-in defaults");
            Config::default()
        }
    };
    config.apply_env(|key| std::env::var(key).ok());

    tracing::info!(
        data_dir = %config.data_dir,
        suppliers = config.suppliers.len(),
        peers = config.peers.len(),
        "Configuration loaded"
    );

    let report = Harvester::new(config).run(Utc::now()).await?;
    if !report.outcome.has_snapshot() {
        tracing::warn!("No snapshot available yet; consumers have nothing to display");
    }
    Ok(())
}
