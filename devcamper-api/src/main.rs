//! `devcamper` binary

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use devcamper_api::prelude::*;

/// DevCamper REST API server
#[derive(Debug, Parser)]
#[command(name = "devcamper", version, about)]
struct Cli {
    /// Load configuration from this file instead of the search path
    #[arg(short, long, env = "DEVCAMPER_CONFIG")]
    config: Option<PathBuf>,

    /// Seed the store from a directory of JSON fixtures before serving
    #[arg(short, long)]
    seed: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::load().context("loading config")?,
    };
    init_tracing(&config)?;

    let state = AppState::builder()
        .config(config.clone())
        .build()
        .context("building application state")?;

    if let Some(dir) = cli.seed.as_ref().or(config.database.seed_dir.as_ref()) {
        seed_from_dir(&state, dir)
            .await
            .with_context(|| format!("seeding from {}", dir.display()))?;
    }

    Server::new(config).serve(router(state)).await?;
    Ok(())
}
