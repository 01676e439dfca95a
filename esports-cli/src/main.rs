//! Esports CLI - Command-line interface
//!
//! Commands:
//! - series: Simulate one series, or many trials of it
//! - league: Run a region's regular season and playoffs
//! - region: Run the region tournament to a champion region
//! - worlds: Run the world championship to a champion team

mod league_cmd;
mod region_cmd;
mod roster_file;
mod series_cmd;
mod snapshot;
mod worlds_cmd;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use esports_tournament::EngineConfig;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "esports")]
#[command(about = "Esports series and tournament simulator")]
struct Cli {
    /// Random seed for reproducibility
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Engine configuration overrides (JSON)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a series between two teams
    Series(series_cmd::SeriesArgs),
    /// Run a league season
    League(league_cmd::LeagueArgs),
    /// Run the region tournament
    Region(region_cmd::RegionArgs),
    /// Run the world championship
    Worlds(worlds_cmd::WorldsArgs),
}

/// Options shared by every command
pub struct RunContext {
    pub seed: Option<u64>,
    pub config: EngineConfig,
    pub json: bool,
}

impl RunContext {
    /// The explicit seed, or a fresh one drawn from entropy
    pub fn base_seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| create_rng(None).gen())
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let ctx = RunContext {
        seed: cli.seed,
        config: load_engine_config(cli.config.as_deref())?,
        json: cli.json,
    };

    match cli.command {
        Commands::Series(args) => series_cmd::run(args, &ctx),
        Commands::League(args) => league_cmd::run(args, &ctx),
        Commands::Region(args) => region_cmd::run(args, &ctx),
        Commands::Worlds(args) => worlds_cmd::run(args, &ctx),
    }
}

/// Engine defaults, overridden by a JSON file when one is given
fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    tracing::info!(path = %path.display(), "loaded engine config");
    Ok(config)
}

/// Create RNG from seed or random
pub fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}
