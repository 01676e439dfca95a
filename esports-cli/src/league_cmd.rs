//! League command - one region's regular season and playoffs
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestrates the command
//! - Level 2: load_league(), play_league(), report_results()
//! - Level 3: league_config()
//! - Level 4: print helpers

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use esports_tournament::{
    run_while, League, LeagueConfig, LeaguePhase, NullSink, PlayoffConfig, RosterBook, SimulationConfig,
    StandingEntry,
};

use crate::roster_file::{load_roster_file, RosterFile};
use crate::snapshot::{load_snapshot, save_snapshot, Snapshot};
use crate::RunContext;

#[derive(Args, Debug)]
pub struct LeagueArgs {
    /// Roster file (JSON)
    #[arg(long, value_name = "FILE")]
    pub rosters: PathBuf,

    /// Region whose teams form the league, by id or name
    #[arg(long)]
    pub region: String,

    /// Follow the regular season with the double-elimination playoffs
    #[arg(long)]
    pub playoffs: bool,

    /// Write the league state here after running
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,

    /// Continue from a snapshot instead of starting a new season
    #[arg(long, value_name = "FILE")]
    pub resume: Option<PathBuf>,

    /// Stop at a phase boundary
    #[arg(long, value_enum)]
    pub stop_after: Option<LeagueStop>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LeagueStop {
    /// Stop once the regular season is complete
    Season,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run the league command
pub fn run(args: LeagueArgs, ctx: &RunContext) -> Result<()> {
    let file = load_roster_file(&args.rosters)?;
    let rosters = file.roster_book();
    let (mut league, seed) = load_league(&args, ctx, &file)?;

    tracing::info!(league = %league.name, phase = ?league.phase(), seed, "running league");

    play_league(&mut league, &rosters, &ctx.config.simulation, seed, args.stop_after)?;

    if let Some(path) = &args.snapshot {
        save_snapshot(path, &Snapshot::new(seed, league.clone()))?;
    }

    report_results(&league, ctx.json);
    Ok(())
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

/// Resume a saved league or schedule a new one
fn load_league(args: &LeagueArgs, ctx: &RunContext, file: &RosterFile) -> Result<(League, u64)> {
    if let Some(path) = &args.resume {
        let snapshot: Snapshot<League> = load_snapshot(path)?;
        if ctx.seed.is_some_and(|s| s != snapshot.seed) {
            tracing::warn!(snapshot_seed = snapshot.seed, "ignoring --seed, resuming with the snapshot seed");
        }
        return Ok((snapshot.state, snapshot.seed));
    }

    let region = file
        .find_region(&args.region)
        .with_context(|| format!("Region not found: {}", args.region))?;
    let config = league_config(&ctx.config.league, args.playoffs);
    let league = League::new(config, &region.name, region.entrants(), 1)
        .with_context(|| format!("Failed to schedule league for {}", region.name))?;
    Ok((league, ctx.base_seed()))
}

fn play_league(
    league: &mut League,
    rosters: &RosterBook,
    config: &SimulationConfig,
    seed: u64,
    stop_after: Option<LeagueStop>,
) -> Result<usize> {
    let played = run_while(league, rosters, config, seed, &mut NullSink, |l| match stop_after {
        Some(LeagueStop::Season) => l.phase() == LeaguePhase::RegularSeason,
        None => true,
    })
    .context("League simulation failed")?;

    tracing::info!(played, phase = ?league.phase(), "league run finished");
    Ok(played)
}

fn report_results(league: &League, json: bool) {
    if json {
        print_json_results(league);
    } else {
        print_text_results(league);
    }
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Engine league config with playoffs switched on or off
fn league_config(base: &LeagueConfig, playoffs: bool) -> LeagueConfig {
    LeagueConfig {
        playoffs: playoffs.then(|| base.playoffs.clone().unwrap_or_else(PlayoffConfig::default)),
        ..base.clone()
    }
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

fn print_json_results(league: &League) {
    #[derive(serde::Serialize)]
    struct JsonPlacement {
        team_id: u64,
        place: u8,
        points: u32,
    }

    #[derive(serde::Serialize)]
    struct JsonOutput<'a> {
        league: &'a str,
        phase: LeaguePhase,
        series_played: usize,
        champion: Option<u64>,
        table: &'a [StandingEntry],
        playoffs: Vec<JsonPlacement>,
    }

    let output = JsonOutput {
        league: &league.name,
        phase: league.phase(),
        series_played: league.ledger.len(),
        champion: league.champion(),
        table: league.table().map(|t| t.entries()).unwrap_or_default(),
        playoffs: league
            .playoffs
            .iter()
            .flat_map(|b| {
                b.placements.iter().map(|p| JsonPlacement {
                    team_id: p.team_id,
                    place: p.place,
                    points: b.team_points(p.team_id),
                })
            })
            .collect(),
    };

    if let Ok(json) = serde_json::to_string_pretty(&output) {
        println!("{}", json);
    }
}

fn print_text_results(league: &League) {
    println!("\n=== {} ({:?}) ===", league.name, league.phase());
    println!("Series played: {}", league.ledger.len());

    if let Some(table) = league.table() {
        println!("\n  #  Team                  W   L  Pts  Games");
        for e in table.entries() {
            println!(
                "{:>3}  {:<20} {:>3} {:>3} {:>4}  {}-{} ({:+})",
                e.rank, e.team_name, e.wins, e.losses, e.points, e.games_won, e.games_lost, e.game_diff
            );
        }
    }

    if let Some(bracket) = &league.playoffs {
        let name = |id: u64| {
            league
                .table()
                .and_then(|t| t.entry(id))
                .map_or_else(|| id.to_string(), |e| e.team_name.clone())
        };
        if bracket.is_finished() {
            println!("\nPlayoffs:");
            for p in &bracket.placements {
                println!("  {:>2}. {} ({} pts)", p.place, name(p.team_id), bracket.team_points(p.team_id));
            }
        } else {
            println!("\nPlayoffs in progress: {} series pending", bracket.pending_fixtures().len());
        }
    }

    if let Some(champion) = league.champion() {
        let name = league
            .table()
            .and_then(|t| t.entry(champion))
            .map_or_else(|| champion.to_string(), |e| e.team_name.clone());
        println!("\nChampion: {}", name);
    }
}

// ============================================================================
// TESTS
// ============================================================================
