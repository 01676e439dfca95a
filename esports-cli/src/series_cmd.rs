//! Series command - simulate one series, or many trials of it
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestrates the command
//! - Level 2: load_teams(), play_trials(), report_results()
//! - Level 3: summarize_trials()
//! - Level 4: print helpers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use esports_core::{TeamId, TeamRoster};
use esports_tournament::{GameRunner, MatchFormat, MatchId, SeriesResult, SimulationConfig};
use indicatif::{ProgressBar, ProgressStyle};

use crate::roster_file::load_roster_file;
use crate::RunContext;

#[derive(Args, Debug)]
pub struct SeriesArgs {
    /// Roster file (JSON)
    #[arg(long, value_name = "FILE")]
    pub rosters: PathBuf,

    /// First team, by id or name
    #[arg(long)]
    pub team_a: String,

    /// Second team, by id or name
    #[arg(long)]
    pub team_b: String,

    /// Series length (1, 3, 5 or 7)
    #[arg(long, default_value = "3")]
    pub best_of: u8,

    /// Number of independent series to simulate
    #[arg(long, default_value = "1")]
    pub trials: usize,
}

/// Win counts over many trials of the same pairing
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TrialSummary {
    pub team_a: TeamId,
    pub team_b: TeamId,
    pub trials: usize,
    pub team_a_wins: usize,
    pub team_b_wins: usize,
    pub sweeps: usize,
    pub avg_games: f64,
}

impl TrialSummary {
    pub fn team_a_win_rate(&self) -> f64 {
        if self.trials == 0 {
            0.0
        } else {
            self.team_a_wins as f64 / self.trials as f64
        }
    }
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run the series command
pub fn run(args: SeriesArgs, ctx: &RunContext) -> Result<()> {
    let format = MatchFormat::from_best_of(args.best_of)
        .with_context(|| format!("Unsupported series length: best of {}", args.best_of))?;
    let (team_a, team_b) = load_teams(&args)?;
    let seed = ctx.base_seed();

    tracing::info!(
        team_a = %team_a.team_name,
        team_b = %team_b.team_name,
        ?format,
        trials = args.trials,
        seed,
        "simulating series"
    );

    let results = play_trials(&team_a, &team_b, format, args.trials, &ctx.config.simulation, seed);
    report_results(&results, &team_a, &team_b, ctx.json);
    Ok(())
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

/// Load both rosters from the roster file
fn load_teams(args: &SeriesArgs) -> Result<(TeamRoster, TeamRoster)> {
    let file = load_roster_file(&args.rosters)?;
    let team_a = file
        .find_team(&args.team_a)
        .with_context(|| format!("Team not found: {}", args.team_a))?;
    let team_b = file
        .find_team(&args.team_b)
        .with_context(|| format!("Team not found: {}", args.team_b))?;
    if team_a.id == team_b.id {
        bail!("A team cannot play itself: {}", team_a.name);
    }
    Ok((team_a.roster(), team_b.roster()))
}

/// Play independent series; trial `i` uses match id `i`
fn play_trials(
    team_a: &TeamRoster,
    team_b: &TeamRoster,
    format: MatchFormat,
    trials: usize,
    config: &SimulationConfig,
    seed: u64,
) -> Vec<SeriesResult> {
    let progress = if trials > 1 {
        let bar = ProgressBar::new(trials as u64);
        if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} series ({eta})") {
            bar.set_style(style);
        }
        bar
    } else {
        ProgressBar::hidden()
    };

    let results = (1..=trials as MatchId)
        .map(|match_id| {
            let result = GameRunner::for_match(config.clone(), seed, match_id).play_series(match_id, team_a, team_b, format);
            progress.inc(1);
            result
        })
        .collect();

    progress.finish_and_clear();
    results
}

fn report_results(results: &[SeriesResult], team_a: &TeamRoster, team_b: &TeamRoster, json: bool) {
    match (results, json) {
        ([single], true) => print_json(single),
        ([single], false) => print_series(single, team_a, team_b),
        (_, true) => print_json(&summarize_trials(results, team_a.team_id, team_b.team_id)),
        (_, false) => print_summary(&summarize_trials(results, team_a.team_id, team_b.team_id), team_a, team_b),
    }
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Aggregate trial outcomes
fn summarize_trials(results: &[SeriesResult], team_a: TeamId, team_b: TeamId) -> TrialSummary {
    let team_a_wins = results.iter().filter(|r| r.winner_id == team_a).count();
    let total_games: usize = results.iter().map(|r| r.games.len()).sum();
    TrialSummary {
        team_a,
        team_b,
        trials: results.len(),
        team_a_wins,
        team_b_wins: results.len() - team_a_wins,
        sweeps: results.iter().filter(|r| r.is_sweep()).count(),
        avg_games: if results.is_empty() {
            0.0
        } else {
            total_games as f64 / results.len() as f64
        },
    }
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

fn print_json<T: serde::Serialize>(value: &T) {
    if let Ok(json) = serde_json::to_string_pretty(value) {
        println!("{}", json);
    }
}

fn print_series(result: &SeriesResult, team_a: &TeamRoster, team_b: &TeamRoster) {
    let name = |id: TeamId| {
        if id == team_a.team_id {
            team_a.team_name.as_str()
        } else {
            team_b.team_name.as_str()
        }
    };

    println!("\n=== {} vs {} ({:?}) ===", team_a.team_name, team_b.team_name, result.format);
    for game in &result.games {
        println!(
            "  Game {}: {} wins ({:.1} vs {:.1}){}",
            game.game_number,
            name(game.winner_id),
            game.team_a.performance,
            game.team_b.performance,
            if game.is_upset { " upset" } else { "" }
        );
    }
    println!("Result: {} {}-{}", name(result.winner_id), result.score_a.max(result.score_b), result.score_a.min(result.score_b));
    if let Some(mvp) = &result.mvp {
        println!("MVP:    {} ({}, impact {:+.1})", mvp.player_name, name(mvp.team_id), mvp.total_impact);
    }
    if let Some(key) = &result.key_player {
        println!(
            "Key:    {} ({:?}, game {}, impact {:+.1})",
            key.player_name, key.reason, key.game_number, key.impact_score
        );
    }
}

fn print_summary(summary: &TrialSummary, team_a: &TeamRoster, team_b: &TeamRoster) {
    println!("\n=== {} vs {} ===", team_a.team_name, team_b.team_name);
    println!("Trials:     {}", summary.trials);
    println!(
        "{}: {} ({:.1}%)",
        team_a.team_name,
        summary.team_a_wins,
        summary.team_a_win_rate() * 100.0
    );
    println!(
        "{}: {} ({:.1}%)",
        team_b.team_name,
        summary.team_b_wins,
        (1.0 - summary.team_a_win_rate()) * 100.0
    );
    println!("Sweeps:     {}", summary.sweeps);
    println!("Avg games:  {:.2}", summary.avg_games);
}

// ============================================================================
// TESTS
// ============================================================================
