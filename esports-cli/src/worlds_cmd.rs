//! Worlds command - Swiss group stage, then the Bo5 knockout
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestrates the command
//! - Level 2: load_worlds(), play_worlds(), report_results()
//! - Level 3: worlds_field()
//! - Level 4: print helpers

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use esports_tournament::{
    run_while, GroupEntrant, NullSink, RosterBook, SimulationConfig, StandingEntry, WorldsPhase, WorldsPlacement,
    WorldsRound, WorldsTournament, WORLDS_DIRECT_SEEDS,
};

use crate::roster_file::{load_roster_file, RosterFile};
use crate::snapshot::{load_snapshot, save_snapshot, Snapshot};
use crate::RunContext;

/// Teams sent to the Swiss stage
const SWISS_TEAMS: usize = 8;

#[derive(Args, Debug)]
pub struct WorldsArgs {
    /// Roster file (JSON); seeded teams qualify, best seeds first
    #[arg(long, value_name = "FILE")]
    pub rosters: PathBuf,

    /// Write the championship state here after running
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,

    /// Continue from a snapshot instead of starting a new championship
    #[arg(long, value_name = "FILE")]
    pub resume: Option<PathBuf>,

    /// Stop at a phase boundary
    #[arg(long, value_enum)]
    pub stop_after: Option<WorldsStop>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum WorldsStop {
    /// Stop once the Swiss stage is complete
    Swiss,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run the worlds command
pub fn run(args: WorldsArgs, ctx: &RunContext) -> Result<()> {
    let file = load_roster_file(&args.rosters)?;
    let rosters = file.roster_book();
    let (mut worlds, seed) = load_worlds(&args, ctx, &file)?;

    tracing::info!(phase = ?worlds.phase(), seed, "running world championship");

    play_worlds(&mut worlds, &rosters, &ctx.config.simulation, seed, args.stop_after)?;

    if let Some(path) = &args.snapshot {
        save_snapshot(path, &Snapshot::new(seed, worlds.clone()))?;
    }

    report_results(&worlds, ctx.json);
    Ok(())
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

/// Resume a saved championship or draw a new one from the seeded teams
fn load_worlds(args: &WorldsArgs, ctx: &RunContext, file: &RosterFile) -> Result<(WorldsTournament, u64)> {
    if let Some(path) = &args.resume {
        let snapshot: Snapshot<WorldsTournament> = load_snapshot(path)?;
        if ctx.seed.is_some_and(|s| s != snapshot.seed) {
            tracing::warn!(snapshot_seed = snapshot.seed, "ignoring --seed, resuming with the snapshot seed");
        }
        return Ok((snapshot.state, snapshot.seed));
    }

    let (direct, swiss) = worlds_field(file);
    let worlds = WorldsTournament::new(ctx.config.worlds.clone(), direct, swiss, 1)
        .context("Failed to create world championship")?;
    Ok((worlds, ctx.base_seed()))
}

fn play_worlds(
    worlds: &mut WorldsTournament,
    rosters: &RosterBook,
    config: &SimulationConfig,
    seed: u64,
    stop_after: Option<WorldsStop>,
) -> Result<usize> {
    let played = run_while(worlds, rosters, config, seed, &mut NullSink, |w| match stop_after {
        Some(WorldsStop::Swiss) => w.phase() == WorldsPhase::Swiss,
        None => true,
    })
    .context("World championship simulation failed")?;

    tracing::info!(played, phase = ?worlds.phase(), "worlds run finished");
    Ok(played)
}

fn report_results(worlds: &WorldsTournament, json: bool) {
    if json {
        print_json_results(worlds);
    } else {
        print_text_results(worlds);
    }
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Seeded teams ordered by seed, then by region order. The first four
/// are seeded into the quarterfinals and the next eight play the Swiss
/// stage.
fn worlds_field(file: &RosterFile) -> (Vec<GroupEntrant>, Vec<GroupEntrant>) {
    let mut seeded: Vec<(u8, usize, GroupEntrant)> = file
        .regions
        .iter()
        .enumerate()
        .flat_map(|(order, region)| {
            region.teams.iter().filter_map(move |t| {
                t.seed.map(|seed| {
                    (
                        seed,
                        order,
                        GroupEntrant {
                            team_id: t.id,
                            name: t.name.clone(),
                        },
                    )
                })
            })
        })
        .collect();
    seeded.sort_by_key(|(seed, order, _)| (*seed, *order));

    let mut entrants = seeded.into_iter().map(|(_, _, e)| e);
    let direct: Vec<GroupEntrant> = entrants.by_ref().take(WORLDS_DIRECT_SEEDS).collect();
    let swiss: Vec<GroupEntrant> = entrants.take(SWISS_TEAMS).collect();
    (direct, swiss)
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

fn print_json_results(worlds: &WorldsTournament) {
    #[derive(serde::Serialize)]
    struct JsonPlacement {
        team_id: u64,
        place: u8,
        points: u32,
    }

    #[derive(serde::Serialize)]
    struct JsonOutput<'a> {
        phase: WorldsPhase,
        series_played: usize,
        champion: Option<u64>,
        swiss: &'a [StandingEntry],
        placements: Vec<JsonPlacement>,
    }

    let output = JsonOutput {
        phase: worlds.phase(),
        series_played: worlds.ledger.len(),
        champion: worlds.champion(),
        swiss: worlds.swiss_table().map(|t| t.entries()).unwrap_or_default(),
        placements: worlds
            .placements
            .iter()
            .map(|&WorldsPlacement { team_id, place }| JsonPlacement {
                team_id,
                place,
                points: worlds.team_points(team_id),
            })
            .collect(),
    };

    if let Ok(json) = serde_json::to_string_pretty(&output) {
        println!("{}", json);
    }
}

fn print_text_results(worlds: &WorldsTournament) {
    let name = |id: u64| worlds.team_name(id).map_or_else(|| id.to_string(), str::to_string);

    println!("\n=== World Championship ({:?}) ===", worlds.phase());
    println!("Series played: {}", worlds.ledger.len());

    if let Some(table) = worlds.swiss_table() {
        println!("\nSwiss stage:");
        for e in table.entries() {
            println!("{:>3}  {:<20} {}-{}", e.rank, e.team_name, e.wins, e.losses);
        }
    }

    let rounds = [
        (WorldsRound::Quarterfinal, "Quarterfinal"),
        (WorldsRound::Semifinal, "Semifinal"),
        (WorldsRound::ThirdPlace, "Third place"),
        (WorldsRound::GrandFinal, "Final"),
    ];
    for (round, label) in rounds {
        for order in 1..=4 {
            let Some(stage) = worlds.stage(round, order) else { continue };
            let score = stage
                .winner()
                .map_or_else(|| "pending".to_string(), |w| format!("{} advances", name(w)));
            println!("{} {}: {} vs {} ({})", label, order, name(stage.side_a), name(stage.side_b), score);
        }
    }

    if worlds.is_finished() {
        println!("\nPlacements:");
        for p in &worlds.placements {
            println!("  {:>2}. {} ({} pts)", p.place, name(p.team_id), worlds.team_points(p.team_id));
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster_file::tests::sample_file;
    use esports_tournament::WorldsConfig;

    #[test]
    fn test_field_takes_best_seeds_first() {
        let (direct, swiss) = worlds_field(&sample_file());
        let ids = |v: &[GroupEntrant]| v.iter().map(|e| e.team_id).collect::<Vec<_>>();
        assert_eq!(ids(&direct), vec![101, 201, 102, 202]);
        assert_eq!(ids(&swiss), vec![103, 203, 104, 204]);
    }

    #[test]
    fn test_stop_after_swiss_then_finish() {
        let file = sample_file();
        let (direct, swiss) = worlds_field(&file);
        let mut worlds = WorldsTournament::new(WorldsConfig::default(), direct, swiss, 1).unwrap();
        let config = SimulationConfig::default();

        // Four Swiss teams, two series per round for five rounds
        let played = play_worlds(&mut worlds, &file.roster_book(), &config, 6, Some(WorldsStop::Swiss)).unwrap();
        assert_eq!(played, 10);
        assert_eq!(worlds.phase(), WorldsPhase::Knockout);

        let played = play_worlds(&mut worlds, &file.roster_book(), &config, 6, None).unwrap();
        assert_eq!(played, 8);
        assert!(worlds.is_finished());
        assert_eq!(worlds.placements.len(), 8);
    }
}
