//! Region command - seed groups, region battles, champion region
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestrates the command
//! - Level 2: load_tournament(), play_tournament(), report_results()
//! - Level 3: summarize_regions()
//! - Level 4: print helpers

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use esports_tournament::{
    run_while, BracketStage, NullSink, RegionId, RegionPhase, RegionTournament, RosterBook, SimulationConfig,
    SlotState,
};

use crate::roster_file::{load_roster_file, RosterFile};
use crate::snapshot::{load_snapshot, save_snapshot, Snapshot};
use crate::RunContext;

#[derive(Args, Debug)]
pub struct RegionArgs {
    /// Roster file (JSON); teams with a seed represent their region
    #[arg(long, value_name = "FILE")]
    pub rosters: PathBuf,

    /// Write the tournament state here after running
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,

    /// Continue from a snapshot instead of starting a new tournament
    #[arg(long, value_name = "FILE")]
    pub resume: Option<PathBuf>,

    /// Stop at a phase boundary
    #[arg(long, value_enum)]
    pub stop_after: Option<RegionStop>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum RegionStop {
    /// Stop once every seed group is complete
    Groups,
}

/// One region's line in the final report
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RegionSummary {
    pub region_id: RegionId,
    pub name: String,
    pub badges: u32,
    pub placement: Option<u8>,
    /// Placement points of each of the region's teams
    pub team_points: Vec<(u64, u32)>,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run the region command
pub fn run(args: RegionArgs, ctx: &RunContext) -> Result<()> {
    let file = load_roster_file(&args.rosters)?;
    let rosters = file.roster_book();
    let (mut tournament, seed) = load_tournament(&args, ctx, &file)?;

    tracing::info!(regions = tournament.regions.len(), phase = ?tournament.phase, seed, "running region tournament");

    play_tournament(&mut tournament, &rosters, &ctx.config.simulation, seed, args.stop_after)?;

    if let Some(path) = &args.snapshot {
        save_snapshot(path, &Snapshot::new(seed, tournament.clone()))?;
    }

    report_results(&tournament, ctx.json);
    Ok(())
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

/// Resume a saved tournament or create a new one from the seeded teams
fn load_tournament(args: &RegionArgs, ctx: &RunContext, file: &RosterFile) -> Result<(RegionTournament, u64)> {
    if let Some(path) = &args.resume {
        let snapshot: Snapshot<RegionTournament> = load_snapshot(path)?;
        if ctx.seed.is_some_and(|s| s != snapshot.seed) {
            tracing::warn!(snapshot_seed = snapshot.seed, "ignoring --seed, resuming with the snapshot seed");
        }
        return Ok((snapshot.state, snapshot.seed));
    }

    let tournament = RegionTournament::new(ctx.config.region.clone(), file.seeded_regions(), 1)
        .context("Failed to create region tournament")?;
    Ok((tournament, ctx.base_seed()))
}

fn play_tournament(
    tournament: &mut RegionTournament,
    rosters: &RosterBook,
    config: &SimulationConfig,
    seed: u64,
    stop_after: Option<RegionStop>,
) -> Result<usize> {
    let played = run_while(tournament, rosters, config, seed, &mut NullSink, |t| match stop_after {
        Some(RegionStop::Groups) => t.phase == RegionPhase::Groups,
        None => true,
    })
    .context("Region tournament simulation failed")?;

    tracing::info!(played, phase = ?tournament.phase, "region run finished");
    Ok(played)
}

fn report_results(tournament: &RegionTournament, json: bool) {
    let regions = summarize_regions(tournament);
    if json {
        print_json_results(tournament, &regions);
    } else {
        print_text_results(tournament, &regions);
    }
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Regions in placement order, unplaced regions last by id
fn summarize_regions(tournament: &RegionTournament) -> Vec<RegionSummary> {
    let mut regions: Vec<RegionSummary> = tournament
        .regions
        .iter()
        .map(|r| RegionSummary {
            region_id: r.id,
            name: r.name.clone(),
            badges: tournament.badges.get(&r.id).copied().unwrap_or(0),
            placement: tournament.placement(r.id),
            team_points: r
                .teams
                .iter()
                .map(|t| (t.team_id, tournament.team_points(t.team_id)))
                .collect(),
        })
        .collect();
    regions.sort_by_key(|r| (r.placement.unwrap_or(u8::MAX), r.region_id));
    regions
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

fn print_json_results(tournament: &RegionTournament, regions: &[RegionSummary]) {
    #[derive(serde::Serialize)]
    struct JsonOutput<'a> {
        phase: RegionPhase,
        series_played: usize,
        champion: Option<RegionId>,
        semifinal_skipped: bool,
        regions: &'a [RegionSummary],
        semifinal: Option<&'a BracketStage>,
        #[serde(rename = "final")]
        final_stage: Option<&'a BracketStage>,
    }

    let output = JsonOutput {
        phase: tournament.phase,
        series_played: tournament.ledger.len(),
        champion: tournament.champion(),
        semifinal_skipped: tournament.semifinal_skipped,
        regions,
        semifinal: tournament.semifinal.as_ref(),
        final_stage: tournament.final_stage.as_ref(),
    };

    if let Ok(json) = serde_json::to_string_pretty(&output) {
        println!("{}", json);
    }
}

fn print_text_results(tournament: &RegionTournament, regions: &[RegionSummary]) {
    let region_name = |id: RegionId| {
        tournament
            .region(id)
            .map_or_else(|_| id.to_string(), |r| r.name.clone())
    };

    println!("\n=== Region Tournament ({:?}) ===", tournament.phase);
    println!("Series played: {}", tournament.ledger.len());

    println!("\nRegions:");
    for r in regions {
        let place = r.placement.map_or_else(|| "-".to_string(), |p| p.to_string());
        println!("  {:>2}  {:<16} badges {}", place, r.name, r.badges);
    }

    if tournament.semifinal_skipped {
        println!("\nSemifinal skipped: runner-up on badges went straight to the final");
    }
    for (label, stage) in [("Semifinal", &tournament.semifinal), ("Final", &tournament.final_stage)] {
        let Some(stage) = stage else { continue };
        println!(
            "\n{}: {} vs {} ({}-{})",
            label,
            region_name(stage.side_a),
            region_name(stage.side_b),
            stage.wins_a,
            stage.wins_b
        );
        for slot in stage.slots.iter().chain(stage.tiebreaker.iter()) {
            let state = match slot.state {
                SlotState::Scheduled => "scheduled".to_string(),
                SlotState::Completed { score_a, score_b, .. } => format!("{}-{}", score_a, score_b),
                SlotState::Cancelled => "cancelled".to_string(),
            };
            let seed = if slot.seed == 0 { "TB".to_string() } else { format!("S{}", slot.seed) };
            println!("  {:<3} {} vs {}: {}", seed, slot.team_a, slot.team_b, state);
        }
    }

    if let Some(champion) = tournament.champion() {
        println!("\nChampion region: {}", region_name(champion));
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster_file::tests::sample_file;
    use esports_tournament::RegionBattleConfig;

    fn tournament(file: &RosterFile) -> RegionTournament {
        RegionTournament::new(RegionBattleConfig::default(), file.seeded_regions(), 1).unwrap()
    }

    #[test]
    fn test_stop_after_groups() {
        let file = sample_file();
        let mut t = tournament(&file);
        // 4 seed groups of 2 teams, one series each
        let played = play_tournament(&mut t, &file.roster_book(), &SimulationConfig::default(), 4, Some(RegionStop::Groups)).unwrap();

        assert_eq!(played, 4);
        assert_eq!(t.phase, RegionPhase::RegionBattle);
        assert!(t.final_stage.is_some());
        assert!(t.semifinal_skipped);
    }

    #[test]
    fn test_full_run_places_both_regions() {
        let file = sample_file();
        let mut t = tournament(&file);
        play_tournament(&mut t, &file.roster_book(), &SimulationConfig::default(), 4, None).unwrap();

        assert_eq!(t.phase, RegionPhase::Completed);
        let regions = summarize_regions(&t);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].placement, Some(1));
        assert_eq!(regions[1].placement, Some(2));
        assert_eq!(Some(regions[0].region_id), t.champion());
        assert!(regions.iter().all(|r| r.team_points.len() == 4));
        assert!(regions[0].team_points.iter().all(|&(_, pts)| pts == 12 || pts == 6));
    }
}
