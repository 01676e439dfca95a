//! Batch simulation - compute pending series lane by lane, apply in order
//!
//! Level 1 - Orchestration

use esports_core::{TeamId, TeamRoster};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::bracket::BracketStage;
use crate::collaborators::{PersistenceSink, RosterSupplier};
use crate::config::SimulationConfig;
use crate::error::TournamentError;
use crate::game_runner::GameRunner;
use crate::league::League;
use crate::region::{RegionPhase, RegionTournament};
use crate::schedule::{Fixture, MatchId};
use crate::series::SeriesResult;
use crate::worlds::WorldsTournament;

/// Work the batch runner can compute independently of every other lane
#[derive(Clone, Debug, PartialEq)]
pub enum Lane {
    /// A fixture no other result can cancel
    Fixture(Fixture),
    /// A stage whose slots are played one at a time in seed order; a
    /// slot is only computed while the stage still needs it
    Stage(BracketStage),
}

impl Lane {
    /// Teams whose rosters the lane may need
    fn teams(&self) -> Vec<TeamId> {
        match self {
            Lane::Fixture(f) => vec![f.team_a, f.team_b],
            Lane::Stage(stage) => stage.slots.iter().flat_map(|s| [s.team_a, s.team_b]).collect(),
        }
    }
}

/// A tournament shape the batch runner can drive
pub trait Competition {
    /// Fixtures ready to simulate, ascending match id
    fn pending_fixtures(&self) -> Vec<Fixture>;

    /// Pending work split into independent lanes. Shapes whose stages
    /// can cancel their own slots hand those stages over whole.
    fn pending_lanes(&self) -> Vec<Lane> {
        self.pending_fixtures().into_iter().map(Lane::Fixture).collect()
    }

    /// Whether a match still takes a result
    fn is_pending(&self, match_id: MatchId) -> bool;

    /// Apply one result; rejects anything not currently pending
    fn apply_result(&mut self, result: SeriesResult, sink: &mut dyn PersistenceSink) -> Result<(), TournamentError>;

    /// Create whatever the latest results unlocked
    fn advance(&mut self) -> Result<bool, TournamentError>;

    fn is_finished(&self) -> bool;
}

impl Competition for League {
    fn pending_fixtures(&self) -> Vec<Fixture> {
        League::pending_fixtures(self)
    }

    fn is_pending(&self, match_id: MatchId) -> bool {
        League::is_pending(self, match_id)
    }

    fn apply_result(&mut self, result: SeriesResult, sink: &mut dyn PersistenceSink) -> Result<(), TournamentError> {
        self.apply(result, sink)
    }

    fn advance(&mut self) -> Result<bool, TournamentError> {
        League::advance(self)
    }

    fn is_finished(&self) -> bool {
        League::is_finished(self)
    }
}

impl Competition for RegionTournament {
    fn pending_fixtures(&self) -> Vec<Fixture> {
        RegionTournament::pending_fixtures(self)
    }

    /// Seed-group fixtures one by one, each region battle as one lane
    fn pending_lanes(&self) -> Vec<Lane> {
        let mut lanes: Vec<Lane> = self.groups.pending_fixtures().into_iter().map(Lane::Fixture).collect();
        lanes.extend(
            self.semifinal
                .iter()
                .chain(self.final_stage.iter())
                .filter(|s| !s.pending_fixtures().is_empty())
                .cloned()
                .map(Lane::Stage),
        );
        lanes
    }

    fn is_pending(&self, match_id: MatchId) -> bool {
        RegionTournament::is_pending(self, match_id)
    }

    fn apply_result(&mut self, result: SeriesResult, sink: &mut dyn PersistenceSink) -> Result<(), TournamentError> {
        self.apply(result, sink)
    }

    fn advance(&mut self) -> Result<bool, TournamentError> {
        RegionTournament::advance(self)
    }

    fn is_finished(&self) -> bool {
        self.phase == RegionPhase::Completed
    }
}

impl Competition for WorldsTournament {
    fn pending_fixtures(&self) -> Vec<Fixture> {
        WorldsTournament::pending_fixtures(self)
    }

    fn is_pending(&self, match_id: MatchId) -> bool {
        WorldsTournament::is_pending(self, match_id)
    }

    fn apply_result(&mut self, result: SeriesResult, sink: &mut dyn PersistenceSink) -> Result<(), TournamentError> {
        self.apply(result, sink)
    }

    fn advance(&mut self) -> Result<bool, TournamentError> {
        WorldsTournament::advance(self)
    }

    fn is_finished(&self) -> bool {
        WorldsTournament::is_finished(self)
    }
}

/// Look up every roster the lanes may need, before anything is played
fn resolve_rosters(
    lanes: &[Lane],
    rosters: &dyn RosterSupplier,
) -> Result<FxHashMap<TeamId, TeamRoster>, TournamentError> {
    let mut resolved = FxHashMap::default();
    for team in lanes.iter().flat_map(Lane::teams) {
        if !resolved.contains_key(&team) {
            let roster = rosters.roster(team).ok_or(TournamentError::RosterUnavailable(team))?;
            resolved.insert(team, roster);
        }
    }
    Ok(resolved)
}

fn play(
    fixture: &Fixture,
    rosters: &FxHashMap<TeamId, TeamRoster>,
    config: &SimulationConfig,
    seed: u64,
) -> Result<SeriesResult, TournamentError> {
    let a = rosters
        .get(&fixture.team_a)
        .ok_or(TournamentError::RosterUnavailable(fixture.team_a))?;
    let b = rosters
        .get(&fixture.team_b)
        .ok_or(TournamentError::RosterUnavailable(fixture.team_b))?;
    Ok(GameRunner::for_match(config.clone(), seed, fixture.match_id).play_fixture(fixture, a, b))
}

/// Compute one lane. A stage lane records each result on a private copy
/// of the stage and stops once the copy has nothing left to play, so
/// slots the stage cancels are never simulated.
fn play_lane<F>(lane: &Lane, play: &F) -> Result<Vec<SeriesResult>, TournamentError>
where
    F: Fn(&Fixture) -> Result<SeriesResult, TournamentError>,
{
    match lane {
        Lane::Fixture(fixture) => Ok(vec![play(fixture)?]),
        Lane::Stage(stage) => {
            let mut stage = stage.clone();
            let mut results = Vec::new();
            while let Some(fixture) = stage.pending_fixtures().into_iter().next() {
                let result = play(&fixture)?;
                stage.record(fixture.match_id, &result)?;
                results.push(result);
            }
            Ok(results)
        }
    }
}

/// Simulate every currently pending series and apply the results.
///
/// Each match draws from its own random stream derived from `seed` and
/// its match id, so results do not depend on thread scheduling. With
/// `config.parallel` the lanes are computed on the rayon pool; results
/// are always applied one at a time in ascending match id. Returns the
/// number of series applied.
pub fn simulate_pending<C: Competition + ?Sized>(
    competition: &mut C,
    rosters: &dyn RosterSupplier,
    config: &SimulationConfig,
    seed: u64,
    sink: &mut dyn PersistenceSink,
) -> Result<usize, TournamentError> {
    let lanes = competition.pending_lanes();
    let resolved = resolve_rosters(&lanes, rosters)?;
    let play_one = |fixture: &Fixture| play(fixture, &resolved, config, seed);

    let computed: Vec<Vec<SeriesResult>> = if config.parallel {
        lanes.par_iter().map(|lane| play_lane(lane, &play_one)).collect::<Result<_, _>>()?
    } else {
        lanes.iter().map(|lane| play_lane(lane, &play_one)).collect::<Result<_, _>>()?
    };

    let mut results: Vec<SeriesResult> = computed.into_iter().flatten().collect();
    results.sort_by_key(|r| r.match_id);
    let applied = results.len();
    for result in results {
        competition.apply_result(result, sink)?;
    }

    tracing::debug!(lanes = lanes.len(), applied, "batch applied");
    Ok(applied)
}

/// Alternate simulating and advancing while `keep_going` holds and the
/// competition is not finished. Returns the number of series applied.
pub fn run_while<C, F>(
    competition: &mut C,
    rosters: &dyn RosterSupplier,
    config: &SimulationConfig,
    seed: u64,
    sink: &mut dyn PersistenceSink,
    mut keep_going: F,
) -> Result<usize, TournamentError>
where
    C: Competition + ?Sized,
    F: FnMut(&C) -> bool,
{
    let mut total = 0;
    while !competition.is_finished() && keep_going(&*competition) {
        let applied = simulate_pending(competition, rosters, config, seed, sink)?;
        let advanced = competition.advance()?;
        total += applied;
        if applied == 0 && !advanced {
            tracing::warn!("competition made no progress, stopping");
            break;
        }
    }
    Ok(total)
}

/// Run a competition to the end
pub fn run_to_completion<C: Competition + ?Sized>(
    competition: &mut C,
    rosters: &dyn RosterSupplier,
    config: &SimulationConfig,
    seed: u64,
    sink: &mut dyn PersistenceSink,
) -> Result<usize, TournamentError> {
    run_while(competition, rosters, config, seed, sink, |_| true)
}
