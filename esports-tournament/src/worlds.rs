//! World championship - Swiss group stage, then a Bo5 knockout
//!
//! Level 1 - Orchestration

use esports_core::TeamId;
use serde::{Deserialize, Serialize};

use crate::bracket::{BracketStage, StageEvent, StageRound};
use crate::collaborators::{store_series, store_standings, PersistenceSink};
use crate::config::WorldsConfig;
use crate::error::TournamentError;
use crate::group_stage::{GroupEntrant, GroupStage};
use crate::schedule::{Fixture, MatchId, MatchIdAllocator};
use crate::series::{SeriesLedger, SeriesResult};
use crate::standings::{GroupId, StandingsTable};

/// Teams seeded straight into the quarterfinals
pub const WORLDS_DIRECT_SEEDS: usize = 4;

/// Teams the Swiss stage sends to the quarterfinals
pub const WORLDS_SWISS_QUALIFIERS: usize = 4;

/// Table id of the Swiss stage
pub const SWISS_GROUP: GroupId = 1;

/// Shared placement of every Swiss-stage eliminee
const SWISS_ELIMINATED_PLACE: u8 = 9;

/// Knockout rounds, in play order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldsRound {
    Quarterfinal,
    Semifinal,
    ThirdPlace,
    GrandFinal,
}

/// Where the championship is
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldsPhase {
    Swiss,
    Knockout,
    Completed,
}

/// Final placement of one team
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldsPlacement {
    pub team_id: TeamId,
    /// 1-4, 5 (shared by quarterfinal losers) or 9 (Swiss eliminees)
    pub place: u8,
}

/// Direct seeds wait in the quarterfinals while the rest play a Bo1
/// Swiss stage. Seed 1 meets the fourth Swiss qualifier, seed 2 the
/// third, and so on; quarterfinal winners 1-2 and 3-4 meet in the
/// semifinals, whose losers play for third place.
///
/// Knockout stages are created by `advance` once their feeders are
/// decided and are never recreated, so a snapshot resumes exactly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldsTournament {
    pub config: WorldsConfig,
    /// Best first
    pub direct_seeds: Vec<GroupEntrant>,
    pub swiss: GroupStage,
    pub stages: Vec<BracketStage>,
    pub placements: Vec<WorldsPlacement>,
    pub ledger: SeriesLedger,
    ids: MatchIdAllocator,
}

impl WorldsTournament {
    /// Validate the field and pair the first Swiss round
    pub fn new(
        config: WorldsConfig,
        direct_seeds: Vec<GroupEntrant>,
        swiss_teams: Vec<GroupEntrant>,
        first_match_id: MatchId,
    ) -> Result<Self, TournamentError> {
        if direct_seeds.len() != WORLDS_DIRECT_SEEDS {
            return Err(TournamentError::NotEnoughParticipants {
                needed: WORLDS_DIRECT_SEEDS,
                actual: direct_seeds.len(),
            });
        }
        if swiss_teams.len() < WORLDS_SWISS_QUALIFIERS {
            return Err(TournamentError::NotEnoughParticipants {
                needed: WORLDS_SWISS_QUALIFIERS,
                actual: swiss_teams.len(),
            });
        }

        let mut ids = MatchIdAllocator::starting_at(first_match_id);
        let swiss = GroupStage::new(
            config.swiss.clone(),
            vec![(SWISS_GROUP, "Swiss".to_string(), swiss_teams)],
            &mut ids,
        )?;

        tracing::info!(
            direct = direct_seeds.len(),
            swiss = swiss.groups.iter().map(|g| g.teams.len()).sum::<usize>(),
            "world championship created"
        );

        Ok(Self {
            config,
            direct_seeds,
            swiss,
            stages: Vec::new(),
            placements: Vec::new(),
            ledger: SeriesLedger::new(),
            ids,
        })
    }

    pub fn phase(&self) -> WorldsPhase {
        if !self.placements.is_empty() {
            WorldsPhase::Completed
        } else if self.swiss.is_complete() {
            WorldsPhase::Knockout
        } else {
            WorldsPhase::Swiss
        }
    }

    pub fn is_finished(&self) -> bool {
        self.phase() == WorldsPhase::Completed
    }

    pub fn swiss_table(&self) -> Option<&StandingsTable> {
        self.swiss.group(SWISS_GROUP).map(|g| &g.table)
    }

    /// Knockout stage for a bracket position, if created
    pub fn stage(&self, round: WorldsRound, order: u8) -> Option<&BracketStage> {
        let wanted = StageRound::Worlds { round, order };
        self.stages.iter().find(|s| s.round == wanted)
    }

    /// Display name of any team in the field
    pub fn team_name(&self, team: TeamId) -> Option<&str> {
        self.direct_seeds
            .iter()
            .find(|e| e.team_id == team)
            .map(|e| e.name.as_str())
            .or_else(|| self.swiss_table()?.entry(team).map(|e| e.team_name.as_str()))
    }

    pub fn champion(&self) -> Option<TeamId> {
        self.placements.iter().find(|p| p.place == 1).map(|p| p.team_id)
    }

    pub fn placement(&self, team: TeamId) -> Option<u8> {
        self.placements.iter().find(|p| p.team_id == team).map(|p| p.place)
    }

    /// Points earned by a team's placement
    pub fn team_points(&self, team: TeamId) -> u32 {
        let points = &self.config.placement_points;
        match self.placement(team) {
            Some(1) => points.champion,
            Some(2) => points.runner_up,
            Some(3) => points.third,
            Some(4) => points.fourth,
            Some(SWISS_ELIMINATED_PLACE) => self.config.group_stage_points,
            Some(_) => points.quarterfinalist,
            None => 0,
        }
    }

    /// Fixtures ready to play, ascending match id
    pub fn pending_fixtures(&self) -> Vec<Fixture> {
        let mut fixtures = self.swiss.pending_fixtures();
        fixtures.extend(self.stages.iter().flat_map(BracketStage::pending_fixtures));
        fixtures.sort_by_key(|f| f.match_id);
        fixtures
    }

    pub fn is_pending(&self, match_id: MatchId) -> bool {
        self.swiss.is_pending(match_id) || self.stages.iter().any(|s| s.is_pending(match_id))
    }

    /// Apply a result, record it in the ledger and hand it to the sink
    pub fn apply(&mut self, result: SeriesResult, sink: &mut dyn PersistenceSink) -> Result<(), TournamentError> {
        let match_id = result.match_id;
        if self.is_finished() {
            return Err(TournamentError::AlreadyFinished);
        }
        if self.ledger.contains(match_id) {
            return Err(TournamentError::SeriesAlreadyApplied(match_id));
        }

        let table = if self.swiss.is_pending(match_id) {
            let group = self.swiss.apply(match_id, &result)?;
            Some((group.id, group.table.entries().to_vec()))
        } else {
            let stage = self
                .stages
                .iter_mut()
                .find(|s| s.slots.iter().any(|slot| slot.match_id == match_id))
                .ok_or(TournamentError::UnknownMatch(match_id))?;
            if let StageEvent::Completed { winner, loser } = stage.record(match_id, &result)? {
                tracing::debug!(round = ?stage.round, winner, loser, "knockout decided");
            }
            None
        };

        let result = self.ledger.record(result)?;
        store_series(sink, match_id, result);
        if let Some((group_id, entries)) = table {
            store_standings(sink, group_id, &entries);
        }
        Ok(())
    }

    /// Pair Swiss rounds, then create every knockout stage whose
    /// feeders are decided, and place the field once the final and the
    /// third-place match are. Returns whether anything changed.
    pub fn advance(&mut self) -> Result<bool, TournamentError> {
        use WorldsRound::*;

        if self.is_finished() {
            return Ok(false);
        }
        if !self.swiss.is_complete() {
            return self.swiss.advance(&mut self.ids);
        }

        if self.stage(Quarterfinal, 1).is_none() {
            self.seed_quarterfinals();
            return Ok(true);
        }

        let quarterfinals: Option<Vec<(TeamId, TeamId)>> = (1..=4).map(|o| self.outcome(Quarterfinal, o)).collect();
        let Some(quarterfinals) = quarterfinals else {
            return Ok(false);
        };
        if self.stage(Semifinal, 1).is_none() {
            self.create(Semifinal, 1, quarterfinals[0].0, quarterfinals[1].0);
            self.create(Semifinal, 2, quarterfinals[2].0, quarterfinals[3].0);
            return Ok(true);
        }

        let (Some((w1, l1)), Some((w2, l2))) = (self.outcome(Semifinal, 1), self.outcome(Semifinal, 2)) else {
            return Ok(false);
        };
        if self.stage(GrandFinal, 1).is_none() {
            self.create(ThirdPlace, 1, l1, l2);
            self.create(GrandFinal, 1, w1, w2);
            return Ok(true);
        }

        let (Some((champion, runner_up)), Some((third, fourth))) =
            (self.outcome(GrandFinal, 1), self.outcome(ThirdPlace, 1))
        else {
            return Ok(false);
        };

        let mut placements = vec![
            WorldsPlacement { team_id: champion, place: 1 },
            WorldsPlacement { team_id: runner_up, place: 2 },
            WorldsPlacement { team_id: third, place: 3 },
            WorldsPlacement { team_id: fourth, place: 4 },
        ];
        placements.extend(quarterfinals.iter().map(|&(_, team_id)| WorldsPlacement { team_id, place: 5 }));
        let qualified = self.swiss_qualifiers();
        let eliminated = self
            .swiss_table()
            .map(StandingsTable::ranked_team_ids)
            .unwrap_or_default()
            .into_iter()
            .filter(|t| !qualified.contains(t));
        placements.extend(eliminated.map(|team_id| WorldsPlacement {
            team_id,
            place: SWISS_ELIMINATED_PLACE,
        }));
        self.placements = placements;

        tracing::info!(champion, runner_up, third, "world championship finished");
        Ok(true)
    }

    /// Top of the Swiss table, best first
    fn swiss_qualifiers(&self) -> Vec<TeamId> {
        let mut ranked = self.swiss_table().map(StandingsTable::ranked_team_ids).unwrap_or_default();
        ranked.truncate(WORLDS_SWISS_QUALIFIERS);
        ranked
    }

    /// Direct seed i meets Swiss qualifier 5 - i
    fn seed_quarterfinals(&mut self) {
        let qualifiers = self.swiss_qualifiers();
        let seeds: Vec<TeamId> = self.direct_seeds.iter().map(|e| e.team_id).collect();
        for (i, (&seed, &qualifier)) in seeds.iter().zip(qualifiers.iter().rev()).enumerate() {
            self.create(WorldsRound::Quarterfinal, i as u8 + 1, seed, qualifier);
        }
        tracing::info!(?seeds, ?qualifiers, "quarterfinals seeded");
    }

    fn create(&mut self, round: WorldsRound, order: u8, team_a: TeamId, team_b: TeamId) {
        let id = self.stages.len() as u32;
        let stage = BracketStage::knockout(
            id,
            StageRound::Worlds { round, order },
            team_a,
            team_b,
            self.config.knockout_format,
            &mut self.ids,
        );
        self.stages.push(stage);
    }

    /// (winner, loser) of a decided position
    fn outcome(&self, round: WorldsRound, order: u8) -> Option<(TeamId, TeamId)> {
        let stage = self.stage(round, order)?;
        Some((stage.winner()?, stage.loser()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{MemorySink, NullSink};
    use crate::config::MatchFormat;

    fn entrants(ids: impl IntoIterator<Item = TeamId>) -> Vec<GroupEntrant> {
        ids.into_iter()
            .map(|team_id| GroupEntrant {
                team_id,
                name: format!("Team {}", team_id),
            })
            .collect()
    }

    /// Direct seeds 1-4, Swiss teams 11-18
    fn worlds() -> WorldsTournament {
        WorldsTournament::new(WorldsConfig::default(), entrants(1..=4), entrants(11..=18), 1).unwrap()
    }

    fn result(fixture: &Fixture, winner: TeamId) -> SeriesResult {
        let a_wins = winner == fixture.team_a;
        let (win, lose) = (fixture.format.wins_needed(), 0);
        SeriesResult {
            match_id: fixture.match_id,
            team_a_id: fixture.team_a,
            team_b_id: fixture.team_b,
            format: fixture.format,
            games: Vec::new(),
            score_a: if a_wins { win } else { lose },
            score_b: if a_wins { lose } else { win },
            winner_id: winner,
            mvp: None,
            key_player: None,
        }
    }

    /// Play everything pending with `pick`, then advance
    fn step(t: &mut WorldsTournament, pick: &dyn Fn(&Fixture) -> TeamId) -> bool {
        for fixture in t.pending_fixtures() {
            t.apply(result(&fixture, pick(&fixture)), &mut NullSink).unwrap();
        }
        t.advance().unwrap()
    }

    fn lower_id_wins(f: &Fixture) -> TeamId {
        f.team_a.min(f.team_b)
    }

    #[test]
    fn test_swiss_opening_round() {
        let t = worlds();
        assert_eq!(t.phase(), WorldsPhase::Swiss);
        let pending = t.pending_fixtures();
        assert_eq!(pending.len(), 4);
        assert!(pending.iter().all(|f| f.format == MatchFormat::Bo1));
        assert!(t.stages.is_empty());
        assert_eq!(t.team_name(3), Some("Team 3"));
        assert_eq!(t.team_name(17), Some("Team 17"));
        assert_eq!(t.team_name(99), None);
    }

    #[test]
    fn test_swiss_rounds_are_paired_progressively() {
        let mut t = worlds();
        let mut rounds = 0;
        while t.phase() == WorldsPhase::Swiss {
            step(&mut t, &lower_id_wins);
            rounds += 1;
        }
        assert_eq!(rounds, 5);
        let table = t.swiss_table().unwrap();
        assert!(table.is_complete());
        assert_eq!(table.entries().iter().map(|e| e.matches_played).sum::<u32>(), 40);
        // 11 beats everyone it meets
        assert_eq!(table.entries()[0].team_id, 11);
        assert_eq!(table.entries()[0].wins, 5);
    }

    #[test]
    fn test_quarterfinal_seeding() {
        let mut t = worlds();
        while t.phase() == WorldsPhase::Swiss {
            step(&mut t, &lower_id_wins);
        }
        assert_eq!(t.stages.len(), 4);
        let qualifiers = t.swiss_qualifiers();
        for (i, seed) in (1..=4u64).enumerate() {
            let qf = t.stage(WorldsRound::Quarterfinal, i as u8 + 1).unwrap();
            assert_eq!(qf.side_a, seed);
            assert_eq!(qf.side_b, qualifiers[3 - i]);
            assert_eq!(qf.format, MatchFormat::Bo5);
        }
    }

    #[test]
    fn test_full_run_places_the_field() {
        let mut t = worlds();
        while !t.is_finished() {
            assert!(step(&mut t, &lower_id_wins));
        }

        // Direct seeds win every knockout they play by id
        assert_eq!(t.champion(), Some(1));
        assert_eq!(t.placement(2), Some(3));
        assert_eq!(t.placement(3), Some(2));
        assert_eq!(t.placement(4), Some(4));
        let semi = t.stage(WorldsRound::Semifinal, 2).unwrap();
        assert_eq!((semi.side_a, semi.side_b), (3, 4));
        let third = t.stage(WorldsRound::ThirdPlace, 1).unwrap();
        assert_eq!((third.side_a, third.side_b), (2, 4));

        assert_eq!(t.placements.len(), 12);
        let fifth = t.placements.iter().filter(|p| p.place == 5).count();
        let ninth = t.placements.iter().filter(|p| p.place == 9).count();
        assert_eq!((fifth, ninth), (4, 4));

        let qualifier = t.stage(WorldsRound::Quarterfinal, 1).unwrap().side_b;
        let eliminated = t.placements.iter().find(|p| p.place == 9).map(|p| p.team_id).unwrap();
        assert_eq!(t.team_points(1), 20);
        assert_eq!(t.team_points(3), 16);
        assert_eq!(t.team_points(2), 12);
        assert_eq!(t.team_points(4), 8);
        assert_eq!(t.team_points(qualifier), 6);
        assert_eq!(t.team_points(eliminated), 4);
        assert_eq!(t.team_points(99), 0);
        assert!(!t.advance().unwrap());
    }

    #[test]
    fn test_upsets_carry_qualifiers_through() {
        let mut t = worlds();
        while t.phase() == WorldsPhase::Swiss {
            step(&mut t, &lower_id_wins);
        }
        // Swiss qualifiers win every knockout series
        let qualifier_wins = |f: &Fixture| f.team_a.max(f.team_b);
        while !t.is_finished() {
            step(&mut t, &qualifier_wins);
        }
        let qualifiers = t.swiss_qualifiers();
        assert!(qualifiers.contains(&t.champion().unwrap()));
        for seed in 1..=4 {
            assert_eq!(t.placement(seed), Some(5));
        }
    }

    #[test]
    fn test_apply_rejects_replays_and_finished() {
        let mut t = worlds();
        let fixture = t.pending_fixtures()[0].clone();
        let mut sink = MemorySink::new();

        t.apply(result(&fixture, fixture.team_a), &mut sink).unwrap();
        assert_eq!(
            t.apply(result(&fixture, fixture.team_a), &mut sink),
            Err(TournamentError::SeriesAlreadyApplied(fixture.match_id))
        );
        assert_eq!(sink.series, vec![fixture.match_id]);
        assert_eq!(sink.latest_standings(SWISS_GROUP).map(|e| e.len()), Some(8));

        while !t.is_finished() {
            step(&mut t, &lower_id_wins);
        }
        assert_eq!(
            t.apply(result(&fixture, fixture.team_a), &mut sink),
            Err(TournamentError::AlreadyFinished)
        );
    }

    #[test]
    fn test_field_size_is_validated() {
        let err = WorldsTournament::new(WorldsConfig::default(), entrants(1..=3), entrants(11..=18), 1).err();
        assert_eq!(err, Some(TournamentError::NotEnoughParticipants { needed: 4, actual: 3 }));

        let err = WorldsTournament::new(WorldsConfig::default(), entrants(1..=4), entrants(11..=13), 1).err();
        assert_eq!(err, Some(TournamentError::NotEnoughParticipants { needed: 4, actual: 3 }));
    }

    #[test]
    fn test_snapshot_resumes_mid_knockout() {
        let mut t = worlds();
        while t.phase() == WorldsPhase::Swiss {
            step(&mut t, &lower_id_wins);
        }
        step(&mut t, &lower_id_wins);
        assert!(t.stage(WorldsRound::Semifinal, 1).is_some());

        let json = serde_json::to_string(&t).unwrap();
        let mut resumed: WorldsTournament = serde_json::from_str(&json).unwrap();
        assert_eq!(resumed, t);

        while !t.is_finished() {
            step(&mut t, &lower_id_wins);
        }
        while !resumed.is_finished() {
            step(&mut resumed, &lower_id_wins);
        }
        assert_eq!(resumed.placements, t.placements);
    }
}
