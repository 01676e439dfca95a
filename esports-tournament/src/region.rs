//! Region tournament - seed groups, badge counts, region battles
//!
//! Level 1 - Orchestration

use std::collections::BTreeMap;

use esports_core::TeamId;
use serde::{Deserialize, Serialize};

use crate::bracket::{BracketStage, StageEvent, StageId, StageRound};
use crate::collaborators::{
    store_series, store_standings, BadgeRanking, PersistenceSink, QualificationSource, RegionStanding,
};
use crate::config::RegionBattleConfig;
use crate::error::TournamentError;
use crate::group_stage::{GroupEntrant, GroupStage};
use crate::schedule::{Fixture, MatchId, MatchIdAllocator};
use crate::series::{SeriesLedger, SeriesResult};
use crate::standings::GroupId;

/// Stable identifier of a region
pub type RegionId = u64;

/// A team with its seed inside its region
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeededTeam {
    pub team_id: TeamId,
    pub name: String,
    /// 1-based
    pub seed: u8,
}

/// A region and the teams it sends
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
    pub teams: Vec<SeededTeam>,
}

impl Region {
    /// The team holding a seed
    pub fn seeded(&self, seed: u8) -> Option<&SeededTeam> {
        self.teams.iter().find(|t| t.seed == seed)
    }

    pub fn has_team(&self, team: TeamId) -> bool {
        self.teams.iter().any(|t| t.team_id == team)
    }
}

/// Where the tournament is
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionPhase {
    Groups,
    RegionBattle,
    Completed,
}

/// Final placement of one region
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionPlacement {
    pub region_id: RegionId,
    /// 1-based
    pub placement: u8,
}

/// Stage ids within a region tournament
const SEMIFINAL: StageId = 0;
const FINAL: StageId = 1;

/// Regions send seeded teams into one group per seed number; badges
/// earned there rank the regions, which then meet in seed-vs-seed
/// battles down to a champion region.
///
/// Everything needed to resume is in this struct: stages that exist
/// are never rebuilt, and match ids come from the owned allocator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionTournament {
    pub config: RegionBattleConfig,
    pub regions: Vec<Region>,
    pub groups: GroupStage,
    pub badges: BTreeMap<RegionId, u32>,
    /// Best first, fixed when the region battle starts
    pub ranking: Vec<RegionId>,
    pub semifinal: Option<BracketStage>,
    pub final_stage: Option<BracketStage>,
    pub semifinal_skipped: bool,
    pub placements: Vec<RegionPlacement>,
    pub phase: RegionPhase,
    pub ledger: SeriesLedger,
    ids: MatchIdAllocator,
}

impl RegionTournament {
    /// Validate the regions and schedule the seed groups
    pub fn new(config: RegionBattleConfig, regions: Vec<Region>, first_match_id: MatchId) -> Result<Self, TournamentError> {
        if regions.len() < 2 {
            return Err(TournamentError::NotEnoughParticipants {
                needed: 2,
                actual: regions.len(),
            });
        }

        let seeds = config.seeds_per_region;
        let mut groups = Vec::with_capacity(seeds as usize);
        for seed in 1..=seeds {
            let mut entrants = Vec::with_capacity(regions.len());
            for region in &regions {
                let team = region.seeded(seed).ok_or(TournamentError::NotEnoughParticipants {
                    needed: seeds as usize,
                    actual: region.teams.len(),
                })?;
                entrants.push(GroupEntrant {
                    team_id: team.team_id,
                    name: team.name.clone(),
                });
            }
            groups.push((seed as GroupId, format!("Seed {}", seed), entrants));
        }

        let mut ids = MatchIdAllocator::starting_at(first_match_id);
        let groups = GroupStage::new(config.groups.clone(), groups, &mut ids)?;

        tracing::info!(regions = regions.len(), seeds, "region tournament created");

        Ok(Self {
            config,
            badges: regions.iter().map(|r| (r.id, 0)).collect(),
            regions,
            groups,
            ranking: Vec::new(),
            semifinal: None,
            final_stage: None,
            semifinal_skipped: false,
            placements: Vec::new(),
            phase: RegionPhase::Groups,
            ledger: SeriesLedger::new(),
            ids,
        })
    }

    pub fn region(&self, id: RegionId) -> Result<&Region, TournamentError> {
        self.regions
            .iter()
            .find(|r| r.id == id)
            .ok_or(TournamentError::UnknownRegion(id))
    }

    /// Region a team plays for
    pub fn region_of(&self, team: TeamId) -> Option<RegionId> {
        self.regions.iter().find(|r| r.has_team(team)).map(|r| r.id)
    }

    pub fn stage(&self, id: StageId) -> Result<&BracketStage, TournamentError> {
        let stage = match id {
            SEMIFINAL => self.semifinal.as_ref(),
            FINAL => self.final_stage.as_ref(),
            _ => None,
        };
        stage.ok_or(TournamentError::UnknownStage(id))
    }

    /// Badge counts per region, available once every group is complete
    pub fn region_standings(&self) -> Result<Vec<RegionStanding>, TournamentError> {
        if !self.groups.is_complete() {
            return Err(TournamentError::GroupsIncomplete);
        }
        Ok(self
            .regions
            .iter()
            .map(|r| RegionStanding {
                region_id: r.id,
                badges: self.badges.get(&r.id).copied().unwrap_or(0),
            })
            .collect())
    }

    pub fn champion(&self) -> Option<RegionId> {
        self.placements.iter().find(|p| p.placement == 1).map(|p| p.region_id)
    }

    pub fn placement(&self, region: RegionId) -> Option<u8> {
        self.placements
            .iter()
            .find(|p| p.region_id == region)
            .map(|p| p.placement)
    }

    /// Whether a team played at least one series in a region battle
    pub fn participated(&self, team: TeamId) -> bool {
        self.semifinal
            .iter()
            .chain(self.final_stage.iter())
            .any(|s| s.participants().contains(&team))
    }

    /// Points a team earns from its region's placement
    pub fn team_points(&self, team: TeamId) -> u32 {
        let placement = self.region_of(team).and_then(|r| self.placement(r));
        match placement {
            Some(p) => self
                .config
                .placement_points
                .points(p as usize, self.participated(team)),
            None => 0,
        }
    }

    /// Fixtures ready to play, ascending match id
    pub fn pending_fixtures(&self) -> Vec<Fixture> {
        let mut fixtures = self.groups.pending_fixtures();
        for stage in self.semifinal.iter().chain(self.final_stage.iter()) {
            fixtures.extend(stage.pending_fixtures());
        }
        fixtures.sort_by_key(|f| f.match_id);
        fixtures
    }

    pub fn is_pending(&self, match_id: MatchId) -> bool {
        self.groups.is_pending(match_id)
            || self
                .semifinal
                .iter()
                .chain(self.final_stage.iter())
                .any(|s| s.is_pending(match_id))
    }

    /// Apply a result, record it in the ledger and hand it to the sink
    pub fn apply(
        &mut self,
        result: SeriesResult,
        sink: &mut dyn PersistenceSink,
    ) -> Result<(), TournamentError> {
        let match_id = result.match_id;
        if self.phase == RegionPhase::Completed {
            return Err(TournamentError::AlreadyFinished);
        }
        if self.ledger.contains(match_id) {
            return Err(TournamentError::SeriesAlreadyApplied(match_id));
        }

        if self.groups.is_pending(match_id) {
            let group = self.groups.apply(match_id, &result)?;
            let (group_id, entries) = (group.id, group.table.entries().to_vec());
            if group.is_complete() {
                self.award_badges(group_id)?;
            }
            let result = self.ledger.record(result)?;
            store_series(sink, match_id, result);
            store_standings(sink, group_id, &entries);
            return Ok(());
        }

        let stage = self
            .semifinal
            .iter_mut()
            .chain(self.final_stage.iter_mut())
            .find(|s| owns_match(s, match_id))
            .ok_or(TournamentError::UnknownMatch(match_id))?;
        let event = stage.record(match_id, &result)?;
        if let StageEvent::Completed { winner, .. } = event {
            tracing::info!(stage = stage.id, winner, "region battle decided");
        }
        let result = self.ledger.record(result)?;
        store_series(sink, match_id, result);
        Ok(())
    }

    /// Add one badge per qualifier of a completed group to its region
    fn award_badges(&mut self, group_id: GroupId) -> Result<(), TournamentError> {
        let qualifiers: Vec<TeamId> = self
            .groups
            .group(group_id)
            .and_then(|g| g.table.qualifiers())
            .map(|q| q.iter().map(|e| e.team_id).collect())
            .unwrap_or_default();

        for team in qualifiers {
            let region = self.region_of(team).ok_or(TournamentError::UnknownTeam(team))?;
            *self.badges.entry(region).or_insert(0) += 1;
            tracing::debug!(team, region, group_id, "badge awarded");
        }
        Ok(())
    }

    /// Move the tournament forward with the default badge ranking
    pub fn advance(&mut self) -> Result<bool, TournamentError> {
        self.advance_with(&BadgeRanking)
    }

    /// Move the tournament forward: schedule Swiss rounds, start the
    /// region battle once the groups are done, chain the semifinal into
    /// the final, and derive placements. Returns whether anything changed.
    pub fn advance_with(&mut self, source: &dyn QualificationSource) -> Result<bool, TournamentError> {
        match self.phase {
            RegionPhase::Groups => {
                let mut changed = self.groups.advance(&mut self.ids)?;
                if self.groups.is_complete() {
                    self.start_region_battle(source)?;
                    changed = true;
                }
                Ok(changed)
            }
            RegionPhase::RegionBattle => self.advance_battles(),
            RegionPhase::Completed => Ok(false),
        }
    }

    fn start_region_battle(&mut self, source: &dyn QualificationSource) -> Result<(), TournamentError> {
        let standings = self.region_standings()?;
        let ranking = source.region_ranking(&standings);
        for id in &ranking {
            self.region(*id)?;
        }
        if ranking.len() < 2 {
            return Err(TournamentError::NotEnoughParticipants {
                needed: 2,
                actual: ranking.len(),
            });
        }

        let badges = |id: RegionId| self.badges.get(&id).copied().unwrap_or(0);
        let skip_semifinal = ranking.len() == 2 || badges(ranking[1]) > badges(ranking[2]);

        tracing::info!(?ranking, skip_semifinal, "region battle starting");

        if skip_semifinal {
            let stage = self.battle(FINAL, StageRound::RegionFinal, ranking[0], ranking[1])?;
            self.final_stage = Some(stage);
        } else {
            let stage = self.battle(SEMIFINAL, StageRound::RegionSemifinal, ranking[1], ranking[2])?;
            self.semifinal = Some(stage);
        }
        self.semifinal_skipped = skip_semifinal;
        self.ranking = ranking;
        self.phase = RegionPhase::RegionBattle;
        Ok(())
    }

    fn advance_battles(&mut self) -> Result<bool, TournamentError> {
        if self.final_stage.is_none() {
            let semifinal_winner = self.semifinal.as_ref().and_then(BracketStage::winner);
            return match (semifinal_winner, self.ranking.first().copied()) {
                (Some(winner), Some(top)) => {
                    let stage = self.battle(FINAL, StageRound::RegionFinal, top, winner)?;
                    self.final_stage = Some(stage);
                    Ok(true)
                }
                _ => Ok(false),
            };
        }

        let decided = self
            .final_stage
            .as_ref()
            .and_then(|s| Some((s.winner()?, s.loser()?)));
        let Some((champion, runner_up)) = decided else {
            return Ok(false);
        };

        let mut placements = vec![
            RegionPlacement {
                region_id: champion,
                placement: 1,
            },
            RegionPlacement {
                region_id: runner_up,
                placement: 2,
            },
        ];
        let rest = self.ranking.iter().filter(|&&r| r != champion && r != runner_up);
        for (i, &region_id) in rest.enumerate() {
            placements.push(RegionPlacement {
                region_id,
                placement: i as u8 + 3,
            });
        }
        self.placements = placements;
        self.phase = RegionPhase::Completed;

        tracing::info!(champion, runner_up, "region tournament finished");
        Ok(true)
    }

    /// A seed-vs-seed battle between two regions
    fn battle(
        &mut self,
        id: StageId,
        round: StageRound,
        side_a: RegionId,
        side_b: RegionId,
    ) -> Result<BracketStage, TournamentError> {
        let (a, b) = (self.region(side_a)?, self.region(side_b)?);
        let mut pairings = Vec::with_capacity(self.config.seeds_per_region as usize);
        for seed in 1..=self.config.seeds_per_region {
            match (a.seeded(seed), b.seeded(seed)) {
                (Some(ta), Some(tb)) => pairings.push((ta.team_id, tb.team_id)),
                _ => {
                    return Err(TournamentError::NotEnoughParticipants {
                        needed: self.config.seeds_per_region as usize,
                        actual: a.teams.len().min(b.teams.len()),
                    })
                }
            }
        }

        Ok(BracketStage::new(
            id,
            round,
            (side_a, side_b),
            &pairings,
            self.config.battle_format,
            self.config.win_threshold,
            &mut self.ids,
        ))
    }
}

fn owns_match(stage: &BracketStage, match_id: MatchId) -> bool {
    stage.slots.iter().any(|s| s.match_id == match_id) || stage.tiebreaker_match_id == Some(match_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::StageStatus;
    use crate::collaborators::{FixedRanking, MemorySink, NullSink};

    /// Region r fields teams r*10+1 ..= r*10+4, seeded in that order
    fn region(id: RegionId) -> Region {
        Region {
            id,
            name: format!("Region {}", id),
            teams: (1..=4)
                .map(|seed| SeededTeam {
                    team_id: id * 10 + seed as u64,
                    name: format!("R{}S{}", id, seed),
                    seed,
                })
                .collect(),
        }
    }

    fn result(fixture: &Fixture, winner: TeamId) -> SeriesResult {
        let a_wins = winner == fixture.team_a;
        SeriesResult {
            match_id: fixture.match_id,
            team_a_id: fixture.team_a,
            team_b_id: fixture.team_b,
            format: fixture.format,
            games: Vec::new(),
            score_a: if a_wins { 2 } else { 0 },
            score_b: if a_wins { 0 } else { 2 },
            winner_id: winner,
            mvp: None,
            key_player: None,
        }
    }

    /// Play everything pending with `pick`, then advance
    fn step(t: &mut RegionTournament, pick: &dyn Fn(&Fixture) -> TeamId) -> bool {
        let mut sink = NullSink;
        for fixture in t.pending_fixtures() {
            // Slots cancelled by an earlier result in this batch are skipped
            if t.is_pending(fixture.match_id) {
                t.apply(result(&fixture, pick(&fixture)), &mut sink).unwrap();
            }
        }
        t.advance().unwrap()
    }

    /// Lower region id wins every group match
    fn lower_region_wins(f: &Fixture) -> TeamId {
        f.team_a.min(f.team_b)
    }

    /// Region 3 wins whenever it plays, otherwise side A
    fn region_three_wins(f: &Fixture) -> TeamId {
        if f.team_b / 10 == 3 {
            f.team_b
        } else {
            f.team_a
        }
    }

    #[test]
    fn test_seed_groups() {
        let t = RegionTournament::new(RegionBattleConfig::default(), vec![region(1), region(2), region(3), region(4)], 1)
            .unwrap();
        assert_eq!(t.groups.groups.len(), 4);
        let seed_two: Vec<TeamId> = t.groups.groups[1].teams.clone();
        assert_eq!(seed_two, vec![12, 22, 32, 42]);
        // Four groups of four, six matches each
        assert_eq!(t.pending_fixtures().len(), 24);
        assert_eq!(t.phase, RegionPhase::Groups);
        assert_eq!(t.region_standings(), Err(TournamentError::GroupsIncomplete));
    }

    #[test]
    fn test_badges_and_semifinal_skip() {
        let mut t =
            RegionTournament::new(RegionBattleConfig::default(), vec![region(1), region(2), region(3), region(4)], 1)
                .unwrap();
        assert!(step(&mut t, &lower_region_wins));

        // Regions 1 and 2 take both badges in every group
        assert_eq!(t.badges.get(&1), Some(&4));
        assert_eq!(t.badges.get(&2), Some(&4));
        assert_eq!(t.badges.get(&3), Some(&0));
        assert_eq!(t.ranking, vec![1, 2, 3, 4]);
        assert!(t.semifinal_skipped);
        assert!(t.semifinal.is_none());
        assert_eq!(t.phase, RegionPhase::RegionBattle);

        let fin = t.final_stage.as_ref().unwrap();
        assert_eq!((fin.side_a, fin.side_b), (1, 2));
        assert_eq!(fin.slots[0].team_a, 11);
        assert_eq!(fin.slots[0].team_b, 21);
    }

    #[test]
    fn test_full_run_with_semifinal() {
        let mut t =
            RegionTournament::new(RegionBattleConfig::default(), vec![region(1), region(2), region(3), region(4)], 1)
                .unwrap();
        step(&mut t, &lower_region_wins);

        // Force a semifinal: 2 and 3 level on badges
        let mut t2 = t.clone();
        t2.phase = RegionPhase::Groups;
        t2.final_stage = None;
        t2.badges.insert(2, 3);
        t2.badges.insert(3, 3);
        t2.ids = MatchIdAllocator::starting_at(1000);
        assert!(t2.advance().unwrap());
        assert!(!t2.semifinal_skipped);
        let semi = t2.semifinal.as_ref().unwrap();
        assert_eq!((semi.side_a, semi.side_b), (2, 3));

        // Region 3 sweeps the semifinal, region 1 wins the final
        step(&mut t2, &region_three_wins);
        let semi = t2.semifinal.as_ref().unwrap();
        assert_eq!(semi.winner(), Some(3));
        assert_eq!(semi.cancelled_matches().len(), 1);
        let fin = t2.final_stage.as_ref().unwrap();
        assert_eq!((fin.side_a, fin.side_b), (1, 3));

        step(&mut t2, &|f: &Fixture| f.team_a);
        assert_eq!(t2.phase, RegionPhase::Completed);
        assert_eq!(t2.champion(), Some(1));
        assert_eq!(t2.placement(3), Some(2));
        assert_eq!(t2.placement(2), Some(3));
        assert_eq!(t2.placement(4), Some(4));

        // Seed 4 of region 2 never played: its battle slot was cancelled
        assert!(t2.participated(21));
        assert!(!t2.participated(24));
        assert_eq!(t2.team_points(11), 12);
        assert_eq!(t2.team_points(31), 8);
        assert_eq!(t2.team_points(21), 6);
        assert_eq!(t2.team_points(24), 3);
        assert_eq!(t2.team_points(41), 2);
        assert!(!t2.advance().unwrap());
    }

    #[test]
    fn test_tiebreaker_in_region_final() {
        let mut t = RegionTournament::new(RegionBattleConfig::default(), vec![region(1), region(2)], 1).unwrap();
        step(&mut t, &lower_region_wins);
        assert!(t.semifinal_skipped);

        // Split 2-2: side A takes seeds 1 and 3
        step(&mut t, &|f: &Fixture| if f.round % 2 == 1 { f.team_a } else { f.team_b });
        let fin = t.final_stage.as_ref().unwrap();
        assert_eq!(fin.status, StageStatus::Tiebreaker);
        let pending = t.pending_fixtures();
        assert_eq!(pending.len(), 1);
        assert_eq!((pending[0].team_a, pending[0].team_b), (11, 21));

        step(&mut t, &|f: &Fixture| f.team_b);
        assert_eq!(t.champion(), Some(2));
        assert_eq!(t.placements.len(), 2);
    }

    #[test]
    fn test_apply_rejects_replays_and_finished() {
        let mut t = RegionTournament::new(RegionBattleConfig::default(), vec![region(1), region(2)], 1).unwrap();
        let fixture = t.pending_fixtures()[0].clone();
        let mut sink = MemorySink::new();

        t.apply(result(&fixture, fixture.team_a), &mut sink).unwrap();
        assert_eq!(
            t.apply(result(&fixture, fixture.team_a), &mut sink),
            Err(TournamentError::SeriesAlreadyApplied(fixture.match_id))
        );
        assert_eq!(sink.series, vec![fixture.match_id]);
        assert_eq!(sink.standings.len(), 1);

        while t.phase != RegionPhase::Completed {
            step(&mut t, &|f: &Fixture| f.team_a);
        }
        assert_eq!(
            t.apply(result(&fixture, fixture.team_a), &mut sink),
            Err(TournamentError::AlreadyFinished)
        );
    }

    #[test]
    fn test_failing_sink_does_not_block() {
        let mut t = RegionTournament::new(RegionBattleConfig::default(), vec![region(1), region(2)], 1).unwrap();
        let mut sink = MemorySink::failing();
        for fixture in t.pending_fixtures() {
            t.apply(result(&fixture, fixture.team_a), &mut sink).unwrap();
        }
        assert!(t.groups.is_complete());
        assert_eq!(t.ledger.len(), 4);
    }

    #[test]
    fn test_custom_ranking_and_errors() {
        let mut t =
            RegionTournament::new(RegionBattleConfig::default(), vec![region(1), region(2), region(3)], 1).unwrap();
        let mut sink = NullSink;
        for fixture in t.pending_fixtures() {
            t.apply(result(&fixture, lower_region_wins(&fixture)), &mut sink).unwrap();
        }
        // Regions 1 and 2 hold four badges each, so ranks 2 and 3 meet first
        assert!(t.advance_with(&FixedRanking(vec![3, 1, 2])).unwrap());
        assert_eq!(t.ranking, vec![3, 1, 2]);
        assert!(!t.semifinal_skipped);

        let semi = t.stage(SEMIFINAL).unwrap();
        assert_eq!((semi.side_a, semi.side_b), (1, 2));
        assert_eq!(t.stage(FINAL).err(), Some(TournamentError::UnknownStage(FINAL)));
        assert_eq!(t.region(9).err(), Some(TournamentError::UnknownRegion(9)));
    }

    #[test]
    fn test_needs_two_regions() {
        let err = RegionTournament::new(RegionBattleConfig::default(), vec![region(1)], 1).err();
        assert_eq!(err, Some(TournamentError::NotEnoughParticipants { needed: 2, actual: 1 }));
    }
}
