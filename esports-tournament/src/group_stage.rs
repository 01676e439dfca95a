//! Group stage - one standings table per group, fixtures by format
//!
//! Level 2 - Phases

use esports_core::TeamId;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::config::{GroupFormat, GroupStageConfig};
use crate::error::TournamentError;
use crate::schedule::{
    build_fixtures, double_round_robin, pair_key, round_robin_rounds, swiss_pairings, Fixture, MatchId,
    MatchIdAllocator,
};
use crate::series::SeriesResult;
use crate::standings::{GroupId, StandingEntry, StandingsTable};

/// A team entered into a group
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupEntrant {
    pub team_id: TeamId,
    pub name: String,
}

/// A fixture and whether it has been played
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledMatch {
    pub fixture: Fixture,
    pub winner: Option<TeamId>,
}

/// One group with its fixtures and table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub teams: Vec<TeamId>,
    pub fixtures: Vec<ScheduledMatch>,
    pub table: StandingsTable,
    /// Swiss rounds paired so far
    pub rounds_scheduled: u32,
}

impl Group {
    pub fn is_complete(&self) -> bool {
        self.table.is_complete()
    }

    fn has_match(&self, match_id: MatchId) -> bool {
        self.fixtures.iter().any(|m| m.fixture.match_id == match_id)
    }

    fn round_finished(&self) -> bool {
        self.fixtures.iter().all(|m| m.winner.is_some())
    }

    fn schedule(&mut self, fixtures: Vec<Fixture>) -> Result<(), TournamentError> {
        for fixture in fixtures {
            self.table.schedule(fixture.match_id, fixture.team_a, fixture.team_b)?;
            self.fixtures.push(ScheduledMatch { fixture, winner: None });
        }
        Ok(())
    }
}

/// Several groups played under one configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupStage {
    pub config: GroupStageConfig,
    pub groups: Vec<Group>,
}

impl GroupStage {
    /// Build the groups and schedule their opening fixtures.
    ///
    /// Round robins are scheduled in full; Swiss groups get their first
    /// round, later rounds come from `advance`.
    pub fn new(
        config: GroupStageConfig,
        groups: Vec<(GroupId, String, Vec<GroupEntrant>)>,
        ids: &mut MatchIdAllocator,
    ) -> Result<Self, TournamentError> {
        let mut built = Vec::with_capacity(groups.len());
        for (id, name, entrants) in groups {
            if entrants.len() < 2 {
                return Err(TournamentError::NotEnoughParticipants {
                    needed: 2,
                    actual: entrants.len(),
                });
            }

            let teams: Vec<TeamId> = entrants.iter().map(|e| e.team_id).collect();
            let table = StandingsTable::new(
                id,
                entrants.iter().map(|e| (e.team_id, e.name.as_str())),
                config.points_rule,
                config.qualification,
            );
            let mut group = Group {
                id,
                name,
                teams,
                fixtures: Vec::new(),
                table,
                rounds_scheduled: 0,
            };

            let rounds = match config.format {
                GroupFormat::RoundRobin => round_robin_rounds(&group.teams),
                GroupFormat::DoubleRoundRobin => double_round_robin(&group.teams),
                GroupFormat::Swiss { rounds } => {
                    group.table.set_schedule_open(rounds > 0);
                    Vec::new()
                }
            };
            group.rounds_scheduled = rounds.len() as u32;
            group.schedule(build_fixtures(&rounds, config.match_format, 1, ids))?;
            built.push(group);
        }

        let mut stage = Self { config, groups: built };
        stage.advance(ids)?;
        tracing::debug!(groups = stage.groups.len(), "group stage scheduled");
        Ok(stage)
    }

    /// Fixtures with no result yet, ascending match id
    pub fn pending_fixtures(&self) -> Vec<Fixture> {
        let mut fixtures: Vec<Fixture> = self
            .groups
            .iter()
            .flat_map(|g| g.fixtures.iter())
            .filter(|m| m.winner.is_none())
            .map(|m| m.fixture.clone())
            .collect();
        fixtures.sort_by_key(|f| f.match_id);
        fixtures
    }

    pub fn is_pending(&self, match_id: MatchId) -> bool {
        self.groups
            .iter()
            .flat_map(|g| g.fixtures.iter())
            .any(|m| m.fixture.match_id == match_id && m.winner.is_none())
    }

    /// Apply a result to the group that scheduled it; returns that group
    pub fn apply(&mut self, match_id: MatchId, result: &SeriesResult) -> Result<&Group, TournamentError> {
        let group = self
            .groups
            .iter_mut()
            .find(|g| g.has_match(match_id))
            .ok_or(TournamentError::UnknownMatch(match_id))?;

        group.table.apply(match_id, result)?;
        if let Some(m) = group.fixtures.iter_mut().find(|m| m.fixture.match_id == match_id) {
            m.winner = Some(result.winner_id);
        }
        Ok(group)
    }

    /// Pair the next Swiss round in every group whose current round is
    /// finished. Returns whether anything was scheduled or closed.
    pub fn advance(&mut self, ids: &mut MatchIdAllocator) -> Result<bool, TournamentError> {
        let GroupFormat::Swiss { rounds } = self.config.format else {
            return Ok(false);
        };

        let mut changed = false;
        for group in &mut self.groups {
            if group.rounds_scheduled >= rounds || !group.round_finished() {
                continue;
            }

            let played: FxHashSet<(TeamId, TeamId)> = group
                .fixtures
                .iter()
                .map(|m| pair_key(m.fixture.team_a, m.fixture.team_b))
                .collect();
            let pairs = swiss_pairings(&group.table.ranked_team_ids(), &played);
            let round = group.rounds_scheduled + 1;
            let fixtures = build_fixtures(&[pairs], self.config.match_format, round, ids);

            group.schedule(fixtures)?;
            group.rounds_scheduled = round;
            if round == rounds {
                group.table.set_schedule_open(false);
            }
            tracing::debug!(group = group.id, round, "swiss round paired");
            changed = true;
        }
        Ok(changed)
    }

    pub fn is_complete(&self) -> bool {
        self.groups.iter().all(Group::is_complete)
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// Badge holders of every completed group, in group then rank order
    pub fn badge_holders(&self) -> Vec<&StandingEntry> {
        self.groups
            .iter()
            .filter_map(|g| g.table.qualifiers())
            .flatten()
            .collect()
    }
}
