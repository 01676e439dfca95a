//! Eight-team double-elimination playoffs
//!
//! Level 2 - Phases

use esports_core::TeamId;
use serde::{Deserialize, Serialize};

use crate::bracket::{BracketStage, StageEvent, StageRound};
use crate::config::PlayoffConfig;
use crate::error::TournamentError;
use crate::schedule::{Fixture, MatchId, MatchIdAllocator};
use crate::series::SeriesResult;

/// Teams the bracket is seeded with
pub const PLAYOFF_TEAMS: usize = 8;

/// Rounds of the bracket, in play order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayoffRound {
    WinnersR1,
    LosersR1,
    WinnersFinal,
    LosersR2,
    LosersR3,
    LosersFinal,
    GrandFinal,
}

/// Final placement of one team
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayoffPlacement {
    pub team_id: TeamId,
    /// 1, 2, 3, 4, 5 (shared by 5th-6th) or 7 (shared by 7th-8th)
    pub place: u8,
}

/// Double-elimination bracket over an arena of knockout stages.
///
/// Winners R1 is 1v4 and 2v3; losers R1 is 5v8 and 6v7. Later rounds
/// are created by `advance` once the rounds feeding them are decided,
/// and an existing stage is never recreated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayoffBracket {
    pub config: PlayoffConfig,
    /// Seeds in order, best first
    pub seeds: Vec<TeamId>,
    pub stages: Vec<BracketStage>,
    pub placements: Vec<PlayoffPlacement>,
}

impl PlayoffBracket {
    /// Seed the bracket and create the opening rounds
    pub fn new(config: PlayoffConfig, seeds: &[TeamId], ids: &mut MatchIdAllocator) -> Result<Self, TournamentError> {
        if seeds.len() < PLAYOFF_TEAMS {
            return Err(TournamentError::NotEnoughParticipants {
                needed: PLAYOFF_TEAMS,
                actual: seeds.len(),
            });
        }

        let mut bracket = Self {
            config,
            seeds: seeds[..PLAYOFF_TEAMS].to_vec(),
            stages: Vec::new(),
            placements: Vec::new(),
        };
        let s = bracket.seeds.clone();
        bracket.create(PlayoffRound::WinnersR1, 1, s[0], s[3], ids);
        bracket.create(PlayoffRound::WinnersR1, 2, s[1], s[2], ids);
        bracket.create(PlayoffRound::LosersR1, 1, s[4], s[7], ids);
        bracket.create(PlayoffRound::LosersR1, 2, s[5], s[6], ids);

        tracing::info!(seeds = ?bracket.seeds, "playoffs seeded");
        Ok(bracket)
    }

    /// Stage for a bracket position, if created
    pub fn stage(&self, round: PlayoffRound, order: u8) -> Option<&BracketStage> {
        let wanted = StageRound::Playoff { round, order };
        self.stages.iter().find(|s| s.round == wanted)
    }

    fn create(&mut self, round: PlayoffRound, order: u8, team_a: TeamId, team_b: TeamId, ids: &mut MatchIdAllocator) {
        let id = self.stages.len() as u32;
        let stage = BracketStage::knockout(
            id,
            StageRound::Playoff { round, order },
            team_a,
            team_b,
            self.config.match_format,
            ids,
        );
        self.stages.push(stage);
    }

    /// (winner, loser) of a decided position
    fn outcome(&self, round: PlayoffRound, order: u8) -> Option<(TeamId, TeamId)> {
        let stage = self.stage(round, order)?;
        Some((stage.winner()?, stage.loser()?))
    }

    /// Create every stage whose feeders are decided, and record
    /// placements once the grand final is. Returns whether anything
    /// changed.
    pub fn advance(&mut self, ids: &mut MatchIdAllocator) -> Result<bool, TournamentError> {
        use PlayoffRound::*;

        if self.is_finished() {
            return Ok(false);
        }
        let mut changed = false;

        let wr1 = (self.outcome(WinnersR1, 1), self.outcome(WinnersR1, 2));
        let lr1 = (self.outcome(LosersR1, 1), self.outcome(LosersR1, 2));

        if let (Some((w1, _)), Some((w2, _))) = wr1 {
            if self.stage(WinnersFinal, 1).is_none() {
                self.create(WinnersFinal, 1, w1, w2, ids);
                changed = true;
            }
        }

        if let ((Some((_, wl1)), Some((_, wl2))), (Some((lw1, _)), Some((lw2, _)))) = (wr1, lr1) {
            if self.stage(LosersR2, 1).is_none() {
                self.create(LosersR2, 1, lw1, wl2, ids);
                self.create(LosersR2, 2, lw2, wl1, ids);
                changed = true;
            }
        }

        if let (Some((a, _)), Some((b, _))) = (self.outcome(LosersR2, 1), self.outcome(LosersR2, 2)) {
            if self.stage(LosersR3, 1).is_none() {
                self.create(LosersR3, 1, a, b, ids);
                changed = true;
            }
        }

        if let (Some((_, wf_loser)), Some((lr3_winner, _))) = (self.outcome(WinnersFinal, 1), self.outcome(LosersR3, 1)) {
            if self.stage(LosersFinal, 1).is_none() {
                self.create(LosersFinal, 1, wf_loser, lr3_winner, ids);
                changed = true;
            }
        }

        if let (Some((wf_winner, _)), Some((lf_winner, _))) = (self.outcome(WinnersFinal, 1), self.outcome(LosersFinal, 1)) {
            if self.stage(GrandFinal, 1).is_none() {
                self.create(GrandFinal, 1, wf_winner, lf_winner, ids);
                changed = true;
            }
        }

        if let Some((champion, runner_up)) = self.outcome(GrandFinal, 1) {
            self.placements = self.derive_placements(champion, runner_up);
            tracing::info!(champion, runner_up, "playoffs finished");
            changed = true;
        }

        Ok(changed)
    }

    fn derive_placements(&self, champion: TeamId, runner_up: TeamId) -> Vec<PlayoffPlacement> {
        use PlayoffRound::*;

        let mut placements = vec![
            PlayoffPlacement { team_id: champion, place: 1 },
            PlayoffPlacement { team_id: runner_up, place: 2 },
        ];
        let losers = [
            (LosersFinal, 1, 3),
            (LosersR3, 1, 4),
            (LosersR2, 1, 5),
            (LosersR2, 2, 5),
            (LosersR1, 1, 7),
            (LosersR1, 2, 7),
        ];
        for (round, order, place) in losers {
            if let Some((_, team_id)) = self.outcome(round, order) {
                placements.push(PlayoffPlacement { team_id, place });
            }
        }
        placements
    }

    pub fn is_finished(&self) -> bool {
        !self.placements.is_empty()
    }

    pub fn champion(&self) -> Option<TeamId> {
        self.placements.iter().find(|p| p.place == 1).map(|p| p.team_id)
    }

    /// Placement of a team once the bracket is finished
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
            Some(_) => points.quarterfinalist,
            None => 0,
        }
    }

    /// Fixtures ready to play, ascending match id
    pub fn pending_fixtures(&self) -> Vec<Fixture> {
        let mut fixtures: Vec<Fixture> = self.stages.iter().flat_map(|s| s.pending_fixtures()).collect();
        fixtures.sort_by_key(|f| f.match_id);
        fixtures
    }

    pub fn is_pending(&self, match_id: MatchId) -> bool {
        self.stages.iter().any(|s| s.is_pending(match_id))
    }

    /// Record a result against the stage that scheduled it
    pub fn apply(&mut self, match_id: MatchId, result: &SeriesResult) -> Result<StageEvent, TournamentError> {
        let stage = self
            .stages
            .iter_mut()
            .find(|s| s.slots.iter().any(|slot| slot.match_id == match_id))
            .ok_or(TournamentError::UnknownMatch(match_id))?;
        stage.record(match_id, result)
    }
}
