//! Bracket stages - seed-slot battles and single knockout matches
//!
//! Level 2 - Phase-level state machine

use esports_core::TeamId;
use serde::{Deserialize, Serialize};

use crate::config::MatchFormat;
use crate::error::TournamentError;
use crate::playoffs::PlayoffRound;
use crate::worlds::WorldsRound;
use crate::schedule::{Fixture, MatchId, MatchIdAllocator};
use crate::series::SeriesResult;

/// Index of a stage within its orchestrator's arena
pub type StageId = u32;

/// A competing side: a region for region battles, a team for knockouts
pub type SideId = u64;

/// Where a stage sits in its tournament
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageRound {
    RegionSemifinal,
    RegionFinal,
    /// `order` numbers the matches within one playoff round, from 1
    Playoff { round: PlayoffRound, order: u8 },
    /// World championship knockout, numbered the same way
    Worlds { round: WorldsRound, order: u8 },
}

/// Lifecycle of a stage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Scheduled,
    InProgress,
    /// All seed slots used, sides level, tiebreaker pending
    Tiebreaker,
    Completed { winner: SideId, loser: SideId },
}

/// State of one seed slot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    Scheduled,
    Completed { winner: TeamId, score_a: u8, score_b: u8 },
    /// Not needed once the stage was decided; never simulated
    Cancelled,
}

/// One predetermined series within a stage; `team_a` plays for side A
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedSlot {
    /// 1-based seed number; 0 for a tiebreaker
    pub seed: u8,
    pub match_id: MatchId,
    pub team_a: TeamId,
    pub team_b: TeamId,
    pub state: SlotState,
}

impl SeedSlot {
    fn new(seed: u8, match_id: MatchId, team_a: TeamId, team_b: TeamId) -> Self {
        Self {
            seed,
            match_id,
            team_a,
            team_b,
            state: SlotState::Scheduled,
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.state == SlotState::Scheduled
    }

    fn fixture(&self, format: MatchFormat) -> Fixture {
        Fixture {
            match_id: self.match_id,
            team_a: self.team_a,
            team_b: self.team_b,
            format,
            round: self.seed as u32,
        }
    }
}

/// What a recorded result did to the stage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageEvent {
    Progressed,
    TiebreakerScheduled { match_id: MatchId },
    Completed { winner: SideId, loser: SideId },
}

/// Two sides playing a fixed list of seed slots.
///
/// A side wins by reaching `win_threshold` slot wins, or by holding
/// more wins once every slot is used. Level sides after every slot get
/// a single tiebreaker between the first seed's teams. A single
/// knockout match is a stage with one slot and threshold 1.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketStage {
    pub id: StageId,
    pub round: StageRound,
    pub side_a: SideId,
    pub side_b: SideId,
    pub format: MatchFormat,
    /// Ordered by seed
    pub slots: Vec<SeedSlot>,
    pub tiebreaker: Option<SeedSlot>,
    /// Reserved when the stage is created, if a level split is possible
    pub tiebreaker_match_id: Option<MatchId>,
    pub wins_a: usize,
    pub wins_b: usize,
    pub win_threshold: usize,
    pub status: StageStatus,
}

impl BracketStage {
    /// Create a stage from (side A team, side B team) pairings in seed
    /// order. Slot ids come from `ids`, followed by a reserved
    /// tiebreaker id when the slot count is even.
    pub fn new(
        id: StageId,
        round: StageRound,
        sides: (SideId, SideId),
        pairings: &[(TeamId, TeamId)],
        format: MatchFormat,
        win_threshold: Option<usize>,
        ids: &mut MatchIdAllocator,
    ) -> Self {
        let slots: Vec<SeedSlot> = pairings
            .iter()
            .enumerate()
            .map(|(i, &(a, b))| SeedSlot::new(i as u8 + 1, ids.next_id(), a, b))
            .collect();
        let tiebreaker_match_id = (slots.len() % 2 == 0).then(|| ids.next_id());
        let win_threshold = win_threshold.unwrap_or(slots.len() / 2 + 1).max(1);

        tracing::debug!(stage = id, ?round, slots = slots.len(), "stage created");

        Self {
            id,
            round,
            side_a: sides.0,
            side_b: sides.1,
            format,
            slots,
            tiebreaker: None,
            tiebreaker_match_id,
            wins_a: 0,
            wins_b: 0,
            win_threshold,
            status: StageStatus::Scheduled,
        }
    }

    /// A single knockout series between two teams
    pub fn knockout(
        id: StageId,
        round: StageRound,
        team_a: TeamId,
        team_b: TeamId,
        format: MatchFormat,
        ids: &mut MatchIdAllocator,
    ) -> Self {
        Self::new(id, round, (team_a, team_b), &[(team_a, team_b)], format, Some(1), ids)
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.status, StageStatus::Completed { .. })
    }

    pub fn winner(&self) -> Option<SideId> {
        match self.status {
            StageStatus::Completed { winner, .. } => Some(winner),
            _ => None,
        }
    }

    pub fn loser(&self) -> Option<SideId> {
        match self.status {
            StageStatus::Completed { loser, .. } => Some(loser),
            _ => None,
        }
    }

    /// Series that can be simulated now
    pub fn pending_fixtures(&self) -> Vec<Fixture> {
        self.slots
            .iter()
            .chain(self.tiebreaker.iter())
            .filter(|s| s.is_scheduled())
            .map(|s| s.fixture(self.format))
            .collect()
    }

    pub fn is_pending(&self, match_id: MatchId) -> bool {
        self.slots
            .iter()
            .chain(self.tiebreaker.iter())
            .any(|s| s.match_id == match_id && s.is_scheduled())
    }

    /// Slots that were cancelled without being played
    pub fn cancelled_matches(&self) -> Vec<MatchId> {
        self.slots
            .iter()
            .filter(|s| s.state == SlotState::Cancelled)
            .map(|s| s.match_id)
            .collect()
    }

    /// Teams that played at least one completed slot, side A then side B
    pub fn participants(&self) -> Vec<TeamId> {
        let played: Vec<&SeedSlot> = self
            .slots
            .iter()
            .chain(self.tiebreaker.iter())
            .filter(|s| matches!(s.state, SlotState::Completed { .. }))
            .collect();
        let mut teams: Vec<TeamId> = Vec::with_capacity(played.len() * 2);
        for team in played.iter().map(|s| s.team_a).chain(played.iter().map(|s| s.team_b)) {
            if !teams.contains(&team) {
                teams.push(team);
            }
        }
        teams
    }

    /// Record the result of one of this stage's series
    pub fn record(&mut self, match_id: MatchId, result: &SeriesResult) -> Result<StageEvent, TournamentError> {
        let is_tiebreaker = self.tiebreaker.as_ref().map_or(false, |t| t.match_id == match_id);
        let stage_id = self.id;
        let completed = self.is_completed();

        let slot = (if is_tiebreaker {
            self.tiebreaker.as_mut()
        } else {
            self.slots.iter_mut().find(|s| s.match_id == match_id)
        })
        .ok_or(TournamentError::UnknownMatch(match_id))?;

        match slot.state {
            SlotState::Cancelled => return Err(TournamentError::SlotCancelled(match_id)),
            SlotState::Completed { .. } => return Err(TournamentError::SeriesAlreadyApplied(match_id)),
            SlotState::Scheduled if completed => return Err(TournamentError::StageCompleted(stage_id)),
            SlotState::Scheduled => {}
        }
        if !(result.involves(slot.team_a) && result.involves(slot.team_b)) {
            return Err(TournamentError::TeamMismatch {
                match_id,
                got_a: result.team_a_id,
                got_b: result.team_b_id,
            });
        }

        let (score_a, score_b) = result.score_for(slot.team_a).unwrap_or((0, 0));
        slot.state = SlotState::Completed {
            winner: result.winner_id,
            score_a,
            score_b,
        };
        let side_a_won = result.winner_id == slot.team_a;

        if is_tiebreaker {
            return Ok(self.complete(side_a_won));
        }

        if side_a_won {
            self.wins_a += 1;
        } else {
            self.wins_b += 1;
        }
        self.status = StageStatus::InProgress;
        Ok(self.evaluate())
    }

    /// Apply the transition rules after a seed result
    fn evaluate(&mut self) -> StageEvent {
        if self.wins_a >= self.win_threshold {
            return self.complete(true);
        }
        if self.wins_b >= self.win_threshold {
            return self.complete(false);
        }
        if self.slots.iter().any(SeedSlot::is_scheduled) {
            return StageEvent::Progressed;
        }
        if self.wins_a != self.wins_b {
            return self.complete(self.wins_a > self.wins_b);
        }

        let first = self.slots.first().map(|s| (s.team_a, s.team_b));
        match (self.tiebreaker_match_id, first) {
            (Some(match_id), Some((team_a, team_b))) => {
                self.tiebreaker = Some(SeedSlot::new(0, match_id, team_a, team_b));
                self.status = StageStatus::Tiebreaker;
                tracing::info!(stage = self.id, match_id, "level split, tiebreaker scheduled");
                StageEvent::TiebreakerScheduled { match_id }
            }
            // An odd slot count never ends level and a slotless stage
            // never records a result, so no tiebreaker is missing here
            _ => self.complete(true),
        }
    }

    fn complete(&mut self, side_a_won: bool) -> StageEvent {
        let (winner, loser) = if side_a_won {
            (self.side_a, self.side_b)
        } else {
            (self.side_b, self.side_a)
        };
        self.status = StageStatus::Completed { winner, loser };
        let cancelled = self.cancel_unplayed();

        tracing::info!(
            stage = self.id,
            winner,
            loser,
            wins_a = self.wins_a,
            wins_b = self.wins_b,
            cancelled,
            "stage completed"
        );
        StageEvent::Completed { winner, loser }
    }

    /// Cancel every slot still scheduled; returns how many
    fn cancel_unplayed(&mut self) -> usize {
        let mut cancelled = 0;
        for slot in self.slots.iter_mut().filter(|s| s.is_scheduled()) {
            slot.state = SlotState::Cancelled;
            cancelled += 1;
        }
        cancelled
    }
}
