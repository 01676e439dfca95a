//! Errors surfaced by tournament state transitions

use esports_core::TeamId;

use crate::bracket::StageId;
use crate::region::RegionId;
use crate::schedule::MatchId;

/// Orchestration and state-machine errors.
///
/// These all indicate an action that is not valid for the current
/// state; none of them are recoverable by retrying.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TournamentError {
    #[error("series for match {0} has already been applied")]
    SeriesAlreadyApplied(MatchId),

    #[error("match {0} is not scheduled in this competition")]
    UnknownMatch(MatchId),

    #[error("match {0} was cancelled and cannot take a result")]
    SlotCancelled(MatchId),

    #[error("stage {0} is already completed")]
    StageCompleted(StageId),

    #[error("stage {0} does not exist")]
    UnknownStage(StageId),

    #[error("result for match {match_id} is between teams {got_a} and {got_b}, not the scheduled pair")]
    TeamMismatch {
        match_id: MatchId,
        got_a: TeamId,
        got_b: TeamId,
    },

    #[error("team {0} is not part of this table")]
    UnknownTeam(TeamId),

    #[error("no roster available for team {0}")]
    RosterUnavailable(TeamId),

    #[error("region {0} is unknown")]
    UnknownRegion(RegionId),

    #[error("need at least {needed} participants, got {actual}")]
    NotEnoughParticipants { needed: usize, actual: usize },

    #[error("group stage is not complete")]
    GroupsIncomplete,

    #[error("competition is already finished")]
    AlreadyFinished,
}
