//! Narrow interfaces to the outside world: rosters, persistence, seeding

use esports_core::{TeamId, TeamRoster};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::region::RegionId;
use crate::schedule::MatchId;
use crate::series::SeriesResult;
use crate::standings::{GroupId, StandingEntry};

// ============================================================================
// Rosters
// ============================================================================

/// Supplies the current roster of a team
pub trait RosterSupplier {
    fn roster(&self, team: TeamId) -> Option<TeamRoster>;
}

/// In-memory roster lookup
#[derive(Clone, Debug, Default)]
pub struct RosterBook {
    rosters: FxHashMap<TeamId, TeamRoster>,
}

impl RosterBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, roster: TeamRoster) {
        self.rosters.insert(roster.team_id, roster);
    }

    pub fn get(&self, team: TeamId) -> Option<&TeamRoster> {
        self.rosters.get(&team)
    }

    pub fn len(&self) -> usize {
        self.rosters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rosters.is_empty()
    }
}

impl FromIterator<TeamRoster> for RosterBook {
    fn from_iter<I: IntoIterator<Item = TeamRoster>>(iter: I) -> Self {
        let mut book = RosterBook::new();
        for roster in iter {
            book.insert(roster);
        }
        book
    }
}

impl RosterSupplier for RosterBook {
    fn roster(&self, team: TeamId) -> Option<TeamRoster> {
        self.rosters.get(&team).cloned()
    }
}

// ============================================================================
// Persistence
// ============================================================================

/// Failure reported by a persistence sink
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("sink rejected write: {0}")]
    Rejected(String),

    #[error("sink I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Receives completed series and updated tables.
///
/// Called at most once per completed series and once per table update.
/// In-memory state never depends on the outcome.
pub trait PersistenceSink {
    fn persist_series(&mut self, match_id: MatchId, result: &SeriesResult) -> Result<(), SinkError>;

    fn persist_standings(&mut self, group_id: GroupId, entries: &[StandingEntry]) -> Result<(), SinkError>;
}

/// Discards everything
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl PersistenceSink for NullSink {
    fn persist_series(&mut self, _match_id: MatchId, _result: &SeriesResult) -> Result<(), SinkError> {
        Ok(())
    }

    fn persist_standings(&mut self, _group_id: GroupId, _entries: &[StandingEntry]) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Keeps every write in memory
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    pub series: Vec<MatchId>,
    pub standings: Vec<(GroupId, Vec<StandingEntry>)>,
    /// Reject every write
    pub failing: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose writes all fail
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Latest table written for a group
    pub fn latest_standings(&self, group_id: GroupId) -> Option<&[StandingEntry]> {
        self.standings
            .iter()
            .rev()
            .find(|(id, _)| *id == group_id)
            .map(|(_, entries)| entries.as_slice())
    }
}

impl PersistenceSink for MemorySink {
    fn persist_series(&mut self, match_id: MatchId, _result: &SeriesResult) -> Result<(), SinkError> {
        if self.failing {
            return Err(SinkError::Rejected(format!("series {}", match_id)));
        }
        self.series.push(match_id);
        Ok(())
    }

    fn persist_standings(&mut self, group_id: GroupId, entries: &[StandingEntry]) -> Result<(), SinkError> {
        if self.failing {
            return Err(SinkError::Rejected(format!("group {}", group_id)));
        }
        self.standings.push((group_id, entries.to_vec()));
        Ok(())
    }
}

/// Persist a series, logging instead of failing
pub(crate) fn store_series(sink: &mut dyn PersistenceSink, match_id: MatchId, result: &SeriesResult) {
    if let Err(e) = sink.persist_series(match_id, result) {
        tracing::warn!(match_id, error = %e, "failed to persist series");
    }
}

/// Persist a table, logging instead of failing
pub(crate) fn store_standings(sink: &mut dyn PersistenceSink, group_id: GroupId, entries: &[StandingEntry]) {
    if let Err(e) = sink.persist_standings(group_id, entries) {
        tracing::warn!(group_id, error = %e, "failed to persist standings");
    }
}

// ============================================================================
// Qualification ranking
// ============================================================================

/// A region's record going into the region battle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionStanding {
    pub region_id: RegionId,
    pub badges: u32,
}

/// Orders regions for region-battle seeding, best first
pub trait QualificationSource {
    fn region_ranking(&self, standings: &[RegionStanding]) -> Vec<RegionId>;
}

/// Most badges first, lower region id on ties
#[derive(Clone, Copy, Debug, Default)]
pub struct BadgeRanking;

impl QualificationSource for BadgeRanking {
    fn region_ranking(&self, standings: &[RegionStanding]) -> Vec<RegionId> {
        let mut ranked = standings.to_vec();
        ranked.sort_by(|a, b| b.badges.cmp(&a.badges).then_with(|| a.region_id.cmp(&b.region_id)));
        ranked.into_iter().map(|r| r.region_id).collect()
    }
}

/// A fixed, externally supplied order; regions it omits follow by id
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedRanking(pub Vec<RegionId>);

impl QualificationSource for FixedRanking {
    fn region_ranking(&self, standings: &[RegionStanding]) -> Vec<RegionId> {
        let mut ranked: Vec<RegionId> = self
            .0
            .iter()
            .copied()
            .filter(|id| standings.iter().any(|r| r.region_id == *id))
            .collect();
        let mut rest: Vec<RegionId> = standings
            .iter()
            .map(|r| r.region_id)
            .filter(|id| !ranked.contains(id))
            .collect();
        rest.sort_unstable();
        ranked.extend(rest);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_runner::tests::flat_roster;

    #[test]
    fn test_roster_book_lookup() {
        let book: RosterBook = [flat_roster(1, 70, 70), flat_roster(2, 65, 70)].into_iter().collect();
        assert_eq!(book.len(), 2);
        assert_eq!(book.roster(2).map(|r| r.team_id), Some(2));
        assert!(book.roster(3).is_none());
        assert!(book.get(1).is_some());
    }

    #[test]
    fn test_badge_ranking() {
        let standings = [
            RegionStanding { region_id: 3, badges: 2 },
            RegionStanding { region_id: 1, badges: 2 },
            RegionStanding { region_id: 2, badges: 4 },
            RegionStanding { region_id: 4, badges: 0 },
        ];
        assert_eq!(BadgeRanking.region_ranking(&standings), vec![2, 1, 3, 4]);
    }

    #[test]
    fn test_fixed_ranking_fills_gaps() {
        let standings = [
            RegionStanding { region_id: 1, badges: 0 },
            RegionStanding { region_id: 2, badges: 0 },
            RegionStanding { region_id: 3, badges: 0 },
        ];
        let ranking = FixedRanking(vec![3, 9]);
        assert_eq!(ranking.region_ranking(&standings), vec![3, 1, 2]);
    }

    #[test]
    fn test_memory_sink_failures_are_reported() {
        let mut sink = MemorySink::failing();
        assert!(sink.persist_standings(1, &[]).is_err());
        assert!(sink.standings.is_empty());

        let mut sink = MemorySink::new();
        sink.persist_standings(1, &[StandingEntry::new(5, "Five")]).unwrap();
        sink.persist_standings(2, &[]).unwrap();
        assert_eq!(sink.latest_standings(1).map(|e| e.len()), Some(1));
        assert!(sink.latest_standings(3).is_none());
    }
}
