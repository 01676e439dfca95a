//! Standings tables - points, ordering and badges for one group
//!
//! Level 2 - Phase-level state

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use esports_core::TeamId;
use serde::{Deserialize, Serialize};

use crate::config::{PointsRule, QualificationRule};
use crate::error::TournamentError;
use crate::schedule::MatchId;
use crate::series::SeriesResult;

/// Stable identifier of a group or league table
pub type GroupId = u32;

/// One team's row in a table
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingEntry {
    pub team_id: TeamId,
    pub team_name: String,
    pub matches_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub points: u32,
    pub games_won: u32,
    pub games_lost: u32,
    /// games_won - games_lost
    pub game_diff: i32,
    /// 1-based position after the latest sort
    pub rank: u32,
    /// Qualified; only set once the table is complete
    pub has_badge: bool,
}

impl StandingEntry {
    pub fn new(team_id: TeamId, team_name: &str) -> Self {
        Self {
            team_id,
            team_name: team_name.to_string(),
            matches_played: 0,
            wins: 0,
            losses: 0,
            points: 0,
            games_won: 0,
            games_lost: 0,
            game_diff: 0,
            rank: 0,
            has_badge: false,
        }
    }

    /// Series win rate
    pub fn win_rate(&self) -> f64 {
        if self.matches_played == 0 {
            0.0
        } else {
            self.wins as f64 / self.matches_played as f64
        }
    }

    fn record(&mut self, own: u8, opponent: u8, rule: &PointsRule) {
        self.matches_played += 1;
        if own > opponent {
            self.wins += 1;
        } else {
            self.losses += 1;
        }
        self.points += rule.points(own, opponent);
        self.games_won += own as u32;
        self.games_lost += opponent as u32;
        self.game_diff = self.games_won as i32 - self.games_lost as i32;
    }
}

/// Table ordering: points desc, game differential desc, wins desc,
/// then team id ascending
pub fn compare_entries(a: &StandingEntry, b: &StandingEntry) -> Ordering {
    b.points
        .cmp(&a.points)
        .then_with(|| b.game_diff.cmp(&a.game_diff))
        .then_with(|| b.wins.cmp(&a.wins))
        .then_with(|| a.team_id.cmp(&b.team_id))
}

/// Standings for one group or league.
///
/// Every result must belong to a scheduled match, and each match id is
/// accepted once. Entries are kept sorted with ranks re-derived after
/// every update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandingsTable {
    pub group_id: GroupId,
    points_rule: PointsRule,
    qualification: QualificationRule,
    entries: Vec<StandingEntry>,
    /// Scheduled match id -> (team_a, team_b)
    scheduled: BTreeMap<MatchId, (TeamId, TeamId)>,
    applied: BTreeSet<MatchId>,
    /// More matches may still be scheduled (Swiss rounds not yet paired)
    schedule_open: bool,
}

impl StandingsTable {
    pub fn new<'a>(
        group_id: GroupId,
        teams: impl IntoIterator<Item = (TeamId, &'a str)>,
        points_rule: PointsRule,
        qualification: QualificationRule,
    ) -> Self {
        let mut table = Self {
            group_id,
            points_rule,
            qualification,
            entries: teams
                .into_iter()
                .map(|(id, name)| StandingEntry::new(id, name))
                .collect(),
            scheduled: BTreeMap::new(),
            applied: BTreeSet::new(),
            schedule_open: false,
        };
        table.resort();
        table
    }

    /// Register a match this table expects a result for
    pub fn schedule(&mut self, match_id: MatchId, team_a: TeamId, team_b: TeamId) -> Result<(), TournamentError> {
        for team in [team_a, team_b] {
            if self.entry(team).is_none() {
                return Err(TournamentError::UnknownTeam(team));
            }
        }
        self.scheduled.insert(match_id, (team_a, team_b));
        Ok(())
    }

    /// Mark whether further matches may still be scheduled
    pub fn set_schedule_open(&mut self, open: bool) {
        self.schedule_open = open;
        self.resort();
    }

    /// Apply one completed series.
    ///
    /// Rejects a match id already applied, a match that was never
    /// scheduled, and a result between teams other than the scheduled
    /// pair.
    pub fn apply(&mut self, match_id: MatchId, result: &SeriesResult) -> Result<(), TournamentError> {
        if self.applied.contains(&match_id) {
            return Err(TournamentError::SeriesAlreadyApplied(match_id));
        }
        let &(team_a, team_b) = self
            .scheduled
            .get(&match_id)
            .ok_or(TournamentError::UnknownMatch(match_id))?;
        if !(result.involves(team_a) && result.involves(team_b)) {
            return Err(TournamentError::TeamMismatch {
                match_id,
                got_a: result.team_a_id,
                got_b: result.team_b_id,
            });
        }

        let rule = self.points_rule;
        for (team, own, opponent) in [
            (result.team_a_id, result.score_a, result.score_b),
            (result.team_b_id, result.score_b, result.score_a),
        ] {
            let entry = self
                .entries
                .iter_mut()
                .find(|e| e.team_id == team)
                .ok_or(TournamentError::UnknownTeam(team))?;
            entry.record(own, opponent, &rule);
        }

        self.applied.insert(match_id);
        self.resort();

        if self.is_complete() {
            tracing::info!(group_id = self.group_id, "table complete");
        }
        Ok(())
    }

    /// Every scheduled match has a result and no more will be added
    pub fn is_complete(&self) -> bool {
        !self.schedule_open && self.applied.len() == self.scheduled.len()
    }

    pub fn is_scheduled(&self, match_id: MatchId) -> bool {
        self.scheduled.contains_key(&match_id)
    }

    pub fn is_applied(&self, match_id: MatchId) -> bool {
        self.applied.contains(&match_id)
    }

    /// Badge holders in rank order, once the table is complete
    pub fn qualifiers(&self) -> Option<Vec<&StandingEntry>> {
        if !self.is_complete() {
            return None;
        }
        Some(self.entries.iter().filter(|e| e.has_badge).collect())
    }

    /// Entries in rank order
    pub fn entries(&self) -> &[StandingEntry] {
        &self.entries
    }

    pub fn entry(&self, team: TeamId) -> Option<&StandingEntry> {
        self.entries.iter().find(|e| e.team_id == team)
    }

    /// Top N entries
    pub fn top_n(&self, n: usize) -> &[StandingEntry] {
        let n = n.min(self.entries.len());
        &self.entries[..n]
    }

    /// Team ids in rank order
    pub fn ranked_team_ids(&self) -> Vec<TeamId> {
        self.entries.iter().map(|e| e.team_id).collect()
    }

    pub fn points_rule(&self) -> &PointsRule {
        &self.points_rule
    }

    fn resort(&mut self) {
        self.entries.sort_by(compare_entries);
        let complete = self.is_complete() && !self.applied.is_empty();
        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry.rank = i as u32 + 1;
            entry.has_badge = complete && self.qualification.qualifies(entry.rank);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MatchFormat, SimulationConfig};
    use crate::game_runner::tests::flat_roster;
    use crate::series::simulate_series;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// A series with a fixed score between two teams
    fn series(match_id: MatchId, a: TeamId, b: TeamId, score_a: u8, score_b: u8) -> SeriesResult {
        SeriesResult {
            match_id,
            team_a_id: a,
            team_b_id: b,
            format: MatchFormat::Bo3,
            games: Vec::new(),
            score_a,
            score_b,
            winner_id: if score_a > score_b { a } else { b },
            mvp: None,
            key_player: None,
        }
    }

    fn table(teams: &[TeamId]) -> StandingsTable {
        let names: Vec<String> = teams.iter().map(|t| format!("Team {}", t)).collect();
        StandingsTable::new(
            1,
            teams.iter().copied().zip(names.iter().map(String::as_str)),
            PointsRule::default(),
            QualificationRule::TopN(2),
        )
    }

    #[test]
    fn test_points_schedule() {
        let mut t = table(&[1, 2, 3, 4]);
        t.schedule(1, 1, 2).unwrap();
        t.schedule(2, 3, 4).unwrap();

        t.apply(1, &series(1, 1, 2, 2, 0)).unwrap();
        t.apply(2, &series(2, 3, 4, 1, 2)).unwrap();

        assert_eq!(t.entry(1).unwrap().points, 3);
        assert_eq!(t.entry(2).unwrap().points, 0);
        assert_eq!(t.entry(3).unwrap().points, 1);
        assert_eq!(t.entry(4).unwrap().points, 2);

        let one = t.entry(1).unwrap();
        assert_eq!((one.wins, one.losses, one.game_diff), (1, 0, 2));
        assert_eq!(t.entry(3).unwrap().game_diff, -1);
        assert_eq!(t.ranked_team_ids(), vec![1, 4, 3, 2]);
        assert_eq!(t.entries()[0].rank, 1);
    }

    #[test]
    fn test_reapply_is_rejected() {
        let mut t = table(&[1, 2]);
        t.schedule(7, 1, 2).unwrap();
        let result = series(7, 1, 2, 2, 1);

        t.apply(7, &result).unwrap();
        assert_eq!(t.apply(7, &result), Err(TournamentError::SeriesAlreadyApplied(7)));
        assert_eq!(t.entry(1).unwrap().matches_played, 1);
    }

    #[test]
    fn test_unknown_match_and_teams() {
        let mut t = table(&[1, 2, 3]);
        assert_eq!(t.schedule(1, 1, 9), Err(TournamentError::UnknownTeam(9)));

        t.schedule(1, 1, 2).unwrap();
        assert_eq!(t.apply(5, &series(5, 1, 2, 2, 0)), Err(TournamentError::UnknownMatch(5)));
        assert_eq!(
            t.apply(1, &series(1, 1, 3, 2, 0)),
            Err(TournamentError::TeamMismatch {
                match_id: 1,
                got_a: 1,
                got_b: 3
            })
        );
        assert!(!t.is_applied(1));
    }

    #[test]
    fn test_badges_only_when_complete() {
        let mut t = table(&[1, 2, 3]);
        t.schedule(1, 1, 2).unwrap();
        t.schedule(2, 1, 3).unwrap();
        t.schedule(3, 2, 3).unwrap();

        t.apply(1, &series(1, 1, 2, 2, 0)).unwrap();
        t.apply(2, &series(2, 1, 3, 2, 1)).unwrap();
        assert!(!t.is_complete());
        assert!(t.qualifiers().is_none());
        assert!(t.entries().iter().all(|e| !e.has_badge));

        t.apply(3, &series(3, 2, 3, 0, 2)).unwrap();
        assert!(t.is_complete());
        let qualified: Vec<TeamId> = t.qualifiers().unwrap().iter().map(|e| e.team_id).collect();
        assert_eq!(qualified, vec![1, 3]);
    }

    #[test]
    fn test_open_schedule_holds_badges() {
        let mut t = table(&[1, 2]);
        t.set_schedule_open(true);
        t.schedule(1, 1, 2).unwrap();
        t.apply(1, &series(1, 1, 2, 2, 0)).unwrap();
        assert!(!t.is_complete());
        assert!(t.entries().iter().all(|e| !e.has_badge));

        t.set_schedule_open(false);
        assert!(t.is_complete());
        assert!(t.entries().iter().all(|e| e.has_badge));
    }

    #[test]
    fn test_tiebreak_order() {
        let mut t = table(&[5, 3, 8, 1]);
        t.schedule(1, 5, 3).unwrap();
        t.schedule(2, 8, 1).unwrap();

        // 5 and 8 tie on points, diff and wins; lower id first
        t.apply(1, &series(1, 5, 3, 2, 1)).unwrap();
        t.apply(2, &series(2, 8, 1, 2, 1)).unwrap();
        assert_eq!(t.ranked_team_ids(), vec![5, 8, 1, 3]);
        assert_eq!(t.top_n(2).len(), 2);
        assert_eq!(t.top_n(10).len(), 4);
    }

    #[test]
    fn test_simulated_results_apply() {
        let a = flat_roster(1, 75, 70);
        let b = flat_roster(2, 70, 70);
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let result = simulate_series(1, &a, &b, MatchFormat::Bo3, &SimulationConfig::default(), &mut rng);

        let mut t = table(&[1, 2]);
        t.schedule(1, 1, 2).unwrap();
        t.apply(1, &result).unwrap();

        let winner = t.entry(result.winner_id).unwrap();
        assert_eq!(winner.rank, 1);
        assert_eq!(winner.wins, 1);
        assert!(winner.points >= 2);
        assert!((winner.win_rate() - 1.0).abs() < 1e-9);
    }

    fn arb_entry() -> impl Strategy<Value = (u32, i32, u32)> {
        (0u32..6, -3i32..4, 0u32..3)
    }

    proptest! {
        #[test]
        fn prop_standings_total_order(rows in proptest::collection::vec(arb_entry(), 2..12)) {
            let mut entries: Vec<StandingEntry> = rows
                .iter()
                .enumerate()
                .map(|(i, &(points, diff, wins))| {
                    let mut e = StandingEntry::new((rows.len() - i) as TeamId, "t");
                    e.points = points;
                    e.game_diff = diff;
                    e.wins = wins;
                    e
                })
                .collect();
            entries.sort_by(compare_entries);

            for pair in entries.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                prop_assert_eq!(compare_entries(a, b), Ordering::Less);
                prop_assert_eq!(compare_entries(b, a), Ordering::Greater);
                let key_a = (std::cmp::Reverse(a.points), std::cmp::Reverse(a.game_diff), std::cmp::Reverse(a.wins), a.team_id);
                let key_b = (std::cmp::Reverse(b.points), std::cmp::Reverse(b.game_diff), std::cmp::Reverse(b.wins), b.team_id);
                prop_assert!(key_a < key_b);
            }
        }
    }
}
