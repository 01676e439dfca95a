//! Fixture generation - round robin, double round robin and Swiss pairing
//!
//! Level 3 - Steps

use esports_core::TeamId;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::config::MatchFormat;

/// Stable identifier of one scheduled series
pub type MatchId = u64;

/// A scheduled series between two teams
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    pub match_id: MatchId,
    /// Home side
    pub team_a: TeamId,
    /// Away side
    pub team_b: TeamId,
    pub format: MatchFormat,
    /// 1-based round number within its competition
    pub round: u32,
}

/// Hands out match ids in sequence.
///
/// Owned by an orchestrator and serialized with it so ids stay stable
/// across a snapshot and resume.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchIdAllocator {
    next: MatchId,
}

impl MatchIdAllocator {
    pub fn starting_at(first: MatchId) -> Self {
        Self { next: first }
    }

    /// Take the next id
    pub fn next_id(&mut self) -> MatchId {
        let id = self.next;
        self.next += 1;
        id
    }

    /// The id the next call will return
    pub fn peek(&self) -> MatchId {
        self.next
    }
}

/// Normalized key for "these two teams have met"
pub fn pair_key(a: TeamId, b: TeamId) -> (TeamId, TeamId) {
    (a.min(b), a.max(b))
}

/// Single round robin by the circle method.
///
/// The first team stays fixed while the rest rotate one place each
/// round. An odd field gets a bye; whoever meets the bye sits out.
/// Returns one list of (home, away) pairs per round.
pub fn round_robin_rounds(teams: &[TeamId]) -> Vec<Vec<(TeamId, TeamId)>> {
    if teams.len() < 2 {
        return Vec::new();
    }

    let mut field: Vec<Option<TeamId>> = teams.iter().copied().map(Some).collect();
    if field.len() % 2 == 1 {
        field.push(None);
    }

    let fixed = field[0];
    let mut rotating: Vec<Option<TeamId>> = field[1..].to_vec();
    let last = rotating.len() - 1;
    let half = rotating.len() / 2;
    let mut rounds = Vec::with_capacity(rotating.len());

    for _ in 0..rotating.len() {
        let mut pairs = Vec::with_capacity(half + 1);
        if let (Some(home), Some(away)) = (fixed, rotating[last]) {
            pairs.push((home, away));
        }
        for i in 0..half {
            if let (Some(home), Some(away)) = (rotating[i], rotating[last - 1 - i]) {
                pairs.push((home, away));
            }
        }
        rounds.push(pairs);
        rotating.rotate_right(1);
    }

    rounds
}

/// Second leg follows the first with home and away swapped
pub fn double_round_robin(teams: &[TeamId]) -> Vec<Vec<(TeamId, TeamId)>> {
    let first_leg = round_robin_rounds(teams);
    let second_leg: Vec<Vec<(TeamId, TeamId)>> = first_leg
        .iter()
        .map(|round| round.iter().map(|&(home, away)| (away, home)).collect())
        .collect();
    first_leg.into_iter().chain(second_leg).collect()
}

/// Turn rounds of pairs into fixtures, allocating ids in order
pub fn build_fixtures(
    rounds: &[Vec<(TeamId, TeamId)>],
    format: MatchFormat,
    first_round: u32,
    ids: &mut MatchIdAllocator,
) -> Vec<Fixture> {
    rounds
        .iter()
        .enumerate()
        .flat_map(|(r, pairs)| pairs.iter().map(move |&pair| (r as u32, pair)))
        .map(|(r, (team_a, team_b))| Fixture {
            match_id: ids.next_id(),
            team_a,
            team_b,
            format,
            round: first_round + r,
        })
        .collect()
}

/// Pairings for one Swiss round.
///
/// `ranked` is the field ordered best first. Each unpaired team meets
/// the highest-ranked unpaired team it has not played yet; if every
/// remaining opponent is a rematch, the highest-ranked one is taken.
/// With an odd field the last unpaired team gets a bye.
pub fn swiss_pairings(
    ranked: &[TeamId],
    played: &FxHashSet<(TeamId, TeamId)>,
) -> Vec<(TeamId, TeamId)> {
    let n = ranked.len();
    let mut paired = vec![false; n];
    let mut pairings = Vec::with_capacity(n / 2);

    for i in 0..n {
        if paired[i] {
            continue;
        }

        let fresh = (i + 1..n).find(|&j| !paired[j] && !played.contains(&pair_key(ranked[i], ranked[j])));
        let opponent = fresh.or_else(|| (i + 1..n).find(|&j| !paired[j]));

        if let Some(j) = opponent {
            pairings.push((ranked[i], ranked[j]));
            paired[i] = true;
            paired[j] = true;
        }
    }

    pairings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_pairs(rounds: &[Vec<(TeamId, TeamId)>]) -> Vec<(TeamId, TeamId)> {
        let mut pairs: Vec<_> = rounds.iter().flatten().map(|&(a, b)| pair_key(a, b)).collect();
        pairs.sort();
        pairs
    }

    #[test]
    fn test_round_robin_even_field() {
        let teams = [1, 2, 3, 4, 5, 6];
        let rounds = round_robin_rounds(&teams);
        assert_eq!(rounds.len(), 5);

        for round in &rounds {
            assert_eq!(round.len(), 3);
            let mut seen: Vec<TeamId> = round.iter().flat_map(|&(a, b)| [a, b]).collect();
            seen.sort();
            assert_eq!(seen, teams.to_vec(), "every team plays once per round");
        }

        let pairs = all_pairs(&rounds);
        assert_eq!(pairs.len(), 15); // C(6,2)
        let mut unique = pairs.clone();
        unique.dedup();
        assert_eq!(unique.len(), 15);
    }

    #[test]
    fn test_round_robin_odd_field_has_byes() {
        let teams = [10, 20, 30, 40, 50];
        let rounds = round_robin_rounds(&teams);
        assert_eq!(rounds.len(), 5);
        assert!(rounds.iter().all(|r| r.len() == 2));

        let mut pairs = all_pairs(&rounds);
        assert_eq!(pairs.len(), 10); // C(5,2)
        pairs.dedup();
        assert_eq!(pairs.len(), 10);
    }

    #[test]
    fn test_round_robin_degenerate() {
        assert!(round_robin_rounds(&[]).is_empty());
        assert!(round_robin_rounds(&[7]).is_empty());
        assert_eq!(round_robin_rounds(&[1, 2]), vec![vec![(1, 2)]]);
    }

    #[test]
    fn test_double_round_robin_swaps_home() {
        let teams = [1, 2, 3, 4];
        let rounds = double_round_robin(&teams);
        assert_eq!(rounds.len(), 6);

        for (first, second) in rounds[..3].iter().zip(&rounds[3..]) {
            for (&(h1, a1), &(h2, a2)) in first.iter().zip(second) {
                assert_eq!((h1, a1), (a2, h2));
            }
        }
    }

    #[test]
    fn test_build_fixtures_allocates_in_order() {
        let mut ids = MatchIdAllocator::starting_at(100);
        let rounds = double_round_robin(&[1, 2, 3, 4]);
        let fixtures = build_fixtures(&rounds, MatchFormat::Bo3, 1, &mut ids);

        assert_eq!(fixtures.len(), 12);
        assert_eq!(fixtures[0].match_id, 100);
        assert_eq!(fixtures[11].match_id, 111);
        assert_eq!(fixtures[0].round, 1);
        assert_eq!(fixtures[11].round, 6);
        assert_eq!(ids.peek(), 112);
    }

    #[test]
    fn test_swiss_pairings_by_rank() {
        let ranked = [4, 1, 3, 2];
        let pairings = swiss_pairings(&ranked, &FxHashSet::default());
        assert_eq!(pairings, vec![(4, 1), (3, 2)]);
    }

    #[test]
    fn test_swiss_pairings_avoid_rematch() {
        let ranked = [1, 2, 3, 4];
        let mut played = FxHashSet::default();
        played.insert(pair_key(2, 1));
        let pairings = swiss_pairings(&ranked, &played);
        assert_eq!(pairings, vec![(1, 3), (2, 4)]);
    }

    #[test]
    fn test_swiss_pairings_forced_rematch_and_bye() {
        let ranked = [1, 2, 3];
        let mut played = FxHashSet::default();
        played.insert(pair_key(1, 2));
        played.insert(pair_key(1, 3));
        let pairings = swiss_pairings(&ranked, &played);
        // 1 has met everyone; takes the top remaining, 3 sits out
        assert_eq!(pairings, vec![(1, 2)]);
    }
}
