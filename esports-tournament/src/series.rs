//! Series play - best-of-N games between two teams
//!
//! Level 2 - Phase-level implementation

use std::collections::BTreeMap;

use esports_core::{round_to, PlayerId, PlayerPerformance, TeamId, TeamRoster};
use rand::Rng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::config::{MatchFormat, SimulationConfig};
use crate::error::TournamentError;
use crate::game_runner::{simulate_game, GameResult};
use crate::schedule::MatchId;

/// Player with the highest cumulative impact across a series
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MvpRecord {
    pub player_id: PlayerId,
    pub player_name: String,
    pub team_id: TeamId,
    /// Rounded to 1 decimal
    pub total_impact: f64,
}

/// Why the key player stood out
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPlayerReason {
    HighPerformance,
    LowPerformance,
}

/// Player with the largest absolute impact in the deciding game
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyPlayer {
    pub player_id: PlayerId,
    pub player_name: String,
    pub team_id: TeamId,
    pub reason: KeyPlayerReason,
    pub impact_score: f64,
    pub game_number: u8,
}

/// Result of a series (multiple games).
///
/// Immutable once produced; addressed by `match_id` afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeriesResult {
    pub match_id: MatchId,
    pub team_a_id: TeamId,
    pub team_b_id: TeamId,
    pub format: MatchFormat,
    /// Games in the order they were played
    pub games: Vec<GameResult>,
    pub score_a: u8,
    pub score_b: u8,
    pub winner_id: TeamId,
    pub mvp: Option<MvpRecord>,
    pub key_player: Option<KeyPlayer>,
}

impl SeriesResult {
    /// The team that lost the series
    pub fn loser_id(&self) -> TeamId {
        if self.winner_id == self.team_a_id {
            self.team_b_id
        } else {
            self.team_a_id
        }
    }

    /// Whether a team took part
    pub fn involves(&self, team: TeamId) -> bool {
        self.team_a_id == team || self.team_b_id == team
    }

    /// (own, opponent) game score for a participant
    pub fn score_for(&self, team: TeamId) -> Option<(u8, u8)> {
        if team == self.team_a_id {
            Some((self.score_a, self.score_b))
        } else if team == self.team_b_id {
            Some((self.score_b, self.score_a))
        } else {
            None
        }
    }

    /// Games won by a team; zero for a team that did not play
    pub fn games_for(&self, team: TeamId) -> u8 {
        self.score_for(team).map_or(0, |(own, _)| own)
    }

    /// Whether the loser failed to take a game
    pub fn is_sweep(&self) -> bool {
        self.score_a == 0 || self.score_b == 0
    }

    /// Number of upsets across the games
    pub fn upset_count(&self) -> usize {
        self.games.iter().filter(|g| g.is_upset).count()
    }
}

/// Play a best-of-N series (Level 2 phase).
///
/// Games are simulated one after another until a side reaches
/// `format.wins_needed()`, so the game count is always within
/// `[wins_needed, max_games]`.
pub fn simulate_series<R: Rng + ?Sized>(
    match_id: MatchId,
    team_a: &TeamRoster,
    team_b: &TeamRoster,
    format: MatchFormat,
    config: &SimulationConfig,
    rng: &mut R,
) -> SeriesResult {
    let wins_needed = format.wins_needed();
    let mut games = Vec::with_capacity(format.max_games() as usize);
    let mut score_a = 0u8;
    let mut score_b = 0u8;

    while score_a < wins_needed && score_b < wins_needed {
        let game_number = games.len() as u8 + 1;
        let game = simulate_game(team_a, team_b, game_number, config, rng);
        if game.team_a_won() {
            score_a += 1;
        } else {
            score_b += 1;
        }
        games.push(game);
    }

    let winner_id = if score_a > score_b {
        team_a.team_id
    } else {
        team_b.team_id
    };
    let (mvp, key_player) = analyze_series(&games);

    tracing::debug!(match_id, score_a, score_b, winner_id, "series finished");

    SeriesResult {
        match_id,
        team_a_id: team_a.team_id,
        team_b_id: team_b.team_id,
        format,
        games,
        score_a,
        score_b,
        winner_id,
        mvp,
        key_player,
    }
}

// ============================================================================
// Level 3 - Steps
// ============================================================================

/// Accumulated impact for one player across the series
struct ImpactTotal<'a> {
    player_id: PlayerId,
    player_name: &'a str,
    team_id: TeamId,
    total: f64,
}

/// Find the MVP and key player of a series
pub fn analyze_series(games: &[GameResult]) -> (Option<MvpRecord>, Option<KeyPlayer>) {
    (find_mvp(games), find_key_player(games))
}

/// Highest cumulative impact; ties go to the player seen first
fn find_mvp(games: &[GameResult]) -> Option<MvpRecord> {
    let mut index: FxHashMap<PlayerId, usize> = FxHashMap::default();
    let mut totals: Vec<ImpactTotal> = Vec::new();

    for perf in games.iter().flat_map(|g| g.players()) {
        match index.get(&perf.player_id) {
            Some(&i) => totals[i].total += perf.impact_score,
            None => {
                index.insert(perf.player_id, totals.len());
                totals.push(ImpactTotal {
                    player_id: perf.player_id,
                    player_name: &perf.player_name,
                    team_id: perf.team_id,
                    total: perf.impact_score,
                });
            }
        }
    }

    let mut best: Option<&ImpactTotal> = None;
    for entry in &totals {
        if best.map_or(true, |b| entry.total > b.total) {
            best = Some(entry);
        }
    }

    best.map(|b| MvpRecord {
        player_id: b.player_id,
        player_name: b.player_name.to_string(),
        team_id: b.team_id,
        total_impact: round_to(b.total, 1),
    })
}

/// Largest absolute impact in the final game; ties go to the player seen first
fn find_key_player(games: &[GameResult]) -> Option<KeyPlayer> {
    let last = games.last()?;
    let mut best: Option<&PlayerPerformance> = None;
    for perf in last.players() {
        if best.map_or(true, |b| perf.impact_score.abs() > b.impact_score.abs()) {
            best = Some(perf);
        }
    }

    best.map(|p| KeyPlayer {
        player_id: p.player_id,
        player_name: p.player_name.clone(),
        team_id: p.team_id,
        reason: if p.impact_score > 0.0 {
            KeyPlayerReason::HighPerformance
        } else {
            KeyPlayerReason::LowPerformance
        },
        impact_score: p.impact_score,
        game_number: last.game_number,
    })
}

// ============================================================================
// Ledger
// ============================================================================

/// Completed series addressed by match id.
///
/// A match id can be written exactly once.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesLedger {
    results: BTreeMap<MatchId, SeriesResult>,
}

impl SeriesLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a result; a second write to the same match id is rejected
    pub fn record(&mut self, result: SeriesResult) -> Result<&SeriesResult, TournamentError> {
        use std::collections::btree_map::Entry;
        match self.results.entry(result.match_id) {
            Entry::Occupied(_) => Err(TournamentError::SeriesAlreadyApplied(result.match_id)),
            Entry::Vacant(slot) => Ok(slot.insert(result)),
        }
    }

    pub fn get(&self, match_id: MatchId) -> Option<&SeriesResult> {
        self.results.get(&match_id)
    }

    pub fn contains(&self, match_id: MatchId) -> bool {
        self.results.contains_key(&match_id)
    }

    /// Results in ascending match id
    pub fn iter(&self) -> impl Iterator<Item = &SeriesResult> {
        self.results.values()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
