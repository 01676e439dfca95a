//! Game runner - simulates single games
//!
//! Level 3 - Step-level implementation

use esports_core::{
    aggregate_team, round_to, simulate_team_performances, standard_normal, PlayerPerformance,
    RosterWarning, TeamId, TeamRoster,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::{MatchFormat, SimulationConfig};
use crate::schedule::{Fixture, MatchId};
use crate::series::{simulate_series, SeriesResult};

/// One team's side of a single game
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeamGameLine {
    pub team_id: TeamId,
    /// Mean actual ability, rounded to 1 decimal
    pub power: f64,
    /// power plus match-day noise, rounded to 1 decimal
    pub performance: f64,
    pub players: Vec<PlayerPerformance>,
    pub roster_warning: Option<RosterWarning>,
}

/// Outcome of a single game
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    /// 1-based position within the series
    pub game_number: u8,
    pub team_a: TeamGameLine,
    pub team_b: TeamGameLine,
    pub winner_id: TeamId,
    /// team_a power minus team_b power
    pub power_difference: f64,
    /// team_a performance minus team_b performance
    pub performance_difference: f64,
    /// The side with lower raw power won
    pub is_upset: bool,
}

impl GameResult {
    /// Check if side A won
    pub fn team_a_won(&self) -> bool {
        self.winner_id == self.team_a.team_id
    }

    /// Every player performance in the game, side A first
    pub fn players(&self) -> impl Iterator<Item = &PlayerPerformance> {
        self.team_a.players.iter().chain(self.team_b.players.iter())
    }
}

/// Simulate one game between two rosters.
///
/// Two noise layers: each player draws their own performance, then each
/// team draws a match-day performance around its power. The higher
/// performance wins; an exact tie goes to side B.
pub fn simulate_game<R: Rng + ?Sized>(
    team_a: &TeamRoster,
    team_b: &TeamRoster,
    game_number: u8,
    config: &SimulationConfig,
    rng: &mut R,
) -> GameResult {
    let window = &config.ability_window;
    let mut players_a = simulate_team_performances(&team_a.players, team_a.team_id, window, rng);
    let mut players_b = simulate_team_performances(&team_b.players, team_b.team_id, window, rng);

    let power_a = aggregate_team(team_a.team_id, &mut players_a);
    let power_b = aggregate_team(team_b.team_id, &mut players_b);

    let performance_a = power_a.power + standard_normal(rng) * config.performance_sigma;
    let performance_b = power_b.power + standard_normal(rng) * config.performance_sigma;

    let a_wins = performance_a > performance_b;
    let winner_id = if a_wins { team_a.team_id } else { team_b.team_id };
    let is_upset = (power_a.power > power_b.power && !a_wins) || (power_b.power > power_a.power && a_wins);

    GameResult {
        game_number,
        team_a: TeamGameLine {
            team_id: team_a.team_id,
            power: round_to(power_a.power, 1),
            performance: round_to(performance_a, 1),
            players: players_a,
            roster_warning: power_a.warning,
        },
        team_b: TeamGameLine {
            team_id: team_b.team_id,
            power: round_to(power_b.power, 1),
            performance: round_to(performance_b, 1),
            players: players_b,
            roster_warning: power_b.warning,
        },
        winner_id,
        power_difference: round_to(power_a.power - power_b.power, 1),
        performance_difference: round_to(performance_a - performance_b, 1),
        is_upset,
    }
}

/// Per-match seed derived from a batch seed, independent of execution order
pub fn match_seed(base_seed: u64, match_id: MatchId) -> u64 {
    base_seed.wrapping_add(match_id)
}

/// Series runner that owns a seeded random source
pub struct GameRunner {
    /// Simulation configuration
    config: SimulationConfig,
    rng: ChaCha8Rng,
}

impl GameRunner {
    /// Create a new runner with a fixed seed
    pub fn new(config: SimulationConfig, seed: u64) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Runner seeded for one scheduled match of a batch
    pub fn for_match(config: SimulationConfig, base_seed: u64, match_id: MatchId) -> Self {
        Self::new(config, match_seed(base_seed, match_id))
    }

    /// Play a single game
    pub fn play_game(&mut self, team_a: &TeamRoster, team_b: &TeamRoster, game_number: u8) -> GameResult {
        simulate_game(team_a, team_b, game_number, &self.config, &mut self.rng)
    }

    /// Play a full series
    pub fn play_series(
        &mut self,
        match_id: MatchId,
        team_a: &TeamRoster,
        team_b: &TeamRoster,
        format: MatchFormat,
    ) -> SeriesResult {
        simulate_series(match_id, team_a, team_b, format, &self.config, &mut self.rng)
    }

    /// Play a scheduled fixture with the given rosters
    pub fn play_fixture(&mut self, fixture: &Fixture, team_a: &TeamRoster, team_b: &TeamRoster) -> SeriesResult {
        self.play_series(fixture.match_id, team_a, team_b, fixture.format)
    }

    /// Reseed the random source
    pub fn reset_seed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    /// Get configuration
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use esports_core::{PlayerAttributes, Role};

    /// Five players of identical ability and stability
    pub(crate) fn flat_roster(team_id: TeamId, ability: u8, stability: u8) -> TeamRoster {
        let players = Role::ALL
            .iter()
            .enumerate()
            .map(|(i, &role)| {
                let id = team_id * 100 + i as u64;
                PlayerAttributes::new(id, &format!("t{}p{}", team_id, i), role, ability, stability)
            })
            .collect();
        TeamRoster::new(team_id, &format!("Team {}", team_id), players)
    }

    #[test]
    fn test_game_runner_creation() {
        let config = SimulationConfig::default().with_parallel(false);
        let runner = GameRunner::new(config, 7);
        assert!(!runner.config().parallel);
    }

    #[test]
    fn test_simulate_game_shape() {
        let a = flat_roster(1, 75, 80);
        let b = flat_roster(2, 70, 80);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let game = simulate_game(&a, &b, 1, &SimulationConfig::default(), &mut rng);

        assert_eq!(game.game_number, 1);
        assert_eq!(game.team_a.players.len(), 5);
        assert_eq!(game.team_b.players.len(), 5);
        assert!(game.winner_id == 1 || game.winner_id == 2);
        assert_eq!(game.players().count(), 10);
        assert!(game.team_a.roster_warning.is_none());
        assert_eq!(game.team_a_won(), game.winner_id == 1);
    }

    #[test]
    fn test_deterministic_powers_with_perfect_stability() {
        let a = flat_roster(1, 80, 100);
        let b = flat_roster(2, 60, 100);
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        let game = simulate_game(&a, &b, 1, &SimulationConfig::default(), &mut rng);

        assert_eq!(game.team_a.power, 80.0);
        assert_eq!(game.team_b.power, 60.0);
        assert_eq!(game.power_difference, 20.0);
        assert!(game.players().all(|p| p.impact_score == 0.0));
        // upset iff the 60-power side won
        assert_eq!(game.is_upset, game.winner_id == 2);
    }

    #[test]
    fn test_zero_sigma_favours_stronger_team() {
        let a = flat_roster(1, 60, 100);
        let b = flat_roster(2, 61, 100);
        let config = SimulationConfig::default().with_performance_sigma(0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        for n in 1..=10 {
            let game = simulate_game(&a, &b, n, &config, &mut rng);
            assert_eq!(game.winner_id, 2);
            assert!(!game.is_upset);
        }
    }

    #[test]
    fn test_equal_performance_goes_to_side_b() {
        let a = flat_roster(1, 70, 100);
        let b = flat_roster(2, 70, 100);
        let config = SimulationConfig::default().with_performance_sigma(0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let game = simulate_game(&a, &b, 1, &config, &mut rng);
        assert_eq!(game.winner_id, 2);
        assert!(!game.is_upset);
    }

    #[test]
    fn test_short_roster_surfaces_warning() {
        let mut a = flat_roster(1, 70, 90);
        a.players.truncate(3);
        let b = flat_roster(2, 70, 90);
        let mut rng = ChaCha8Rng::seed_from_u64(2);

        let game = simulate_game(&a, &b, 1, &SimulationConfig::default(), &mut rng);
        let warning = game.team_a.roster_warning.expect("short roster warns");
        assert_eq!(warning.actual, 3);
        assert_eq!(game.team_a.players.len(), 3);
    }

    #[test]
    fn test_seeded_runner_is_reproducible() {
        let a = flat_roster(1, 72, 70);
        let b = flat_roster(2, 71, 70);

        let mut first = GameRunner::new(SimulationConfig::default(), 99);
        let mut second = GameRunner::new(SimulationConfig::default(), 99);
        assert_eq!(
            first.play_series(1, &a, &b, MatchFormat::Bo5),
            second.play_series(1, &a, &b, MatchFormat::Bo5)
        );

        second.reset_seed(99);
        first.reset_seed(99);
        assert_eq!(first.play_game(&a, &b, 1), second.play_game(&a, &b, 1));
    }

    #[test]
    fn test_match_seed_varies_by_match() {
        assert_ne!(match_seed(10, 1), match_seed(10, 2));
        assert_eq!(match_seed(u64::MAX, 1), 0);
    }
}
