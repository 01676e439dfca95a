//! Per-game player performance
//!
//! A player's actual ability in one game is their base ability plus
//! condition plus stability-scaled gaussian noise, clamped to a window
//! around the base ability.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::player::{PlayerAttributes, PlayerId, Role, TeamId, ROSTER_SIZE};

/// How far below base ability a bad game can drop
pub const DEFAULT_FLOOR_MARGIN: f64 = 15.0;

/// How far above base ability a great game can reach
pub const DEFAULT_CEILING_MARGIN: f64 = 10.0;

/// Clamp window around a player's base ability
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AbilityWindow {
    pub below: f64,
    pub above: f64,
}

impl Default for AbilityWindow {
    fn default() -> Self {
        Self {
            below: DEFAULT_FLOOR_MARGIN,
            above: DEFAULT_CEILING_MARGIN,
        }
    }
}

impl AbilityWindow {
    /// Inclusive (min, max) bounds for a base ability.
    ///
    /// Ability is capped at 100 and negative margins count as zero, so
    /// `min <= max` for any input.
    pub fn bounds(&self, ability: u8) -> (f64, f64) {
        let ability = ability.min(100) as f64;
        let min = (ability - self.below.max(0.0)).max(0.0);
        let max = (ability + self.above.max(0.0)).min(100.0);
        (min, max)
    }
}

/// One player's derived performance in one game.
///
/// Created fresh per game and never mutated after the team aggregate
/// has filled in `impact_score`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerPerformance {
    pub player_id: PlayerId,
    pub player_name: String,
    pub role: Role,
    pub team_id: TeamId,
    pub base_ability: u8,
    pub condition_bonus: i8,
    /// noise * sigma, rounded to 2 decimals
    pub stability_noise: f64,
    /// Clamped, rounded to 1 decimal
    pub actual_ability: f64,
    /// actual_ability minus team power, rounded to 1 decimal
    pub impact_score: f64,
}

// ============================================================================
// Noise
// ============================================================================

/// Standard deviation of a player's per-game noise.
///
/// stability 100 gives 0, stability 0 gives 10. Out-of-range input clamps.
pub fn stability_sigma(stability: f64) -> f64 {
    (100.0 - stability.clamp(0.0, 100.0)) / 10.0
}

/// Draw from N(0, 1) using the Box-Muller transform.
///
/// Both uniforms are redrawn while exactly zero so `ln` stays defined.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let mut u: f64 = 0.0;
    let mut v: f64 = 0.0;
    while u == 0.0 {
        u = rng.gen();
    }
    while v == 0.0 {
        v = rng.gen();
    }
    (-2.0 * u.ln()).sqrt() * (2.0 * std::f64::consts::PI * v).cos()
}

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

// ============================================================================
// Performance model
// ============================================================================

/// Simulate one player's performance for one game
pub fn simulate_performance<R: Rng + ?Sized>(
    player: &PlayerAttributes,
    team_id: TeamId,
    window: &AbilityWindow,
    rng: &mut R,
) -> PlayerPerformance {
    let sigma = stability_sigma(player.stability as f64);
    let noise = standard_normal(rng) * sigma;

    let raw = player.ability as f64 + player.condition as f64 + noise;
    let (min, max) = window.bounds(player.ability);
    let actual = raw.clamp(min, max);

    PlayerPerformance {
        player_id: player.id,
        player_name: player.name.clone(),
        role: player.role,
        team_id,
        base_ability: player.ability,
        condition_bonus: player.condition,
        stability_noise: round_to(noise, 2),
        actual_ability: round_to(actual, 1),
        impact_score: 0.0,
    }
}

/// Simulate performances for every player a team fields.
///
/// A roster that is not exactly five players is an upstream data
/// problem; it is logged and the players present are still simulated.
pub fn simulate_team_performances<R: Rng + ?Sized>(
    players: &[PlayerAttributes],
    team_id: TeamId,
    window: &AbilityWindow,
    rng: &mut R,
) -> Vec<PlayerPerformance> {
    if players.is_empty() {
        tracing::warn!(team_id, "no players supplied for team");
        return Vec::new();
    }
    if players.len() != ROSTER_SIZE {
        tracing::warn!(
            team_id,
            expected = ROSTER_SIZE,
            actual = players.len(),
            "unexpected roster size"
        );
    }
    players
        .iter()
        .map(|p| simulate_performance(p, team_id, window, rng))
        .collect()
}
