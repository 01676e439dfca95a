//! Team power aggregation
//!
//! Team power is the mean actual ability of the players fielded; each
//! player's impact is how far they played above or below that mean.

use serde::{Deserialize, Serialize};

use crate::performance::{round_to, PlayerPerformance};
use crate::player::{TeamId, ROSTER_SIZE};

/// Non-fatal data-contract warning about a roster
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterWarning {
    pub team_id: TeamId,
    pub expected: usize,
    pub actual: usize,
}

impl std::fmt::Display for RosterWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "team {} fielded {} players (expected {})",
            self.team_id, self.actual, self.expected
        )
    }
}

/// Outcome of aggregating one team's performances for one game
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeamPower {
    /// Unrounded mean actual ability
    pub power: f64,
    pub warning: Option<RosterWarning>,
}

/// Mean actual ability; 0 for an empty slice
pub fn team_power(performances: &[PlayerPerformance]) -> f64 {
    if performances.is_empty() {
        return 0.0;
    }
    let total: f64 = performances.iter().map(|p| p.actual_ability).sum();
    total / performances.len() as f64
}

/// Fill in each player's impact score relative to `power`
pub fn assign_impact_scores(performances: &mut [PlayerPerformance], power: f64) {
    for p in performances.iter_mut() {
        p.impact_score = round_to(p.actual_ability - power, 1);
    }
}

/// Aggregate a team's performances: compute power, then impact scores.
///
/// A count other than five produces a warning but still uses the mean
/// of whatever was supplied.
pub fn aggregate_team(team_id: TeamId, performances: &mut [PlayerPerformance]) -> TeamPower {
    let warning = if performances.len() != ROSTER_SIZE {
        let warning = RosterWarning {
            team_id,
            expected: ROSTER_SIZE,
            actual: performances.len(),
        };
        tracing::warn!(%warning, "aggregating short or oversized roster");
        Some(warning)
    } else {
        None
    };

    let power = team_power(performances);
    assign_impact_scores(performances, power);

    TeamPower { power, warning }
}
