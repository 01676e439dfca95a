//! Esports Core - player and team simulation math
//!
//! This crate provides the leaf layer of the match engine:
//! - Player attributes, roles and rosters
//! - Gaussian noise via Box-Muller on any `rand::Rng`
//! - Per-game player performance with stability-driven variance
//! - Team power aggregation and impact scores

pub mod performance;
pub mod player;
pub mod power;

// Re-exports for convenient access
pub use performance::{
    round_to, simulate_performance, simulate_team_performances, stability_sigma, standard_normal,
    AbilityWindow, PlayerPerformance,
};
pub use player::{
    base_stability_for_age, condition_range, roll_condition, PlayerAttributes, PlayerId, Role,
    TeamId, TeamRoster, ROSTER_SIZE,
};
pub use power::{aggregate_team, assign_impact_scores, team_power, RosterWarning, TeamPower};
