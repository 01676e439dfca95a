//! Configuration types for series and tournament play
//!
//! Level 4 - Utilities and configuration

use esports_core::AbilityWindow;
use serde::{Deserialize, Serialize};

/// Best-of-N series format
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchFormat {
    Bo1,
    Bo3,
    Bo5,
    Bo7,
}

impl Default for MatchFormat {
    fn default() -> Self {
        MatchFormat::Bo3
    }
}

impl MatchFormat {
    /// Parse a best-of count (1, 3, 5 or 7)
    pub fn from_best_of(n: u8) -> Option<Self> {
        match n {
            1 => Some(MatchFormat::Bo1),
            3 => Some(MatchFormat::Bo3),
            5 => Some(MatchFormat::Bo5),
            7 => Some(MatchFormat::Bo7),
            _ => None,
        }
    }

    /// Maximum number of games
    pub fn max_games(self) -> u8 {
        match self {
            MatchFormat::Bo1 => 1,
            MatchFormat::Bo3 => 3,
            MatchFormat::Bo5 => 5,
            MatchFormat::Bo7 => 7,
        }
    }

    /// Game wins needed to take the series, ceil(N/2)
    pub fn wins_needed(self) -> u8 {
        (self.max_games() + 1) / 2
    }
}

/// Engine constants for simulating games
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Standard deviation of match-day team performance
    pub performance_sigma: f64,
    /// Clamp window around each player's base ability
    pub ability_window: AbilityWindow,
    /// Whether independent series in a batch may be computed in parallel
    pub parallel: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            performance_sigma: 6.0,
            ability_window: AbilityWindow::default(),
            parallel: true,
        }
    }
}

impl SimulationConfig {
    /// Set team performance sigma
    pub fn with_performance_sigma(mut self, sigma: f64) -> Self {
        self.performance_sigma = sigma.max(0.0);
        self
    }

    /// Enable or disable parallel series computation
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// How a completed series turns into table points
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointsRule {
    /// Points depend on whether the loser took any games
    ScoreMargin {
        clean_win: u32,
        narrow_win: u32,
        narrow_loss: u32,
        clean_loss: u32,
    },
    /// Flat points per series won or lost
    PerSeries { win: u32, loss: u32 },
}

impl Default for PointsRule {
    /// 2-0 win = 3, 2-1 win = 2, 1-2 loss = 1, 0-2 loss = 0
    fn default() -> Self {
        PointsRule::ScoreMargin {
            clean_win: 3,
            narrow_win: 2,
            narrow_loss: 1,
            clean_loss: 0,
        }
    }
}

impl PointsRule {
    /// Points for one side given its series score and the opponent's
    pub fn points(&self, own: u8, opponent: u8) -> u32 {
        let won = own > opponent;
        match *self {
            PointsRule::ScoreMargin {
                clean_win,
                narrow_win,
                narrow_loss,
                clean_loss,
            } => match (won, opponent == 0, own == 0) {
                (true, true, _) => clean_win,
                (true, false, _) => narrow_win,
                (false, _, true) => clean_loss,
                (false, _, false) => narrow_loss,
            },
            PointsRule::PerSeries { win, loss } => {
                if won {
                    win
                } else {
                    loss
                }
            }
        }
    }
}

/// Which finishers of a completed group earn a badge
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualificationRule {
    TopN(usize),
}

impl Default for QualificationRule {
    fn default() -> Self {
        QualificationRule::TopN(2)
    }
}

impl QualificationRule {
    /// Whether a 1-based rank qualifies
    pub fn qualifies(&self, rank: u32) -> bool {
        match *self {
            QualificationRule::TopN(n) => rank >= 1 && (rank as usize) <= n,
        }
    }
}

/// Group stage format
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupFormat {
    /// Everyone plays everyone once
    RoundRobin,
    /// Everyone plays everyone twice, home and away swapped
    DoubleRoundRobin,
    /// Pair by standings, limited rounds
    Swiss { rounds: u32 },
}

impl Default for GroupFormat {
    fn default() -> Self {
        GroupFormat::RoundRobin
    }
}

/// Group stage configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupStageConfig {
    pub format: GroupFormat,
    pub match_format: MatchFormat,
    pub points_rule: PointsRule,
    pub qualification: QualificationRule,
}

impl Default for GroupStageConfig {
    fn default() -> Self {
        Self {
            format: GroupFormat::RoundRobin,
            match_format: MatchFormat::Bo3,
            points_rule: PointsRule::default(),
            qualification: QualificationRule::default(),
        }
    }
}

impl GroupStageConfig {
    /// Regular-season league: Bo3 double round robin
    pub fn regular_season() -> Self {
        Self {
            format: GroupFormat::DoubleRoundRobin,
            ..Default::default()
        }
    }

    /// Swiss group with a fixed number of rounds
    pub fn swiss(rounds: u32) -> Self {
        Self {
            format: GroupFormat::Swiss { rounds },
            ..Default::default()
        }
    }

    pub fn with_points_rule(mut self, rule: PointsRule) -> Self {
        self.points_rule = rule;
        self
    }

    pub fn with_qualification(mut self, rule: QualificationRule) -> Self {
        self.qualification = rule;
        self
    }
}

/// Points awarded per final placement of a knockout bracket
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementPoints {
    pub champion: u32,
    pub runner_up: u32,
    pub third: u32,
    pub fourth: u32,
    /// 5th through 8th
    pub quarterfinalist: u32,
}

impl Default for PlacementPoints {
    fn default() -> Self {
        Self {
            champion: 12,
            runner_up: 10,
            third: 8,
            fourth: 6,
            quarterfinalist: 3,
        }
    }
}

/// Points awarded to a region's teams for the region's placement
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionPlacementPoints {
    /// Indexed by placement - 1; teams that played in a region battle
    pub participant: [u32; 4],
    /// Indexed by placement - 1; teams that did not
    pub non_participant: [u32; 4],
}

impl Default for RegionPlacementPoints {
    fn default() -> Self {
        Self {
            participant: [12, 8, 6, 4],
            non_participant: [6, 4, 3, 2],
        }
    }
}

impl RegionPlacementPoints {
    /// Points for a 1-based placement
    pub fn points(&self, placement: usize, participated: bool) -> u32 {
        let table = if participated {
            &self.participant
        } else {
            &self.non_participant
        };
        placement
            .checked_sub(1)
            .and_then(|i| table.get(i))
            .copied()
            .unwrap_or(0)
    }
}

/// Double-elimination playoff configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayoffConfig {
    pub match_format: MatchFormat,
    pub placement_points: PlacementPoints,
}

impl Default for PlayoffConfig {
    fn default() -> Self {
        Self {
            match_format: MatchFormat::Bo5,
            placement_points: PlacementPoints::default(),
        }
    }
}

/// League configuration: regular season plus optional playoffs
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeagueConfig {
    pub regular_season: GroupStageConfig,
    pub playoffs: Option<PlayoffConfig>,
}

impl Default for LeagueConfig {
    fn default() -> Self {
        Self {
            regular_season: GroupStageConfig::regular_season(),
            playoffs: Some(PlayoffConfig::default()),
        }
    }
}

/// Region tournament configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionBattleConfig {
    /// Seed groups: one group per seed number
    pub groups: GroupStageConfig,
    /// Format of every seed-vs-seed series in a region battle
    pub battle_format: MatchFormat,
    /// Seeds each region sends
    pub seeds_per_region: u8,
    /// Seed wins needed to take a battle (None = strict majority)
    pub win_threshold: Option<usize>,
    pub placement_points: RegionPlacementPoints,
}

impl Default for RegionBattleConfig {
    fn default() -> Self {
        Self {
            groups: GroupStageConfig::default(),
            battle_format: MatchFormat::Bo5,
            seeds_per_region: 4,
            win_threshold: None,
            placement_points: RegionPlacementPoints::default(),
        }
    }
}

/// World championship configuration: Swiss group stage, then a
/// single-elimination knockout with a third-place match
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldsConfig {
    pub swiss: GroupStageConfig,
    /// Format of every knockout series
    pub knockout_format: MatchFormat,
    /// Quarterfinalist points go to the four quarterfinal losers
    pub placement_points: PlacementPoints,
    /// Points for teams knocked out in the Swiss stage
    pub group_stage_points: u32,
}

impl Default for WorldsConfig {
    fn default() -> Self {
        Self {
            swiss: GroupStageConfig {
                match_format: MatchFormat::Bo1,
                ..GroupStageConfig::swiss(5)
            }
            .with_points_rule(PointsRule::PerSeries { win: 1, loss: 0 })
            .with_qualification(QualificationRule::TopN(4)),
            knockout_format: MatchFormat::Bo5,
            placement_points: PlacementPoints {
                champion: 20,
                runner_up: 16,
                third: 12,
                fourth: 8,
                quarterfinalist: 6,
            },
            group_stage_points: 4,
        }
    }
}

/// Everything the engine can be configured with, as loaded from a file
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub simulation: SimulationConfig,
    pub league: LeagueConfig,
    pub region: RegionBattleConfig,
    pub worlds: WorldsConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_format_wins_needed() {
        assert_eq!(MatchFormat::Bo1.wins_needed(), 1);
        assert_eq!(MatchFormat::Bo3.wins_needed(), 2);
        assert_eq!(MatchFormat::Bo5.wins_needed(), 3);
        assert_eq!(MatchFormat::Bo7.wins_needed(), 4);
        assert_eq!(MatchFormat::from_best_of(5), Some(MatchFormat::Bo5));
        assert_eq!(MatchFormat::from_best_of(4), None);
    }

    #[test]
    fn test_simulation_config_defaults() {
        let config = SimulationConfig::default();
        assert_eq!(config.performance_sigma, 6.0);
        assert_eq!(config.ability_window.below, 15.0);
        assert_eq!(config.ability_window.above, 10.0);
        assert!(config.parallel);

        let config = config.with_parallel(false).with_performance_sigma(-1.0);
        assert!(!config.parallel);
        assert_eq!(config.performance_sigma, 0.0);
    }

    #[test]
    fn test_default_points_rule() {
        let rule = PointsRule::default();
        assert_eq!(rule.points(2, 0), 3);
        assert_eq!(rule.points(2, 1), 2);
        assert_eq!(rule.points(1, 2), 1);
        assert_eq!(rule.points(0, 2), 0);
    }

    #[test]
    fn test_per_series_points_rule() {
        let rule = PointsRule::PerSeries { win: 1, loss: 0 };
        assert_eq!(rule.points(3, 2), 1);
        assert_eq!(rule.points(2, 3), 0);
        assert_eq!(rule.points(3, 0), 1);
    }

    #[test]
    fn test_qualification_rule() {
        let rule = QualificationRule::TopN(2);
        assert!(rule.qualifies(1));
        assert!(rule.qualifies(2));
        assert!(!rule.qualifies(3));
        assert!(!rule.qualifies(0));
    }

    #[test]
    fn test_region_placement_points() {
        let points = RegionPlacementPoints::default();
        assert_eq!(points.points(1, true), 12);
        assert_eq!(points.points(1, false), 6);
        assert_eq!(points.points(4, false), 2);
        assert_eq!(points.points(5, true), 0);
        assert_eq!(points.points(0, true), 0);
    }

    #[test]
    fn test_league_config_defaults() {
        let config = LeagueConfig::default();
        assert_eq!(config.regular_season.format, GroupFormat::DoubleRoundRobin);
        assert_eq!(config.regular_season.match_format, MatchFormat::Bo3);
        let playoffs = config.playoffs.expect("playoffs on by default");
        assert_eq!(playoffs.match_format, MatchFormat::Bo5);
        assert_eq!(playoffs.placement_points.champion, 12);
    }

    #[test]
    fn test_region_config_defaults() {
        let config = RegionBattleConfig::default();
        assert_eq!(config.seeds_per_region, 4);
        assert_eq!(config.battle_format, MatchFormat::Bo5);
        assert_eq!(config.win_threshold, None);
        assert_eq!(config.groups.qualification, QualificationRule::TopN(2));
    }

    #[test]
    fn test_worlds_config_defaults() {
        let config = WorldsConfig::default();
        assert_eq!(config.swiss.format, GroupFormat::Swiss { rounds: 5 });
        assert_eq!(config.swiss.match_format, MatchFormat::Bo1);
        assert_eq!(config.swiss.points_rule.points(1, 0), 1);
        assert_eq!(config.swiss.qualification, QualificationRule::TopN(4));
        assert_eq!(config.knockout_format, MatchFormat::Bo5);
        assert_eq!(config.placement_points.champion, 20);
        assert_eq!(config.group_stage_points, 4);
    }
}
