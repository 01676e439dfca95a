//! Esports Tournament - series simulation and tournament progression
//!
//! This crate provides the match engine and everything built on it:
//! - Single games and best-of-N series with MVP / key-player analysis
//! - Standings tables with configurable points and badges
//! - Seed-slot bracket stages with tiebreakers and cancellation
//! - Group stages, leagues with double-elimination playoffs, region
//!   tournaments, and a world championship (Swiss stage plus knockout)
//! - A batch runner that simulates independent lanes in parallel and
//!   applies in order
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: League, RegionTournament, WorldsTournament, run_to_completion (orchestration)
//! - Level 2: simulate_series, StandingsTable, BracketStage, GroupStage (phases)
//! - Level 3: simulate_game, fixture generation (steps)
//! - Level 4: configuration, errors, collaborator traits

mod batch;
mod bracket;
mod collaborators;
mod config;
mod error;
mod game_runner;
mod group_stage;
mod league;
mod playoffs;
mod region;
mod schedule;
mod series;
mod standings;
mod worlds;

pub use batch::{run_to_completion, run_while, simulate_pending, Competition, Lane};
pub use bracket::{BracketStage, SeedSlot, SideId, SlotState, StageEvent, StageId, StageRound, StageStatus};
pub use collaborators::{
    BadgeRanking, FixedRanking, MemorySink, NullSink, PersistenceSink, QualificationSource, RegionStanding,
    RosterBook, RosterSupplier, SinkError,
};
pub use config::{
    EngineConfig, GroupFormat, GroupStageConfig, LeagueConfig, MatchFormat, PlacementPoints, PlayoffConfig,
    PointsRule, QualificationRule, RegionBattleConfig, RegionPlacementPoints, SimulationConfig, WorldsConfig,
};
pub use error::TournamentError;
pub use game_runner::{match_seed, simulate_game, GameResult, GameRunner, TeamGameLine};
pub use group_stage::{Group, GroupEntrant, GroupStage, ScheduledMatch};
pub use league::{League, LeaguePhase, SEASON_GROUP};
pub use playoffs::{PlayoffBracket, PlayoffPlacement, PlayoffRound, PLAYOFF_TEAMS};
pub use region::{Region, RegionId, RegionPhase, RegionPlacement, RegionTournament, SeededTeam};
pub use schedule::{
    build_fixtures, double_round_robin, round_robin_rounds, swiss_pairings, Fixture, MatchId, MatchIdAllocator,
};
pub use series::{analyze_series, simulate_series, KeyPlayer, KeyPlayerReason, MvpRecord, SeriesLedger, SeriesResult};
pub use standings::{compare_entries, GroupId, StandingEntry, StandingsTable};
pub use worlds::{
    WorldsPhase, WorldsPlacement, WorldsRound, WorldsTournament, SWISS_GROUP, WORLDS_DIRECT_SEEDS,
    WORLDS_SWISS_QUALIFIERS,
};
