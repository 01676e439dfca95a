//! League - double round-robin regular season, then playoffs
//!
//! Level 1 - Orchestration

use esports_core::TeamId;
use serde::{Deserialize, Serialize};

use crate::collaborators::{store_series, store_standings, PersistenceSink};
use crate::config::LeagueConfig;
use crate::error::TournamentError;
use crate::group_stage::{GroupEntrant, GroupStage};
use crate::playoffs::PlayoffBracket;
use crate::schedule::{Fixture, MatchId, MatchIdAllocator};
use crate::series::{SeriesLedger, SeriesResult};
use crate::standings::{GroupId, StandingsTable};

/// Table id of the regular season
pub const SEASON_GROUP: GroupId = 1;

/// Where the league is
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaguePhase {
    RegularSeason,
    Playoffs,
    Completed,
}

/// A league season.
///
/// The playoffs are seeded from the final table and only exist once
/// the regular season is complete.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct League {
    pub config: LeagueConfig,
    pub name: String,
    pub season: GroupStage,
    pub playoffs: Option<PlayoffBracket>,
    pub ledger: SeriesLedger,
    ids: MatchIdAllocator,
}

impl League {
    /// Schedule the regular season
    pub fn new(
        config: LeagueConfig,
        name: &str,
        teams: Vec<GroupEntrant>,
        first_match_id: MatchId,
    ) -> Result<Self, TournamentError> {
        let mut ids = MatchIdAllocator::starting_at(first_match_id);
        let season = GroupStage::new(
            config.regular_season.clone(),
            vec![(SEASON_GROUP, name.to_string(), teams)],
            &mut ids,
        )?;

        tracing::info!(
            league = name,
            fixtures = season.pending_fixtures().len(),
            "regular season scheduled"
        );

        Ok(Self {
            config,
            name: name.to_string(),
            season,
            playoffs: None,
            ledger: SeriesLedger::new(),
            ids,
        })
    }

    pub fn phase(&self) -> LeaguePhase {
        match (&self.playoffs, self.season.is_complete()) {
            (_, false) => LeaguePhase::RegularSeason,
            (None, true) if self.config.playoffs.is_some() => LeaguePhase::Playoffs,
            (None, true) => LeaguePhase::Completed,
            (Some(bracket), true) if bracket.is_finished() => LeaguePhase::Completed,
            (Some(_), true) => LeaguePhase::Playoffs,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.phase() == LeaguePhase::Completed
    }

    /// The regular-season table
    pub fn table(&self) -> Option<&StandingsTable> {
        self.season.group(SEASON_GROUP).map(|g| &g.table)
    }

    /// Playoff champion, or the table leader when there are no playoffs
    pub fn champion(&self) -> Option<TeamId> {
        if !self.is_finished() {
            return None;
        }
        match &self.playoffs {
            Some(bracket) => bracket.champion(),
            None => self.table().and_then(|t| t.entries().first()).map(|e| e.team_id),
        }
    }

    pub fn pending_fixtures(&self) -> Vec<Fixture> {
        let mut fixtures = self.season.pending_fixtures();
        if let Some(bracket) = &self.playoffs {
            fixtures.extend(bracket.pending_fixtures());
        }
        fixtures.sort_by_key(|f| f.match_id);
        fixtures
    }

    pub fn is_pending(&self, match_id: MatchId) -> bool {
        self.season.is_pending(match_id) || self.playoffs.as_ref().map_or(false, |b| b.is_pending(match_id))
    }

    /// Apply a result, record it in the ledger and hand it to the sink
    pub fn apply(&mut self, result: SeriesResult, sink: &mut dyn PersistenceSink) -> Result<(), TournamentError> {
        let match_id = result.match_id;
        if self.is_finished() {
            return Err(TournamentError::AlreadyFinished);
        }
        if self.ledger.contains(match_id) {
            return Err(TournamentError::SeriesAlreadyApplied(match_id));
        }

        let table = if self.season.is_pending(match_id) {
            let group = self.season.apply(match_id, &result)?;
            Some((group.id, group.table.entries().to_vec()))
        } else {
            let bracket = self
                .playoffs
                .as_mut()
                .ok_or(TournamentError::UnknownMatch(match_id))?;
            bracket.apply(match_id, &result)?;
            None
        };

        let result = self.ledger.record(result)?;
        store_series(sink, match_id, result);
        if let Some((group_id, entries)) = table {
            store_standings(sink, group_id, &entries);
        }
        Ok(())
    }

    /// Seed the playoffs once the season is done, then move the bracket
    /// forward. Returns whether anything changed.
    pub fn advance(&mut self) -> Result<bool, TournamentError> {
        if !self.season.is_complete() {
            return self.season.advance(&mut self.ids);
        }

        if let Some(bracket) = self.playoffs.as_mut() {
            return bracket.advance(&mut self.ids);
        }
        let Some(playoff_config) = self.config.playoffs.clone() else {
            return Ok(false);
        };

        let seeds = self.table().map(StandingsTable::ranked_team_ids).unwrap_or_default();
        self.playoffs = Some(PlayoffBracket::new(playoff_config, &seeds, &mut self.ids)?);
        Ok(true)
    }
}
