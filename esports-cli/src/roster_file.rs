//! Roster files - regions, their teams and the players they field
//!
//! ```json
//! { "regions": [ { "id": 1, "name": "North", "teams": [
//!     { "id": 101, "name": "Frost", "seed": 1, "players": [ ... ] } ] } ] }
//! ```

use std::path::Path;

use anyhow::{bail, Context, Result};
use esports_core::{PlayerAttributes, TeamId, TeamRoster};
use esports_tournament::{GroupEntrant, Region, RegionId, RosterBook, SeededTeam};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RosterFile {
    pub regions: Vec<RegionEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegionEntry {
    pub id: RegionId,
    pub name: String,
    pub teams: Vec<TeamEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TeamEntry {
    pub id: TeamId,
    pub name: String,
    /// Region seed, for teams sent to the region tournament
    #[serde(default)]
    pub seed: Option<u8>,
    pub players: Vec<PlayerAttributes>,
}

impl TeamEntry {
    pub fn roster(&self) -> TeamRoster {
        TeamRoster::new(self.id, &self.name, self.players.clone())
    }
}

impl RegionEntry {
    /// Every team of the region as a league entrant
    pub fn entrants(&self) -> Vec<GroupEntrant> {
        self.teams
            .iter()
            .map(|t| GroupEntrant {
                team_id: t.id,
                name: t.name.clone(),
            })
            .collect()
    }

    /// The region with only its seeded teams
    pub fn seeded(&self) -> Region {
        Region {
            id: self.id,
            name: self.name.clone(),
            teams: self
                .teams
                .iter()
                .filter_map(|t| {
                    t.seed.map(|seed| SeededTeam {
                        team_id: t.id,
                        name: t.name.clone(),
                        seed,
                    })
                })
                .collect(),
        }
    }
}

impl RosterFile {
    /// Rosters of every team in the file
    pub fn roster_book(&self) -> RosterBook {
        self.teams().map(TeamEntry::roster).collect()
    }

    pub fn teams(&self) -> impl Iterator<Item = &TeamEntry> {
        self.regions.iter().flat_map(|r| r.teams.iter())
    }

    /// Region by id or by name (case-insensitive)
    pub fn find_region(&self, key: &str) -> Option<&RegionEntry> {
        let id = key.parse::<RegionId>().ok();
        self.regions
            .iter()
            .find(|r| Some(r.id) == id || r.name.eq_ignore_ascii_case(key))
    }

    /// Team by id or by name (case-insensitive)
    pub fn find_team(&self, key: &str) -> Option<&TeamEntry> {
        let id = key.parse::<TeamId>().ok();
        self.teams()
            .find(|t| Some(t.id) == id || t.name.eq_ignore_ascii_case(key))
    }

    pub fn seeded_regions(&self) -> Vec<Region> {
        self.regions.iter().map(RegionEntry::seeded).collect()
    }

    fn validate(&self) -> Result<()> {
        let mut seen = std::collections::BTreeSet::new();
        for team in self.teams() {
            if !seen.insert(team.id) {
                bail!("Duplicate team id {} ({})", team.id, team.name);
            }
            let roster = team.roster();
            if !roster.is_complete() {
                tracing::warn!(
                    team = %team.name,
                    players = team.players.len(),
                    "roster does not field one player per role"
                );
            }
        }
        Ok(())
    }
}

/// Load and check a roster file
pub fn load_roster_file(path: &Path) -> Result<RosterFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read roster file: {}", path.display()))?;
    let file = parse_roster_file(&content).with_context(|| format!("Invalid roster file: {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        regions = file.regions.len(),
        teams = file.teams().count(),
        "loaded rosters"
    );
    Ok(file)
}

fn parse_roster_file(content: &str) -> Result<RosterFile> {
    let file: RosterFile = serde_json::from_str(content)?;
    file.validate()?;
    Ok(file)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use esports_core::Role;

    fn player_json(id: u64, role: Role) -> String {
        format!(
            r#"{{ "id": {}, "name": "P{}", "role": "{}", "ability": 70, "stability": 75, "age": 22 }}"#,
            id, id, role
        )
    }

    fn team_json(id: u64, seed: Option<u8>) -> String {
        let players: Vec<String> = Role::ALL
            .iter()
            .enumerate()
            .map(|(i, &role)| player_json(id * 10 + i as u64, role))
            .collect();
        let seed = seed.map_or(String::new(), |s| format!(r#""seed": {},"#, s));
        format!(
            r#"{{ "id": {}, "name": "Team {}", {} "players": [{}] }}"#,
            id,
            id,
            seed,
            players.join(",")
        )
    }

    /// Two regions of five teams, first four seeded
    pub(crate) fn sample_file() -> RosterFile {
        let region = |id: u64| {
            let teams: Vec<String> = (1..=5)
                .map(|i| team_json(id * 100 + i, if i <= 4 { Some(i as u8) } else { None }))
                .collect();
            format!(r#"{{ "id": {}, "name": "Region {}", "teams": [{}] }}"#, id, id, teams.join(","))
        };
        parse_roster_file(&format!(r#"{{ "regions": [{}, {}] }}"#, region(1), region(2))).unwrap()
    }

    #[test]
    fn test_parse_sample() {
        let file = sample_file();
        assert_eq!(file.regions.len(), 2);
        assert_eq!(file.teams().count(), 10);
        assert_eq!(file.roster_book().len(), 10);
        assert!(file.teams().all(|t| t.roster().is_complete()));
    }

    #[test]
    fn test_seeded_region_drops_unseeded_teams() {
        let file = sample_file();
        let region = file.regions[0].seeded();
        assert_eq!(region.teams.len(), 4);
        assert_eq!(region.seeded(1).map(|t| t.team_id), Some(101));
        assert_eq!(file.regions[0].entrants().len(), 5);
    }

    #[test]
    fn test_lookup_by_id_or_name() {
        let file = sample_file();
        assert_eq!(file.find_region("2").map(|r| r.id), Some(2));
        assert_eq!(file.find_region("region 1").map(|r| r.id), Some(1));
        assert_eq!(file.find_team("Team 203").map(|t| t.id), Some(203));
        assert_eq!(file.find_team("105").map(|t| t.name.as_str()), Some("Team 105"));
        assert!(file.find_team("nobody").is_none());
    }

    #[test]
    fn test_duplicate_team_ids_rejected() {
        let json = format!(
            r#"{{ "regions": [{{ "id": 1, "name": "R", "teams": [{}, {}] }}] }}"#,
            team_json(7, None),
            team_json(7, None)
        );
        assert!(parse_roster_file(&json).is_err());
    }
}
