//! Player attributes and team rosters

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Stable player identifier
pub type PlayerId = u64;

/// Stable team identifier
pub type TeamId = u64;

/// Number of players a team fields in every game
pub const ROSTER_SIZE: usize = 5;

/// The five fixed in-game roles
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Top,
    Jungle,
    Mid,
    Adc,
    Support,
}

impl Role {
    /// All roles in lineup order
    pub const ALL: [Role; ROSTER_SIZE] = [Role::Top, Role::Jungle, Role::Mid, Role::Adc, Role::Support];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Top => "top",
            Role::Jungle => "jungle",
            Role::Mid => "mid",
            Role::Adc => "adc",
            Role::Support => "support",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static attributes of one player, as supplied by the roster owner.
///
/// Immutable for the duration of a simulation call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerAttributes {
    pub id: PlayerId,
    pub name: String,
    pub role: Role,
    /// Base ability, 0-100
    pub ability: u8,
    /// Stability, 0-100; higher means less game-to-game variance
    pub stability: u8,
    /// Transient form bonus (small signed integer)
    #[serde(default)]
    pub condition: i8,
    pub age: u8,
}

impl PlayerAttributes {
    pub fn new(id: PlayerId, name: &str, role: Role, ability: u8, stability: u8) -> Self {
        Self {
            id,
            name: name.to_string(),
            role,
            ability: ability.min(100),
            stability: stability.min(100),
            condition: 0,
            age: 24,
        }
    }

    pub fn with_condition(mut self, condition: i8) -> Self {
        self.condition = condition;
        self
    }

    pub fn with_age(mut self, age: u8) -> Self {
        self.age = age;
        self
    }
}

/// A team and the players it fields
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeamRoster {
    pub team_id: TeamId,
    pub team_name: String,
    pub players: Vec<PlayerAttributes>,
}

impl TeamRoster {
    pub fn new(team_id: TeamId, team_name: &str, players: Vec<PlayerAttributes>) -> Self {
        Self {
            team_id,
            team_name: team_name.to_string(),
            players,
        }
    }

    /// True when the roster has exactly one player per role
    pub fn is_complete(&self) -> bool {
        self.players.len() == ROSTER_SIZE
            && Role::ALL
                .iter()
                .all(|role| self.players.iter().filter(|p| p.role == *role).count() == 1)
    }

    /// Mean base ability (0 for an empty roster)
    pub fn average_ability(&self) -> f64 {
        if self.players.is_empty() {
            return 0.0;
        }
        let total: u32 = self.players.iter().map(|p| p.ability as u32).sum();
        total as f64 / self.players.len() as f64
    }

    /// Player in a given role, if present
    pub fn player_for(&self, role: Role) -> Option<&PlayerAttributes> {
        self.players.iter().find(|p| p.role == role)
    }
}

// ============================================================================
// Age curves
// ============================================================================

/// Baseline stability for a player of the given age.
///
/// Young players swing more; veterans are steadier.
pub fn base_stability_for_age(age: u8) -> u8 {
    let age = age as u32;
    let value = match age {
        0..=17 => 55,
        18..=24 => 60 + ((age - 18) * 5) / 2,
        25..=29 => 75 + (age - 25) * 2,
        30..=36 => 85 + ((age - 30) * 3) / 2,
        _ => 95,
    };
    value as u8
}

/// Inclusive range of match-day condition bonuses for an age
pub fn condition_range(age: u8) -> (i8, i8) {
    match age {
        0..=24 => (-5, 8),
        25..=29 => (-3, 3),
        _ => (0, 2),
    }
}

/// Roll a fresh condition bonus for a player of the given age
pub fn roll_condition<R: Rng + ?Sized>(age: u8, rng: &mut R) -> i8 {
    let (min, max) = condition_range(age);
    rng.gen_range(min..=max)
}
