//! Static room definitions for the tomb.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;
use crate::constants::{
    COMPLETION_DELAY_MILLIS, FINAL_COMPLETION_DELAY_MILLIS, SCALE_TARGET_WEIGHT,
};
use crate::scoring::ScoreCfg;
use crate::verify::Verification;

/// The five rooms, in the order a run visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomId {
    Cartouche,
    Torches,
    Scale,
    Constellation,
    Sarcophagus,
}

impl RoomId {
    pub const ALL: [Self; 5] = [
        Self::Cartouche,
        Self::Torches,
        Self::Scale,
        Self::Constellation,
        Self::Sarcophagus,
    ];

    #[must_use]
    pub const fn first() -> Self {
        Self::Cartouche
    }

    /// The room that follows this one, `None` after the sarcophagus.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Cartouche => Some(Self::Torches),
            Self::Torches => Some(Self::Scale),
            Self::Scale => Some(Self::Constellation),
            Self::Constellation => Some(Self::Sarcophagus),
            Self::Sarcophagus => None,
        }
    }

    #[must_use]
    pub const fn is_last(self) -> bool {
        self.next().is_none()
    }

    /// One-based room number.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::Cartouche => 1,
            Self::Torches => 2,
            Self::Scale => 3,
            Self::Constellation => 4,
            Self::Sarcophagus => 5,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cartouche => "cartouche",
            Self::Torches => "torches",
            Self::Scale => "scale",
            Self::Constellation => "constellation",
            Self::Sarcophagus => "sarcophagus",
        }
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoomId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cartouche" | "room1" => Ok(Self::Cartouche),
            "torches" | "room2" => Ok(Self::Torches),
            "scale" | "room3" => Ok(Self::Scale),
            "constellation" | "room4" => Ok(Self::Constellation),
            "sarcophagus" | "room5" => Ok(Self::Sarcophagus),
            _ => Err(()),
        }
    }
}

/// A token the player can place in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDef {
    pub id: String,
    /// Weight on the balance scale; zero in rooms that ignore weights.
    #[serde(default)]
    pub weight: i32,
}

impl TokenDef {
    fn plain(id: &str) -> Self {
        Self {
            id: id.to_string(),
            weight: 0,
        }
    }

    fn weighted(id: &str, weight: i32) -> Self {
        Self {
            id: id.to_string(),
            weight,
        }
    }
}

/// How a submission is triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubmitMode {
    /// Checked after every pick; complete once the selection is full.
    #[default]
    Auto,
    /// Checked only when the player asks.
    Explicit,
}

/// Constraints on the in-progress selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRule {
    pub max_picks: usize,
    #[serde(default)]
    pub allow_repeats: bool,
    #[serde(default)]
    pub submit: SubmitMode,
    /// Whether a wrong submission empties the selection.
    #[serde(default = "SelectionRule::default_reset_on_failure")]
    pub reset_on_failure: bool,
}

impl SelectionRule {
    const fn default_reset_on_failure() -> bool {
        true
    }
}

/// Immutable definition of one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDef {
    pub id: RoomId,
    pub title: String,
    pub tokens: Vec<TokenDef>,
    pub verification: Verification,
    pub selection: SelectionRule,
    #[serde(default)]
    pub scoring: ScoreCfg,
    #[serde(default = "RoomDef::default_completion_delay_millis")]
    pub completion_delay_millis: u64,
}

impl RoomDef {
    const fn default_completion_delay_millis() -> u64 {
        COMPLETION_DELAY_MILLIS
    }

    #[must_use]
    pub fn token(&self, id: &str) -> Option<&TokenDef> {
        self.tokens.iter().find(|token| token.id == id)
    }

    #[must_use]
    pub fn weight_of(&self, id: &str) -> Option<i32> {
        self.token(id).map(|token| token.weight)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let room = self.id;
        if self.tokens.is_empty() {
            return Err(ConfigError::NoTokens { room });
        }
        let mut seen = HashSet::new();
        for token in &self.tokens {
            if !seen.insert(token.id.as_str()) {
                return Err(ConfigError::DuplicateToken {
                    room,
                    token: token.id.clone(),
                });
            }
        }
        if self.selection.max_picks == 0 {
            return Err(ConfigError::Zero {
                field: "selection.max_picks",
            });
        }
        if let Verification::Positional { solution } = &self.verification {
            if solution.len() != self.selection.max_picks {
                return Err(ConfigError::SelectionLength {
                    room,
                    max_picks: self.selection.max_picks,
                    solution_len: solution.len(),
                });
            }
            let mut used = HashSet::new();
            for token in solution {
                if self.token(token).is_none() {
                    return Err(ConfigError::UnknownSolutionToken {
                        room,
                        token: token.clone(),
                    });
                }
                if !used.insert(token.as_str()) && !self.selection.allow_repeats {
                    return Err(ConfigError::RepeatedSolutionToken {
                        room,
                        token: token.clone(),
                    });
                }
            }
        }
        if self.scoring.floor > self.scoring.base {
            return Err(ConfigError::FloorExceedsBase {
                room,
                floor: self.scoring.floor,
                base: self.scoring.base,
            });
        }
        Ok(())
    }
}

fn positional(solution: &[&str]) -> Verification {
    Verification::Positional {
        solution: solution.iter().map(|s| (*s).to_string()).collect(),
    }
}

const fn auto_rule(max_picks: usize, allow_repeats: bool) -> SelectionRule {
    SelectionRule {
        max_picks,
        allow_repeats,
        submit: SubmitMode::Auto,
        reset_on_failure: true,
    }
}

/// The ordered set of rooms a run walks through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomCatalog {
    pub rooms: Vec<RoomDef>,
}

impl RoomCatalog {
    /// Parse and validate a catalog document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the rooms are inconsistent.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Check room order and per-room consistency.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rooms.len() != RoomId::ALL.len() {
            return Err(ConfigError::RoomCount {
                expected: RoomId::ALL.len(),
                found: self.rooms.len(),
            });
        }
        for (index, (room, expected)) in self.rooms.iter().zip(RoomId::ALL).enumerate() {
            if room.id != expected {
                return Err(ConfigError::RoomOrder {
                    index,
                    expected,
                    found: room.id,
                });
            }
            room.validate()?;
        }
        Ok(())
    }

    /// Look up a room definition. Always `Some` for a validated catalog.
    #[must_use]
    pub fn room(&self, id: RoomId) -> Option<&RoomDef> {
        self.rooms.iter().find(|room| room.id == id)
    }

    /// Highest score a run could reach before the time bonus.
    #[must_use]
    pub fn max_room_points(&self) -> u32 {
        self.rooms.iter().map(|room| room.scoring.base).sum()
    }
}

impl Default for RoomCatalog {
    fn default() -> Self {
        let cartouche = RoomDef {
            id: RoomId::Cartouche,
            title: "The Cartouche Cipher".to_string(),
            tokens: ["river", "desert", "eye", "ankh", "scarab", "crown"]
                .into_iter()
                .map(TokenDef::plain)
                .collect(),
            verification: positional(&["river", "desert", "eye", "ankh", "ankh", "crown"]),
            selection: auto_rule(6, true),
            scoring: ScoreCfg::standard(),
            completion_delay_millis: COMPLETION_DELAY_MILLIS,
        };
        let torches = RoomDef {
            id: RoomId::Torches,
            title: "The Hall of Torches".to_string(),
            tokens: ["east", "south", "west", "north"]
                .into_iter()
                .map(TokenDef::plain)
                .collect(),
            verification: positional(&["east", "south", "west", "north"]),
            selection: auto_rule(4, false),
            scoring: ScoreCfg::standard(),
            completion_delay_millis: COMPLETION_DELAY_MILLIS,
        };
        let scale_tokens = vec![
            TokenDef::weighted("feather", 1),
            TokenDef::weighted("scarab", 3),
            TokenDef::weighted("crook", 5),
            TokenDef::weighted("flail", 4),
            TokenDef::weighted("serpent", 6),
            TokenDef::weighted("lotus", 2),
        ];
        let scale = RoomDef {
            id: RoomId::Scale,
            title: "The Scale of Ma'at".to_string(),
            selection: SelectionRule {
                max_picks: scale_tokens.len(),
                allow_repeats: false,
                submit: SubmitMode::Explicit,
                reset_on_failure: false,
            },
            tokens: scale_tokens,
            verification: Verification::WeightSum {
                target: SCALE_TARGET_WEIGHT,
            },
            scoring: ScoreCfg::standard(),
            completion_delay_millis: COMPLETION_DELAY_MILLIS,
        };
        let constellation = RoomDef {
            id: RoomId::Constellation,
            title: "The Star Chamber".to_string(),
            tokens: ["orion", "eridanus", "taurus", "sirius", "draco"]
                .into_iter()
                .map(TokenDef::plain)
                .collect(),
            verification: positional(&["orion", "eridanus", "taurus"]),
            selection: auto_rule(3, false),
            scoring: ScoreCfg::standard(),
            completion_delay_millis: COMPLETION_DELAY_MILLIS,
        };
        let sarcophagus = RoomDef {
            id: RoomId::Sarcophagus,
            title: "The Sarcophagus of Khamet-Ren".to_string(),
            tokens: ["dusk", "midnight", "dawn", "zenith", "rebirth"]
                .into_iter()
                .map(TokenDef::plain)
                .collect(),
            verification: positional(&["dusk", "midnight", "dawn", "zenith", "rebirth"]),
            selection: auto_rule(5, false),
            scoring: ScoreCfg::final_room(),
            completion_delay_millis: FINAL_COMPLETION_DELAY_MILLIS,
        };
        Self {
            rooms: vec![cartouche, torches, scale, constellation, sarcophagus],
        }
    }
}
