//! Session tuning with serde defaults and validation.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    LEADERBOARD_CAPACITY, LEADERBOARD_KEY, MAX_NAME_LEN, PERFECTION_BONUS, TICK_MILLIS,
    TIME_BONUS_PER_SECOND, TIME_LIMIT_SECS, URGENT_THRESHOLD_SECS,
};
use crate::rooms::RoomId;

/// Errors raised when session or room configuration invariants are violated.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("urgent threshold {threshold}s exceeds time limit {limit}s")]
    UrgentThreshold { threshold: u32, limit: u32 },
    #[error("expected {expected} rooms, found {found}")]
    RoomCount { expected: usize, found: usize },
    #[error("room slot {index} must be {expected}, found {found}")]
    RoomOrder {
        index: usize,
        expected: RoomId,
        found: RoomId,
    },
    #[error("room {room} has no selectable tokens")]
    NoTokens { room: RoomId },
    #[error("room {room} lists token '{token}' twice")]
    DuplicateToken { room: RoomId, token: String },
    #[error("room {room} solution uses unknown token '{token}'")]
    UnknownSolutionToken { room: RoomId, token: String },
    #[error("room {room} solution repeats '{token}' but repeats are not allowed")]
    RepeatedSolutionToken { room: RoomId, token: String },
    #[error("room {room} allows {max_picks} picks but its solution has {solution_len}")]
    SelectionLength {
        room: RoomId,
        max_picks: usize,
        solution_len: usize,
    },
    #[error("room {room} floor {floor} exceeds base {base}")]
    FloorExceedsBase { room: RoomId, floor: u32, base: u32 },
    #[error("invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Session-wide tuning. Every field falls back to the built-in constant when
/// missing from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "SessionConfig::default_time_limit_secs")]
    pub time_limit_secs: u32,
    #[serde(default = "SessionConfig::default_time_bonus_per_second")]
    pub time_bonus_per_second: u32,
    #[serde(default = "SessionConfig::default_perfection_bonus")]
    pub perfection_bonus: u32,
    #[serde(default = "SessionConfig::default_max_name_len")]
    pub max_name_len: usize,
    #[serde(default = "SessionConfig::default_leaderboard_capacity")]
    pub leaderboard_capacity: usize,
    #[serde(default = "SessionConfig::default_leaderboard_key")]
    pub leaderboard_key: String,
    /// Clock turns urgent at or below this many seconds. When omitted it
    /// defaults to 120, capped at `time_limit_secs`.
    #[serde(default = "SessionConfig::default_urgent_threshold_secs")]
    pub urgent_threshold_secs: u32,
    /// Real-time length of one clock second; shortened by the test harness.
    #[serde(default = "SessionConfig::default_tick_millis")]
    pub tick_millis: u64,
}

impl SessionConfig {
    const fn default_time_limit_secs() -> u32 {
        TIME_LIMIT_SECS
    }

    const fn default_time_bonus_per_second() -> u32 {
        TIME_BONUS_PER_SECOND
    }

    const fn default_perfection_bonus() -> u32 {
        PERFECTION_BONUS
    }

    const fn default_max_name_len() -> usize {
        MAX_NAME_LEN
    }

    const fn default_leaderboard_capacity() -> usize {
        LEADERBOARD_CAPACITY
    }

    fn default_leaderboard_key() -> String {
        LEADERBOARD_KEY.to_string()
    }

    const fn default_urgent_threshold_secs() -> u32 {
        URGENT_THRESHOLD_SECS
    }

    const fn default_tick_millis() -> u64 {
        TICK_MILLIS
    }

    /// Parse and validate a configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a value is out of range.
    /// A threshold left to its default is capped at the time limit; one set
    /// explicitly above the limit is an error.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let explicit_threshold = value.get("urgent_threshold_secs").is_some();
        let mut cfg: Self = serde_json::from_value(value)?;
        if !explicit_threshold {
            cfg.urgent_threshold_secs = cfg.urgent_threshold_secs.min(cfg.time_limit_secs);
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check the invariants the session relies on.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.time_limit_secs == 0 {
            return Err(ConfigError::Zero {
                field: "time_limit_secs",
            });
        }
        if self.max_name_len == 0 {
            return Err(ConfigError::Zero {
                field: "max_name_len",
            });
        }
        if self.leaderboard_capacity == 0 {
            return Err(ConfigError::Zero {
                field: "leaderboard_capacity",
            });
        }
        if self.tick_millis == 0 {
            return Err(ConfigError::Zero {
                field: "tick_millis",
            });
        }
        if self.urgent_threshold_secs > self.time_limit_secs {
            return Err(ConfigError::UrgentThreshold {
                threshold: self.urgent_threshold_secs,
                limit: self.time_limit_secs,
            });
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            time_limit_secs: Self::default_time_limit_secs(),
            time_bonus_per_second: Self::default_time_bonus_per_second(),
            perfection_bonus: Self::default_perfection_bonus(),
            max_name_len: Self::default_max_name_len(),
            leaderboard_capacity: Self::default_leaderboard_capacity(),
            leaderboard_key: Self::default_leaderboard_key(),
            urgent_threshold_secs: Self::default_urgent_threshold_secs(),
            tick_millis: Self::default_tick_millis(),
        }
    }
}
