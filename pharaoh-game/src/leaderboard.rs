//! Persisted top-N list of finished runs.
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SessionConfig;
use crate::constants::LOG_STORAGE_TARGET;
use crate::storage::RecordStorage;

/// One finished run as stored under the leaderboard key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: u32,
    pub time_remaining: u32,
    pub date: DateTime<Utc>,
}

impl LeaderboardEntry {
    #[must_use]
    pub fn new(name: impl Into<String>, score: u32, time_remaining: u32) -> Self {
        Self {
            name: name.into(),
            score,
            time_remaining,
            date: Utc::now(),
        }
    }

    /// Whether this row belongs to the run that just ended.
    #[must_use]
    pub fn is_current(&self, name: &str, score: u32) -> bool {
        self.name == name && self.score == score
    }
}

#[derive(Debug, Error)]
pub enum LeaderboardError<E>
where
    E: std::error::Error + 'static,
{
    #[error("leaderboard storage failed: {0}")]
    Storage(#[source] E),
    #[error("leaderboard could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result of recording a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    pub entries: Vec<LeaderboardEntry>,
    /// Zero-based rank of the recorded run, `None` if it did not make the cut.
    pub rank: Option<usize>,
}

/// Sorts descending by score. The sort is stable so ties keep the order in
/// which they were recorded.
fn rank_entries(entries: &mut Vec<LeaderboardEntry>, capacity: usize) {
    entries.sort_by(|a, b| b.score.cmp(&a.score));
    entries.truncate(capacity);
}

/// Leaderboard bound to a storage backend and key.
#[derive(Debug, Clone)]
pub struct Leaderboard<S> {
    storage: S,
    key: String,
    capacity: usize,
}

impl<S: RecordStorage> Leaderboard<S> {
    pub fn new(storage: S, key: impl Into<String>, capacity: usize) -> Self {
        Self {
            storage,
            key: key.into(),
            capacity,
        }
    }

    pub fn from_config(storage: S, config: &SessionConfig) -> Self {
        Self::new(
            storage,
            config.leaderboard_key.clone(),
            config.leaderboard_capacity,
        )
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stored entries, best first. Missing, unreadable, or malformed data
    /// reads as an empty board.
    pub fn load(&self) -> Vec<LeaderboardEntry> {
        let raw = match self.storage.read(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(target: LOG_STORAGE_TARGET, "could not read '{}': {err}", self.key);
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<LeaderboardEntry>>(&raw) {
            Ok(mut entries) => {
                rank_entries(&mut entries, self.capacity);
                entries
            }
            Err(err) => {
                warn!(target: LOG_STORAGE_TARGET, "ignoring malformed '{}': {err}", self.key);
                Vec::new()
            }
        }
    }

    /// Overwrite the stored list.
    ///
    /// # Errors
    ///
    /// Returns an error if the list cannot be encoded or written.
    pub fn save(&self, entries: &[LeaderboardEntry]) -> Result<(), LeaderboardError<S::Error>> {
        let json = serde_json::to_string(entries)?;
        self.storage
            .write(&self.key, &json)
            .map_err(LeaderboardError::Storage)
    }

    /// Insert `entry`, keep the best `capacity` runs, and persist the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the updated list cannot be written.
    pub fn record(&self, entry: LeaderboardEntry) -> Result<Standing, LeaderboardError<S::Error>> {
        let mut entries = self.load();
        entries.push(entry.clone());
        rank_entries(&mut entries, self.capacity);
        self.save(&entries)?;
        let rank = entries.iter().position(|e| *e == entry);
        info!(
            target: LOG_STORAGE_TARGET,
            "recorded {} for '{}' (rank {})",
            entry.score,
            entry.name,
            rank.map_or_else(|| "-".to_string(), |r| (r + 1).to_string())
        );
        Ok(Standing { entries, rank })
    }

    /// Drop every stored entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be removed.
    pub fn clear(&self) -> Result<(), LeaderboardError<S::Error>> {
        self.storage
            .remove(&self.key)
            .map_err(LeaderboardError::Storage)
    }
}
