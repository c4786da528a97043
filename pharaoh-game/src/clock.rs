//! One-second countdown that ends the run at zero.
use serde::{Deserialize, Serialize};

/// Result of a single clock tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickOutcome {
    /// Clock not running (never started, paused, stopped, or already expired).
    Idle,
    /// One second elapsed; carries the seconds left.
    Running(u32),
    /// The last second elapsed. Reported exactly once.
    Expired,
}

/// Countdown state. Ticks only count while `running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Countdown {
    remaining: u32,
    running: bool,
    expired: bool,
}

impl Countdown {
    /// A stopped clock holding `limit` seconds.
    #[must_use]
    pub const fn new(limit: u32) -> Self {
        Self {
            remaining: limit,
            running: false,
            expired: false,
        }
    }

    /// Reset to `limit` and start counting.
    pub const fn start(&mut self, limit: u32) {
        self.remaining = limit;
        self.expired = false;
        self.running = limit > 0;
    }

    /// Freeze the remaining time; `resume` continues from it.
    pub const fn pause(&mut self) {
        self.running = false;
    }

    pub const fn resume(&mut self) {
        if !self.expired && self.remaining > 0 {
            self.running = true;
        }
    }

    /// Stop for good. Idempotent; later ticks are `Idle`.
    pub const fn stop(&mut self) {
        self.running = false;
    }

    pub fn tick(&mut self) -> TickOutcome {
        if !self.running {
            return TickOutcome::Idle;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.running = false;
            self.expired = true;
            TickOutcome::Expired
        } else {
            TickOutcome::Running(self.remaining)
        }
    }

    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub const fn is_expired(&self) -> bool {
        self.expired
    }
}

/// Render seconds as `mm:ss`.
#[must_use]
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
