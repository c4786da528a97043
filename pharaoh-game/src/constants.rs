//! Centralized balance and tuning constants for the tomb session.
//!
//! These values define the scoring math and timing of a run. `SessionConfig`
//! and `RoomCatalog` default to them; overrides go through those types.

// Session timing -----------------------------------------------------------
pub(crate) const TIME_LIMIT_SECS: u32 = 600;
pub(crate) const TICK_MILLIS: u64 = 1_000;
pub(crate) const URGENT_THRESHOLD_SECS: u32 = 120;

// Final score --------------------------------------------------------------
pub(crate) const TIME_BONUS_PER_SECOND: u32 = 2;
pub(crate) const PERFECTION_BONUS: u32 = 2_000;

// Player identity ----------------------------------------------------------
pub(crate) const MAX_NAME_LEN: usize = 20;

// Leaderboard --------------------------------------------------------------
pub(crate) const LEADERBOARD_CAPACITY: usize = 10;
pub(crate) const LEADERBOARD_KEY: &str = "pharaoh-leaderboard";

// Room scoring -------------------------------------------------------------
pub(crate) const ROOM_BASE_POINTS: u32 = 1_000;
pub(crate) const ROOM_HINT_PENALTY: u32 = 200;
pub(crate) const ROOM_ATTEMPT_PENALTY: u32 = 100;
pub(crate) const ROOM_FLOOR_POINTS: u32 = 100;
pub(crate) const FINAL_ROOM_BASE_POINTS: u32 = 1_500;
pub(crate) const FINAL_ROOM_HINT_PENALTY: u32 = 300;
pub(crate) const FINAL_ROOM_ATTEMPT_PENALTY: u32 = 150;
pub(crate) const FINAL_ROOM_FLOOR_POINTS: u32 = 200;

// Presentation pauses ------------------------------------------------------
pub(crate) const COMPLETION_DELAY_MILLIS: u64 = 1_500;
pub(crate) const FINAL_COMPLETION_DELAY_MILLIS: u64 = 2_000;

// Balance scale ------------------------------------------------------------
/// Weight of the moon counterweight on the right pan.
pub(crate) const SCALE_TARGET_WEIGHT: i32 = 3;

// Logging keys -------------------------------------------------------------
pub(crate) const LOG_TARGET: &str = "pharaoh::session";
pub(crate) const LOG_STORAGE_TARGET: &str = "pharaoh::storage";
