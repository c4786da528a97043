//! Pharaoh's Tomb Game Engine
//!
//! Platform-agnostic core logic for the Pharaoh's Tomb escape room.
//! This crate provides the session state machine, room puzzles, scoring, the
//! countdown, and the leaderboard without UI or platform-specific dependencies.

pub mod clock;
pub mod config;
pub mod constants;
pub mod leaderboard;
pub mod room;
pub mod rooms;
#[cfg(feature = "async")]
pub mod runtime;
pub mod scoring;
pub mod session;
pub mod storage;
pub mod summary;
pub mod verify;

use log::warn;
use std::time::Duration;
use thiserror::Error;

// Re-export commonly used types
pub use clock::{Countdown, TickOutcome, format_clock};
pub use config::{ConfigError, SessionConfig};
pub use leaderboard::{Leaderboard, LeaderboardEntry, LeaderboardError, Standing};
pub use room::{PickError, RoomFlow, RoomStep};
pub use rooms::{RoomCatalog, RoomDef, RoomId, SelectionRule, SubmitMode, TokenDef};
#[cfg(feature = "async")]
pub use runtime::{Command, SessionHandle, SessionRunner};
pub use scoring::{FinalScore, FinalScoreInputs, ScoreCfg, final_score, score};
pub use session::{
    Action, PendingCompletion, Rejection, RunResult, Session, SessionEvent, SessionRules, Stage,
    sanitize_username,
};
pub use storage::{FileStorage, MemoryStorage, RecordStorage, StorageError};
pub use summary::{RunSummary, SessionView};
pub use verify::{Verdict, Verification, total_weight, verify, verify_prefix, verify_weight_sum};

use constants::LOG_STORAGE_TARGET;

/// Room input that never reached the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayError {
    #[error("no room is accepting input")]
    NoActiveRoom,
    #[error(transparent)]
    Pick(#[from] PickError),
}

/// What a room interaction did: the room's verdict plus any session events it
/// triggered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub step: RoomStep,
    pub events: Vec<SessionEvent>,
}

/// Main game engine binding one session to its rooms and leaderboard
pub struct GameEngine<S>
where
    S: RecordStorage,
{
    config: SessionConfig,
    catalog: RoomCatalog,
    leaderboard: Leaderboard<S>,
    session: Session,
    room: Option<RoomFlow>,
    standing: Option<Standing>,
}

impl<S> GameEngine<S>
where
    S: RecordStorage,
{
    /// Create an engine with the built-in tomb and default tuning.
    pub fn new(storage: S) -> Self {
        let config = SessionConfig::default();
        let catalog = RoomCatalog::default();
        Self::assemble(storage, config, catalog)
    }

    /// Create an engine with custom tuning and rooms.
    ///
    /// # Errors
    ///
    /// Returns an error if either the config or the catalog is invalid.
    pub fn with_config(
        storage: S,
        config: SessionConfig,
        catalog: RoomCatalog,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        catalog.validate()?;
        Ok(Self::assemble(storage, config, catalog))
    }

    fn assemble(storage: S, config: SessionConfig, catalog: RoomCatalog) -> Self {
        let leaderboard = Leaderboard::from_config(storage, &config);
        let session = Session::new(SessionRules::from(&config));
        Self {
            config,
            catalog,
            leaderboard,
            session,
            room: None,
            standing: None,
        }
    }

    /// Feed one action to the session, keep the active room in step with the
    /// stage, and persist the result when the run finishes.
    pub fn dispatch(&mut self, action: Action) -> Vec<SessionEvent> {
        let events = self.session.apply(action);
        self.sync_room();
        for event in &events {
            match event {
                SessionEvent::Finished(result) => self.persist(result),
                SessionEvent::Reset => self.standing = None,
                _ => {}
            }
        }
        events
    }

    fn sync_room(&mut self) {
        match self.session.stage().room() {
            Some(id) if self.room.as_ref().is_some_and(|room| room.id() == id) => {}
            Some(id) => self.room = self.catalog.room(id).cloned().map(RoomFlow::new),
            None => self.room = None,
        }
    }

    fn persist(&mut self, result: &RunResult) {
        let entry = LeaderboardEntry::new(
            result.username.clone(),
            result.score.total,
            result.remaining_seconds,
        );
        match self.leaderboard.record(entry) {
            Ok(standing) => self.standing = Some(standing),
            Err(err) => warn!(target: LOG_STORAGE_TARGET, "run not saved: {err}"),
        }
    }

    fn play(
        &mut self,
        input: impl FnOnce(&mut RoomFlow, &Session) -> Result<RoomStep, PickError>,
    ) -> Result<Turn, PlayError> {
        let room = self.room.as_mut().ok_or(PlayError::NoActiveRoom)?;
        let step = input(room, &self.session)?;
        let events = room
            .signal(step)
            .map(|action| self.dispatch(action))
            .unwrap_or_default();
        Ok(Turn { step, events })
    }

    /// Place a token in the active room.
    ///
    /// # Errors
    ///
    /// Returns an error if no room is active or the room refuses the pick.
    pub fn pick(&mut self, token: &str) -> Result<Turn, PlayError> {
        self.play(|room, session| room.add_pick(token, session))
    }

    /// Take a token back off the active room's selection.
    ///
    /// # Errors
    ///
    /// Returns an error if no room is active or the room refuses the removal.
    pub fn unpick(&mut self, token: &str) -> Result<(), PlayError> {
        let room = self.room.as_mut().ok_or(PlayError::NoActiveRoom)?;
        room.remove_pick(token, &self.session)?;
        Ok(())
    }

    /// Submit the active room's selection.
    ///
    /// # Errors
    ///
    /// Returns an error if no room is active or the room refuses the submission.
    pub fn submit(&mut self) -> Result<Turn, PlayError> {
        self.play(|room, session| room.submit(session))
    }

    /// Show or hide the active room's hint. Returns the new visibility.
    ///
    /// # Errors
    ///
    /// Returns an error if no room is active.
    pub fn toggle_hint(&mut self) -> Result<bool, PlayError> {
        let room = self.room.as_mut().ok_or(PlayError::NoActiveRoom)?;
        Ok(room.toggle_hint())
    }

    /// Empty the active room's selection without recording an attempt.
    ///
    /// # Errors
    ///
    /// Returns an error if no room is active.
    pub fn clear_room(&mut self) -> Result<(), PlayError> {
        let room = self.room.as_mut().ok_or(PlayError::NoActiveRoom)?;
        room.clear();
        Ok(())
    }

    /// Presentation pause owed before the pending room may complete.
    #[must_use]
    pub fn completion_delay(&self) -> Option<Duration> {
        let pending = self.session.pending()?;
        let def = self.catalog.room(pending.room)?;
        Some(Duration::from_millis(def.completion_delay_millis))
    }

    /// Complete the pending room right away, skipping the presentation pause.
    pub fn complete_pending(&mut self) -> Vec<SessionEvent> {
        match self.session.pending() {
            Some(pending) => self.dispatch(Action::CompleteRoom { room: pending.room }),
            None => Vec::new(),
        }
    }

    #[must_use]
    pub fn view(&self) -> SessionView {
        SessionView::of(&self.session, self.config.urgent_threshold_secs)
    }

    #[must_use]
    pub fn summary(&self) -> Option<RunSummary> {
        RunSummary::of(&self.session)
    }

    /// Current leaderboard, best first.
    #[must_use]
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        self.leaderboard.load()
    }

    /// Where the last finished run landed, until the next reset.
    #[must_use]
    pub const fn standing(&self) -> Option<&Standing> {
        self.standing.as_ref()
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub const fn room(&self) -> Option<&RoomFlow> {
        self.room.as_ref()
    }

    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub const fn catalog(&self) -> &RoomCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        self.leaderboard.storage()
    }
}
