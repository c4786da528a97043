//! Session aggregate and the reducer that drives it.
//!
//! Every change to a run goes through [`Session::apply`]. Actions that do not
//! fit the current stage leave the session untouched and come back as a
//! [`SessionEvent::Rejected`] so callers can log them; nothing here is an
//! error.
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::clock::{Countdown, TickOutcome};
use crate::config::SessionConfig;
use crate::constants::LOG_TARGET;
use crate::rooms::RoomId;
use crate::scoring::{FinalScore, FinalScoreInputs, final_score};

/// Where the run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Username,
    Intro,
    Room(RoomId),
    Ending,
    Failed,
}

impl Stage {
    #[must_use]
    pub const fn room(self) -> Option<RoomId> {
        match self {
            Self::Room(room) => Some(room),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_gameplay(self) -> bool {
        matches!(self, Self::Room(_))
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ending | Self::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Username => f.write_str("username"),
            Self::Intro => f.write_str("intro"),
            Self::Room(room) => write!(f, "room{}", room.number()),
            Self::Ending => f.write_str("ending"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// Input to the session reducer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Raw text from the name field.
    SubmitName(String),
    /// Leave the intro and start the clock.
    Start,
    /// A wrong submission in `room`.
    RecordAttempt(RoomId),
    /// A correct submission in `room`; the clock freezes here.
    RoomSolved { room: RoomId, points: u32 },
    /// The presentation pause for `room` is over; apply its points and move on.
    CompleteRoom { room: RoomId },
    /// One clock second.
    Tick,
    /// Back to a fresh name prompt after the run ended.
    Reset,
}

/// Why an action was ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    BlankName,
    WrongStage { stage: Stage },
    InactiveRoom { room: RoomId, stage: Stage },
    CompletionPending { room: RoomId },
    NotPending { room: RoomId },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlankName => f.write_str("blank name"),
            Self::WrongStage { stage } => write!(f, "not allowed during {stage}"),
            Self::InactiveRoom { room, stage } => write!(f, "{room} is not active ({stage})"),
            Self::CompletionPending { room } => write!(f, "{room} is already sealed"),
            Self::NotPending { room } => write!(f, "{room} has no pending completion"),
        }
    }
}

/// Outcome of a run that reached the ending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub username: String,
    pub score: FinalScore,
    pub remaining_seconds: u32,
    pub total_attempts: u32,
}

/// What the reducer did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEvent {
    NameAccepted { username: String },
    Started { room: RoomId, limit: u32 },
    AttemptRecorded { room: RoomId, attempts: u32 },
    /// Correct answer detected; the clock is frozen until `CompleteRoom`.
    RoomSealed { room: RoomId, points: u32 },
    RoomCompleted { room: RoomId, points: u32, cumulative: u32 },
    RoomEntered { room: RoomId },
    ClockTicked { remaining: u32 },
    TimeExpired { room: RoomId },
    Finished(RunResult),
    Reset,
    Rejected(Rejection),
}

/// Subset of [`SessionConfig`] the reducer needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRules {
    pub time_limit_secs: u32,
    pub time_bonus_per_second: u32,
    pub perfection_bonus: u32,
    pub max_name_len: usize,
}

impl From<&SessionConfig> for SessionRules {
    fn from(cfg: &SessionConfig) -> Self {
        Self {
            time_limit_secs: cfg.time_limit_secs,
            time_bonus_per_second: cfg.time_bonus_per_second,
            perfection_bonus: cfg.perfection_bonus,
            max_name_len: cfg.max_name_len,
        }
    }
}

impl Default for SessionRules {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

/// A solved room waiting out its presentation pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCompletion {
    pub room: RoomId,
    pub points: u32,
}

/// Trim the raw name and cap it at `max_len` characters. `None` when blank.
#[must_use]
pub fn sanitize_username(raw: &str, max_len: usize) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let capped: String = trimmed.chars().take(max_len).collect();
    Some(capped.trim_end().to_string())
}

/// The root aggregate for one play session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    rules: SessionRules,
    stage: Stage,
    username: String,
    clock: Countdown,
    cumulative_points: u32,
    attempts_by_room: BTreeMap<RoomId, u32>,
    pending: Option<PendingCompletion>,
    final_score: Option<FinalScore>,
}

impl Session {
    #[must_use]
    pub fn new(rules: SessionRules) -> Self {
        Self {
            rules,
            stage: Stage::Username,
            username: String::new(),
            clock: Countdown::new(rules.time_limit_secs),
            cumulative_points: 0,
            attempts_by_room: BTreeMap::new(),
            pending: None,
            final_score: None,
        }
    }

    /// Apply one action and report what changed.
    pub fn apply(&mut self, action: Action) -> Vec<SessionEvent> {
        let events = match action {
            Action::SubmitName(raw) => self.submit_name(&raw),
            Action::Start => self.start(),
            Action::RecordAttempt(room) => self.record_attempt(room),
            Action::RoomSolved { room, points } => self.room_solved(room, points),
            Action::CompleteRoom { room } => self.complete_room(room),
            Action::Tick => self.tick(),
            Action::Reset => self.reset(),
        };
        for event in &events {
            if let SessionEvent::Rejected(reason) = event {
                debug!(target: LOG_TARGET, "action ignored: {reason}");
            }
        }
        events
    }

    fn reject(reason: Rejection) -> Vec<SessionEvent> {
        vec![SessionEvent::Rejected(reason)]
    }

    fn wrong_stage(&self) -> Vec<SessionEvent> {
        Self::reject(Rejection::WrongStage { stage: self.stage })
    }

    /// `Ok` when `room` is the active stage and has not been solved yet.
    fn ensure_active(&self, room: RoomId) -> Result<(), Rejection> {
        if self.stage != Stage::Room(room) {
            return Err(Rejection::InactiveRoom {
                room,
                stage: self.stage,
            });
        }
        if self.pending.is_some() {
            return Err(Rejection::CompletionPending { room });
        }
        Ok(())
    }

    fn submit_name(&mut self, raw: &str) -> Vec<SessionEvent> {
        if self.stage != Stage::Username {
            return self.wrong_stage();
        }
        let Some(username) = sanitize_username(raw, self.rules.max_name_len) else {
            return Self::reject(Rejection::BlankName);
        };
        info!(target: LOG_TARGET, "player '{username}' entered the tomb");
        self.username.clone_from(&username);
        self.stage = Stage::Intro;
        vec![SessionEvent::NameAccepted { username }]
    }

    fn start(&mut self) -> Vec<SessionEvent> {
        if self.stage != Stage::Intro {
            return self.wrong_stage();
        }
        let room = RoomId::first();
        let limit = self.rules.time_limit_secs;
        self.clock.start(limit);
        self.stage = Stage::Room(room);
        info!(target: LOG_TARGET, "run started with {limit}s on the clock");
        vec![
            SessionEvent::Started { room, limit },
            SessionEvent::RoomEntered { room },
        ]
    }

    fn record_attempt(&mut self, room: RoomId) -> Vec<SessionEvent> {
        if let Err(reason) = self.ensure_active(room) {
            return Self::reject(reason);
        }
        let attempts = self.attempts_by_room.entry(room).or_insert(0);
        *attempts += 1;
        debug!(target: LOG_TARGET, "{room}: failed attempt #{attempts}");
        vec![SessionEvent::AttemptRecorded {
            room,
            attempts: *attempts,
        }]
    }

    fn room_solved(&mut self, room: RoomId, points: u32) -> Vec<SessionEvent> {
        if let Err(reason) = self.ensure_active(room) {
            return Self::reject(reason);
        }
        self.clock.pause();
        self.pending = Some(PendingCompletion { room, points });
        info!(
            target: LOG_TARGET,
            "{room} sealed for {points} points with {}s left",
            self.clock.remaining()
        );
        vec![SessionEvent::RoomSealed { room, points }]
    }

    fn complete_room(&mut self, room: RoomId) -> Vec<SessionEvent> {
        let pending = match self.pending {
            Some(pending) if pending.room == room && self.stage == Stage::Room(room) => pending,
            _ => return Self::reject(Rejection::NotPending { room }),
        };
        self.pending = None;
        self.cumulative_points = self.cumulative_points.saturating_add(pending.points);
        let mut events = vec![SessionEvent::RoomCompleted {
            room,
            points: pending.points,
            cumulative: self.cumulative_points,
        }];

        if let Some(next) = room.next() {
            self.stage = Stage::Room(next);
            self.clock.resume();
            info!(target: LOG_TARGET, "entering {next}");
            events.push(SessionEvent::RoomEntered { room: next });
        } else {
            self.clock.stop();
            let result = self.finalize();
            events.push(SessionEvent::Finished(result));
        }
        events
    }

    fn finalize(&mut self) -> RunResult {
        let remaining_seconds = self.clock.remaining();
        let total_attempts = self.total_attempts();
        let score = final_score(FinalScoreInputs {
            room_points: self.cumulative_points,
            remaining_seconds,
            total_attempts,
            time_bonus_per_second: self.rules.time_bonus_per_second,
            perfection_bonus: self.rules.perfection_bonus,
        });
        self.final_score = Some(score);
        self.stage = Stage::Ending;
        info!(
            target: LOG_TARGET,
            "'{}' escaped with {} points ({remaining_seconds}s left, {total_attempts} failed attempts)",
            self.username,
            score.total
        );
        RunResult {
            username: self.username.clone(),
            score,
            remaining_seconds,
            total_attempts,
        }
    }

    fn tick(&mut self) -> Vec<SessionEvent> {
        let Some(room) = self.stage.room() else {
            return Vec::new();
        };
        match self.clock.tick() {
            TickOutcome::Idle => Vec::new(),
            TickOutcome::Running(remaining) => {
                if remaining <= 10 {
                    debug!(target: LOG_TARGET, "{remaining}s left in {room}");
                }
                vec![SessionEvent::ClockTicked { remaining }]
            }
            TickOutcome::Expired => {
                self.clock.stop();
                self.pending = None;
                self.stage = Stage::Failed;
                info!(target: LOG_TARGET, "time ran out in {room}");
                vec![SessionEvent::TimeExpired { room }]
            }
        }
    }

    fn reset(&mut self) -> Vec<SessionEvent> {
        if !self.stage.is_terminal() {
            return self.wrong_stage();
        }
        *self = Self::new(self.rules);
        vec![SessionEvent::Reset]
    }

    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub const fn rules(&self) -> &SessionRules {
        &self.rules
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub const fn remaining_seconds(&self) -> u32 {
        self.clock.remaining()
    }

    #[must_use]
    pub const fn is_clock_running(&self) -> bool {
        self.clock.is_running()
    }

    #[must_use]
    pub const fn cumulative_points(&self) -> u32 {
        self.cumulative_points
    }

    /// Failed submissions recorded for `room` so far.
    #[must_use]
    pub fn attempts(&self, room: RoomId) -> u32 {
        self.attempts_by_room.get(&room).copied().unwrap_or(0)
    }

    #[must_use]
    pub const fn attempts_by_room(&self) -> &BTreeMap<RoomId, u32> {
        &self.attempts_by_room
    }

    #[must_use]
    pub fn total_attempts(&self) -> u32 {
        self.attempts_by_room.values().sum()
    }

    #[must_use]
    pub const fn pending(&self) -> Option<PendingCompletion> {
        self.pending
    }

    /// Room accepting input: the current room unless it is already sealed.
    #[must_use]
    pub const fn active_room(&self) -> Option<RoomId> {
        match (self.stage, self.pending) {
            (Stage::Room(room), None) => Some(room),
            _ => None,
        }
    }

    #[must_use]
    pub const fn final_score(&self) -> Option<FinalScore> {
        self.final_score
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionRules::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> Session {
        let mut session = Session::default();
        session.apply(Action::SubmitName("  Nefertari ".to_string()));
        session.apply(Action::Start);
        session
    }

    fn clear_room(session: &mut Session, room: RoomId, points: u32) -> Vec<SessionEvent> {
        session.apply(Action::RoomSolved { room, points });
        session.apply(Action::CompleteRoom { room })
    }

    #[test]
    fn name_is_trimmed_and_capped() {
        assert_eq!(sanitize_username("   ", 20), None);
        assert_eq!(sanitize_username(" Ramses ", 20).as_deref(), Some("Ramses"));
        let long = "A".repeat(30);
        assert_eq!(sanitize_username(&long, 20).map(|n| n.len()), Some(20));
    }

    #[test]
    fn blank_name_keeps_username_stage() {
        let mut session = Session::default();
        let events = session.apply(Action::SubmitName("   ".to_string()));
        assert_eq!(events, vec![SessionEvent::Rejected(Rejection::BlankName)]);
        assert_eq!(session.stage(), Stage::Username);
        assert!(!session.is_clock_running());
    }

    #[test]
    fn name_then_start_runs_clock() {
        let mut session = Session::default();
        session.apply(Action::SubmitName("Nefertari".to_string()));
        assert_eq!(session.stage(), Stage::Intro);
        assert!(!session.is_clock_running());
        assert_eq!(session.apply(Action::Tick), Vec::new());
        assert_eq!(session.remaining_seconds(), 600);

        session.apply(Action::Start);
        assert_eq!(session.stage(), Stage::Room(RoomId::Cartouche));
        assert!(session.is_clock_running());
        session.apply(Action::Tick);
        assert_eq!(session.remaining_seconds(), 599);
    }

    #[test]
    fn completion_for_inactive_room_changes_nothing() {
        let mut session = started();
        let before = session.clone();
        let events = session.apply(Action::RoomSolved {
            room: RoomId::Scale,
            points: 1_000,
        });
        assert!(matches!(
            events.as_slice(),
            [SessionEvent::Rejected(Rejection::InactiveRoom {
                room: RoomId::Scale,
                ..
            })]
        ));
        session.apply(Action::CompleteRoom {
            room: RoomId::Scale,
        });
        assert_eq!(session, before);
    }

    #[test]
    fn rooms_advance_and_accumulate_points() {
        let mut session = started();
        let events = clear_room(&mut session, RoomId::Cartouche, 900);
        assert_eq!(
            events,
            vec![
                SessionEvent::RoomCompleted {
                    room: RoomId::Cartouche,
                    points: 900,
                    cumulative: 900
                },
                SessionEvent::RoomEntered {
                    room: RoomId::Torches
                },
            ]
        );
        assert_eq!(session.stage(), Stage::Room(RoomId::Torches));
        assert!(session.is_clock_running());
        assert_eq!(session.cumulative_points(), 900);
    }

    #[test]
    fn duplicate_completion_is_not_scored_twice() {
        let mut session = started();
        clear_room(&mut session, RoomId::Cartouche, 1_000);
        session.apply(Action::CompleteRoom {
            room: RoomId::Cartouche,
        });
        assert_eq!(session.cumulative_points(), 1_000);
        assert_eq!(session.stage(), Stage::Room(RoomId::Torches));
    }

    #[test]
    fn clock_freezes_between_seal_and_completion() {
        let mut session = started();
        session.apply(Action::RoomSolved {
            room: RoomId::Cartouche,
            points: 1_000,
        });
        assert_eq!(session.active_room(), None);
        for _ in 0..5 {
            session.apply(Action::Tick);
        }
        assert_eq!(session.remaining_seconds(), 600);
        let again = session.apply(Action::RoomSolved {
            room: RoomId::Cartouche,
            points: 1_000,
        });
        assert!(matches!(
            again.as_slice(),
            [SessionEvent::Rejected(Rejection::CompletionPending { .. })]
        ));
    }

    #[test]
    fn attempts_are_tracked_lazily_per_room() {
        let mut session = started();
        assert!(session.attempts_by_room().is_empty());
        session.apply(Action::RecordAttempt(RoomId::Cartouche));
        session.apply(Action::RecordAttempt(RoomId::Cartouche));
        session.apply(Action::RecordAttempt(RoomId::Torches));
        assert_eq!(session.attempts(RoomId::Cartouche), 2);
        assert_eq!(session.attempts(RoomId::Torches), 0);
        assert_eq!(session.total_attempts(), 2);
    }

    #[test]
    fn perfect_run_earns_every_bonus() {
        let mut session = started();
        for _ in 0..100 {
            session.apply(Action::Tick);
        }
        let mut last = Vec::new();
        for room in RoomId::ALL {
            let points = if room.is_last() { 1_500 } else { 1_000 };
            last = clear_room(&mut session, room, points);
        }
        let expected = FinalScore {
            room_points: 5_500,
            time_bonus: 1_000,
            perfection_bonus: 2_000,
            total: 8_500,
        };
        assert_eq!(session.stage(), Stage::Ending);
        assert_eq!(session.final_score(), Some(expected));
        assert!(matches!(
            last.last(),
            Some(SessionEvent::Finished(RunResult { score, remaining_seconds: 500, .. })) if *score == expected
        ));
        assert!(!session.is_clock_running());
        assert_eq!(session.apply(Action::Tick), Vec::new());
        assert_eq!(session.stage(), Stage::Ending);
    }

    #[test]
    fn any_attempt_forfeits_perfection_bonus() {
        let mut session = started();
        session.apply(Action::RecordAttempt(RoomId::Cartouche));
        for room in RoomId::ALL {
            clear_room(&mut session, room, 500);
        }
        let score = session.final_score().expect("finished");
        assert_eq!(score.perfection_bonus, 0);
        assert_eq!(score.total, 2_500 + 1_200);
    }

    #[test]
    fn expiry_fails_the_run_once() {
        let rules = SessionRules {
            time_limit_secs: 3,
            ..SessionRules::default()
        };
        let mut session = Session::new(rules);
        session.apply(Action::SubmitName("Ay".to_string()));
        session.apply(Action::Start);
        session.apply(Action::Tick);
        session.apply(Action::Tick);
        let events = session.apply(Action::Tick);
        assert_eq!(
            events,
            vec![SessionEvent::TimeExpired {
                room: RoomId::Cartouche
            }]
        );
        assert_eq!(session.stage(), Stage::Failed);
        assert_eq!(session.apply(Action::Tick), Vec::new());
        assert_eq!(session.final_score(), None);

        let late = session.apply(Action::RoomSolved {
            room: RoomId::Cartouche,
            points: 1_000,
        });
        assert!(matches!(late.as_slice(), [SessionEvent::Rejected(_)]));
    }

    #[test]
    fn reset_only_from_terminal_stage() {
        let mut session = started();
        assert!(matches!(
            session.apply(Action::Reset).as_slice(),
            [SessionEvent::Rejected(Rejection::WrongStage { .. })]
        ));
        for room in RoomId::ALL {
            clear_room(&mut session, room, 100);
        }
        assert_eq!(session.apply(Action::Reset), vec![SessionEvent::Reset]);
        assert_eq!(session, Session::default());
    }

    #[test]
    fn stage_labels_follow_room_numbers() {
        assert_eq!(Stage::Room(RoomId::Constellation).to_string(), "room4");
        assert_eq!(Stage::Failed.to_string(), "failed");
    }
}
