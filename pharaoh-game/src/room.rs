//! Per-room interaction: the in-progress selection, the hint, and the
//! decision to report a failed or solved submission.
use log::debug;
use std::cmp::Ordering;
use thiserror::Error;

use crate::constants::LOG_TARGET;
use crate::rooms::{RoomDef, RoomId, SubmitMode};
use crate::session::{Action, Session};
use crate::verify::{Verdict, Verification, total_weight};

/// A pick or submission the room refused. The selection is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PickError {
    #[error("{room} has no token '{token}'")]
    UnknownToken { room: RoomId, token: String },
    #[error("'{token}' is already placed in {room}")]
    AlreadyPicked { room: RoomId, token: String },
    #[error("{room} holds at most {max_picks} tokens")]
    SelectionFull { room: RoomId, max_picks: usize },
    #[error("{room} is already solved")]
    Sealed { room: RoomId },
    #[error("{room} is not accepting input")]
    Inactive { room: RoomId },
    #[error("{room} checks itself; there is nothing to submit")]
    AutoSubmit { room: RoomId },
    #[error("{room} selection is empty")]
    EmptySelection { room: RoomId },
    #[error("'{token}' is not placed in {room}")]
    NotPicked { room: RoomId, token: String },
}

/// What a pick or submission amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStep {
    /// Accepted, nothing to report yet.
    Pending,
    /// Wrong answer; record an attempt.
    Failed,
    /// Correct answer worth `points`.
    Solved { points: u32 },
}

impl RoomStep {
    /// The session action this step reports, if any.
    #[must_use]
    pub const fn signal(self, room: RoomId) -> Option<Action> {
        match self {
            Self::Pending => None,
            Self::Failed => Some(Action::RecordAttempt(room)),
            Self::Solved { points } => Some(Action::RoomSolved { room, points }),
        }
    }
}

/// Live state of the room the player is standing in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomFlow {
    def: RoomDef,
    selection: Vec<String>,
    hint_visible: bool,
    hint_used: bool,
    error: bool,
    sealed: bool,
}

impl RoomFlow {
    #[must_use]
    pub const fn new(def: RoomDef) -> Self {
        Self {
            def,
            selection: Vec::new(),
            hint_visible: false,
            hint_used: false,
            error: false,
            sealed: false,
        }
    }

    #[must_use]
    pub const fn id(&self) -> RoomId {
        self.def.id
    }

    #[must_use]
    pub const fn def(&self) -> &RoomDef {
        &self.def
    }

    /// The session action `step` reports for this room.
    #[must_use]
    pub const fn signal(&self, step: RoomStep) -> Option<Action> {
        step.signal(self.id())
    }

    /// Place `token`. A correct answer is priced with the attempts `session`
    /// has recorded for this room.
    ///
    /// # Errors
    ///
    /// Returns an error if the room is solved or not active, the token is
    /// unknown, already placed in a no-repeat room, or the selection is full.
    pub fn add_pick(&mut self, token: &str, session: &Session) -> Result<RoomStep, PickError> {
        let room = self.id();
        self.ensure_open(session)?;
        if self.def.token(token).is_none() {
            return Err(PickError::UnknownToken {
                room,
                token: token.to_string(),
            });
        }
        if !self.def.selection.allow_repeats && self.selection.iter().any(|t| t == token) {
            return Err(PickError::AlreadyPicked {
                room,
                token: token.to_string(),
            });
        }
        if self.selection.len() >= self.def.selection.max_picks {
            return Err(PickError::SelectionFull {
                room,
                max_picks: self.def.selection.max_picks,
            });
        }

        self.error = false;
        self.selection.push(token.to_string());
        debug!(target: LOG_TARGET, "{room}: picked {token} ({:?})", self.selection);

        if self.def.selection.submit == SubmitMode::Explicit {
            return Ok(RoomStep::Pending);
        }
        let full = self.selection.len() == self.def.selection.max_picks;
        let attempts = session.attempts(room);
        match &self.def.verification {
            Verification::Positional { .. } => Ok(self.evaluate(attempts)),
            Verification::WeightSum { .. } if full => Ok(self.evaluate(attempts)),
            Verification::WeightSum { .. } => Ok(RoomStep::Pending),
        }
    }

    /// Take `token` back off the selection. Only rooms with an explicit submit
    /// let the player rearrange before committing.
    ///
    /// # Errors
    ///
    /// Returns an error for auto-checked, solved, or inactive rooms and for
    /// tokens that are not placed.
    pub fn remove_pick(&mut self, token: &str, session: &Session) -> Result<(), PickError> {
        let room = self.id();
        self.ensure_open(session)?;
        if self.def.selection.submit == SubmitMode::Auto {
            return Err(PickError::AutoSubmit { room });
        }
        let Some(index) = self.selection.iter().rposition(|t| t == token) else {
            return Err(PickError::NotPicked {
                room,
                token: token.to_string(),
            });
        };
        self.selection.remove(index);
        self.error = false;
        Ok(())
    }

    /// Check the current selection in an explicit-submit room.
    ///
    /// # Errors
    ///
    /// Returns an error for auto-checked or solved rooms and for an empty
    /// selection, which is never counted as an attempt.
    pub fn submit(&mut self, session: &Session) -> Result<RoomStep, PickError> {
        let room = self.id();
        self.ensure_open(session)?;
        if self.def.selection.submit == SubmitMode::Auto {
            return Err(PickError::AutoSubmit { room });
        }
        if self.selection.is_empty() {
            return Err(PickError::EmptySelection { room });
        }
        Ok(self.evaluate(session.attempts(room)))
    }

    fn ensure_open(&self, session: &Session) -> Result<(), PickError> {
        let room = self.id();
        if self.sealed {
            Err(PickError::Sealed { room })
        } else if session.active_room() != Some(room) {
            Err(PickError::Inactive { room })
        } else {
            Ok(())
        }
    }

    fn evaluate(&mut self, attempts: u32) -> RoomStep {
        let def = &self.def;
        let verdict = def
            .verification
            .check(&self.selection, |token| def.weight_of(token));
        match verdict {
            Verdict::Incomplete => RoomStep::Pending,
            Verdict::Matched => {
                self.sealed = true;
                let points = self.def.scoring.award(self.hint_used, attempts);
                debug!(target: LOG_TARGET, "{}: solved for {points}", self.id());
                RoomStep::Solved { points }
            }
            Verdict::Mismatch { index } => {
                self.error = true;
                if self.def.selection.reset_on_failure {
                    self.selection.clear();
                }
                debug!(target: LOG_TARGET, "{}: wrong at slot {index}", self.id());
                RoomStep::Failed
            }
        }
    }

    /// Show or hide the hint. Revealing it once costs the hint penalty for the
    /// rest of the room, even if it is hidden again.
    pub fn toggle_hint(&mut self) -> bool {
        self.hint_visible = !self.hint_visible;
        if self.hint_visible {
            self.hint_used = true;
        }
        self.hint_visible
    }

    /// Empty the selection and drop the error flag.
    pub fn clear(&mut self) {
        if !self.sealed {
            self.selection.clear();
            self.error = false;
        }
    }

    #[must_use]
    pub fn selection(&self) -> &[String] {
        &self.selection
    }

    #[must_use]
    pub const fn hint_visible(&self) -> bool {
        self.hint_visible
    }

    #[must_use]
    pub const fn hint_used(&self) -> bool {
        self.hint_used
    }

    /// Set after a wrong submission until the next pick.
    #[must_use]
    pub const fn has_error(&self) -> bool {
        self.error
    }

    #[must_use]
    pub const fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Which way the scale leans: `Greater` when the selection outweighs the
    /// counterweight. `None` for rooms without a scale.
    #[must_use]
    pub fn tilt(&self) -> Option<Ordering> {
        match self.def.verification {
            Verification::WeightSum { target } => {
                let weight = total_weight(&self.selection, |token| self.def.weight_of(token));
                Some(weight.cmp(&target))
            }
            Verification::Positional { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rooms::RoomCatalog;
    use crate::session::SessionRules;

    fn flow(id: RoomId) -> RoomFlow {
        let catalog = RoomCatalog::default();
        RoomFlow::new(catalog.room(id).unwrap().clone())
    }

    /// A running session standing in `room`.
    fn session_in(room: RoomId) -> Session {
        let mut session = Session::new(SessionRules::default());
        session.apply(Action::SubmitName("Hatshepsut".to_string()));
        session.apply(Action::Start);
        let mut current = RoomId::first();
        while current != room {
            session.apply(Action::RoomSolved {
                room: current,
                points: 0,
            });
            session.apply(Action::CompleteRoom { room: current });
            current = current.next().unwrap();
        }
        session
    }

    fn pick_all(flow: &mut RoomFlow, session: &Session, tokens: &[&str]) -> RoomStep {
        let mut step = RoomStep::Pending;
        for token in tokens {
            step = flow.add_pick(token, session).unwrap();
        }
        step
    }

    #[test]
    fn torches_fail_on_first_wrong_pick() {
        let session = session_in(RoomId::Torches);
        let mut room = flow(RoomId::Torches);
        assert_eq!(room.add_pick("east", &session), Ok(RoomStep::Pending));
        assert_eq!(room.add_pick("north", &session), Ok(RoomStep::Failed));
        assert!(room.has_error());
        assert!(room.selection().is_empty());

        assert_eq!(room.add_pick("east", &session), Ok(RoomStep::Pending));
        assert!(!room.has_error());
    }

    #[test]
    fn correct_sequence_solves_and_seals() {
        let session = session_in(RoomId::Torches);
        let mut room = flow(RoomId::Torches);
        let step = pick_all(&mut room, &session, &["east", "south", "west", "north"]);
        assert_eq!(step, RoomStep::Solved { points: 1_000 });
        assert!(room.is_sealed());
        assert_eq!(
            room.add_pick("east", &session),
            Err(PickError::Sealed {
                room: RoomId::Torches
            })
        );
    }

    #[test]
    fn cartouche_allows_repeated_glyphs() {
        let session = session_in(RoomId::Cartouche);
        let mut room = flow(RoomId::Cartouche);
        let glyphs = ["river", "desert", "eye", "ankh", "ankh", "crown"];
        assert_eq!(
            pick_all(&mut room, &session, &glyphs),
            RoomStep::Solved { points: 1_000 }
        );
    }

    #[test]
    fn no_repeat_rooms_reject_duplicates() {
        let session = session_in(RoomId::Constellation);
        let mut room = flow(RoomId::Constellation);
        room.add_pick("orion", &session).unwrap();
        assert!(matches!(
            room.add_pick("orion", &session),
            Err(PickError::AlreadyPicked { .. })
        ));
        assert!(matches!(
            room.add_pick("vega", &session),
            Err(PickError::UnknownToken { .. })
        ));
        assert_eq!(room.selection(), ["orion".to_string()]);
    }

    #[test]
    fn picks_outside_the_active_room_are_refused() {
        let session = session_in(RoomId::Cartouche);
        let mut room = flow(RoomId::Torches);
        assert_eq!(
            room.add_pick("east", &session),
            Err(PickError::Inactive {
                room: RoomId::Torches
            })
        );
        assert!(room.selection().is_empty());
    }

    #[test]
    fn award_reflects_hint_and_attempts() {
        let mut session = session_in(RoomId::Sarcophagus);
        session.apply(Action::RecordAttempt(RoomId::Sarcophagus));
        session.apply(Action::RecordAttempt(RoomId::Sarcophagus));
        let mut room = flow(RoomId::Sarcophagus);
        room.toggle_hint();
        room.toggle_hint();
        assert!(!room.hint_visible());
        assert!(room.hint_used());
        let step = pick_all(
            &mut room,
            &session,
            &["dusk", "midnight", "dawn", "zenith", "rebirth"],
        );
        assert_eq!(
            step,
            RoomStep::Solved {
                points: 1_500 - 300 - 2 * 150
            }
        );
    }

    #[test]
    fn scale_waits_for_explicit_submit() {
        let mut session = session_in(RoomId::Scale);
        let mut room = flow(RoomId::Scale);
        assert_eq!(
            room.submit(&session),
            Err(PickError::EmptySelection {
                room: RoomId::Scale
            })
        );
        room.add_pick("scarab", &session).unwrap();
        room.add_pick("lotus", &session).unwrap();
        assert_eq!(room.tilt(), Some(Ordering::Greater));
        let step = room.submit(&session).unwrap();
        assert_eq!(step, RoomStep::Failed);
        assert!(room.has_error());
        assert_eq!(room.selection().len(), 2);
        session.apply(step.signal(RoomId::Scale).unwrap());

        room.remove_pick("lotus", &session).unwrap();
        assert!(!room.has_error());
        assert_eq!(room.tilt(), Some(Ordering::Equal));
        assert!(matches!(
            room.remove_pick("lotus", &session),
            Err(PickError::NotPicked { .. })
        ));
        assert_eq!(room.submit(&session), Ok(RoomStep::Solved { points: 900 }));
    }

    #[test]
    fn auto_rooms_have_no_submit_or_removal() {
        let session = session_in(RoomId::Torches);
        let mut room = flow(RoomId::Torches);
        room.add_pick("east", &session).unwrap();
        assert!(matches!(
            room.submit(&session),
            Err(PickError::AutoSubmit { .. })
        ));
        assert!(matches!(
            room.remove_pick("east", &session),
            Err(PickError::AutoSubmit { .. })
        ));
        assert_eq!(room.tilt(), None);
        room.clear();
        assert!(room.selection().is_empty());
    }

    #[test]
    fn steps_map_to_session_actions() {
        let room = RoomId::Scale;
        assert_eq!(RoomStep::Pending.signal(room), None);
        assert_eq!(
            RoomStep::Failed.signal(room),
            Some(Action::RecordAttempt(room))
        );
        assert_eq!(
            RoomStep::Solved { points: 700 }.signal(room),
            Some(Action::RoomSolved { room, points: 700 })
        );
    }
}
