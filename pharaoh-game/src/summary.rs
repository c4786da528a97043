//! Read-only projections of a session for the HUD and the ending screen.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::clock::format_clock;
use crate::rooms::RoomId;
use crate::session::{Session, Stage};

/// Snapshot the presentation layer renders from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    pub username: String,
    pub stage: Stage,
    pub remaining_seconds: u32,
    pub clock_text: String,
    /// Less than the urgent threshold left on the clock.
    pub urgent: bool,
    pub cumulative_points: u32,
    pub room_number: Option<u8>,
    /// HUD is only shown while a room is on screen.
    pub show_hud: bool,
    pub awaiting_completion: bool,
    pub final_total: Option<u32>,
}

impl SessionView {
    #[must_use]
    pub fn of(session: &Session, urgent_threshold_secs: u32) -> Self {
        let remaining = session.remaining_seconds();
        let stage = session.stage();
        Self {
            username: session.username().to_string(),
            stage,
            remaining_seconds: remaining,
            clock_text: format_clock(remaining),
            urgent: stage.is_gameplay() && remaining < urgent_threshold_secs,
            cumulative_points: session.cumulative_points(),
            room_number: stage.room().map(RoomId::number),
            show_hud: stage.is_gameplay(),
            awaiting_completion: session.pending().is_some(),
            final_total: session.final_score().map(|score| score.total),
        }
    }
}

/// Ending-screen breakdown of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub username: String,
    pub time_remaining: u32,
    pub time_taken: u32,
    pub room_points: u32,
    pub time_bonus: u32,
    pub perfection_bonus: u32,
    pub total: u32,
    pub total_attempts: u32,
    pub attempts_by_room: BTreeMap<RoomId, u32>,
}

impl RunSummary {
    /// `None` until the session reaches the ending.
    #[must_use]
    pub fn of(session: &Session) -> Option<Self> {
        let score = session.final_score()?;
        let remaining = session.remaining_seconds();
        Some(Self {
            username: session.username().to_string(),
            time_remaining: remaining,
            time_taken: session.rules().time_limit_secs.saturating_sub(remaining),
            room_points: score.room_points,
            time_bonus: score.time_bonus,
            perfection_bonus: score.perfection_bonus,
            total: score.total,
            total_attempts: session.total_attempts(),
            attempts_by_room: session.attempts_by_room().clone(),
        })
    }

    #[must_use]
    pub fn time_taken_text(&self) -> String {
        format_clock(self.time_taken)
    }

    #[must_use]
    pub const fn is_perfect(&self) -> bool {
        self.total_attempts == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Action;

    #[test]
    fn hud_hidden_outside_rooms() {
        let mut session = Session::default();
        let view = SessionView::of(&session, 120);
        assert!(!view.show_hud);
        assert_eq!(view.clock_text, "10:00");
        assert_eq!(view.room_number, None);

        session.apply(Action::SubmitName("Ay".to_string()));
        session.apply(Action::Start);
        let view = SessionView::of(&session, 120);
        assert!(view.show_hud);
        assert_eq!(view.room_number, Some(1));
        assert!(!view.urgent);
    }

    #[test]
    fn urgency_kicks_in_below_threshold() {
        let mut session = Session::default();
        session.apply(Action::SubmitName("Ay".to_string()));
        session.apply(Action::Start);
        for _ in 0..481 {
            session.apply(Action::Tick);
        }
        let view = SessionView::of(&session, 120);
        assert_eq!(view.clock_text, "01:59");
        assert!(view.urgent);
    }

    #[test]
    fn summary_reports_time_taken_and_attempts() {
        let mut session = Session::default();
        assert_eq!(RunSummary::of(&session), None);
        session.apply(Action::SubmitName("Ay".to_string()));
        session.apply(Action::Start);
        for _ in 0..75 {
            session.apply(Action::Tick);
        }
        session.apply(Action::RecordAttempt(RoomId::Cartouche));
        for room in RoomId::ALL {
            session.apply(Action::RoomSolved { room, points: 100 });
            session.apply(Action::CompleteRoom { room });
        }
        let summary = RunSummary::of(&session).expect("finished");
        assert_eq!(summary.time_taken, 75);
        assert_eq!(summary.time_taken_text(), "01:15");
        assert_eq!(summary.time_remaining, 525);
        assert_eq!(summary.total, 500 + 1_050);
        assert!(!summary.is_perfect());
        assert_eq!(summary.attempts_by_room.get(&RoomId::Cartouche), Some(&1));
    }
}
