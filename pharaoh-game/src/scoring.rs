//! Room awards and the end-of-run score.
use serde::{Deserialize, Serialize};

use crate::constants::{
    FINAL_ROOM_ATTEMPT_PENALTY, FINAL_ROOM_BASE_POINTS, FINAL_ROOM_FLOOR_POINTS,
    FINAL_ROOM_HINT_PENALTY, ROOM_ATTEMPT_PENALTY, ROOM_BASE_POINTS, ROOM_FLOOR_POINTS,
    ROOM_HINT_PENALTY,
};

/// Scoring constants for one room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreCfg {
    pub base: u32,
    pub hint_penalty: u32,
    pub attempt_penalty: u32,
    pub floor: u32,
}

impl ScoreCfg {
    /// Constants shared by rooms one through four.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            base: ROOM_BASE_POINTS,
            hint_penalty: ROOM_HINT_PENALTY,
            attempt_penalty: ROOM_ATTEMPT_PENALTY,
            floor: ROOM_FLOOR_POINTS,
        }
    }

    /// Constants for the sarcophagus.
    #[must_use]
    pub const fn final_room() -> Self {
        Self {
            base: FINAL_ROOM_BASE_POINTS,
            hint_penalty: FINAL_ROOM_HINT_PENALTY,
            attempt_penalty: FINAL_ROOM_ATTEMPT_PENALTY,
            floor: FINAL_ROOM_FLOOR_POINTS,
        }
    }

    /// Points awarded for a successful submission under these constants.
    #[must_use]
    pub fn award(&self, hint_used: bool, attempts: u32) -> u32 {
        score(
            self.base,
            hint_used,
            attempts,
            self.hint_penalty,
            self.attempt_penalty,
            self.floor,
        )
    }
}

impl Default for ScoreCfg {
    fn default() -> Self {
        Self::standard()
    }
}

/// `max(base - hint - attempts * per_attempt, floor)`, computed without
/// underflow.
#[must_use]
pub fn score(
    base: u32,
    hint_used: bool,
    attempts: u32,
    hint_penalty: u32,
    per_attempt_penalty: u32,
    floor: u32,
) -> u32 {
    let base = i64::from(base);
    let hint = if hint_used { i64::from(hint_penalty) } else { 0 };
    let attempts = i64::from(attempts) * i64::from(per_attempt_penalty);
    let raw = base - hint - attempts;
    let floored = raw.max(i64::from(floor));
    u32::try_from(floored).unwrap_or(u32::MAX)
}

/// Breakdown of the final score shown on the ending screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalScore {
    /// Sum of every room award, the last room included.
    pub room_points: u32,
    pub time_bonus: u32,
    pub perfection_bonus: u32,
    pub total: u32,
}

/// Inputs to the end-of-run formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalScoreInputs {
    pub room_points: u32,
    pub remaining_seconds: u32,
    pub total_attempts: u32,
    pub time_bonus_per_second: u32,
    pub perfection_bonus: u32,
}

/// Room points plus two points per remaining second plus the perfection
/// bonus when no attempt failed.
#[must_use]
pub fn final_score(inputs: FinalScoreInputs) -> FinalScore {
    let time_bonus = inputs
        .remaining_seconds
        .saturating_mul(inputs.time_bonus_per_second);
    let perfection_bonus = if inputs.total_attempts == 0 {
        inputs.perfection_bonus
    } else {
        0
    };
    FinalScore {
        room_points: inputs.room_points,
        time_bonus,
        perfection_bonus,
        total: inputs
            .room_points
            .saturating_add(time_bonus)
            .saturating_add(perfection_bonus),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_room_penalties_apply() {
        let cfg = ScoreCfg::standard();
        assert_eq!(cfg.award(false, 0), 1_000);
        assert_eq!(cfg.award(true, 0), 800);
        assert_eq!(cfg.award(false, 3), 700);
        assert_eq!(cfg.award(true, 3), 500);
    }

    #[test]
    fn award_never_drops_below_floor() {
        let cfg = ScoreCfg::standard();
        assert_eq!(cfg.award(true, 50), 100);
        let last = ScoreCfg::final_room();
        assert_eq!(last.award(true, 9), 200);
        assert_eq!(last.award(false, u32::MAX), 200);
    }

    #[test]
    fn award_is_monotone_in_hint_and_attempts() {
        for cfg in [ScoreCfg::standard(), ScoreCfg::final_room()] {
            let mut previous = u32::MAX;
            for attempts in 0..20 {
                let plain = cfg.award(false, attempts);
                let hinted = cfg.award(true, attempts);
                assert!(hinted <= plain);
                assert!(plain <= previous);
                assert!(hinted >= cfg.floor);
                previous = plain;
            }
        }
    }

    #[test]
    fn recorded_attempts_reduce_award_linearly() {
        let cfg = ScoreCfg::final_room();
        for n in 0..5 {
            assert_eq!(cfg.award(false, n), (1_500 - n * 150).max(200));
        }
    }

    #[test]
    fn final_score_adds_bonuses() {
        let perfect = final_score(FinalScoreInputs {
            room_points: 5_500,
            remaining_seconds: 321,
            total_attempts: 0,
            time_bonus_per_second: 2,
            perfection_bonus: 2_000,
        });
        assert_eq!(perfect.time_bonus, 642);
        assert_eq!(perfect.perfection_bonus, 2_000);
        assert_eq!(perfect.total, 5_500 + 642 + 2_000);

        let flawed = final_score(FinalScoreInputs {
            total_attempts: 1,
            ..FinalScoreInputs {
                room_points: 5_000,
                remaining_seconds: 10,
                total_attempts: 0,
                time_bonus_per_second: 2,
                perfection_bonus: 2_000,
            }
        });
        assert_eq!(flawed.perfection_bonus, 0);
        assert_eq!(flawed.total, 5_020);
    }
}
