use std::collections::HashSet;
use std::fmt;

use pharaoh_game::{RoomDef, RoomFlow, RoomId, Session, SubmitMode, Verification};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// One player input chosen by a [`PlayerPolicy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Move {
    Pick(String),
    Unpick(String),
    Submit,
    ToggleHint,
    Clear,
    /// Do nothing and let the clock run.
    Wait,
}

/// Policy interface for automated play strategies.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Choose the next input for the active room.
    fn next_move(&mut self, room: &RoomFlow, session: &Session) -> Move;
}

/// Built-in player strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameplayStrategy {
    Perfect,
    Sloppy,
    HintSeeker,
    Idle,
    Fumbler,
}

impl GameplayStrategy {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            GameplayStrategy::Perfect => "Perfect",
            GameplayStrategy::Sloppy => "Sloppy",
            GameplayStrategy::HintSeeker => "Hint Seeker",
            GameplayStrategy::Idle => "Idle",
            GameplayStrategy::Fumbler => "Fumbler",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy + Send> {
        match self {
            GameplayStrategy::Perfect => Box::new(PerfectPolicy),
            GameplayStrategy::Sloppy => Box::new(SloppyPolicy::default()),
            GameplayStrategy::HintSeeker => Box::new(HintSeekerPolicy),
            GameplayStrategy::Idle => Box::new(IdlePolicy),
            GameplayStrategy::Fumbler => Box::new(FumblerPolicy::new(seed)),
        }
    }
}

impl fmt::Display for GameplayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tokens that solve `def`: the positional solution, or the smallest set of
/// weights that balances the scale.
#[must_use]
pub fn answer_for(def: &RoomDef) -> Vec<String> {
    match &def.verification {
        Verification::Positional { solution } => solution.clone(),
        Verification::WeightSum { target } => balancing_set(def, *target),
    }
}

fn balancing_set(def: &RoomDef, target: i32) -> Vec<String> {
    let count = def.tokens.len().min(16);
    let mut masks: Vec<u32> = (1..(1_u32 << count)).collect();
    masks.sort_by_key(|mask| mask.count_ones());
    masks
        .into_iter()
        .find(|mask| {
            let weight: i32 = (0..count)
                .filter(|bit| mask & (1 << bit) != 0)
                .map(|bit| def.tokens[bit].weight)
                .sum();
            weight == target
        })
        .map(|mask| {
            (0..count)
                .filter(|bit| mask & (1 << bit) != 0)
                .map(|bit| def.tokens[bit].id.clone())
                .collect()
        })
        .unwrap_or_default()
}

/// The correct next input given what is already placed.
fn correct_move(room: &RoomFlow) -> Move {
    let answer = answer_for(room.def());
    let selection = room.selection();
    match room.def().selection.submit {
        SubmitMode::Auto => {
            if !answer.starts_with(selection) {
                return Move::Clear;
            }
            answer
                .get(selection.len())
                .map_or(Move::Wait, |token| Move::Pick(token.clone()))
        }
        SubmitMode::Explicit => {
            let wanted: HashSet<&String> = answer.iter().collect();
            if let Some(extra) = selection.iter().find(|token| !wanted.contains(token)) {
                return Move::Unpick(extra.clone());
            }
            answer
                .iter()
                .find(|token| !selection.contains(*token))
                .map_or(Move::Submit, |token| Move::Pick(token.clone()))
        }
    }
}

/// A token that is wrong for the current slot, if the room has one.
fn wrong_move(room: &RoomFlow) -> Option<Move> {
    let answer = answer_for(room.def());
    let def = room.def();
    match def.selection.submit {
        SubmitMode::Auto => {
            let expected = answer.get(room.selection().len())?;
            def.tokens
                .iter()
                .find(|token| &token.id != expected && !room.selection().contains(&token.id))
                .map(|token| Move::Pick(token.id.clone()))
        }
        SubmitMode::Explicit => {
            if room.selection().is_empty() {
                def.tokens
                    .iter()
                    .find(|token| !answer.contains(&token.id))
                    .map(|token| Move::Pick(token.id.clone()))
            } else {
                Some(Move::Submit)
            }
        }
    }
}

struct PerfectPolicy;
struct HintSeekerPolicy;
struct IdlePolicy;

/// Fails each room once before solving it.
#[derive(Default)]
struct SloppyPolicy {
    blundered: HashSet<RoomId>,
}

/// Plays the right token most of the time and a random one otherwise.
struct FumblerPolicy {
    rng: ChaCha20Rng,
    accuracy: f64,
}

impl FumblerPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            accuracy: 0.8,
        }
    }
}

impl PlayerPolicy for PerfectPolicy {
    fn name(&self) -> &'static str {
        "Perfect"
    }

    fn next_move(&mut self, room: &RoomFlow, _session: &Session) -> Move {
        correct_move(room)
    }
}

impl PlayerPolicy for HintSeekerPolicy {
    fn name(&self) -> &'static str {
        "Hint Seeker"
    }

    fn next_move(&mut self, room: &RoomFlow, _session: &Session) -> Move {
        if room.hint_used() {
            correct_move(room)
        } else {
            Move::ToggleHint
        }
    }
}

impl PlayerPolicy for IdlePolicy {
    fn name(&self) -> &'static str {
        "Idle"
    }

    fn next_move(&mut self, _room: &RoomFlow, _session: &Session) -> Move {
        Move::Wait
    }
}

impl PlayerPolicy for SloppyPolicy {
    fn name(&self) -> &'static str {
        "Sloppy"
    }

    fn next_move(&mut self, room: &RoomFlow, session: &Session) -> Move {
        let id = room.id();
        if session.attempts(id) > 0 {
            self.blundered.insert(id);
        }
        if self.blundered.contains(&id) {
            return correct_move(room);
        }
        wrong_move(room).unwrap_or_else(|| correct_move(room))
    }
}

impl PlayerPolicy for FumblerPolicy {
    fn name(&self) -> &'static str {
        "Fumbler"
    }

    fn next_move(&mut self, room: &RoomFlow, _session: &Session) -> Move {
        if self.rng.gen_bool(0.05) {
            return Move::ToggleHint;
        }
        if self.rng.gen_bool(self.accuracy) {
            return correct_move(room);
        }
        let def = room.def();
        if def.selection.submit == SubmitMode::Explicit && !room.selection().is_empty() {
            return if self.rng.gen_bool(0.5) {
                Move::Submit
            } else {
                Move::Clear
            };
        }
        def.tokens
            .choose(&mut self.rng)
            .map_or(Move::Wait, |token| Move::Pick(token.id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pharaoh_game::RoomCatalog;

    fn def(id: RoomId) -> RoomDef {
        RoomCatalog::default().room(id).unwrap().clone()
    }

    #[test]
    fn scale_answer_balances_the_counterweight() {
        let scale = def(RoomId::Scale);
        let answer = answer_for(&scale);
        let weight: i32 = answer.iter().filter_map(|t| scale.weight_of(t)).sum();
        assert_eq!(weight, 3);
        assert_eq!(answer, vec!["scarab".to_string()]);
    }

    #[test]
    fn positional_answer_is_the_solution() {
        let torches = def(RoomId::Torches);
        assert_eq!(answer_for(&torches), ["east", "south", "west", "north"]);
    }

    #[test]
    fn fresh_rooms_start_with_the_first_token() {
        let room = RoomFlow::new(def(RoomId::Constellation));
        assert_eq!(correct_move(&room), Move::Pick("orion".to_string()));
        assert_eq!(wrong_move(&room), Some(Move::Pick("eridanus".to_string())));
    }

    #[test]
    fn strategies_have_labels() {
        assert_eq!(GameplayStrategy::HintSeeker.to_string(), "Hint Seeker");
        let policy = GameplayStrategy::Fumbler.create_policy(7);
        assert_eq!(policy.name(), "Fumbler");
    }
}
