use anyhow::{Context, Result, ensure};

use pharaoh_game::{Action, RoomId, RunSummary, SessionEvent, Stage};

use super::TestScenario;
use crate::logic::game_tester::{Driver, SimulationPlan, SimulationSummary, TesterEngine};
use crate::logic::GameplayStrategy;

const PERFECT_ROOM_POINTS: u32 = 4 * 1_000 + 1_500;
const PERFECTION_BONUS: u32 = 2_000;

pub fn smoke() -> TestScenario {
    TestScenario::simulation(
        "Perfect Run",
        SimulationPlan::new(GameplayStrategy::Perfect)
            .with_expectation(escaped)
            .with_expectation(flawless)
            .with_expectation(ranked),
    )
}

pub fn sloppy() -> TestScenario {
    TestScenario::simulation(
        "Sloppy Run",
        SimulationPlan::new(GameplayStrategy::Sloppy)
            .with_expectation(escaped)
            .with_expectation(one_failure_per_room),
    )
}

pub fn hint_seeker() -> TestScenario {
    TestScenario::simulation(
        "Hint Seeker",
        SimulationPlan::new(GameplayStrategy::HintSeeker)
            .with_expectation(escaped)
            .with_expectation(hints_cost_points),
    )
}

pub fn idle_timeout() -> TestScenario {
    TestScenario::simulation(
        "Idle Timeout",
        SimulationPlan::new(GameplayStrategy::Idle)
            .with_time_limit(45)
            .with_expectation(timed_out),
    )
}

pub fn fumbler() -> TestScenario {
    TestScenario::simulation(
        "Fumbler",
        SimulationPlan::new(GameplayStrategy::Fumbler).with_expectation(score_adds_up),
    )
}

pub fn stale_signals() -> TestScenario {
    TestScenario::simulation(
        "Stale Signals",
        SimulationPlan::new(GameplayStrategy::Perfect)
            .with_setup(send_stale_signals)
            .with_expectation(escaped)
            .with_expectation(flawless)
            .with_expectation(|summary: &SimulationSummary| -> Result<()> {
                ensure!(
                    summary.rejected_actions >= 6,
                    "expected every stale signal to be rejected, saw {}",
                    summary.rejected_actions
                );
                Ok(())
            }),
    )
}

pub fn last_second() -> TestScenario {
    TestScenario::simulation(
        "Last Second Escape",
        SimulationPlan::new(GameplayStrategy::Perfect)
            .with_time_limit(16)
            .with_expectation(escaped)
            .with_expectation(|summary: &SimulationSummary| -> Result<()> {
                let run = finished_run(summary)?;
                ensure!(run.time_remaining == 1, "{}s left, expected 1", run.time_remaining);
                ensure!(run.time_bonus == 2, "time bonus {}", run.time_bonus);
                Ok(())
            }),
    )
}

pub fn too_slow() -> TestScenario {
    TestScenario::simulation(
        "Too Slow",
        SimulationPlan::new(GameplayStrategy::Perfect)
            .with_time_limit(15)
            .with_expectation(timed_out)
            .with_expectation(|summary: &SimulationSummary| -> Result<()> {
                ensure!(
                    summary.final_view.cumulative_points == 4_000,
                    "four rooms should be banked, saw {}",
                    summary.final_view.cumulative_points
                );
                Ok(())
            }),
    )
}

pub fn realtime() -> TestScenario {
    TestScenario::simulation(
        "Realtime Runner",
        SimulationPlan::new(GameplayStrategy::Perfect)
            .with_driver(Driver::Realtime {
                tick_millis: 5,
                pause_millis: 20,
            })
            .with_expectation(escaped)
            .with_expectation(flawless),
    )
}

fn send_stale_signals(engine: &mut TesterEngine) -> Vec<SessionEvent> {
    [
        Action::RoomSolved {
            room: RoomId::Scale,
            points: 1_000,
        },
        Action::CompleteRoom {
            room: RoomId::Cartouche,
        },
        Action::RecordAttempt(RoomId::Sarcophagus),
        Action::SubmitName("Imposter".to_string()),
        Action::Start,
        Action::Reset,
    ]
    .into_iter()
    .flat_map(|action| engine.dispatch(action))
    .collect()
}

fn finished_run(summary: &SimulationSummary) -> Result<&RunSummary> {
    summary
        .run
        .as_ref()
        .with_context(|| format!("run {}", summary.outcome_label()))
}

fn escaped(summary: &SimulationSummary) -> Result<()> {
    ensure!(summary.stage == Stage::Ending, "run {}", summary.outcome_label());
    ensure!(
        summary.final_view.final_total.is_some(),
        "ending view is missing the final score"
    );
    Ok(())
}

fn flawless(summary: &SimulationSummary) -> Result<()> {
    let run = finished_run(summary)?;
    ensure!(run.total_attempts == 0, "{} failed attempts", run.total_attempts);
    ensure!(run.room_points == PERFECT_ROOM_POINTS, "room points {}", run.room_points);
    ensure!(run.perfection_bonus == PERFECTION_BONUS, "no perfection bonus");
    Ok(())
}

fn ranked(summary: &SimulationSummary) -> Result<()> {
    let run = finished_run(summary)?;
    if summary.leaderboard_rank.is_some() {
        return Ok(());
    }
    let board = &summary.hall_of_fame;
    ensure!(
        board.len() >= summary.leaderboard_capacity
            && board.iter().all(|entry| entry.score >= run.total),
        "{} points should have made the hall of fame",
        run.total
    );
    Ok(())
}

fn one_failure_per_room(summary: &SimulationSummary) -> Result<()> {
    let run = finished_run(summary)?;
    for room in RoomId::ALL {
        let attempts = run.attempts_by_room.get(&room).copied().unwrap_or(0);
        ensure!(attempts == 1, "{room} recorded {attempts} failed attempts");
    }
    ensure!(run.perfection_bonus == 0, "perfection bonus despite failures");
    ensure!(run.room_points == 4 * 900 + 1_350, "room points {}", run.room_points);
    Ok(())
}

fn hints_cost_points(summary: &SimulationSummary) -> Result<()> {
    let run = finished_run(summary)?;
    ensure!(summary.hints_revealed == 5, "revealed {} hints", summary.hints_revealed);
    ensure!(run.room_points == 4 * 800 + 1_200, "room points {}", run.room_points);
    ensure!(run.perfection_bonus == PERFECTION_BONUS, "hints forfeited perfection");
    Ok(())
}

fn timed_out(summary: &SimulationSummary) -> Result<()> {
    ensure!(summary.stage == Stage::Failed, "run {}", summary.outcome_label());
    ensure!(summary.run.is_none(), "failed run produced a score");
    ensure!(
        summary.leaderboard_rank.is_none(),
        "failed run reached the hall of fame"
    );
    ensure!(summary.final_view.remaining_seconds == 0, "clock not drained");
    Ok(())
}

fn score_adds_up(summary: &SimulationSummary) -> Result<()> {
    let Some(run) = &summary.run else {
        return Ok(());
    };
    ensure!(
        run.total == run.room_points + run.time_bonus + run.perfection_bonus,
        "score breakdown does not sum to {}",
        run.total
    );
    let by_room: u32 = run.attempts_by_room.values().sum();
    ensure!(by_room == run.total_attempts, "attempt tallies disagree");
    ensure!(
        run.time_remaining + run.time_taken == 600,
        "time split {} + {}",
        run.time_remaining,
        run.time_taken
    );
    Ok(())
}
