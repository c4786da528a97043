use anyhow::{Context, Result, anyhow};
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;

use pharaoh_game::{
    Action, Command, GameEngine, LeaderboardEntry, PlayError, RoomCatalog, RoomId, RunSummary,
    SessionConfig, SessionEvent, SessionHandle, SessionRunner, SessionView, Stage, SubmitMode,
};

use crate::logic::policy::{GameplayStrategy, Move, answer_for};
use crate::logic::storage::TesterStorage;

pub type TesterEngine = GameEngine<TesterStorage>;

/// Upper bound on inputs per run; a stuck policy still lets the clock expire.
const MAX_MOVES: usize = 5_000;
const REALTIME_WAIT: Duration = Duration::from_secs(30);

/// How a plan drives the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    /// Synchronous: the policy moves, then the clock advances `seconds_per_move`.
    Stepped { seconds_per_move: u32 },
    /// Tokio runner with a shortened second and presentation pause.
    Realtime { tick_millis: u64, pause_millis: u64 },
}

#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub strategy: GameplayStrategy,
    pub driver: Driver,
    pub config: SessionConfig,
    pub setup: Option<fn(&mut TesterEngine) -> Vec<SessionEvent>>,
    pub expectations: Vec<SimulationExpectation>,
}

impl SimulationPlan {
    #[must_use]
    pub fn new(strategy: GameplayStrategy) -> Self {
        Self {
            strategy,
            driver: Driver::Stepped {
                seconds_per_move: 1,
            },
            config: SessionConfig::default(),
            setup: None,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_driver(mut self, driver: Driver) -> Self {
        self.driver = driver;
        self
    }

    #[must_use]
    pub fn with_time_limit(mut self, time_limit_secs: u32) -> Self {
        self.config.time_limit_secs = time_limit_secs;
        self.config.urgent_threshold_secs = self.config.urgent_threshold_secs.min(time_limit_secs);
        self
    }

    #[must_use]
    pub fn with_setup(mut self, setup: fn(&mut TesterEngine) -> Vec<SessionEvent>) -> Self {
        self.setup = Some(setup);
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<SimulationExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Assertion hook run after a simulation completes.
type SimulationExpectationFn = Arc<dyn Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct SimulationExpectation(SimulationExpectationFn);

impl std::fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationExpectation").finish()
    }
}

impl SimulationExpectation {
    pub fn evaluate(&self, summary: &SimulationSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// Complete record of a simulated run.
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub seed: u64,
    pub strategy: GameplayStrategy,
    pub username: String,
    pub stage: Stage,
    pub moves: usize,
    pub rejected_actions: usize,
    pub refused_inputs: usize,
    pub hints_revealed: usize,
    pub final_view: SessionView,
    pub run: Option<RunSummary>,
    pub leaderboard_rank: Option<usize>,
    /// Board as it stood after this run was recorded.
    pub hall_of_fame: Vec<LeaderboardEntry>,
    pub leaderboard_capacity: usize,
    /// Broken clock or score monotonicity observed during play.
    pub violations: Vec<String>,
}

impl SimulationSummary {
    #[must_use]
    pub const fn finished(&self) -> bool {
        matches!(self.stage, Stage::Ending)
    }

    #[must_use]
    pub fn outcome_label(&self) -> String {
        match &self.run {
            Some(run) => format!("escaped with {} points", run.total),
            None => format!("ended in {}", self.stage),
        }
    }
}

/// Tracks monotonic quantities across a run.
#[derive(Debug, Default)]
struct Watchdog {
    last_remaining: Option<u32>,
    last_points: u32,
    violations: Vec<String>,
}

impl Watchdog {
    fn observe(&mut self, view: &SessionView) {
        if !view.show_hud {
            return;
        }
        if let Some(last) = self.last_remaining {
            if view.remaining_seconds > last {
                self.violations.push(format!(
                    "clock went up from {last} to {}",
                    view.remaining_seconds
                ));
            }
        }
        if view.cumulative_points < self.last_points {
            self.violations.push(format!(
                "points went down from {} to {}",
                self.last_points, view.cumulative_points
            ));
        }
        self.last_remaining = Some(view.remaining_seconds);
        self.last_points = view.cumulative_points;
    }
}

#[derive(Debug, Clone)]
pub struct GameTester {
    verbose: bool,
    storage: TesterStorage,
}

impl GameTester {
    pub const fn new(storage: TesterStorage, verbose: bool) -> Self {
        Self { verbose, storage }
    }

    fn engine(&self, config: SessionConfig, catalog: RoomCatalog) -> Result<TesterEngine> {
        GameEngine::with_config(self.storage.clone(), config, catalog)
            .context("invalid simulation configuration")
    }

    /// Run one plan to completion under `seed`.
    ///
    /// # Errors
    ///
    /// Returns an error if the plan's configuration is invalid or a realtime
    /// run stalls.
    pub async fn run_plan(&self, plan: &SimulationPlan, seed: u64) -> Result<SimulationSummary> {
        match plan.driver {
            Driver::Stepped { seconds_per_move } => self.run_stepped(plan, seed, seconds_per_move),
            Driver::Realtime {
                tick_millis,
                pause_millis,
            } => self.run_realtime(plan, seed, tick_millis, pause_millis).await,
        }
    }

    fn run_stepped(
        &self,
        plan: &SimulationPlan,
        seed: u64,
        seconds_per_move: u32,
    ) -> Result<SimulationSummary> {
        let mut engine = self.engine(plan.config.clone(), RoomCatalog::default())?;
        let mut policy = plan.strategy.create_policy(seed);
        let username = player_name(plan.strategy, seed);
        let mut watchdog = Watchdog::default();
        let mut rejected = 0;
        let mut refused = 0;
        let mut hints = 0;
        let mut moves = 0;

        rejected += rejections(&engine.dispatch(Action::SubmitName(username.clone())));
        rejected += rejections(&engine.dispatch(Action::Start));
        if let Some(setup) = plan.setup {
            rejected += rejections(&setup(&mut engine));
        }

        while engine.session().stage().is_gameplay() && moves < MAX_MOVES {
            watchdog.observe(&engine.view());
            if engine.session().pending().is_some() {
                rejected += rejections(&engine.complete_pending());
                continue;
            }
            let Some(room) = engine.room() else {
                break;
            };
            let next = policy.next_move(room, engine.session());
            if self.verbose {
                log::debug!("{} in {}: {next:?}", policy.name(), room.id());
            }
            moves += 1;
            match apply_move(&mut engine, &next) {
                Ok(events) => rejected += rejections(&events),
                Err(_) => refused += 1,
            }
            if next == Move::ToggleHint {
                hints += 1;
            }
            for _ in 0..seconds_per_move {
                rejected += rejections(&engine.dispatch(Action::Tick));
            }
        }
        watchdog.observe(&engine.view());

        Ok(SimulationSummary {
            seed,
            strategy: plan.strategy,
            username,
            stage: engine.session().stage(),
            moves,
            rejected_actions: rejected,
            refused_inputs: refused,
            hints_revealed: hints,
            final_view: engine.view(),
            run: engine.summary(),
            leaderboard_rank: engine.standing().and_then(|standing| standing.rank),
            hall_of_fame: engine
                .standing()
                .map(|standing| standing.entries.clone())
                .unwrap_or_default(),
            leaderboard_capacity: engine.config().leaderboard_capacity,
            violations: watchdog.violations,
        })
    }

    async fn run_realtime(
        &self,
        plan: &SimulationPlan,
        seed: u64,
        tick_millis: u64,
        pause_millis: u64,
    ) -> Result<SimulationSummary> {
        let config = SessionConfig {
            tick_millis,
            ..plan.config.clone()
        };
        let mut catalog = RoomCatalog::default();
        for room in &mut catalog.rooms {
            room.completion_delay_millis = pause_millis;
        }
        let engine = self.engine(config, catalog.clone())?;
        let username = player_name(plan.strategy, seed);
        let mut handle = SessionRunner::spawn(engine);
        let mut watchdog = Watchdog::default();
        let mut moves = 0;

        handle
            .send(Command::Dispatch(Action::SubmitName(username.clone())))
            .await?;
        handle.send(Command::Dispatch(Action::Start)).await?;

        for id in RoomId::ALL {
            let number = Some(id.number());
            let view = wait(&mut handle, |view| {
                view.stage.is_terminal() || (view.room_number == number && !view.awaiting_completion)
            })
            .await?;
            watchdog.observe(&view);
            if view.stage.is_terminal() {
                break;
            }
            let def = catalog
                .room(id)
                .ok_or_else(|| anyhow!("room {id} missing from catalog"))?;
            for token in answer_for(def) {
                handle.send(Command::Pick(token)).await?;
                moves += 1;
            }
            if def.selection.submit == SubmitMode::Explicit {
                handle.send(Command::Submit).await?;
                moves += 1;
            }
            if self.verbose {
                println!("  {} {} placed", "⏱".cyan(), id);
            }
        }

        let view = wait(&mut handle, |view| view.stage.is_terminal()).await?;
        watchdog.observe(&view);
        let engine = handle
            .shutdown()
            .await
            .ok_or_else(|| anyhow!("session runner panicked"))?;

        Ok(SimulationSummary {
            seed,
            strategy: plan.strategy,
            username,
            stage: engine.session().stage(),
            moves,
            rejected_actions: 0,
            refused_inputs: 0,
            hints_revealed: 0,
            final_view: engine.view(),
            run: engine.summary(),
            leaderboard_rank: engine.standing().and_then(|standing| standing.rank),
            hall_of_fame: engine
                .standing()
                .map(|standing| standing.entries.clone())
                .unwrap_or_default(),
            leaderboard_capacity: engine.config().leaderboard_capacity,
            violations: watchdog.violations,
        })
    }
}

async fn wait(
    handle: &mut SessionHandle<TesterStorage>,
    predicate: impl FnMut(&SessionView) -> bool,
) -> Result<SessionView> {
    tokio::time::timeout(REALTIME_WAIT, handle.wait_for(predicate))
        .await
        .context("realtime session stalled")?
        .context("realtime session stopped early")
}

fn rejections(events: &[SessionEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, SessionEvent::Rejected(_)))
        .count()
}

fn apply_move(engine: &mut TesterEngine, next: &Move) -> Result<Vec<SessionEvent>, PlayError> {
    match next {
        Move::Pick(token) => engine.pick(token).map(|turn| turn.events),
        Move::Unpick(token) => engine.unpick(token).map(|()| Vec::new()),
        Move::Submit => engine.submit().map(|turn| turn.events),
        Move::ToggleHint => engine.toggle_hint().map(|_| Vec::new()),
        Move::Clear => engine.clear_room().map(|()| Vec::new()),
        Move::Wait => Ok(Vec::new()),
    }
}

fn player_name(strategy: GameplayStrategy, seed: u64) -> String {
    let label: String = strategy.label().split_whitespace().collect();
    format!("{label}-{seed}")
}
