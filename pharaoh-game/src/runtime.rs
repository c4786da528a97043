//! Tokio driver for a live session.
//!
//! [`SessionRunner`] owns the engine and is its only writer. Player commands
//! arrive over an mpsc channel, the clock ticks on a `tokio::time::interval`,
//! and a sealed room completes after its presentation pause via
//! `sleep_until`. Commands are polled first so a completion landing on the
//! same boundary as a tick always wins. Shutdown applies every command
//! already queued before handing the engine back.
use log::debug;
use std::future;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};

use crate::constants::LOG_TARGET;
use crate::session::{Action, SessionEvent};
use crate::storage::RecordStorage;
use crate::summary::SessionView;
use crate::GameEngine;

const COMMAND_BUFFER: usize = 32;

/// Player input forwarded to the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Dispatch(Action),
    Pick(String),
    Unpick(String),
    Submit,
    ToggleHint,
    ClearRoom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("session runner has stopped")]
pub struct RunnerClosed;

pub struct SessionRunner<S>
where
    S: RecordStorage,
{
    engine: GameEngine<S>,
    commands: mpsc::Receiver<Command>,
    views: watch::Sender<SessionView>,
    cancel: oneshot::Receiver<()>,
}

impl<S> SessionRunner<S>
where
    S: RecordStorage + Send + 'static,
{
    /// Move `engine` onto its own task and return the handle that drives it.
    #[must_use]
    pub fn spawn(engine: GameEngine<S>) -> SessionHandle<S> {
        let (command_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (views, view_rx) = watch::channel(engine.view());
        let (cancel_tx, cancel) = oneshot::channel();
        let runner = Self {
            engine,
            commands,
            views,
            cancel,
        };
        SessionHandle {
            commands: command_tx,
            views: view_rx,
            cancel: Some(cancel_tx),
            task: tokio::spawn(runner.run()),
        }
    }

    async fn run(mut self) -> GameEngine<S> {
        let period = Duration::from_millis(self.engine.config().tick_millis);
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut deadline: Option<Instant> = None;

        loop {
            let completion = async move {
                match deadline {
                    Some(at) => time::sleep_until(at).await,
                    None => future::pending().await,
                }
            };
            let events = tokio::select! {
                biased;
                _ = &mut self.cancel => {
                    self.drain();
                    break;
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                () = completion => self.engine.complete_pending(),
                _ = ticker.tick() => self.engine.dispatch(Action::Tick),
            };

            if events
                .iter()
                .any(|event| matches!(event, SessionEvent::Started { .. }))
            {
                ticker.reset();
            }
            deadline = match (deadline, self.engine.completion_delay()) {
                (Some(at), Some(_)) => Some(at),
                (None, Some(delay)) => Some(Instant::now() + delay),
                (_, None) => None,
            };
            self.publish();
        }
        debug!(target: LOG_TARGET, "session runner stopped");
        self.engine
    }

    /// Apply every command already accepted by `send`, then refuse new ones.
    fn drain(&mut self) {
        self.commands.close();
        while let Ok(command) = self.commands.try_recv() {
            self.handle(command);
        }
        self.publish();
    }

    fn handle(&mut self, command: Command) -> Vec<SessionEvent> {
        let engine = &mut self.engine;
        let outcome = match command {
            Command::Dispatch(action) => return engine.dispatch(action),
            Command::Pick(token) => engine.pick(&token).map(|turn| turn.events),
            Command::Submit => engine.submit().map(|turn| turn.events),
            Command::Unpick(token) => engine.unpick(&token).map(|()| Vec::new()),
            Command::ToggleHint => engine.toggle_hint().map(|_| Vec::new()),
            Command::ClearRoom => engine.clear_room().map(|()| Vec::new()),
        };
        outcome.unwrap_or_else(|err| {
            debug!(target: LOG_TARGET, "input refused: {err}");
            Vec::new()
        })
    }

    fn publish(&self) {
        let next = self.engine.view();
        self.views.send_if_modified(|view| {
            if *view == next {
                false
            } else {
                *view = next;
                true
            }
        });
    }
}

/// Control side of a spawned [`SessionRunner`].
pub struct SessionHandle<S>
where
    S: RecordStorage,
{
    commands: mpsc::Sender<Command>,
    views: watch::Receiver<SessionView>,
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<GameEngine<S>>,
}

impl<S> SessionHandle<S>
where
    S: RecordStorage,
{
    /// Queue a command for the runner.
    ///
    /// # Errors
    ///
    /// Returns an error if the runner has already stopped.
    pub async fn send(&self, command: Command) -> Result<(), RunnerClosed> {
        self.commands.send(command).await.map_err(|_| RunnerClosed)
    }

    /// Latest published view.
    #[must_use]
    pub fn view(&self) -> SessionView {
        self.views.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.views.clone()
    }

    /// Wait until a published view satisfies `predicate`.
    ///
    /// # Errors
    ///
    /// Returns an error if the runner stops first.
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&SessionView) -> bool,
    ) -> Result<SessionView, RunnerClosed> {
        self.views
            .wait_for(predicate)
            .await
            .map(|view| view.clone())
            .map_err(|_| RunnerClosed)
    }

    /// Stop the runner and take the engine back. Consuming the handle makes a
    /// second cancellation impossible.
    pub async fn shutdown(mut self) -> Option<GameEngine<S>> {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        self.task.await.ok()
    }
}
