//! Session worker that owns the authoritative [`GameEngine`].
//!
//! Receives commands from [`RuntimeHandle`](crate::RuntimeHandle), drives the
//! engine's timers from a tokio interval, and publishes drained engine events
//! to the EventBus.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use game_core::{
    ApplyOutcome, ClickOutcome, EffectId, GameEngine, GameError, HitInput, ResourceKind,
    SessionSnapshot, SessionStatus, SkillBook,
};

use crate::api::{Result, RuntimeError};
use crate::events::{Event, EventBus, SessionEvent};

/// Commands that can be sent to the session worker
pub enum Command {
    Click {
        input: HitInput,
        reply: oneshot::Sender<ClickOutcome>,
    },
    ClickRegion {
        index: usize,
        reply: oneshot::Sender<Result<ClickOutcome>>,
    },
    ApplyEffect {
        id: EffectId,
        reply: oneshot::Sender<Result<ApplyOutcome>>,
    },
    RemoveEffect {
        id: EffectId,
        reply: oneshot::Sender<bool>,
    },
    ClaimMysteryBox {
        kind: ResourceKind,
        reply: oneshot::Sender<Result<u64>>,
    },
    SetSkillLevel {
        name: String,
        level: u32,
        reply: oneshot::Sender<Result<u32>>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Restore {
        snapshot: Box<SessionSnapshot>,
        reset_combo: bool,
        reply: oneshot::Sender<Result<()>>,
    },
    Reset {
        reply: oneshot::Sender<Result<()>>,
    },
    /// Query the current session status (read-only).
    QueryStatus {
        reply: oneshot::Sender<SessionStatus>,
    },
    /// Tear the engine down and stop the loop.
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Monotonic session time in milliseconds, starting at zero.
#[derive(Clone, Copy, Debug)]
pub struct SessionClock {
    origin: Instant,
}

impl SessionClock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Background task that processes session commands.
pub struct SessionWorker {
    engine: GameEngine,
    skills: SkillBook,
    clock: SessionClock,
    tick_interval: Duration,
    command_rx: mpsc::Receiver<Command>,
    event_bus: EventBus,
}

impl SessionWorker {
    pub fn new(
        engine: GameEngine,
        skills: SkillBook,
        clock: SessionClock,
        tick_interval: Duration,
        command_rx: mpsc::Receiver<Command>,
        event_bus: EventBus,
    ) -> Self {
        info!(
            regions = engine.field().len(),
            effects = engine.effects().catalog().len(),
            tick_ms = tick_interval.as_millis() as u64,
            "SessionWorker initialized"
        );

        Self {
            engine,
            skills,
            clock,
            tick_interval,
            command_rx,
            event_bus,
        }
    }

    /// Main worker loop.
    ///
    /// Ends on [`Command::Shutdown`] or when every handle has been dropped.
    /// The engine is torn down either way.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let shutdown_reply = loop {
            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(Command::Shutdown { reply }) => break Some(reply),
                    Some(cmd) => self.handle_command(cmd),
                    None => break None,
                },
                _ = ticker.tick() => {
                    let now = self.clock.now_ms();
                    let fired = self.engine.advance(now);
                    if fired > 0 {
                        debug!(fired, now, "timers dispatched");
                    }
                    self.publish_pending(now);
                }
            }
        };

        let now = self.clock.now_ms();
        self.engine.teardown(now);
        self.publish_pending(now);
        self.event_bus
            .publish(Event::Session(SessionEvent::Stopped { at_ms: now }));
        info!(now, "session worker stopped");

        if let Some(reply) = shutdown_reply
            && reply.send(()).is_err()
        {
            debug!("Shutdown reply channel closed (caller dropped)");
        }
    }

    fn handle_command(&mut self, cmd: Command) {
        let now = self.clock.now_ms();
        match cmd {
            Command::Click { input, reply } => {
                let outcome = self.engine.click(input, now);
                self.reply(reply, outcome, "Click", now);
            }
            Command::ClickRegion { index, reply } => {
                let result = self.engine.click_region(index, now).map_err(log_engine_error);
                self.reply(reply, result, "ClickRegion", now);
            }
            Command::ApplyEffect { id, reply } => {
                let result = self.engine.apply_effect(id, now).map_err(log_engine_error);
                self.reply(reply, result, "ApplyEffect", now);
            }
            Command::RemoveEffect { id, reply } => {
                let removed = self.engine.remove_effect(id, now);
                self.reply(reply, removed, "RemoveEffect", now);
            }
            Command::ClaimMysteryBox { kind, reply } => {
                let result = self
                    .engine
                    .claim_mystery_box(kind, now)
                    .map_err(log_engine_error);
                self.reply(reply, result, "ClaimMysteryBox", now);
            }
            Command::SetSkillLevel { name, level, reply } => {
                let result = self.set_skill_level(name, level);
                self.reply(reply, result, "SetSkillLevel", now);
            }
            Command::Snapshot { reply } => {
                self.engine.advance(now);
                let snapshot = self.engine.snapshot();
                self.reply(reply, snapshot, "Snapshot", now);
            }
            Command::Restore {
                snapshot,
                reset_combo,
                reply,
            } => {
                let result = self
                    .engine
                    .restore(*snapshot, now, reset_combo)
                    .map_err(log_engine_error);
                if result.is_ok() {
                    self.event_bus
                        .publish(Event::Session(SessionEvent::Restored { reset_combo }));
                }
                self.reply(reply, result, "Restore", now);
            }
            Command::Reset { reply } => {
                let result = self.engine.reset(now).map_err(log_engine_error);
                if result.is_ok() {
                    self.event_bus.publish(Event::Session(SessionEvent::Reset));
                }
                self.reply(reply, result, "Reset", now);
            }
            Command::QueryStatus { reply } => {
                let status = self.engine.status(now);
                self.reply(reply, status, "QueryStatus", now);
            }
            Command::Shutdown { .. } => {
                // Intercepted by the run loop.
            }
        }
    }

    /// Publishes the events the command produced, then answers it.
    fn reply<T>(&mut self, reply: oneshot::Sender<T>, value: T, command: &'static str, now: u64) {
        self.publish_pending(now);
        if reply.send(value).is_err() {
            debug!(command, "reply channel closed (caller dropped)");
        }
    }

    fn set_skill_level(&mut self, name: String, level: u32) -> Result<u32> {
        let Some(stored) = self.skills.set_level(&name, level) else {
            return Err(RuntimeError::UnknownSkill(name));
        };
        self.engine.set_bonuses(Arc::new(self.skills.clone()));
        self.event_bus.publish(Event::Session(SessionEvent::SkillChanged {
            name,
            level: stored,
        }));
        Ok(stored)
    }

    fn publish_pending(&mut self, now: u64) {
        for event in self.engine.drain_events() {
            self.event_bus.publish(Event::Game { at_ms: now, event });
        }
    }
}

fn log_engine_error(error: game_core::EngineError) -> RuntimeError {
    warn!(
        error = %error,
        code = error.error_code(),
        severity = error.severity().as_str(),
        "engine request refused"
    );
    RuntimeError::Engine(error)
}
