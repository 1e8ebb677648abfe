//! High-level runtime orchestrator.
//!
//! The runtime owns the session worker, wires up command/event channels, and
//! exposes a builder-based API for clients to drive the session.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::info;

use game_content::GameContent;
use game_core::{
    EffectCatalog, GameConfig, GameEngine, PcgRng, ResourceBook, RngOracle, SessionSnapshot,
    SkillBook,
};

use crate::api::{Result, RuntimeError, RuntimeHandle};
use crate::events::{Event, EventBus, SessionEvent, Topic};
use crate::workers::{Command, SessionClock, SessionWorker};

/// Runtime configuration shared across the orchestrator and workers.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub event_buffer_size: usize,
    pub command_buffer_size: usize,
    /// How often due engine timers are dispatched.
    pub tick_interval: Duration,
    /// Seed for every random decision of the session.
    pub seed: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 256,
            command_buffer_size: 32,
            tick_interval: Duration::from_millis(50),
            seed: 0,
        }
    }
}

/// Main runtime that hosts one play session
///
/// Design: Runtime owns the worker and coordinates shutdown.
/// [`RuntimeHandle`] provides a cloneable façade for clients.
pub struct Runtime {
    handle: RuntimeHandle,
    worker_handle: JoinHandle<()>,
}

impl Runtime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Get a cloneable handle to this runtime
    ///
    /// The handle can be shared across clients and async tasks.
    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.handle.subscribe(topic)
    }

    /// Shutdown the runtime gracefully
    ///
    /// The engine is torn down before the worker exits, so no timer fires
    /// afterwards. Handles still held by clients report
    /// [`RuntimeError::CommandChannelClosed`] from then on.
    pub async fn shutdown(self) -> Result<()> {
        // The worker may already be gone if every other handle was dropped.
        let _ = self.handle.shutdown().await;
        drop(self.handle);

        self.worker_handle.await.map_err(RuntimeError::WorkerJoin)
    }
}

/// Builder for [`Runtime`] with flexible configuration.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    game_config: GameConfig,
    catalog: Option<EffectCatalog>,
    skills: SkillBook,
    rng: Option<Arc<dyn RngOracle>>,
    snapshot: Option<SessionSnapshot>,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            game_config: GameConfig::default(),
            catalog: None,
            skills: SkillBook::new(),
            rng: None,
            snapshot: None,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Use loaded content: game configuration, effect catalog and upgrade lines.
    pub fn content(mut self, content: GameContent) -> Self {
        self.game_config = content.config;
        self.catalog = Some(content.catalog);
        self.skills = content.skills;
        self
    }

    pub fn game_config(mut self, config: GameConfig) -> Self {
        self.game_config = config;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Replace the random source (defaults to [`PcgRng`]).
    pub fn rng(mut self, rng: Arc<dyn RngOracle>) -> Self {
        self.rng = Some(rng);
        self
    }

    /// Resume from a saved session; the combo streak starts from zero.
    pub fn resume(mut self, snapshot: SessionSnapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    /// Build the runtime and spawn its session worker
    pub async fn build(self) -> Result<Runtime> {
        let seed = self.config.seed;
        let clock = SessionClock::start();
        let ledger = ResourceBook::with_energy(self.game_config.energy.max);

        let mut engine = GameEngine::builder()
            .config(self.game_config)
            .catalog(Arc::new(self.catalog.unwrap_or_else(EffectCatalog::standard)))
            .ledger(Box::new(ledger))
            .bonuses(Arc::new(self.skills.clone()))
            .rng(self.rng.unwrap_or_else(|| Arc::new(PcgRng)))
            .seed(seed)
            .build(clock.now_ms())?;
        if let Some(snapshot) = self.snapshot {
            engine.restore(snapshot, clock.now_ms(), true)?;
        }

        let (command_tx, command_rx) = mpsc::channel::<Command>(self.config.command_buffer_size);
        let event_bus = EventBus::with_capacity(self.config.event_buffer_size);
        let handle = RuntimeHandle::new(command_tx, event_bus.clone());

        // Events produced while building are not published.
        engine.drain_events();
        event_bus.publish(Event::Session(SessionEvent::Started { seed }));
        info!(seed, "session runtime started");

        let worker = SessionWorker::new(
            engine,
            self.skills,
            clock,
            self.config.tick_interval,
            command_rx,
            event_bus,
        );
        let worker_handle = tokio::spawn(async move {
            worker.run().await;
        });

        Ok(Runtime {
            handle,
            worker_handle,
        })
    }
}
