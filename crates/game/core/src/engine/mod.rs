//! Session engine: the single owner of every piece of mutable game state.
//!
//! The [`GameEngine`] wires the effect engine, target field, combo tracker,
//! ledger and timer registry together. Input enters through
//! [`GameEngine::click`]; time enters through [`GameEngine::advance`], which
//! pops due timers in deadline order and dispatches them through the same
//! entry points used by input. Nothing here reads the wall clock.

mod click;
mod errors;

pub use click::{ClickFlags, ClickOutcome, HitReport};
pub use errors::EngineError;

use std::sync::Arc;

use tracing::{debug, info};

use crate::bonus::{BonusProvider, NoBonuses};
use crate::combo::{ComboState, ComboTracker};
use crate::config::GameConfig;
use crate::effects::{
    ApplyOutcome, EffectCatalog, EffectContext, EffectEngine, EffectId, FiredTimer,
    ModifierSummary, Polarity, TimerPurpose, TimerRegistry,
};
use crate::env::{Dice, PcgRng, RngOracle};
use crate::events::{EventSink, GameEvent};
use crate::field::{LayoutKind, TargetField};
use crate::ledger::{ResourceBook, ResourceKind, ResourceLedger};
use crate::snapshot::{ClickStats, SessionSnapshot, SnapshotError};

/// Borrows the engine's collaborators as an [`EffectContext`].
///
/// A macro rather than a method so the borrow stays field-precise and
/// `self.effects` remains available alongside the context.
macro_rules! effect_ctx {
    ($engine:expr, $now:expr) => {
        EffectContext {
            now: $now,
            config: &$engine.config,
            ledger: &mut *$engine.ledger,
            bonuses: &*$engine.bonuses,
            dice: &mut $engine.dice,
            field: &mut $engine.field,
            timers: &mut $engine.timers,
            events: &mut $engine.events,
        }
    };
}
pub(crate) use effect_ctx;

/// Point-in-time view of a session for status displays.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionStatus {
    pub now: u64,
    pub combo: u32,
    pub combo_deadline: u64,
    pub combo_frozen: bool,
    pub target: usize,
    pub regions: usize,
    pub rotation_angle: f64,
    pub rotation_speed: f64,
    pub gold: u64,
    pub energy: u64,
    /// Active effects with their remaining time (`None` for counted effects).
    pub active: Vec<(EffectId, Option<u64>)>,
    pub shield_charges: u32,
    pub star_power_clicks: u32,
    pub mystery_box: Option<Vec<ResourceKind>>,
    pub stats: ClickStats,
    pub destroyed: bool,
}

pub struct GameEngineBuilder {
    config: GameConfig,
    catalog: Option<Arc<EffectCatalog>>,
    ledger: Option<Box<dyn ResourceLedger>>,
    bonuses: Option<Arc<dyn BonusProvider>>,
    rng: Option<Arc<dyn RngOracle>>,
    seed: u64,
    target: Option<usize>,
}

impl GameEngineBuilder {
    fn new() -> Self {
        Self {
            config: GameConfig::default(),
            catalog: None,
            ledger: None,
            bonuses: None,
            rng: None,
            seed: 0,
            target: None,
        }
    }

    pub fn config(mut self, config: GameConfig) -> Self {
        self.config = config;
        self
    }

    pub fn catalog(mut self, catalog: Arc<EffectCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Defaults to a [`ResourceBook`] with a full, capped energy meter.
    pub fn ledger(mut self, ledger: Box<dyn ResourceLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn bonuses(mut self, bonuses: Arc<dyn BonusProvider>) -> Self {
        self.bonuses = Some(bonuses);
        self
    }

    /// Defaults to [`PcgRng`].
    pub fn rng(mut self, rng: Arc<dyn RngOracle>) -> Self {
        self.rng = Some(rng);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Places the initial target instead of rolling it.
    pub fn target(mut self, index: usize) -> Self {
        self.target = Some(index);
        self
    }

    /// Builds the engine with its clock at `now` and arms the system timers.
    pub fn build(self, now: u64) -> Result<GameEngine, EngineError> {
        let config = self.config;
        let oracle = self.rng.unwrap_or_else(|| Arc::new(PcgRng));
        let mut dice = Dice::new(oracle, self.seed);
        let mut events = EventSink::new();

        let mut field = TargetField::new(&config, &mut dice, &mut events)?;
        if let Some(index) = self.target {
            field.generate_layout(config.layout, Some(index), &mut dice, &mut events)?;
        }

        let mut timers = TimerRegistry::new();
        schedule_system_timers(&mut timers, &config, now);

        let ledger = self
            .ledger
            .unwrap_or_else(|| Box::new(ResourceBook::with_energy(config.energy.max)));
        let catalog = self
            .catalog
            .unwrap_or_else(|| Arc::new(EffectCatalog::standard()));

        info!(
            seed = self.seed,
            regions = field.len(),
            effects = catalog.len(),
            "game engine initialized"
        );

        Ok(GameEngine {
            effects: EffectEngine::new(catalog),
            field,
            combo: ComboTracker::new(),
            ledger,
            bonuses: self.bonuses.unwrap_or_else(|| Arc::new(NoBonuses)),
            dice,
            timers,
            events,
            stats: ClickStats::default(),
            clock: now,
            config,
        })
    }
}

fn schedule_system_timers(timers: &mut TimerRegistry, config: &GameConfig, now: u64) {
    timers.schedule_repeating(now, config.watchdog.effect_interval_ms, TimerPurpose::EffectWatchdog);
    timers.schedule_repeating(now, config.watchdog.combo_interval_ms, TimerPurpose::ComboWatchdog);
    timers.schedule_repeating(now, config.energy.regen_interval_ms, TimerPurpose::EnergyRegen);
}

/// Authoritative state machine for one play session.
pub struct GameEngine {
    config: GameConfig,
    effects: EffectEngine,
    field: TargetField,
    combo: ComboTracker,
    ledger: Box<dyn ResourceLedger>,
    bonuses: Arc<dyn BonusProvider>,
    dice: Dice,
    timers: TimerRegistry,
    events: EventSink,
    stats: ClickStats,
    /// Latest instant the engine has observed; drives ring rotation.
    clock: u64,
}

impl GameEngine {
    pub fn builder() -> GameEngineBuilder {
        GameEngineBuilder::new()
    }

    /// Dispatches every timer due at or before `now`, in deadline order.
    ///
    /// Returns the number of timers fired.
    pub fn advance(&mut self, now: u64) -> usize {
        if self.is_destroyed() {
            return 0;
        }
        let mut fired = 0;
        while let Some(timer) = self.timers.pop_due(now) {
            self.advance_clock(timer.due_at);
            self.dispatch(timer);
            fired += 1;
        }
        self.advance_clock(now);
        fired
    }

    fn advance_clock(&mut self, to: u64) {
        if to > self.clock {
            self.field.advance_rotation(to - self.clock);
            self.clock = to;
        }
    }

    fn dispatch(&mut self, timer: FiredTimer) {
        let now = timer.due_at;
        match timer.purpose {
            TimerPurpose::Expire(_) | TimerPurpose::Tick(_) => {
                self.effects.on_timer(timer, &mut effect_ctx!(self, now));
            }
            TimerPurpose::EffectWatchdog => {
                let ceiling = self.config.watchdog.safety_ceiling_ms;
                self.effects
                    .force_expire_stale(ceiling, &mut effect_ctx!(self, now));
            }
            TimerPurpose::ComboWatchdog => self.expire_combo(now),
            TimerPurpose::EnergyRegen => self.regenerate_energy(now),
        }
    }

    pub(crate) fn expire_combo(&mut self, now: u64) {
        let frozen = self.effects.counters().frozen_combo;
        if let Some(previous) = self.combo.expire_if_due(now, frozen) {
            debug!(previous, "combo expired");
            self.events
                .push(GameEvent::ComboChanged { previous, count: 0 });
        }
    }

    fn regenerate_energy(&mut self, now: u64) {
        if self.effects.modifiers(now).blocks_energy_regen {
            return;
        }
        let credited = self
            .ledger
            .add(ResourceKind::Energy, self.config.energy.regen_amount);
        self.events.resource(
            ResourceKind::Energy,
            credited as i64,
            self.ledger.get(ResourceKind::Energy),
        );
    }

    fn ensure_live(&self) -> Result<(), EngineError> {
        if self.is_destroyed() {
            Err(EngineError::Destroyed)
        } else {
            Ok(())
        }
    }

    pub fn apply_effect(&mut self, id: EffectId, now: u64) -> Result<ApplyOutcome, EngineError> {
        self.advance(now);
        Ok(self.effects.apply_effect(id, &mut effect_ctx!(self, now))?)
    }

    /// Returns false when `id` was not active.
    pub fn remove_effect(&mut self, id: EffectId, now: u64) -> bool {
        self.advance(now);
        self.effects.remove_effect(
            id,
            crate::events::ExpiryReason::Removed,
            &mut effect_ctx!(self, now),
        )
    }

    pub fn remove_polarity(&mut self, polarity: Polarity, now: u64) -> usize {
        self.advance(now);
        self.effects
            .remove_polarity(polarity, &mut effect_ctx!(self, now))
    }

    pub fn claim_mystery_box(&mut self, kind: ResourceKind, now: u64) -> Result<u64, EngineError> {
        self.advance(now);
        Ok(self
            .effects
            .claim_mystery_box(kind, &mut effect_ctx!(self, now))?)
    }

    /// Runs the stale-effect sweep immediately instead of waiting for its timer.
    pub fn sweep(&mut self, now: u64) -> usize {
        self.advance(now);
        let ceiling = self.config.watchdog.safety_ceiling_ms;
        self.effects
            .force_expire_stale(ceiling, &mut effect_ctx!(self, now))
    }

    pub fn set_target(&mut self, index: usize, now: u64) -> Result<bool, EngineError> {
        self.ensure_live()?;
        self.advance(now);
        Ok(self
            .field
            .set_target(index, &mut self.dice, &mut self.events)?)
    }

    pub fn shuffle(&mut self, now: u64) -> Result<bool, EngineError> {
        self.ensure_live()?;
        self.advance(now);
        Ok(self.field.shuffle(&mut self.dice, &mut self.events)?)
    }

    pub fn generate_layout(
        &mut self,
        layout: LayoutKind,
        target: Option<usize>,
        now: u64,
    ) -> Result<(), EngineError> {
        self.ensure_live()?;
        self.advance(now);
        self.field
            .generate_layout(layout, target, &mut self.dice, &mut self.events)?;
        Ok(())
    }

    /// Swaps the upgrade source. Durations already resolved are not rescheduled.
    pub fn set_bonuses(&mut self, bonuses: Arc<dyn BonusProvider>) {
        self.bonuses = bonuses;
    }

    pub fn replace_catalog(&mut self, catalog: Arc<EffectCatalog>) {
        self.effects.replace_catalog(catalog);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let resources = ResourceKind::HOLDINGS
            .iter()
            .chain(std::iter::once(&ResourceKind::Energy))
            .map(|kind| (*kind, self.ledger.get(*kind)))
            .filter(|(_, amount)| *amount > 0)
            .collect();
        SessionSnapshot {
            resources,
            counters: self.effects.counters().clone(),
            combo: self.combo.state(),
            target_index: self.field.target(),
            stats: self.stats,
        }
    }

    /// Loads a snapshot. Active effects are cleared, never restored, and so
    /// is the counter state they own (combo freeze, heavy-click progress).
    ///
    /// With `reset_combo` the streak starts from zero instead of the saved one.
    pub fn restore(
        &mut self,
        snapshot: SessionSnapshot,
        now: u64,
        reset_combo: bool,
    ) -> Result<(), EngineError> {
        self.ensure_live()?;
        if snapshot.target_index >= self.field.len() {
            return Err(SnapshotError::TargetOutOfRange {
                index: snapshot.target_index,
                len: self.field.len(),
            }
            .into());
        }
        self.advance(now);
        self.effects.clear_all(&mut effect_ctx!(self, now));

        for kind in ResourceKind::HOLDINGS
            .iter()
            .chain(std::iter::once(&ResourceKind::Energy))
        {
            let amount = snapshot.resources.get(kind).copied().unwrap_or(0);
            self.ledger.set(*kind, amount);
        }
        self.effects.restore_counters(snapshot.counters);
        self.combo = if reset_combo {
            ComboTracker::new()
        } else {
            ComboTracker::from_state(snapshot.combo)
        };
        self.field
            .set_target(snapshot.target_index, &mut self.dice, &mut self.events)?;
        self.stats = snapshot.stats;
        info!(target_index = snapshot.target_index, reset_combo, "session restored");
        Ok(())
    }

    /// Clears effects, resources, combo and stats, and rolls a fresh layout.
    pub fn reset(&mut self, now: u64) -> Result<(), EngineError> {
        self.ensure_live()?;
        self.advance(now);
        self.effects.clear_all(&mut effect_ctx!(self, now));
        for kind in ResourceKind::HOLDINGS {
            self.ledger.set(kind, 0);
        }
        self.ledger
            .set(ResourceKind::Energy, self.config.energy.max);
        let previous = self.combo.reset();
        if previous > 0 {
            self.events
                .push(GameEvent::ComboChanged { previous, count: 0 });
        }
        self.stats = ClickStats::default();
        self.field
            .generate_layout(self.config.layout, None, &mut self.dice, &mut self.events)?;
        info!("session reset");
        Ok(())
    }

    /// Cancels every timer and marks the engine destroyed. Idempotent.
    pub fn teardown(&mut self, now: u64) {
        if self.is_destroyed() {
            return;
        }
        self.effects.teardown(&mut effect_ctx!(self, now));
        info!("game engine torn down");
    }

    pub fn is_destroyed(&self) -> bool {
        self.effects.is_destroyed()
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain()
    }

    pub fn pending_events(&self) -> &[GameEvent] {
        self.events.pending()
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn effects(&self) -> &EffectEngine {
        &self.effects
    }

    pub fn field(&self) -> &TargetField {
        &self.field
    }

    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    pub fn ledger(&self) -> &dyn ResourceLedger {
        self.ledger.as_ref()
    }

    pub fn resource(&self, kind: ResourceKind) -> u64 {
        self.ledger.get(kind)
    }

    pub fn combo_state(&self) -> ComboState {
        self.combo.state()
    }

    /// Streak as observed at `now`, honouring lazy expiry and freezes.
    pub fn combo_count(&self, now: u64) -> u32 {
        self.combo
            .count_at(now, self.effects.counters().frozen_combo)
    }

    pub fn is_active(&self, id: EffectId, now: u64) -> bool {
        self.effects.is_active_at(id, now)
    }

    pub fn modifiers(&self, now: u64) -> ModifierSummary {
        self.effects.modifiers(now)
    }

    pub fn stats(&self) -> ClickStats {
        self.stats
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn status(&self, now: u64) -> SessionStatus {
        let counters = self.effects.counters();
        SessionStatus {
            now,
            combo: self.combo_count(now),
            combo_deadline: self.combo.state().deadline,
            combo_frozen: counters.frozen_combo,
            target: self.field.target(),
            regions: self.field.len(),
            rotation_angle: self.field.rotation_angle(),
            rotation_speed: self.field.rotation_speed().effective(),
            gold: self.ledger.get(ResourceKind::Gold),
            energy: self.ledger.get(ResourceKind::Energy),
            active: self
                .effects
                .active_effects()
                .map(|e| (e.id, e.remaining_ms(now)))
                .collect(),
            shield_charges: counters.shield_charges,
            star_power_clicks: counters.star_power_clicks,
            mystery_box: counters.mystery_box.as_ref().map(|m| m.options.to_vec()),
            stats: self.stats,
            destroyed: self.is_destroyed(),
        }
    }
}

impl std::fmt::Debug for GameEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameEngine")
            .field("clock", &self.clock)
            .field("target", &self.field.target())
            .field("combo", &self.combo.state())
            .field("active_effects", &self.effects.active_count())
            .field("timers", &self.timers.len())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
