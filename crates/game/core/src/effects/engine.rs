//! Effect engine: owns the active set and applies each behavior's side effects.
//!
//! The engine never holds references to the ledger, field, or timers. Every
//! mutating call receives an [`EffectContext`] that borrows them from the
//! surrounding [`GameEngine`](crate::engine::GameEngine) for the duration of
//! the call.

use std::collections::BTreeMap;
use std::sync::Arc;

use arrayvec::ArrayVec;
use tracing::{debug, warn};

use crate::bonus::{BonusKind, BonusProvider, BonusTarget};
use crate::config::GameConfig;
use crate::env::{Dice, RollContext};
use crate::events::{EventSink, ExpiryReason, GameEvent};
use crate::field::TargetField;
use crate::ledger::{ResourceKind, ResourceLedger};

use super::{
    ActiveEffect, CountedUse, EffectBehavior, EffectCatalog, EffectCounters, EffectDefinition,
    EffectError, EffectId, FiredTimer, InstantAction, MAX_MYSTERY_CHOICES, MysteryOffer,
    PassiveModifier, Polarity, TickAction, TimerPurpose, TimerRegistry,
};

/// Borrowed collaborators for one engine call.
pub struct EffectContext<'a> {
    pub now: u64,
    pub config: &'a GameConfig,
    pub ledger: &'a mut dyn ResourceLedger,
    pub bonuses: &'a dyn BonusProvider,
    pub dice: &'a mut Dice,
    pub field: &'a mut TargetField,
    pub timers: &'a mut TimerRegistry,
    pub events: &'a mut EventSink,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The effect entered the active set.
    Applied { duration_ms: Option<u64> },
    /// An instant effect resolved without entering the active set.
    Resolved,
    /// A debuff was absorbed by a shield charge.
    Blocked { charges_left: u32 },
}

/// Aggregate of the passive modifiers of every live effect.
#[derive(Clone, Debug, PartialEq)]
pub struct ModifierSummary {
    pub click_multiplier: f64,
    /// Categorical gain multipliers in catalog order.
    pub gain_multipliers: Vec<(EffectId, f64)>,
    pub effect_chance_bonus: f64,
    pub effect_chance_scale: f64,
    pub critical_chance_bonus: f64,
    pub energy_cost_scale: f64,
    pub forced_polarity: Option<Polarity>,
    pub ghost_chance: f64,
    pub production_scale: f64,
    pub market_discount: f64,
    pub blocks_energy_regen: bool,
    pub slot_machine: Option<(f64, u64)>,
}

impl Default for ModifierSummary {
    fn default() -> Self {
        Self {
            click_multiplier: 1.0,
            gain_multipliers: Vec::new(),
            effect_chance_bonus: 0.0,
            effect_chance_scale: 1.0,
            critical_chance_bonus: 0.0,
            energy_cost_scale: 1.0,
            forced_polarity: None,
            ghost_chance: 0.0,
            production_scale: 1.0,
            market_discount: 0.0,
            blocks_energy_regen: false,
            slot_machine: None,
        }
    }
}

pub struct EffectEngine {
    catalog: Arc<EffectCatalog>,
    active: BTreeMap<EffectId, ActiveEffect>,
    counters: EffectCounters,
    destroyed: bool,
}

impl EffectEngine {
    pub fn new(catalog: Arc<EffectCatalog>) -> Self {
        Self {
            catalog,
            active: BTreeMap::new(),
            counters: EffectCounters::default(),
            destroyed: false,
        }
    }

    pub fn catalog(&self) -> &EffectCatalog {
        &self.catalog
    }

    /// Swaps the catalog. Active entries whose id is missing from the new
    /// catalog become orphans and are collected by the next watchdog sweep.
    pub fn replace_catalog(&mut self, catalog: Arc<EffectCatalog>) {
        self.catalog = catalog;
    }

    pub fn counters(&self) -> &EffectCounters {
        &self.counters
    }

    /// Replaces the counter bag (snapshot restore).
    pub fn restore_counters(&mut self, counters: EffectCounters) {
        self.counters = counters.into_restored();
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn active(&self, id: EffectId) -> Option<&ActiveEffect> {
        self.active.get(&id)
    }

    pub fn active_effects(&self) -> impl Iterator<Item = &ActiveEffect> {
        self.active.values()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn is_active(&self, id: EffectId) -> bool {
        self.active.contains_key(&id)
    }

    /// Like [`is_active`](Self::is_active) but also false once the window has
    /// passed, even if the expiry timer has not been dispatched yet.
    pub fn is_active_at(&self, id: EffectId, now: u64) -> bool {
        self.active.get(&id).is_some_and(|e| e.is_live_at(now))
    }

    /// Provider bonus plus contributions from live effects.
    pub fn aggregate_bonus(
        &self,
        bonuses: &dyn BonusProvider,
        kind: BonusKind,
        target: BonusTarget,
        now: u64,
    ) -> f64 {
        let from_effects: f64 = self
            .live_definitions(now)
            .flat_map(|d| d.modifiers.iter())
            .filter_map(|m| match (m, kind, target) {
                (PassiveModifier::CriticalChanceBonus(v), BonusKind::Chance, BonusTarget::Critical) => {
                    Some(*v)
                }
                _ => None,
            })
            .sum();
        bonuses.bonus(kind, target) + from_effects
    }

    pub fn modifiers(&self, now: u64) -> ModifierSummary {
        let mut summary = ModifierSummary::default();
        let mut forced: Vec<Polarity> = Vec::new();

        for definition in self.live_definitions(now) {
            for modifier in &definition.modifiers {
                match *modifier {
                    PassiveModifier::GainMultiplier(v) => {
                        summary.gain_multipliers.push((definition.id, v))
                    }
                    PassiveModifier::ClickMultiplier(v) => summary.click_multiplier *= v,
                    PassiveModifier::EffectChanceBonus(v) => summary.effect_chance_bonus += v,
                    PassiveModifier::EffectChanceScale(v) => summary.effect_chance_scale *= v,
                    PassiveModifier::CriticalChanceBonus(v) => summary.critical_chance_bonus += v,
                    PassiveModifier::EnergyCostScale(v) => summary.energy_cost_scale *= v,
                    PassiveModifier::ForcePolarity(p) => forced.push(p),
                    PassiveModifier::GhostChance(v) => {
                        summary.ghost_chance = summary.ghost_chance.max(v)
                    }
                    PassiveModifier::ProductionScale(v) => summary.production_scale *= v,
                    PassiveModifier::MarketDiscount(v) => {
                        summary.market_discount = summary.market_discount.max(v)
                    }
                    PassiveModifier::BlocksEnergyRegen => summary.blocks_energy_regen = true,
                    PassiveModifier::SlotMachine { chance, amount } => {
                        summary.slot_machine = Some((chance, amount))
                    }
                }
            }
        }

        // Opposing overrides cancel out.
        summary.forced_polarity = match forced.as_slice() {
            [first, rest @ ..] if rest.iter().all(|p| p == first) => Some(*first),
            _ => None,
        };
        summary
    }

    /// Repeat clicks a heavy-click effect currently demands, if one is live.
    pub fn heavy_click_requirement(&self, now: u64) -> Option<u32> {
        self.live_definitions(now)
            .find_map(|d| match d.behavior {
                EffectBehavior::HeavyClick { required } => Some(required),
                _ => None,
            })
    }

    /// True while any live effect locks input.
    pub fn is_input_locked(&self, now: u64) -> bool {
        self.live_definitions(now)
            .any(|d| matches!(d.behavior, EffectBehavior::InputLock))
    }

    pub fn apply_effect(
        &mut self,
        id: EffectId,
        ctx: &mut EffectContext<'_>,
    ) -> Result<ApplyOutcome, EffectError> {
        if self.destroyed {
            return Err(EffectError::Destroyed);
        }
        let Some(definition) = self.catalog.get(id).cloned() else {
            warn!(effect = %id, "apply_effect: unknown effect id");
            return Err(EffectError::UnknownEffect(id));
        };

        if definition.polarity == Polarity::Debuff
            && let Some(charges_left) = self.try_block(id, ctx)
        {
            return Ok(ApplyOutcome::Blocked { charges_left });
        }

        if self.active.contains_key(&id) {
            self.remove_effect(id, ExpiryReason::Replaced, ctx);
        }

        if let EffectBehavior::Instant(action) = &definition.behavior {
            ctx.events.push(GameEvent::EffectApplied {
                id,
                polarity: definition.polarity,
                duration_ms: None,
            });
            self.resolve_instant(action, ctx);
            debug!(effect = %id, "instant effect resolved");
            return Ok(ApplyOutcome::Resolved);
        }

        let duration_ms = resolve_duration(&definition, ctx);
        let expiry = duration_ms.map(|d| ctx.timers.schedule_once(ctx.now, d, TimerPurpose::Expire(id)));
        let tick = match definition.behavior {
            EffectBehavior::Periodic { interval_ms, .. } => {
                Some(ctx.timers.schedule_repeating(ctx.now, interval_ms, TimerPurpose::Tick(id)))
            }
            _ => None,
        };

        self.on_apply(&definition, ctx);
        self.active.insert(
            id,
            ActiveEffect {
                id,
                polarity: definition.polarity,
                started_at: ctx.now,
                resolved_duration_ms: duration_ms,
                expiry,
                tick,
            },
        );

        ctx.events.push(GameEvent::EffectApplied {
            id,
            polarity: definition.polarity,
            duration_ms,
        });
        debug!(effect = %id, ?duration_ms, "effect applied");
        Ok(ApplyOutcome::Applied { duration_ms })
    }

    /// Cancels the entry's timers, undoes its side effects, and reports the expiry.
    ///
    /// Returns false when `id` was not active.
    pub fn remove_effect(
        &mut self,
        id: EffectId,
        reason: ExpiryReason,
        ctx: &mut EffectContext<'_>,
    ) -> bool {
        let Some(entry) = self.active.remove(&id) else {
            return false;
        };
        if let Some(handle) = entry.expiry {
            ctx.timers.cancel(handle);
        }
        if let Some(handle) = entry.tick {
            ctx.timers.cancel(handle);
        }

        let behavior = self.catalog.get(id).map(|d| d.behavior.clone());
        self.on_remove(id, behavior.as_ref(), ctx);

        ctx.events.push(GameEvent::EffectExpired { id, reason });
        debug!(effect = %id, %reason, "effect removed");
        true
    }

    /// Removes every active effect of `polarity`.
    pub fn remove_polarity(&mut self, polarity: Polarity, ctx: &mut EffectContext<'_>) -> usize {
        let ids: Vec<EffectId> = self
            .active
            .values()
            .filter(|e| e.polarity == polarity)
            .map(|e| e.id)
            .collect();
        ids.into_iter()
            .filter(|id| self.remove_effect(*id, ExpiryReason::Removed, ctx))
            .count()
    }

    /// Handles an expiry or tick timer. Timers that no longer match the arena
    /// entry (replaced or removed effects) are ignored.
    pub fn on_timer(&mut self, fired: FiredTimer, ctx: &mut EffectContext<'_>) {
        if self.destroyed {
            return;
        }
        match fired.purpose {
            TimerPurpose::Expire(id) => {
                if self
                    .active
                    .get(&id)
                    .is_some_and(|e| e.expiry == Some(fired.handle))
                {
                    self.remove_effect(id, ExpiryReason::Timer, ctx);
                } else {
                    debug!(effect = %id, "stale expiry timer ignored");
                }
            }
            TimerPurpose::Tick(id) => {
                if self
                    .active
                    .get(&id)
                    .is_some_and(|e| e.tick == Some(fired.handle))
                {
                    self.run_tick(id, ctx);
                } else {
                    debug!(effect = %id, "stale tick timer ignored");
                }
            }
            TimerPurpose::EffectWatchdog | TimerPurpose::ComboWatchdog | TimerPurpose::EnergyRegen => {}
        }
    }

    /// Watchdog sweep.
    ///
    /// Force-removes timed effects whose elapsed time exceeds their resolved
    /// duration or `max_age_ms`, and entries missing from the catalog.
    pub fn force_expire_stale(&mut self, max_age_ms: u64, ctx: &mut EffectContext<'_>) -> usize {
        if self.destroyed {
            return 0;
        }
        let now = ctx.now;
        let stale: Vec<EffectId> = self
            .active
            .values()
            .filter(|entry| {
                let orphaned = !self.catalog.contains(entry.id);
                let overdue = entry
                    .resolved_duration_ms
                    .is_some_and(|d| entry.elapsed(now) > d || entry.elapsed(now) > max_age_ms);
                orphaned || overdue
            })
            .map(|entry| entry.id)
            .collect();

        for id in &stale {
            warn!(effect = %id, "watchdog force-expiring stale effect");
            self.remove_effect(*id, ExpiryReason::Watchdog, ctx);
        }
        stale.len()
    }

    /// Cancels every effect timer, empties the active set and counters, and
    /// restores rotation speed to its baseline. Idempotent.
    pub fn clear_all(&mut self, ctx: &mut EffectContext<'_>) {
        let entries: Vec<ActiveEffect> = std::mem::take(&mut self.active).into_values().collect();
        for entry in entries {
            if let Some(handle) = entry.expiry {
                ctx.timers.cancel(handle);
            }
            if let Some(handle) = entry.tick {
                ctx.timers.cancel(handle);
            }
            ctx.events.push(GameEvent::EffectExpired {
                id: entry.id,
                reason: ExpiryReason::Cleared,
            });
        }
        // Handles lost from the arena are still owned by the registry.
        ctx.timers.cancel_where(|purpose| !purpose.is_system());
        self.counters.reset();
        ctx.field.rotation_speed_mut().clear_all();
    }

    /// `clear_all` plus every remaining timer. Later calls become no-ops.
    pub fn teardown(&mut self, ctx: &mut EffectContext<'_>) {
        self.clear_all(ctx);
        ctx.timers.clear();
        self.destroyed = true;
    }

    /// Grants the pending mystery box reward for `kind`.
    pub fn claim_mystery_box(
        &mut self,
        kind: ResourceKind,
        ctx: &mut EffectContext<'_>,
    ) -> Result<u64, EffectError> {
        if self.destroyed {
            return Err(EffectError::Destroyed);
        }
        let offer = self.counters.mystery_box.as_ref().ok_or(EffectError::NoMysteryBox)?;
        if !offer.options.contains(&kind) {
            return Err(EffectError::NotOffered(kind));
        }
        let amount = offer.amount;
        self.counters.mystery_box = None;
        let credited = ctx.ledger.add(kind, amount);
        ctx.events.resource(kind, credited as i64, ctx.ledger.get(kind));
        Ok(credited)
    }

    /// Spends one star power use on a target hit.
    pub fn consume_star_power(&mut self, ctx: &mut EffectContext<'_>) -> Option<(ResourceKind, u64)> {
        if self.counters.star_power_clicks == 0 {
            return None;
        }
        let kind = ctx.dice.pick(RollContext::BonusResource, &ResourceKind::TRADEABLE)?;
        let credited = ctx.ledger.add(kind, self.counters.star_power_bonus);
        self.counters.star_power_clicks -= 1;
        let remaining = self.counters.star_power_clicks;

        ctx.events.resource(kind, credited as i64, ctx.ledger.get(kind));
        ctx.events.push(GameEvent::StarPowerUsed {
            kind,
            amount: credited,
            remaining,
        });
        if remaining == 0 {
            self.counters.star_power_bonus = 0;
            self.remove_effect(EffectId::StarPower, ExpiryReason::Consumed, ctx);
        }
        Some((kind, credited))
    }

    /// Counts a click towards a heavy click. True when the click registers.
    pub fn register_heavy_click(&mut self, region: usize, required: u32) -> bool {
        let progress = &mut self.counters.heavy_click;
        if progress.region != Some(region) {
            progress.region = Some(region);
            progress.count = 0;
        }
        progress.count += 1;
        if progress.count >= required {
            progress.count = 0;
            true
        } else {
            false
        }
    }

    fn live_definitions(&self, now: u64) -> impl Iterator<Item = &EffectDefinition> {
        self.active
            .values()
            .filter(move |e| e.is_live_at(now))
            .filter_map(|e| self.catalog.get(e.id))
    }

    /// Shield rule. Returns the charges left when the debuff was absorbed.
    fn try_block(&mut self, id: EffectId, ctx: &mut EffectContext<'_>) -> Option<u32> {
        if self.counters.shield_charges == 0 {
            return None;
        }
        self.counters.shield_charges -= 1;
        let charges_left = self.counters.shield_charges;
        ctx.events.push(GameEvent::EffectBlocked { id, charges_left });
        debug!(effect = %id, charges_left, "debuff blocked by shield");
        if charges_left == 0 {
            self.remove_effect(EffectId::Shield, ExpiryReason::Consumed, ctx);
        }
        Some(charges_left)
    }

    fn on_apply(&mut self, definition: &EffectDefinition, ctx: &mut EffectContext<'_>) {
        match definition.behavior {
            EffectBehavior::Counted {
                counter: CountedUse::Shield,
                uses,
            } => self.counters.shield_charges = uses,
            EffectBehavior::Counted {
                counter: CountedUse::StarPower { bonus },
                uses,
            } => {
                self.counters.star_power_clicks = uses;
                self.counters.star_power_bonus = bonus;
            }
            EffectBehavior::ComboFreeze => self.counters.frozen_combo = true,
            EffectBehavior::HeavyClick { .. } => {
                self.counters.heavy_click = Default::default();
            }
            EffectBehavior::RotationScale { factor } => {
                ctx.field
                    .rotation_speed_mut()
                    .set_slot(definition.id.as_ref(), factor);
            }
            EffectBehavior::Passive
            | EffectBehavior::Periodic { .. }
            | EffectBehavior::Instant(_)
            | EffectBehavior::InputLock => {}
        }
    }

    fn on_remove(&mut self, id: EffectId, behavior: Option<&EffectBehavior>, ctx: &mut EffectContext<'_>) {
        // Orphans have no behavior left; the rotation slot is keyed by id alone.
        ctx.field.rotation_speed_mut().clear_slot(id.as_ref());
        match behavior {
            Some(EffectBehavior::Counted {
                counter: CountedUse::Shield,
                ..
            }) => self.counters.shield_charges = 0,
            Some(EffectBehavior::Counted {
                counter: CountedUse::StarPower { .. },
                ..
            }) => {
                self.counters.star_power_clicks = 0;
                self.counters.star_power_bonus = 0;
            }
            Some(EffectBehavior::ComboFreeze) => self.counters.frozen_combo = false,
            Some(EffectBehavior::HeavyClick { .. }) => {
                self.counters.heavy_click = Default::default();
            }
            _ => {}
        }
    }

    fn run_tick(&mut self, id: EffectId, ctx: &mut EffectContext<'_>) {
        let Some(EffectBehavior::Periodic { action, .. }) =
            self.catalog.get(id).map(|d| d.behavior.clone())
        else {
            return;
        };
        match action {
            TickAction::GrantRandomTradeable { amount } => {
                if let Some(kind) = ctx.dice.pick(RollContext::EffectTick, &ResourceKind::TRADEABLE) {
                    let credited = ctx.ledger.add(kind, amount);
                    ctx.events.resource(kind, credited as i64, ctx.ledger.get(kind));
                }
            }
            TickAction::DrainHoldings { fraction } => {
                for kind in ResourceKind::HOLDINGS {
                    let current = ctx.ledger.get(kind);
                    let loss = (current as f64 * fraction).floor() as u64;
                    let removed = ctx.ledger.subtract(kind, loss);
                    ctx.events.resource(kind, -(removed as i64), ctx.ledger.get(kind));
                }
            }
        }
    }

    fn resolve_instant(&mut self, action: &InstantAction, ctx: &mut EffectContext<'_>) {
        match action {
            InstantAction::Roll { outcomes } => {
                let chances: Vec<f64> = outcomes.iter().map(|o| o.chance).collect();
                let Some(outcome) = ctx
                    .dice
                    .weighted_f64(RollContext::InstantOutcome, &chances)
                    .and_then(|i| outcomes.get(i))
                else {
                    return;
                };
                let Some(kind) = ctx.dice.pick(RollContext::InstantOutcome, &ResourceKind::TRADEABLE)
                else {
                    return;
                };
                let delta = if outcome.amount >= 0 {
                    ctx.ledger.add(kind, outcome.amount as u64) as i64
                } else {
                    -(ctx.ledger.subtract(kind, outcome.amount.unsigned_abs()) as i64)
                };
                ctx.events.resource(kind, delta, ctx.ledger.get(kind));
                ctx.events.push(GameEvent::RollResolved {
                    label: outcome.label.clone(),
                    kind,
                    delta,
                });
            }
            InstantAction::Explosion { fraction } => {
                let Some(kind) = ctx.dice.pick(RollContext::InstantOutcome, &ResourceKind::TRADEABLE)
                else {
                    return;
                };
                let protection = ctx
                    .bonuses
                    .bonus(BonusKind::Protection, BonusTarget::Explosion)
                    .clamp(0.0, 1.0);
                let damage = fraction * (1.0 - protection);
                let current = ctx.ledger.get(kind);
                let kept = (current as f64 * (1.0 - damage)).floor().max(0.0) as u64;
                let removed = ctx.ledger.subtract(kind, current.saturating_sub(kept));
                ctx.events.resource(kind, -(removed as i64), ctx.ledger.get(kind));
            }
            InstantAction::MysteryBox { choices, amount } => {
                let mut pool: Vec<ResourceKind> = ResourceKind::TRADEABLE.to_vec();
                let wanted = (*choices).min(MAX_MYSTERY_CHOICES).min(pool.len());
                let mut options = ArrayVec::<ResourceKind, MAX_MYSTERY_CHOICES>::new();
                while options.len() < wanted {
                    let Some(slot) = ctx.dice.index(RollContext::InstantOutcome, pool.len()) else {
                        break;
                    };
                    options.push(pool.swap_remove(slot));
                }
                ctx.events.push(GameEvent::MysteryBoxOffered {
                    options: options.to_vec(),
                });
                self.counters.mystery_box = Some(MysteryOffer {
                    options,
                    amount: *amount,
                });
            }
        }
    }
}

/// Base duration scaled by duration bonuses; debuffs also by reduction bonuses
/// with a floor of [`GameConfig::MIN_DEBUFF_DURATION_MS`].
fn resolve_duration(definition: &EffectDefinition, ctx: &EffectContext<'_>) -> Option<u64> {
    let base = definition.base_duration_ms? as f64;
    let target = definition.polarity.bonus_target();
    let mut duration = base * (1.0 + ctx.bonuses.bonus(BonusKind::Duration, target));
    match definition.polarity {
        Polarity::Buff => Some((duration.round() as u64).max(1)),
        Polarity::Debuff => {
            let reduction = ctx
                .bonuses
                .bonus(BonusKind::Reduction, BonusTarget::Debuffs)
                .clamp(0.0, 1.0);
            duration *= 1.0 - reduction;
            Some((duration.round() as u64).max(GameConfig::MIN_DEBUFF_DURATION_MS))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bonus::{FixedBonuses, NoBonuses};
    use crate::env::ScriptedRng;
    use crate::ledger::ResourceBook;

    struct Harness {
        config: GameConfig,
        ledger: ResourceBook,
        dice: Dice,
        field: TargetField,
        timers: TimerRegistry,
        events: EventSink,
        effects: EffectEngine,
    }

    impl Harness {
        fn new() -> Self {
            let config = GameConfig::new();
            let mut dice = Dice::new(Arc::new(ScriptedRng::new(vec![0, 7, 3, 11])), 0);
            let mut events = EventSink::new();
            let field = TargetField::new(&config, &mut dice, &mut events).unwrap();
            events.drain();
            Self {
                config,
                ledger: ResourceBook::new(),
                dice,
                field,
                timers: TimerRegistry::new(),
                events,
                effects: EffectEngine::new(Arc::new(EffectCatalog::standard())),
            }
        }

        fn with<R>(
            &mut self,
            now: u64,
            bonuses: &dyn BonusProvider,
            f: impl FnOnce(&mut EffectEngine, &mut EffectContext<'_>) -> R,
        ) -> R {
            let mut ctx = EffectContext {
                now,
                config: &self.config,
                ledger: &mut self.ledger,
                bonuses,
                dice: &mut self.dice,
                field: &mut self.field,
                timers: &mut self.timers,
                events: &mut self.events,
            };
            f(&mut self.effects, &mut ctx)
        }

        fn apply(&mut self, now: u64, id: EffectId) -> Result<ApplyOutcome, EffectError> {
            self.with(now, &NoBonuses, |fx, ctx| fx.apply_effect(id, ctx))
        }

        /// Dispatches every timer due at or before `now`.
        fn run_until(&mut self, now: u64) {
            while let Some(fired) = self.timers.pop_due(now) {
                self.with(fired.due_at, &NoBonuses, |fx, ctx| fx.on_timer(fired, ctx));
            }
        }

        fn expired_count(&self, id: EffectId) -> usize {
            self.events
                .pending()
                .iter()
                .filter(|e| matches!(e, GameEvent::EffectExpired { id: x, .. } if *x == id))
                .count()
        }
    }

    #[test]
    fn reapplying_replaces_instead_of_stacking() {
        let mut h = Harness::new();
        h.apply(0, EffectId::Frenzy).unwrap();
        h.apply(1_000, EffectId::Frenzy).unwrap();
        h.apply(2_000, EffectId::Frenzy).unwrap();

        assert_eq!(h.effects.active_count(), 1);
        assert_eq!(h.effects.active(EffectId::Frenzy).unwrap().started_at, 2_000);
        // Only the newest expiry timer is still scheduled.
        assert_eq!(h.timers.len(), 1);

        h.run_until(16_000);
        assert_eq!(h.effects.active(EffectId::Frenzy).map(|e| e.id), Some(EffectId::Frenzy));
        h.run_until(17_000);
        assert!(!h.effects.is_active(EffectId::Frenzy));
    }

    #[test]
    fn duration_scales_with_bonuses() {
        let mut h = Harness::new();
        let bonuses = FixedBonuses::new()
            .with(BonusKind::Duration, BonusTarget::Buffs, 0.2)
            .with(BonusKind::Reduction, BonusTarget::Debuffs, 0.9);

        let frenzy = h.with(0, &bonuses, |fx, ctx| fx.apply_effect(EffectId::Frenzy, ctx));
        assert_eq!(frenzy, Ok(ApplyOutcome::Applied { duration_ms: Some(18_000) }));

        // Lock: 1000 × 0.1 = 100 → floored at 500.
        let lock = h.with(0, &bonuses, |fx, ctx| fx.apply_effect(EffectId::Lock, ctx));
        assert_eq!(lock, Ok(ApplyOutcome::Applied { duration_ms: Some(500) }));
    }

    #[test]
    fn shield_blocks_exactly_its_charges() {
        let mut h = Harness::new();
        h.apply(0, EffectId::Shield).unwrap();
        assert_eq!(h.effects.counters().shield_charges, 3);

        for expected in [2, 1, 0] {
            let outcome = h.apply(10, EffectId::Curse).unwrap();
            assert_eq!(outcome, ApplyOutcome::Blocked { charges_left: expected });
            assert!(!h.effects.is_active(EffectId::Curse));
        }
        assert!(!h.effects.is_active(EffectId::Shield));

        let fourth = h.apply(10, EffectId::Curse).unwrap();
        assert!(matches!(fourth, ApplyOutcome::Applied { .. }));
        assert!(h.effects.is_active(EffectId::Curse));
    }

    #[test]
    fn unknown_effect_is_a_noop() {
        let mut h = Harness::new();
        let catalog = EffectCatalog::from_definitions(
            EffectCatalog::standard()
                .iter()
                .filter(|d| d.id != EffectId::Frenzy)
                .cloned(),
        )
        .unwrap();
        h.effects.replace_catalog(Arc::new(catalog));

        assert_eq!(h.apply(0, EffectId::Frenzy), Err(EffectError::UnknownEffect(EffectId::Frenzy)));
        assert_eq!(h.effects.active_count(), 0);
        assert!(h.timers.is_empty());
        assert!(h.events.is_empty());
    }

    #[test]
    fn periodic_tick_grants_resources_until_expiry() {
        let mut h = Harness::new();
        h.apply(0, EffectId::Waterfall).unwrap();
        h.run_until(10_000);

        let granted: u64 = ResourceKind::TRADEABLE.iter().map(|k| h.ledger.get(*k)).sum();
        // Ticks at 1s..9s fire; the 10s tick and expiry share a due time and
        // the expiry timer was scheduled first.
        assert_eq!(granted, 9);
        assert!(!h.effects.is_active(EffectId::Waterfall));
        assert!(h.timers.is_empty());
    }

    #[test]
    fn drain_ticks_take_a_fraction_of_holdings() {
        let mut h = Harness::new();
        h.ledger.set(ResourceKind::Gold, 1_000);
        h.ledger.set(ResourceKind::Wood, 10);
        h.apply(0, EffectId::TaxCollector).unwrap();
        h.run_until(3_000);

        assert_eq!(h.ledger.get(ResourceKind::Gold), 950);
        // floor(10 × 0.05) = 0
        assert_eq!(h.ledger.get(ResourceKind::Wood), 10);
    }

    #[test]
    fn explosion_respects_protection() {
        let mut h = Harness::new();
        for kind in ResourceKind::TRADEABLE {
            h.ledger.set(kind, 100);
        }
        let bonuses = FixedBonuses::new().with(BonusKind::Protection, BonusTarget::Explosion, 0.5);
        let outcome = h.with(0, &bonuses, |fx, ctx| fx.apply_effect(EffectId::Explosion, ctx));
        assert_eq!(outcome, Ok(ApplyOutcome::Resolved));
        assert!(!h.effects.is_active(EffectId::Explosion));

        let total: u64 = ResourceKind::TRADEABLE.iter().map(|k| h.ledger.get(*k)).sum();
        assert_eq!(total, 700 - 5);
    }

    #[test]
    fn mystery_box_offers_distinct_choices_and_claims_once() {
        let mut h = Harness::new();
        h.apply(0, EffectId::MysteryBox).unwrap();

        let offer = h.effects.counters().mystery_box.clone().unwrap();
        assert_eq!(offer.options.len(), 3);
        let mut sorted = offer.options.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 3);

        let choice = offer.options[1];
        let claimed = h.with(0, &NoBonuses, |fx, ctx| fx.claim_mystery_box(choice, ctx));
        assert_eq!(claimed, Ok(5));
        assert_eq!(h.ledger.get(choice), 5);

        let again = h.with(0, &NoBonuses, |fx, ctx| fx.claim_mystery_box(choice, ctx));
        assert_eq!(again, Err(EffectError::NoMysteryBox));
    }

    #[test]
    fn star_power_is_removed_when_exhausted() {
        let mut h = Harness::new();
        h.apply(0, EffectId::StarPower).unwrap();
        for _ in 0..10 {
            assert!(h.with(0, &NoBonuses, |fx, ctx| fx.consume_star_power(ctx)).is_some());
        }
        assert!(!h.effects.is_active(EffectId::StarPower));
        assert!(h.with(0, &NoBonuses, |fx, ctx| fx.consume_star_power(ctx)).is_none());

        let total: u64 = ResourceKind::TRADEABLE.iter().map(|k| h.ledger.get(*k)).sum();
        assert_eq!(total, 50);
    }

    #[test]
    fn rotation_layer_follows_effect_lifetime() {
        let mut h = Harness::new();
        let base = h.field.rotation_speed().effective();
        h.apply(0, EffectId::Rapid).unwrap();
        assert_eq!(h.field.rotation_speed().effective(), base * 2.0);

        h.run_until(5_000);
        assert_eq!(h.field.rotation_speed().effective(), base);
    }

    #[test]
    fn watchdog_removes_effect_with_lost_timer_once() {
        let mut h = Harness::new();
        h.apply(0, EffectId::Freeze).unwrap();
        // Simulate a lost expiry timer.
        let handle = h.effects.active(EffectId::Freeze).unwrap().expiry.unwrap();
        h.timers.cancel(handle);

        h.run_until(60_000);
        assert!(h.effects.is_active(EffectId::Freeze));
        assert!(h.effects.counters().frozen_combo);

        let removed = h.with(60_000, &NoBonuses, |fx, ctx| fx.force_expire_stale(20 * 60_000, ctx));
        assert_eq!(removed, 1);
        assert!(!h.effects.is_active(EffectId::Freeze));
        assert!(!h.effects.counters().frozen_combo);
        assert_eq!(h.expired_count(EffectId::Freeze), 1);

        let again = h.with(65_000, &NoBonuses, |fx, ctx| fx.force_expire_stale(20 * 60_000, ctx));
        assert_eq!(again, 0);
        assert_eq!(h.expired_count(EffectId::Freeze), 1);
    }

    #[test]
    fn watchdog_collects_orphans_and_ancient_effects() {
        let mut h = Harness::new();
        h.apply(0, EffectId::Frenzy).unwrap();
        h.apply(0, EffectId::TaxBoom).unwrap();

        let without_frenzy = EffectCatalog::from_definitions(
            EffectCatalog::standard()
                .iter()
                .filter(|d| d.id != EffectId::Frenzy)
                .cloned(),
        )
        .unwrap();
        h.effects.replace_catalog(Arc::new(without_frenzy));

        // Frenzy is orphaned; the 900s effect exceeds a 60s ceiling.
        let removed = h.with(61_000, &NoBonuses, |fx, ctx| fx.force_expire_stale(60_000, ctx));
        assert_eq!(removed, 2);
        assert_eq!(h.effects.active_count(), 0);
        assert!(h.timers.is_empty());
    }

    #[test]
    fn clear_all_is_idempotent_and_restores_baseline() {
        let mut h = Harness::new();
        let base = h.field.rotation_speed().effective();
        h.timers
            .schedule_repeating(0, 5_000, TimerPurpose::EffectWatchdog);
        h.apply(0, EffectId::Rapid).unwrap();
        h.apply(0, EffectId::Decay).unwrap();
        h.apply(0, EffectId::Shield).unwrap();

        h.with(100, &NoBonuses, |fx, ctx| fx.clear_all(ctx));
        assert_eq!(h.effects.active_count(), 0);
        assert!(h.effects.counters().is_default());
        assert_eq!(h.field.rotation_speed().effective(), base);
        // The watchdog survives.
        assert_eq!(h.timers.len(), 1);

        let events_before = h.events.len();
        h.with(200, &NoBonuses, |fx, ctx| fx.clear_all(ctx));
        assert_eq!(h.events.len(), events_before);
    }

    #[test]
    fn teardown_makes_everything_a_noop() {
        let mut h = Harness::new();
        h.apply(0, EffectId::Waterfall).unwrap();
        h.timers.schedule_repeating(0, 1_000, TimerPurpose::ComboWatchdog);

        h.with(0, &NoBonuses, |fx, ctx| fx.teardown(ctx));
        assert!(h.timers.is_empty());
        assert_eq!(h.apply(10, EffectId::Frenzy), Err(EffectError::Destroyed));
        assert_eq!(h.effects.active_count(), 0);
    }

    #[test]
    fn modifiers_aggregate_live_effects() {
        let mut h = Harness::new();
        h.apply(0, EffectId::Frenzy).unwrap();
        h.apply(0, EffectId::GoldenTouch).unwrap();
        h.apply(0, EffectId::DoubleTap).unwrap();
        h.apply(0, EffectId::ChaosClown).unwrap();

        let summary = h.effects.modifiers(1_000);
        assert_eq!(
            summary.gain_multipliers,
            vec![(EffectId::Frenzy, 2.0), (EffectId::GoldenTouch, 3.0)]
        );
        assert_eq!(summary.click_multiplier, 2.0);
        assert_eq!(summary.forced_polarity, Some(Polarity::Buff));

        // Golden touch lasts 8s: gone from the summary even before its timer runs.
        let later = h.effects.modifiers(9_000);
        assert_eq!(later.gain_multipliers, vec![(EffectId::Frenzy, 2.0)]);
    }

    #[test]
    fn opposing_polarity_overrides_cancel() {
        let mut h = Harness::new();
        h.apply(0, EffectId::ChaosClown).unwrap();
        h.apply(0, EffectId::UnluckyCurse).unwrap();
        assert_eq!(h.effects.modifiers(0).forced_polarity, None);
    }
}
