//! Resolution pipeline for a single click.
//!
//! ```text
//! lock → lazy combo expiry → region lookup → role
//!   non-target: energy restore / resource bonus → miss (combo reset)
//!   target:     ghost → heavy click → energy → combo → reward → credit
//!               → star power → slot machine → relocation → effect trigger
//! ```
//!
//! Guards reject the click without touching the combo. Errors from the
//! effect engine are logged and the click carries on.

use bitflags::bitflags;
use tracing::{debug, warn};

use crate::bonus::{BonusKind, BonusTarget};
use crate::combo::effective_streak;
use crate::effects::{EffectContext, EffectId, Polarity};
use crate::env::RollContext;
use crate::error::GameError;
use crate::events::{GameEvent, MissReason, RejectReason};
use crate::field::{HitInput, HitResolution};
use crate::ledger::{CostMap, ResourceKind};
use crate::reward::{RewardInputs, compute_reward};

use super::{EngineError, GameEngine, effect_ctx};

bitflags! {
    /// Secondary outcomes of a target hit.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ClickFlags: u8 {
        const CRITICAL         = 1 << 0;
        const STAR_POWER       = 1 << 1;
        const SLOT_MACHINE     = 1 << 2;
        const SHUFFLED         = 1 << 3;
        const EFFECT_TRIGGERED = 1 << 4;
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HitReport {
    pub region: usize,
    pub accuracy: f64,
    pub combo: u32,
    /// Gold actually credited.
    pub reward: u64,
    pub flags: ClickFlags,
    /// Effect applied by the trigger roll, if any.
    pub triggered: Option<EffectId>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClickOutcome {
    Hit(HitReport),
    Miss {
        region: Option<usize>,
        reason: MissReason,
    },
    Rejected(RejectReason),
}

impl ClickOutcome {
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }

    pub fn reward(&self) -> u64 {
        match self {
            Self::Hit(report) => report.reward,
            _ => 0,
        }
    }
}

impl GameEngine {
    /// Resolves one input event at `now`. Due timers are dispatched first.
    pub fn click(&mut self, input: HitInput, now: u64) -> ClickOutcome {
        if self.is_destroyed() {
            return ClickOutcome::Rejected(RejectReason::Destroyed);
        }
        self.advance(now);
        self.stats.clicks += 1;

        if self.effects.is_input_locked(now) {
            return self.reject(RejectReason::Locked);
        }
        self.expire_combo(now);

        let Some(hit) = self.field.resolve_hit(input, &mut self.dice) else {
            return self.miss(None, MissReason::NoRegion);
        };
        if !hit.effects.is_target {
            return self.resolve_off_target(hit);
        }
        self.resolve_target(hit, now)
    }

    /// Clicks the centre of region `index` at the current rotation.
    pub fn click_region(&mut self, index: usize, now: u64) -> Result<ClickOutcome, EngineError> {
        if self.is_destroyed() {
            return Err(EngineError::Destroyed);
        }
        // Rotate first so the aim matches the angle the click is resolved at.
        self.advance(now);
        let input = self.field.aim_at(index).ok_or(crate::field::FieldError::OutOfRange {
            index,
            len: self.field.len(),
        })?;
        Ok(self.click(input, now))
    }

    fn reject(&mut self, reason: RejectReason) -> ClickOutcome {
        debug!(%reason, "click rejected");
        self.stats.rejected += 1;
        self.events.push(GameEvent::InputRejected { reason });
        ClickOutcome::Rejected(reason)
    }

    fn miss(&mut self, region: Option<usize>, reason: MissReason) -> ClickOutcome {
        self.stats.misses += 1;
        let previous = self.combo.reset();
        if previous > 0 {
            self.events
                .push(GameEvent::ComboChanged { previous, count: 0 });
        }
        self.events.push(GameEvent::TargetMiss { region, reason });
        ClickOutcome::Miss { region, reason }
    }

    fn resolve_off_target(&mut self, hit: HitResolution) -> ClickOutcome {
        let effects = hit.effects;
        if effects.energy_restore > 0 {
            let credited = self.ledger.add(ResourceKind::Energy, effects.energy_restore);
            self.events.resource(
                ResourceKind::Energy,
                credited as i64,
                self.ledger.get(ResourceKind::Energy),
            );
        }
        if effects.resource_bonus > 0
            && let Some(kind) = self
                .dice
                .pick(RollContext::BonusResource, &ResourceKind::TRADEABLE)
        {
            let credited = self.ledger.add(kind, effects.resource_bonus);
            self.events
                .resource(kind, credited as i64, self.ledger.get(kind));
        }
        self.miss(Some(hit.region), MissReason::WrongRegion)
    }

    fn resolve_target(&mut self, hit: HitResolution, now: u64) -> ClickOutcome {
        let modifiers = self.effects.modifiers(now);
        let counters = self.effects.counters();
        let frozen = counters.frozen_combo;

        if self.dice.chance(RollContext::Ghost, modifiers.ghost_chance) {
            return self.reject(RejectReason::Ghost);
        }
        if let Some(required) = self.effects.heavy_click_requirement(now)
            && !self.effects.register_heavy_click(hit.region, required)
        {
            return self.reject(RejectReason::HeavyClick);
        }

        let cost = (hit.effects.energy_cost as f64 * modifiers.energy_cost_scale)
            .round()
            .max(0.0) as u64;
        if cost > 0 {
            if !self
                .ledger
                .try_spend(&CostMap::from([(ResourceKind::Energy, cost)]))
            {
                return self.reject(RejectReason::InsufficientEnergy);
            }
            self.events.resource(
                ResourceKind::Energy,
                -(cost as i64),
                self.ledger.get(ResourceKind::Energy),
            );
        }

        // Combo timeout bonus is an absolute number of milliseconds.
        let timeout_bonus = self
            .bonuses
            .bonus(BonusKind::Duration, BonusTarget::ComboTimeout)
            .max(0.0)
            .round() as u64;
        let update = self.combo.register_hit(
            now,
            hit.region,
            hit.accuracy,
            frozen,
            timeout_bonus,
            &self.config.combo,
        );
        if update.count != update.previous {
            self.events.push(GameEvent::ComboChanged {
                previous: update.previous,
                count: update.count,
            });
        }
        self.stats.best_combo = self.stats.best_combo.max(update.count);

        let inputs = RewardInputs {
            streak: effective_streak(
                update.count,
                self.bonuses.bonus(BonusKind::Multiplier, BonusTarget::Combo),
            ),
            accuracy: hit.accuracy,
            click_multiplier: modifiers.click_multiplier,
            skill_bonus: self.bonuses.bonus(BonusKind::Multiplier, BonusTarget::Gold),
            buff_multipliers: modifiers.gain_multipliers.clone(),
            critical_chance: self.effects.aggregate_bonus(
                &*self.bonuses,
                BonusKind::Chance,
                BonusTarget::Critical,
                now,
            ),
        };
        let breakdown = compute_reward(&inputs, &self.config.reward, &mut self.dice);
        let reward = self.ledger.add(ResourceKind::Gold, breakdown.amount);
        self.events.resource(
            ResourceKind::Gold,
            reward as i64,
            self.ledger.get(ResourceKind::Gold),
        );

        let mut flags = ClickFlags::empty();
        if breakdown.critical {
            flags |= ClickFlags::CRITICAL;
            self.stats.critical_hits += 1;
            self.events.push(GameEvent::CriticalHit { reward });
        }
        self.stats.target_hits += 1;
        self.events.push(GameEvent::TargetHit {
            region: hit.region,
            accuracy: hit.accuracy,
            combo: update.count,
            reward,
        });
        debug!(
            region = hit.region,
            accuracy = hit.accuracy,
            combo = update.count,
            reward,
            "target hit"
        );

        if self
            .effects
            .consume_star_power(&mut effect_ctx!(self, now))
            .is_some()
        {
            flags |= ClickFlags::STAR_POWER;
        }
        if let Some((chance, amount)) = modifiers.slot_machine
            && self.dice.chance(RollContext::SlotMachine, chance)
            && let Some(kind) = self
                .dice
                .pick(RollContext::SlotMachine, &ResourceKind::TRADEABLE)
        {
            let credited = self.ledger.add(kind, amount);
            self.events
                .resource(kind, credited as i64, self.ledger.get(kind));
            self.events.push(GameEvent::SlotMachineWin {
                kind,
                amount: credited,
            });
            flags |= ClickFlags::SLOT_MACHINE;
        }

        if self
            .dice
            .chance(RollContext::Shuffle, self.config.triggers.shuffle_chance)
        {
            match self.field.shuffle(&mut self.dice, &mut self.events) {
                Ok(true) => flags |= ClickFlags::SHUFFLED,
                Ok(false) => {}
                Err(e) => warn!(error = %e, code = e.error_code(), "relocation failed"),
            }
        }

        let triggered = self.roll_effect_trigger(&modifiers, now);
        if triggered.is_some() {
            flags |= ClickFlags::EFFECT_TRIGGERED;
        }

        ClickOutcome::Hit(HitReport {
            region: hit.region,
            accuracy: hit.accuracy,
            combo: update.count,
            reward,
            flags,
            triggered,
        })
    }

    fn roll_effect_trigger(
        &mut self,
        modifiers: &crate::effects::ModifierSummary,
        now: u64,
    ) -> Option<EffectId> {
        let chance = (self.config.triggers.base_effect_chance + modifiers.effect_chance_bonus)
            * modifiers.effect_chance_scale
            + self.bonuses.bonus(BonusKind::Chance, BonusTarget::Luck);
        if !self.dice.chance(RollContext::EffectTrigger, chance) {
            return None;
        }

        let polarity = match modifiers.forced_polarity {
            Some(forced) => forced,
            None => self.roll_polarity(),
        };
        let triggers = &self.config.triggers;
        let id = self.effects.catalog().pick_random(
            polarity,
            &triggers.rarity_weights,
            &triggers.severity_weights,
            &mut self.dice,
        )?;

        match self.effects.apply_effect(id, &mut effect_ctx!(self, now)) {
            Ok(_) => {
                self.stats.effects_triggered += 1;
                Some(id)
            }
            Err(e) => {
                warn!(effect = %id, code = e.error_code(), "triggered effect not applied");
                None
            }
        }
    }

    /// Buff with probability `order / (order + entropy)`; even odds when both are zero.
    fn roll_polarity(&mut self) -> Polarity {
        let order = self.ledger.get(ResourceKind::Faith) as f64;
        let damping = self
            .bonuses
            .bonus(BonusKind::Reduction, BonusTarget::Chaos)
            .clamp(0.0, 1.0);
        let entropy = self.ledger.get(ResourceKind::Chaos) as f64 * (1.0 - damping);

        let buff_probability = if order + entropy <= 0.0 {
            0.5
        } else {
            order / (order + entropy)
        };
        if self.dice.chance(RollContext::EffectPolarity, buff_probability) {
            Polarity::Buff
        } else {
            Polarity::Debuff
        }
    }
}
