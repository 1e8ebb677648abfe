//! Reward resolver.
//!
//! Composition order is fixed and covered by golden tests:
//!
//! ```text
//! amount = max(1, streak)
//!        × click multiplier
//!        × (1 + accuracy × accuracy_weight)
//!        × (1 + skill gold bonus)
//!        × categorical buff multipliers (catalog order)
//!        × critical multiplier (on a successful roll)
//! reward = min(floor(amount), max_per_click)
//! ```
//!
//! All intermediate steps stay in `f64`; only the final value is floored.

use crate::config::RewardConfig;
use crate::effects::EffectId;
use crate::env::{Dice, RollContext};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RewardInputs {
    /// Streak after the combo multiplier bonus.
    pub streak: u32,
    pub accuracy: f64,
    pub click_multiplier: f64,
    /// `bonus(Multiplier, Gold)` from the bonus provider.
    pub skill_bonus: f64,
    /// Active categorical multipliers in catalog order.
    pub buff_multipliers: Vec<(EffectId, f64)>,
    pub critical_chance: f64,
}

/// Every intermediate value of one reward computation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RewardBreakdown {
    pub base: f64,
    pub after_click: f64,
    pub after_accuracy: f64,
    pub after_skill: f64,
    pub after_buffs: f64,
    pub critical: bool,
    pub amount: u64,
}

pub fn compute_reward(inputs: &RewardInputs, config: &RewardConfig, dice: &mut Dice) -> RewardBreakdown {
    let base = inputs.streak.max(1) as f64;
    let after_click = base * inputs.click_multiplier;
    let after_accuracy = after_click * (1.0 + inputs.accuracy.clamp(0.0, 1.0) * config.accuracy_weight);
    let after_skill = after_accuracy * (1.0 + inputs.skill_bonus);
    let after_buffs = inputs
        .buff_multipliers
        .iter()
        .fold(after_skill, |acc, (_, factor)| acc * factor);

    let critical = dice.chance(RollContext::Critical, inputs.critical_chance);
    let final_amount = if critical {
        after_buffs * config.critical_multiplier
    } else {
        after_buffs
    };

    RewardBreakdown {
        base,
        after_click,
        after_accuracy,
        after_skill,
        after_buffs,
        critical,
        amount: floor_and_clamp(final_amount, config.max_per_click),
    }
}

fn floor_and_clamp(value: f64, max: u64) -> u64 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    let floored = value.floor();
    if floored >= max as f64 {
        max
    } else {
        floored as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::ScriptedRng;
    use std::sync::Arc;

    fn plain(streak: u32, accuracy: f64) -> RewardInputs {
        RewardInputs {
            streak,
            accuracy,
            click_multiplier: 1.0,
            ..RewardInputs::default()
        }
    }

    fn no_luck() -> Dice {
        Dice::new(Arc::new(ScriptedRng::never()), 0)
    }

    #[test]
    fn zero_streak_perfect_accuracy_pays_one() {
        // 1 × 1.5 = 1.5 → 1
        let reward = compute_reward(&plain(0, 1.0), &RewardConfig::default(), &mut no_luck());
        assert_eq!(reward.amount, 1);
        assert!(!reward.critical);
    }

    #[test]
    fn frenzy_streak_five_half_accuracy() {
        let mut inputs = plain(5, 0.5);
        inputs.buff_multipliers = vec![(EffectId::Frenzy, 2.0)];
        let reward = compute_reward(&inputs, &RewardConfig::default(), &mut no_luck());
        assert_eq!(reward.after_accuracy, 6.25);
        assert_eq!(reward.after_buffs, 12.5);
        assert_eq!(reward.amount, 12);
    }

    #[test]
    fn full_stack_golden_value() {
        let inputs = RewardInputs {
            streak: 7,
            accuracy: 0.8,
            click_multiplier: 2.0,
            skill_bonus: 0.3,
            buff_multipliers: vec![(EffectId::Frenzy, 2.0), (EffectId::GoldenTouch, 3.0)],
            critical_chance: 1.0,
        };
        // 7 × 2 × 1.4 × 1.3 × 2 × 3 × 2 = 305.76
        let reward = compute_reward(&inputs, &RewardConfig::default(), &mut no_luck());
        assert!(reward.critical);
        assert_eq!(reward.amount, 305);
    }

    #[test]
    fn critical_roll_uses_stubbed_randomness() {
        let mut inputs = plain(3, 0.0);
        inputs.critical_chance = 0.5;

        let mut lucky = Dice::new(Arc::new(ScriptedRng::from_units(&[0.1])), 0);
        let hit = compute_reward(&inputs, &RewardConfig::default(), &mut lucky);
        assert!(hit.critical);
        assert_eq!(hit.amount, 6);

        let miss = compute_reward(&inputs, &RewardConfig::default(), &mut no_luck());
        assert!(!miss.critical);
        assert_eq!(miss.amount, 3);
    }

    #[test]
    fn ceiling_applies_after_flooring() {
        let config = RewardConfig {
            max_per_click: 50,
            ..RewardConfig::default()
        };
        let reward = compute_reward(&plain(100, 1.0), &config, &mut no_luck());
        assert_eq!(reward.amount, 50);
    }

    #[test]
    fn zero_click_multiplier_pays_nothing() {
        let mut inputs = plain(4, 1.0);
        inputs.click_multiplier = 0.0;
        let reward = compute_reward(&inputs, &RewardConfig::default(), &mut no_luck());
        assert_eq!(reward.amount, 0);
    }
}
