use crate::effects::{Rarity, Severity};
use crate::field::LayoutKind;

/// Game configuration constants and tunable parameters.
///
/// Every balance number the engine applies lives here so that content files
/// can override it; the mechanisms never hard-code a constant.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GameConfig {
    pub layout: LayoutKind,
    /// Number of `Bonus` regions scattered on every layout change.
    pub bonus_regions: usize,
    /// Number of `SecondaryBonus` regions scattered on every layout change.
    pub secondary_bonus_regions: usize,

    pub combo: ComboConfig,
    pub reward: RewardConfig,
    pub triggers: TriggerConfig,
    pub energy: EnergyConfig,
    pub watchdog: WatchdogConfig,

    /// Ring rotation in radians per second before any speed layer is applied.
    pub base_rotation_speed: f64,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ComboConfig {
    pub timeout_ms: u64,
    pub max_count: u32,
    /// Accuracy above which a hit adds one extra streak step. `None` disables it.
    pub high_accuracy_threshold: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RewardConfig {
    /// Weight of accuracy in the `1 + accuracy * weight` factor.
    pub accuracy_weight: f64,
    pub critical_multiplier: f64,
    /// Anti-exploit ceiling applied after flooring.
    pub max_per_click: u64,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TriggerConfig {
    /// Probability in `[0, 1]` that a target hit relocates the target.
    pub shuffle_chance: f64,
    /// Probability in `[0, 1]` that a target hit triggers a random effect.
    pub base_effect_chance: f64,
    pub rarity_weights: RarityWeights,
    pub severity_weights: SeverityWeights,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EnergyConfig {
    pub max: u64,
    pub click_cost: u64,
    /// Energy restored by a `Bonus` region hit.
    pub bonus_restore: u64,
    /// Energy restored by a `SecondaryBonus` region hit.
    pub secondary_restore: u64,
    /// Tradeable resource granted by a `SecondaryBonus` region hit.
    pub secondary_resource_bonus: u64,
    pub regen_amount: u64,
    pub regen_interval_ms: u64,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WatchdogConfig {
    pub effect_interval_ms: u64,
    pub combo_interval_ms: u64,
    /// Absolute age after which any timed effect is force-removed.
    pub safety_ceiling_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RarityWeights {
    pub common: u32,
    pub uncommon: u32,
    pub rare: u32,
    pub epic: u32,
    pub legendary: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SeverityWeights {
    pub mild: u32,
    pub moderate: u32,
    pub severe: u32,
    pub catastrophic: u32,
}

impl GameConfig {
    // ===== runtime-tunable defaults =====
    pub const DEFAULT_REGION_COUNT: usize = 8;
    pub const DEFAULT_GRID_SIZE: usize = 3;
    pub const DEFAULT_BONUS_REGIONS: usize = 2;
    pub const DEFAULT_SECONDARY_BONUS_REGIONS: usize = 1;
    pub const DEFAULT_ROTATION_SPEED: f64 = 0.5;
    /// Upper bound on regions in any layout (a 32x32 grid).
    pub const MAX_REGIONS: usize = 1_024;

    /// Minimum resolved duration of a debuff after reduction bonuses.
    pub const MIN_DEBUFF_DURATION_MS: u64 = 500;
    /// Bounded retries for picking a fresh target index.
    pub const SHUFFLE_ATTEMPTS: usize = 10;

    pub fn new() -> Self {
        Self {
            layout: LayoutKind::Ring {
                regions: Self::DEFAULT_REGION_COUNT,
            },
            bonus_regions: Self::DEFAULT_BONUS_REGIONS,
            secondary_bonus_regions: Self::DEFAULT_SECONDARY_BONUS_REGIONS,
            combo: ComboConfig::default(),
            reward: RewardConfig::default(),
            triggers: TriggerConfig::default(),
            energy: EnergyConfig::default(),
            watchdog: WatchdogConfig::default(),
            base_rotation_speed: Self::DEFAULT_ROTATION_SPEED,
        }
    }

    /// Same defaults on a square grid layout.
    pub fn grid() -> Self {
        Self {
            layout: LayoutKind::Grid {
                size: Self::DEFAULT_GRID_SIZE,
            },
            ..Self::new()
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for ComboConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            max_count: 100,
            high_accuracy_threshold: None,
        }
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            accuracy_weight: 0.5,
            critical_multiplier: 2.0,
            max_per_click: 1_000_000,
        }
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            shuffle_chance: 0.1,
            base_effect_chance: 0.1,
            rarity_weights: RarityWeights::default(),
            severity_weights: SeverityWeights::default(),
        }
    }
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            max: 100,
            click_cost: 1,
            bonus_restore: 3,
            secondary_restore: 2,
            secondary_resource_bonus: 2,
            regen_amount: 1,
            regen_interval_ms: 15_000,
        }
    }
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            effect_interval_ms: 5_000,
            combo_interval_ms: 1_000,
            // Longer than the longest catalog effect (15 minute market discount).
            safety_ceiling_ms: 20 * 60 * 1_000,
        }
    }
}

impl RarityWeights {
    pub fn weight(&self, rarity: Rarity) -> u32 {
        match rarity {
            Rarity::Common => self.common,
            Rarity::Uncommon => self.uncommon,
            Rarity::Rare => self.rare,
            Rarity::Epic => self.epic,
            Rarity::Legendary => self.legendary,
        }
    }
}

impl Default for RarityWeights {
    fn default() -> Self {
        Self {
            common: 45,
            uncommon: 30,
            rare: 18,
            epic: 6,
            legendary: 1,
        }
    }
}

impl SeverityWeights {
    pub fn weight(&self, severity: Severity) -> u32 {
        match severity {
            Severity::Mild => self.mild,
            Severity::Moderate => self.moderate,
            Severity::Severe => self.severe,
            Severity::Catastrophic => self.catastrophic,
        }
    }
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            mild: 45,
            moderate: 35,
            severe: 18,
            catastrophic: 2,
        }
    }
}
