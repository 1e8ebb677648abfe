//! Bonus provider contract: aggregated upgrade modifiers keyed by kind and target.
//!
//! The engine only ever asks "how much `kind` bonus applies to `target`" and
//! treats the answer as a plain fraction (`0.2` = +20%).

use std::collections::BTreeMap;

/// How a bonus is applied.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display, strum::EnumString,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum BonusKind {
    /// Lengthens a duration: `base × (1 + bonus)`.
    Duration,
    /// Shortens or weakens: `value × (1 − bonus)`.
    Reduction,
    /// Scales a gain: `value × (1 + bonus)`.
    Multiplier,
    /// Additive probability.
    Chance,
    /// Fraction of a loss that is prevented.
    Protection,
}

/// What a bonus applies to.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display, strum::EnumString,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum BonusTarget {
    Buffs,
    Debuffs,
    ComboTimeout,
    Combo,
    Gold,
    Critical,
    Luck,
    Explosion,
    Chaos,
}

/// Source of aggregated upgrade bonuses. Pure from the engine's perspective.
pub trait BonusProvider: Send + Sync {
    fn bonus(&self, kind: BonusKind, target: BonusTarget) -> f64;
}

/// Provider with no upgrades purchased.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoBonuses;

impl BonusProvider for NoBonuses {
    fn bonus(&self, _kind: BonusKind, _target: BonusTarget) -> f64 {
        0.0
    }
}

/// One purchasable upgrade line and its per-level grant.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkillGrant {
    pub kind: BonusKind,
    pub target: BonusTarget,
    pub per_level: f64,
    pub max_level: u32,
}

/// Aggregates purchased skill levels into bonuses.
///
/// Grants of the same `(kind, target)` pair are summed.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkillBook {
    grants: BTreeMap<String, SkillGrant>,
    levels: BTreeMap<String, u32>,
}

impl SkillBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an upgrade line under `name`.
    pub fn with_grant(mut self, name: impl Into<String>, grant: SkillGrant) -> Self {
        self.grants.insert(name.into(), grant);
        self
    }

    /// Sets the purchased level, clamped to the line's maximum.
    ///
    /// Returns the stored level, or `None` for an unknown line.
    pub fn set_level(&mut self, name: &str, level: u32) -> Option<u32> {
        let grant = self.grants.get(name)?;
        let level = level.min(grant.max_level);
        self.levels.insert(name.to_owned(), level);
        Some(level)
    }

    pub fn level(&self, name: &str) -> u32 {
        self.levels.get(name).copied().unwrap_or(0)
    }

    pub fn grants(&self) -> impl Iterator<Item = (&str, &SkillGrant)> {
        self.grants.iter().map(|(name, grant)| (name.as_str(), grant))
    }
}

impl BonusProvider for SkillBook {
    fn bonus(&self, kind: BonusKind, target: BonusTarget) -> f64 {
        self.grants
            .iter()
            .filter(|(_, grant)| grant.kind == kind && grant.target == target)
            .map(|(name, grant)| grant.per_level * self.level(name) as f64)
            .sum()
    }
}

/// Fixed table of bonuses, handy for tests and scripted sessions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FixedBonuses {
    values: BTreeMap<(BonusKind, BonusTarget), f64>,
}

impl FixedBonuses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: BonusKind, target: BonusTarget, value: f64) -> Self {
        self.values.insert((kind, target), value);
        self
    }
}

impl BonusProvider for FixedBonuses {
    fn bonus(&self, kind: BonusKind, target: BonusTarget) -> f64 {
        self.values.get(&(kind, target)).copied().unwrap_or(0.0)
    }
}
