//! Resource ledger contract and the in-memory book the engine uses by default.
//!
//! The ledger owns validation: quantities never go below zero and never exceed
//! [`MAX_SAFE`] or the per-kind cap. Callers only ask to add, subtract, or
//! atomically spend.

use std::collections::BTreeMap;

/// Largest quantity any resource may hold (2^53 − 1).
pub const MAX_SAFE: u64 = (1 << 53) - 1;

/// Every kind of quantity tracked by the ledger.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ResourceKind {
    /// Primary currency earned by target hits.
    Gold,
    Wood,
    Stone,
    Food,
    Water,
    Iron,
    People,
    Science,
    /// "Order" resource: raises the buff share of triggered effects.
    Faith,
    /// "Entropy" resource: raises the debuff share of triggered effects.
    Chaos,
    /// Spent per target click, restored by bonus regions and regeneration.
    Energy,
}

impl ResourceKind {
    /// Resources that random grants and losses draw from.
    pub const TRADEABLE: [ResourceKind; 7] = [
        ResourceKind::Wood,
        ResourceKind::Stone,
        ResourceKind::Food,
        ResourceKind::Water,
        ResourceKind::Iron,
        ResourceKind::People,
        ResourceKind::Science,
    ];

    /// Everything except energy, which is a meter rather than a holding.
    pub const HOLDINGS: [ResourceKind; 10] = [
        ResourceKind::Gold,
        ResourceKind::Wood,
        ResourceKind::Stone,
        ResourceKind::Food,
        ResourceKind::Water,
        ResourceKind::Iron,
        ResourceKind::People,
        ResourceKind::Science,
        ResourceKind::Faith,
        ResourceKind::Chaos,
    ];

    pub fn is_tradeable(self) -> bool {
        Self::TRADEABLE.contains(&self)
    }
}

/// Amounts that must all be available for a spend to succeed.
pub type CostMap = BTreeMap<ResourceKind, u64>;

/// Read/write access to player holdings.
pub trait ResourceLedger: Send {
    fn get(&self, kind: ResourceKind) -> u64;

    /// Overwrites a quantity, clamped to the cap. Used by snapshot restore.
    fn set(&mut self, kind: ResourceKind, amount: u64);

    /// Upper bound for a kind.
    fn cap(&self, _kind: ResourceKind) -> u64 {
        MAX_SAFE
    }

    /// Adds `amount`, clamped to the cap. Returns the amount actually credited.
    fn add(&mut self, kind: ResourceKind, amount: u64) -> u64 {
        let current = self.get(kind);
        let next = current.saturating_add(amount).min(self.cap(kind));
        let credited = next.saturating_sub(current);
        if credited > 0 {
            self.set(kind, next);
        }
        credited
    }

    /// Subtracts up to `amount`, never below zero. Returns the amount removed.
    fn subtract(&mut self, kind: ResourceKind, amount: u64) -> u64 {
        let current = self.get(kind);
        let removed = amount.min(current);
        if removed > 0 {
            self.set(kind, current - removed);
        }
        removed
    }

    /// All-or-nothing spend. Returns false without mutating anything when any
    /// entry is short.
    fn try_spend(&mut self, cost: &CostMap) -> bool {
        if cost.iter().any(|(kind, amount)| self.get(*kind) < *amount) {
            return false;
        }
        for (kind, amount) in cost {
            self.subtract(*kind, *amount);
        }
        true
    }
}

/// In-memory ledger with optional per-kind caps.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceBook {
    amounts: BTreeMap<ResourceKind, u64>,
    caps: BTreeMap<ResourceKind, u64>,
}

impl ResourceBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Book with the energy meter capped and filled to `max_energy`.
    pub fn with_energy(max_energy: u64) -> Self {
        let mut book = Self::new().with_cap(ResourceKind::Energy, max_energy);
        book.set(ResourceKind::Energy, max_energy);
        book
    }

    pub fn with_cap(mut self, kind: ResourceKind, cap: u64) -> Self {
        self.caps.insert(kind, cap.min(MAX_SAFE));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, u64)> + '_ {
        self.amounts.iter().map(|(k, v)| (*k, *v))
    }
}

impl ResourceLedger for ResourceBook {
    fn get(&self, kind: ResourceKind) -> u64 {
        self.amounts.get(&kind).copied().unwrap_or(0)
    }

    fn set(&mut self, kind: ResourceKind, amount: u64) {
        let clamped = amount.min(self.cap(kind));
        self.amounts.insert(kind, clamped);
    }

    fn cap(&self, kind: ResourceKind) -> u64 {
        self.caps.get(&kind).copied().unwrap_or(MAX_SAFE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_clamps_to_max_safe() {
        let mut book = ResourceBook::new();
        book.set(ResourceKind::Gold, MAX_SAFE - 1);
        assert_eq!(book.add(ResourceKind::Gold, 10), 1);
        assert_eq!(book.get(ResourceKind::Gold), MAX_SAFE);
    }

    #[test]
    fn subtract_never_underflows() {
        let mut book = ResourceBook::new();
        book.set(ResourceKind::Wood, 3);
        assert_eq!(book.subtract(ResourceKind::Wood, 10), 3);
        assert_eq!(book.get(ResourceKind::Wood), 0);
    }

    #[test]
    fn try_spend_is_all_or_nothing() {
        let mut book = ResourceBook::new();
        book.set(ResourceKind::Gold, 10);
        book.set(ResourceKind::Energy, 0);

        let cost = CostMap::from([(ResourceKind::Gold, 5), (ResourceKind::Energy, 1)]);
        assert!(!book.try_spend(&cost));
        assert_eq!(book.get(ResourceKind::Gold), 10);

        book.set(ResourceKind::Energy, 1);
        assert!(book.try_spend(&cost));
        assert_eq!(book.get(ResourceKind::Gold), 5);
        assert_eq!(book.get(ResourceKind::Energy), 0);
    }

    #[test]
    fn energy_cap_applies() {
        let mut book = ResourceBook::with_energy(100);
        assert_eq!(book.add(ResourceKind::Energy, 5), 0);
        book.subtract(ResourceKind::Energy, 10);
        assert_eq!(book.add(ResourceKind::Energy, 50), 10);
    }

    #[test]
    fn kinds_parse_case_insensitively() {
        let kind: ResourceKind = "SCIENCE".parse().unwrap();
        assert_eq!(kind, ResourceKind::Science);
        assert!(kind.is_tradeable());
        assert!(!ResourceKind::Gold.is_tradeable());
    }
}
