//! Layered parameters: a base value scaled by named multiplier slots.
//!
//! Each modifier source owns exactly one slot. The effective value is
//! recomputed on every read, so overlapping sources can be added and removed
//! in any order and clearing every slot always lands back on the base.

use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayeredValue {
    base: f64,
    slots: BTreeMap<String, f64>,
}

impl LayeredValue {
    pub fn new(base: f64) -> Self {
        Self {
            base,
            slots: BTreeMap::new(),
        }
    }

    pub fn base(&self) -> f64 {
        self.base
    }

    /// `base × Π slots`.
    pub fn effective(&self) -> f64 {
        self.slots.values().fold(self.base, |acc, factor| acc * factor)
    }

    /// Installs or replaces the multiplier owned by `source`.
    pub fn set_slot(&mut self, source: impl Into<String>, factor: f64) {
        self.slots.insert(source.into(), factor);
    }

    pub fn clear_slot(&mut self, source: &str) -> bool {
        self.slots.remove(source).is_some()
    }

    pub fn clear_all(&mut self) {
        self.slots.clear();
    }

    pub fn slot(&self, source: &str) -> Option<f64> {
        self.slots.get(source).copied()
    }

    pub fn is_baseline(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_sources_restore_cleanly() {
        let mut speed = LayeredValue::new(2.0);
        speed.set_slot("rapid", 3.0);
        speed.set_slot("slow", 0.5);
        assert_eq!(speed.effective(), 3.0);

        // Removal order opposite to installation.
        speed.clear_slot("rapid");
        assert_eq!(speed.effective(), 1.0);
        speed.clear_slot("slow");
        assert_eq!(speed.effective(), 2.0);
        assert!(speed.is_baseline());
    }

    #[test]
    fn reinstalling_a_slot_replaces_it() {
        let mut speed = LayeredValue::new(1.0);
        speed.set_slot("rapid", 3.0);
        speed.set_slot("rapid", 3.0);
        assert_eq!(speed.effective(), 3.0);
    }
}
