//! Session-scoped random stream built on an [`RngOracle`].

use std::sync::Arc;

use super::rng::{PcgRng, RngOracle, compute_seed};

/// Which decision a roll feeds. Mixed into the seed so that two decisions made
/// at the same nonce never share a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum RollContext {
    Layout = 0,
    Shuffle = 1,
    Accuracy = 2,
    Critical = 3,
    EffectTrigger = 4,
    EffectPolarity = 5,
    EffectPick = 6,
    EffectTick = 7,
    InstantOutcome = 8,
    Ghost = 9,
    SlotMachine = 10,
    BonusResource = 11,
}

/// Ordered stream of rolls: `seed + nonce + context → value`.
#[derive(Clone)]
pub struct Dice {
    oracle: Arc<dyn RngOracle>,
    seed: u64,
    nonce: u64,
}

impl Dice {
    pub fn new(oracle: Arc<dyn RngOracle>, seed: u64) -> Self {
        Self {
            oracle,
            seed,
            nonce: 0,
        }
    }

    /// PCG-backed stream.
    pub fn seeded(seed: u64) -> Self {
        Self::new(Arc::new(PcgRng), seed)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of rolls drawn so far.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn next_u32(&mut self, context: RollContext) -> u32 {
        let seed = compute_seed(self.seed, self.nonce, 0, context as u32);
        self.nonce = self.nonce.wrapping_add(1);
        self.oracle.next_u32(seed)
    }

    /// Uniform value in `[0, 1)`.
    pub fn unit(&mut self, context: RollContext) -> f64 {
        let seed = compute_seed(self.seed, self.nonce, 0, context as u32);
        self.nonce = self.nonce.wrapping_add(1);
        self.oracle.unit(seed)
    }

    /// True with probability `p`. No roll is consumed for `p <= 0` or `p >= 1`.
    pub fn chance(&mut self, context: RollContext, p: f64) -> bool {
        if p <= 0.0 {
            return false;
        }
        if p >= 1.0 {
            return true;
        }
        self.unit(context) < p
    }

    /// Uniform index in `0..len`; `None` when `len == 0`.
    pub fn index(&mut self, context: RollContext, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some(self.next_u32(context) as usize % len)
    }

    pub fn pick<T: Copy>(&mut self, context: RollContext, items: &[T]) -> Option<T> {
        self.index(context, items.len()).map(|i| items[i])
    }

    /// Index chosen proportionally to `weights`; `None` when all weights are 0.
    pub fn weighted(&mut self, context: RollContext, weights: &[u32]) -> Option<usize> {
        let total: u64 = weights.iter().map(|&w| w as u64).sum();
        if total == 0 {
            return None;
        }
        let mut roll = self.next_u32(context) as u64 % total;
        for (i, &w) in weights.iter().enumerate() {
            if roll < w as u64 {
                return Some(i);
            }
            roll -= w as u64;
        }
        None
    }

    /// Index chosen by cumulative probabilities (entries need not sum to 1).
    pub fn weighted_f64(&mut self, context: RollContext, weights: &[f64]) -> Option<usize> {
        let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
        if total <= 0.0 {
            return None;
        }
        let mut roll = self.unit(context) * total;
        for (i, &w) in weights.iter().enumerate() {
            if w <= 0.0 {
                continue;
            }
            if roll < w {
                return Some(i);
            }
            roll -= w;
        }
        weights.iter().rposition(|w| *w > 0.0)
    }
}

impl core::fmt::Debug for Dice {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Dice")
            .field("seed", &self.seed)
            .field("nonce", &self.nonce)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::ScriptedRng;

    #[test]
    fn certain_chances_do_not_consume_rolls() {
        let mut dice = Dice::seeded(1);
        assert!(dice.chance(RollContext::Critical, 1.0));
        assert!(!dice.chance(RollContext::Critical, 0.0));
        assert_eq!(dice.nonce(), 0);
    }

    #[test]
    fn weighted_skips_zero_weights() {
        let mut dice = Dice::new(Arc::new(ScriptedRng::constant(0)), 0);
        assert_eq!(dice.weighted(RollContext::EffectPick, &[0, 5, 3]), Some(1));
        assert_eq!(dice.weighted(RollContext::EffectPick, &[0, 0]), None);
    }

    #[test]
    fn weighted_f64_walks_cumulative_table() {
        let mut dice = Dice::new(Arc::new(ScriptedRng::from_units(&[0.5])), 0);
        // 0.5 lands in the third bucket: [0.15, 0.20, 0.30, ...]
        let pick = dice.weighted_f64(RollContext::InstantOutcome, &[0.15, 0.20, 0.30, 0.25, 0.10]);
        assert_eq!(pick, Some(2));
    }

    #[test]
    fn same_seed_same_stream() {
        let mut a = Dice::seeded(99);
        let mut b = Dice::seeded(99);
        for _ in 0..8 {
            assert_eq!(a.next_u32(RollContext::Shuffle), b.next_u32(RollContext::Shuffle));
        }
    }
}
