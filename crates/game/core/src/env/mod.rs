//! Randomness sources injected into the engine.
//!
//! The engine never calls a global RNG. It draws from a [`Dice`] stream that
//! wraps an [`RngOracle`], so tests can swap in [`ScriptedRng`].
mod dice;
mod rng;

pub use dice::{Dice, RollContext};
pub use rng::{PcgRng, RngOracle, ScriptedRng, compute_seed};
