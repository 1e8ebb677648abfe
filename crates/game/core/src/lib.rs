//! Deterministic clicker rules: timed effects, target resolution and rewards.
//!
//! `game-core` is a synchronous state machine with no I/O and no wall clock.
//! Every entry point takes an explicit `now` in milliseconds, and every random
//! decision flows through an injected [`env::RngOracle`]. All state mutation
//! goes through [`engine::GameEngine`]; the runtime crate drives it from a
//! tokio task.
pub mod bonus;
pub mod combo;
pub mod config;
pub mod effects;
pub mod engine;
pub mod env;
pub mod error;
pub mod events;
pub mod field;
pub mod ledger;
pub mod params;
pub mod reward;
pub mod snapshot;

pub use bonus::{BonusKind, BonusProvider, BonusTarget, FixedBonuses, NoBonuses, SkillBook, SkillGrant};
pub use combo::{ComboState, ComboTracker, ComboUpdate};
pub use config::GameConfig;
pub use effects::{
    ActiveEffect, ApplyOutcome, EffectBehavior, EffectCatalog, EffectCounters, EffectDefinition,
    EffectEngine, EffectError, EffectId, ModifierSummary, PassiveModifier, Polarity,
};
pub use engine::{
    ClickFlags, ClickOutcome, EngineError, GameEngine, GameEngineBuilder, HitReport, SessionStatus,
};
pub use env::{Dice, PcgRng, RngOracle, ScriptedRng};
pub use error::{ErrorSeverity, GameError};
pub use events::{EventSink, ExpiryReason, GameEvent, MissReason, RejectReason};
pub use field::{FieldError, HitInput, LayoutKind, RegionRole, TargetField};
pub use ledger::{CostMap, MAX_SAFE, ResourceBook, ResourceKind, ResourceLedger};
pub use params::LayeredValue;
pub use reward::{RewardBreakdown, RewardInputs, compute_reward};
pub use snapshot::{ClickStats, SessionSnapshot, SnapshotError};
