//! Timed effect engine: catalog, active arena, counters, and timers.
mod active;
mod catalog;
mod counters;
mod engine;
mod timers;

pub use active::ActiveEffect;
pub use catalog::{
    CountedUse, EffectBehavior, EffectCatalog, EffectDefinition, EffectId, InstantAction,
    PassiveModifier, Polarity, Rarity, RollOutcome, Severity, StackingPolicy, TickAction,
    WeightClass,
};
pub use counters::{EffectCounters, HeavyClickProgress, MAX_MYSTERY_CHOICES, MysteryOffer};
pub use engine::{ApplyOutcome, EffectContext, EffectEngine, ModifierSummary};
pub use timers::{FiredTimer, TimerHandle, TimerPurpose, TimerRegistry};

use crate::error::{ErrorSeverity, GameError};
use crate::ledger::ResourceKind;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EffectError {
    #[error("unknown effect {0}")]
    UnknownEffect(EffectId),

    #[error("effect {0} is defined more than once")]
    DuplicateDefinition(EffectId),

    #[error("invalid definition for {id}: {reason}")]
    InvalidDefinition { id: EffectId, reason: &'static str },

    #[error("no mystery box is waiting to be claimed")]
    NoMysteryBox,

    #[error("{0} is not one of the offered mystery box choices")]
    NotOffered(ResourceKind),

    #[error("effect engine has been torn down")]
    Destroyed,
}

impl GameError for EffectError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::UnknownEffect(_) | Self::NotOffered(_) => ErrorSeverity::Validation,
            Self::NoMysteryBox => ErrorSeverity::Recoverable,
            Self::DuplicateDefinition(_) | Self::InvalidDefinition { .. } => {
                ErrorSeverity::Internal
            }
            Self::Destroyed => ErrorSeverity::Fatal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownEffect(_) => "EFFECT_UNKNOWN",
            Self::DuplicateDefinition(_) => "EFFECT_DUPLICATE",
            Self::InvalidDefinition { .. } => "EFFECT_INVALID_DEFINITION",
            Self::NoMysteryBox => "EFFECT_NO_MYSTERY_BOX",
            Self::NotOffered(_) => "EFFECT_NOT_OFFERED",
            Self::Destroyed => "EFFECT_DESTROYED",
        }
    }
}
