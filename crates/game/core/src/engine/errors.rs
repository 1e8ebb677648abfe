//! Errors surfaced by [`GameEngine`](super::GameEngine) entry points.

use crate::effects::EffectError;
use crate::error::{ErrorSeverity, GameError};
use crate::field::FieldError;
use crate::snapshot::SnapshotError;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Effect(#[from] EffectError),

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("engine has been torn down")]
    Destroyed,
}

impl GameError for EngineError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Effect(e) => e.severity(),
            Self::Field(e) => e.severity(),
            Self::Snapshot(e) => e.severity(),
            Self::Destroyed => ErrorSeverity::Fatal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Effect(e) => e.error_code(),
            Self::Field(e) => e.error_code(),
            Self::Snapshot(e) => e.error_code(),
            Self::Destroyed => "ENGINE_DESTROYED",
        }
    }
}
