//! Common error infrastructure for game-core.
//!
//! Domain-specific errors (`EffectError`, `FieldError`, `SnapshotError`) are
//! defined next to the code that produces them. This module provides the
//! shared severity classification and the [`GameError`] trait they implement.
//!
//! None of these errors ever interrupts the input loop: the click pipeline and
//! the timer dispatcher log them and continue with a no-op.

/// Severity level of an error, used for categorization and recovery strategies.
///
/// - **Recoverable**: the request was well-formed but the state refused it
/// - **Validation**: invalid input or an unknown reference
/// - **Internal**: unexpected state inconsistency that requires investigation
/// - **Fatal**: the engine can no longer accept requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Examples: not enough energy, debuff absorbed by a shield.
    Recoverable,

    /// Examples: unknown effect id, region index out of range.
    Validation,

    /// Examples: orphaned active effect, corrupted snapshot payload.
    Internal,

    /// Examples: request issued after teardown.
    Fatal,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    /// Returns true if this error indicates an internal bug.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

impl core::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common trait for all game-core errors.
///
/// # Implementation Guidelines
///
/// - All error enums should implement this trait
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity based on recoverability, not impact
pub trait GameError: core::fmt::Display + core::fmt::Debug {
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    ///
    /// Used as a structured log field and in tests.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_classification() {
        assert!(ErrorSeverity::Recoverable.is_recoverable());
        assert!(!ErrorSeverity::Validation.is_internal());
        assert!(ErrorSeverity::Fatal.is_internal());
        assert_eq!(ErrorSeverity::Internal.to_string(), "internal");
    }
}
