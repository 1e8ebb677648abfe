//! Persistable session state.
//!
//! A snapshot carries resources, effect counters, the combo and the target
//! index. Active effects are never persisted: a restored session starts with
//! an empty active set.

use std::collections::BTreeMap;

use crate::combo::ComboState;
use crate::effects::EffectCounters;
use crate::error::{ErrorSeverity, GameError};
use crate::ledger::ResourceKind;

/// Lifetime click counters reported to the player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClickStats {
    pub clicks: u64,
    pub target_hits: u64,
    pub misses: u64,
    pub rejected: u64,
    pub critical_hits: u64,
    pub best_combo: u32,
    pub effects_triggered: u64,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SessionSnapshot {
    pub resources: BTreeMap<ResourceKind, u64>,
    pub counters: EffectCounters,
    pub combo: ComboState,
    pub target_index: usize,
    pub stats: ClickStats,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to encode snapshot: {0}")]
    Encode(String),

    #[error("failed to decode snapshot: {0}")]
    Decode(String),

    #[error("snapshot is {len} bytes, shorter than its checksum")]
    Truncated { len: usize },

    #[error("snapshot checksum mismatch")]
    ChecksumMismatch,

    #[error("snapshot target index {index} out of range (field has {len} regions)")]
    TargetOutOfRange { index: usize, len: usize },
}

impl GameError for SnapshotError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Encode(_) => ErrorSeverity::Internal,
            Self::Decode(_) | Self::Truncated { .. } | Self::ChecksumMismatch => {
                ErrorSeverity::Recoverable
            }
            Self::TargetOutOfRange { .. } => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Encode(_) => "SNAPSHOT_ENCODE",
            Self::Decode(_) => "SNAPSHOT_DECODE",
            Self::Truncated { .. } => "SNAPSHOT_TRUNCATED",
            Self::ChecksumMismatch => "SNAPSHOT_CHECKSUM",
            Self::TargetOutOfRange { .. } => "SNAPSHOT_TARGET_OUT_OF_RANGE",
        }
    }
}

#[cfg(feature = "serde")]
const CHECKSUM_LEN: usize = 32;

#[cfg(feature = "serde")]
impl SessionSnapshot {
    /// Encodes as `sha256(payload) ‖ bincode(payload)`.
    pub fn encode(&self) -> Result<Vec<u8>, SnapshotError> {
        let payload = bincode::serialize(self).map_err(|e| SnapshotError::Encode(e.to_string()))?;
        let mut bytes = Vec::with_capacity(CHECKSUM_LEN + payload.len());
        bytes.extend_from_slice(&checksum(&payload));
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, SnapshotError> {
        if bytes.len() < CHECKSUM_LEN {
            return Err(SnapshotError::Truncated { len: bytes.len() });
        }
        let (digest, payload) = bytes.split_at(CHECKSUM_LEN);
        if digest != checksum(payload) {
            return Err(SnapshotError::ChecksumMismatch);
        }
        bincode::deserialize(payload).map_err(|e| SnapshotError::Decode(e.to_string()))
    }
}

#[cfg(feature = "serde")]
fn checksum(payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(payload);
    hasher.finalize().into()
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    fn sample() -> SessionSnapshot {
        SessionSnapshot {
            resources: BTreeMap::from([(ResourceKind::Gold, 120), (ResourceKind::Energy, 40)]),
            counters: EffectCounters {
                shield_charges: 2,
                ..EffectCounters::default()
            },
            combo: ComboState {
                count: 4,
                deadline: 9_000,
                last_region: Some(3),
            },
            target_index: 3,
            stats: ClickStats {
                clicks: 10,
                ..ClickStats::default()
            },
        }
    }

    #[test]
    fn encoded_snapshot_decodes() {
        let bytes = sample().encode().unwrap();
        assert_eq!(SessionSnapshot::decode(&bytes).unwrap(), sample());
    }

    #[test]
    fn corrupted_payload_is_rejected() {
        let mut bytes = sample().encode().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert_eq!(SessionSnapshot::decode(&bytes), Err(SnapshotError::ChecksumMismatch));
        assert_eq!(
            SessionSnapshot::decode(&bytes[..10]),
            Err(SnapshotError::Truncated { len: 10 })
        );
    }
}
