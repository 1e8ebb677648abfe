//! Typed notifications produced by the engine.
//!
//! The engine pushes events into an [`EventSink`] and never checks whether
//! anyone consumes them. The runtime drains the sink after each command and
//! republishes the events on its bus. Embedders that never call
//! `GameEngine::drain_events` lose the oldest events once the sink is full.

use tracing::warn;

use crate::effects::{EffectId, Polarity};
use crate::ledger::ResourceKind;

/// Why an active effect left the active set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum ExpiryReason {
    /// Its expiry timer fired.
    Timer,
    /// The watchdog found it past its duration, past the safety ceiling, or orphaned.
    Watchdog,
    /// Its counted uses were exhausted.
    Consumed,
    /// A fresh application of the same identity replaced it.
    Replaced,
    /// Removed on request.
    Removed,
    /// Dropped by `clear_all`.
    Cleared,
}

/// Why a click found no score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum MissReason {
    /// The input fell outside every region.
    NoRegion,
    /// A region was hit, but it was not the target.
    WrongRegion,
}

/// Why a target click was refused before scoring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum RejectReason {
    /// An input lock is active.
    Locked,
    /// The click was swallowed by a ghost-click roll.
    Ghost,
    /// The region needs more repeat clicks before it registers.
    HeavyClick,
    /// Not enough energy to pay the click cost.
    InsufficientEnergy,
    /// The engine has been torn down.
    Destroyed,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GameEvent {
    EffectApplied {
        id: EffectId,
        polarity: Polarity,
        duration_ms: Option<u64>,
    },
    EffectExpired {
        id: EffectId,
        reason: ExpiryReason,
    },
    /// A debuff was absorbed by a shield charge.
    EffectBlocked {
        id: EffectId,
        charges_left: u32,
    },
    TargetHit {
        region: usize,
        accuracy: f64,
        combo: u32,
        reward: u64,
    },
    TargetMiss {
        region: Option<usize>,
        reason: MissReason,
    },
    InputRejected {
        reason: RejectReason,
    },
    ComboChanged {
        previous: u32,
        count: u32,
    },
    ResourceChanged {
        kind: ResourceKind,
        delta: i64,
        total: u64,
    },
    LayoutChanged {
        target: usize,
        bonus: Vec<usize>,
        secondary: Vec<usize>,
    },
    CriticalHit {
        reward: u64,
    },
    MysteryBoxOffered {
        options: Vec<ResourceKind>,
    },
    StarPowerUsed {
        kind: ResourceKind,
        amount: u64,
        remaining: u32,
    },
    SlotMachineWin {
        kind: ResourceKind,
        amount: u64,
    },
    /// Outcome of a one-shot roll table.
    RollResolved {
        label: String,
        kind: ResourceKind,
        delta: i64,
    },
}

/// Bounded buffer of pending events.
///
/// Owners are expected to drain after every call into the engine. An
/// undrained sink keeps the newest `limit` events and drops the oldest.
#[derive(Clone, Debug)]
pub struct EventSink {
    pending: Vec<GameEvent>,
    limit: usize,
    dropped: u64,
}

impl Default for EventSink {
    fn default() -> Self {
        Self::with_limit(Self::DEFAULT_LIMIT)
    }
}

impl EventSink {
    pub const DEFAULT_LIMIT: usize = 4_096;

    pub fn new() -> Self {
        Self::default()
    }

    /// Sink holding at most `limit` events (at least one).
    pub fn with_limit(limit: usize) -> Self {
        Self {
            pending: Vec::new(),
            limit: limit.max(1),
            dropped: 0,
        }
    }

    pub fn push(&mut self, event: GameEvent) {
        if self.pending.len() >= self.limit {
            if self.dropped == 0 {
                warn!(limit = self.limit, "event sink full, dropping oldest events");
            }
            self.pending.remove(0);
            self.dropped += 1;
        }
        self.pending.push(event);
    }

    /// Records a signed ledger change. Zero deltas are not reported.
    pub fn resource(&mut self, kind: ResourceKind, delta: i64, total: u64) {
        if delta != 0 {
            self.push(GameEvent::ResourceChanged { kind, delta, total });
        }
    }

    pub fn drain(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending)
    }

    pub fn pending(&self) -> &[GameEvent] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Events discarded because the sink was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
