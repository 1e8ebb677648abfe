//! Event types for different topics.

use game_core::GameEvent;
use serde::{Deserialize, Serialize};

use super::bus::Topic;

/// Session lifecycle notifications emitted by the worker itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    Started { seed: u64 },
    Restored { reset_combo: bool },
    Reset,
    SkillChanged { name: String, level: u32 },
    Stopped { at_ms: u64 },
}

/// Topic an engine event is routed to.
pub(crate) fn topic_of(event: &GameEvent) -> Topic {
    match event {
        GameEvent::EffectApplied { .. }
        | GameEvent::EffectExpired { .. }
        | GameEvent::EffectBlocked { .. }
        | GameEvent::MysteryBoxOffered { .. }
        | GameEvent::RollResolved { .. } => Topic::Effects,
        GameEvent::TargetHit { .. }
        | GameEvent::TargetMiss { .. }
        | GameEvent::InputRejected { .. }
        | GameEvent::ComboChanged { .. }
        | GameEvent::CriticalHit { .. } => Topic::Input,
        GameEvent::ResourceChanged { .. }
        | GameEvent::StarPowerUsed { .. }
        | GameEvent::SlotMachineWin { .. } => Topic::Economy,
        GameEvent::LayoutChanged { .. } => Topic::Layout,
    }
}
