use super::{EffectId, Polarity, TimerHandle};

/// Arena entry for a running effect.
///
/// Holds both timer handles together with the start time and resolved
/// duration, so a single cleanup routine can tear the entry down.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveEffect {
    pub id: EffectId,
    pub polarity: Polarity,
    pub started_at: u64,
    /// Base duration scaled by bonuses at application time. `None` for counted effects.
    pub resolved_duration_ms: Option<u64>,
    pub expiry: Option<TimerHandle>,
    pub tick: Option<TimerHandle>,
}

impl ActiveEffect {
    pub fn elapsed(&self, now: u64) -> u64 {
        now.saturating_sub(self.started_at)
    }

    /// Instant at which the effect should end, if it is timed.
    pub fn ends_at(&self) -> Option<u64> {
        self.resolved_duration_ms
            .map(|d| self.started_at.saturating_add(d))
    }

    /// True while `now` is inside the effect window. Counted effects never lapse by time.
    pub fn is_live_at(&self, now: u64) -> bool {
        self.ends_at().is_none_or(|end| now < end)
    }

    pub fn remaining_ms(&self, now: u64) -> Option<u64> {
        self.ends_at().map(|end| end.saturating_sub(now))
    }
}
