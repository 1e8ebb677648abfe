//! Deterministic timer registry.
//!
//! Timers are plain records with a due time. Nothing runs on its own: the
//! engine pops due timers in `(due_at, handle)` order from `advance(now)` and
//! dispatches them through its regular entry points.

use std::collections::BTreeMap;

use super::EffectId;

/// Opaque handle to a scheduled timer. Handles are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(u64);

/// What a timer does when it fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerPurpose {
    /// Remove the effect when its duration ends.
    Expire(EffectId),
    /// Run the effect's periodic side effect.
    Tick(EffectId),
    /// Sweep stale, overdue, and orphaned effects.
    EffectWatchdog,
    /// Expire the combo if its deadline passed.
    ComboWatchdog,
    EnergyRegen,
}

impl TimerPurpose {
    /// System timers survive `clear_all`; effect timers do not.
    pub fn is_system(&self) -> bool {
        matches!(
            self,
            TimerPurpose::EffectWatchdog | TimerPurpose::ComboWatchdog | TimerPurpose::EnergyRegen
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Timer {
    purpose: TimerPurpose,
    due_at: u64,
    interval: Option<u64>,
}

/// A timer that came due.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FiredTimer {
    pub handle: TimerHandle,
    pub purpose: TimerPurpose,
    /// The instant the timer was scheduled to fire, which may precede `now`.
    pub due_at: u64,
}

#[derive(Clone, Debug, Default)]
pub struct TimerRegistry {
    next_handle: u64,
    timers: BTreeMap<TimerHandle, Timer>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_once(&mut self, now: u64, delay_ms: u64, purpose: TimerPurpose) -> TimerHandle {
        self.insert(Timer {
            purpose,
            due_at: now.saturating_add(delay_ms),
            interval: None,
        })
    }

    /// Fires every `interval_ms` starting one interval from `now`.
    pub fn schedule_repeating(
        &mut self,
        now: u64,
        interval_ms: u64,
        purpose: TimerPurpose,
    ) -> TimerHandle {
        let interval = interval_ms.max(1);
        self.insert(Timer {
            purpose,
            due_at: now.saturating_add(interval),
            interval: Some(interval),
        })
    }

    /// Cancels a timer. Unknown and already-fired handles are ignored.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.timers.remove(&handle).is_some()
    }

    pub fn contains(&self, handle: TimerHandle) -> bool {
        self.timers.contains_key(&handle)
    }

    /// Pops the earliest timer due at or before `now`.
    ///
    /// One-shot timers are removed; repeating timers are re-armed one interval
    /// after their previous due time so missed ticks are caught up in order.
    pub fn pop_due(&mut self, now: u64) -> Option<FiredTimer> {
        let (handle, timer) = self
            .timers
            .iter()
            .filter(|(_, timer)| timer.due_at <= now)
            .min_by_key(|(handle, timer)| (timer.due_at, **handle))
            .map(|(handle, timer)| (*handle, *timer))?;

        match timer.interval {
            Some(interval) => {
                if let Some(entry) = self.timers.get_mut(&handle) {
                    entry.due_at = timer.due_at.saturating_add(interval);
                }
            }
            None => {
                self.timers.remove(&handle);
            }
        }

        Some(FiredTimer {
            handle,
            purpose: timer.purpose,
            due_at: timer.due_at,
        })
    }

    /// Earliest pending due time.
    pub fn next_due_at(&self) -> Option<u64> {
        self.timers.values().map(|t| t.due_at).min()
    }

    /// Cancels every timer whose purpose matches.
    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&TimerPurpose) -> bool) -> usize {
        let before = self.timers.len();
        self.timers.retain(|_, timer| !predicate(&timer.purpose));
        before - self.timers.len()
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    fn insert(&mut self, timer: Timer) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        self.timers.insert(handle, timer);
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_due_order() {
        let mut timers = TimerRegistry::new();
        let late = timers.schedule_once(0, 200, TimerPurpose::Expire(EffectId::Frenzy));
        let early = timers.schedule_once(0, 100, TimerPurpose::Expire(EffectId::Lucky));

        assert_eq!(timers.pop_due(50), None);
        assert_eq!(timers.pop_due(300).map(|f| f.handle), Some(early));
        assert_eq!(timers.pop_due(300).map(|f| f.handle), Some(late));
        assert!(timers.is_empty());
    }

    #[test]
    fn repeating_timers_catch_up() {
        let mut timers = TimerRegistry::new();
        timers.schedule_repeating(0, 1_000, TimerPurpose::EnergyRegen);

        let mut fired = Vec::new();
        while let Some(timer) = timers.pop_due(3_500) {
            fired.push(timer.due_at);
        }
        assert_eq!(fired, vec![1_000, 2_000, 3_000]);
        assert_eq!(timers.next_due_at(), Some(4_000));
    }

    #[test]
    fn cancelling_twice_is_harmless() {
        let mut timers = TimerRegistry::new();
        let handle = timers.schedule_once(0, 10, TimerPurpose::ComboWatchdog);
        assert!(timers.cancel(handle));
        assert!(!timers.cancel(handle));
        assert_eq!(timers.pop_due(100), None);
    }

    #[test]
    fn cancel_where_keeps_system_timers() {
        let mut timers = TimerRegistry::new();
        timers.schedule_repeating(0, 5_000, TimerPurpose::EffectWatchdog);
        timers.schedule_once(0, 10, TimerPurpose::Expire(EffectId::Freeze));
        timers.schedule_repeating(0, 10, TimerPurpose::Tick(EffectId::Decay));

        assert_eq!(timers.cancel_where(|p| !p.is_system()), 2);
        assert_eq!(timers.len(), 1);
    }
}
