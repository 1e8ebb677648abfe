//! Combo streak tracker.
//!
//! Expiry is lazy: the streak is zero the instant `now` passes the deadline,
//! whether or not anything has observed it yet. A freeze suspends the deadline
//! check without moving the deadline.

use crate::config::ComboConfig;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComboState {
    pub count: u32,
    pub deadline: u64,
    pub last_region: Option<usize>,
}

/// Result of registering a target hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComboUpdate {
    pub previous: u32,
    pub count: u32,
    pub deadline: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComboTracker {
    state: ComboState,
}

impl ComboTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: ComboState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> ComboState {
        self.state
    }

    fn is_expired(&self, now: u64, frozen: bool) -> bool {
        !frozen && self.state.count > 0 && now > self.state.deadline
    }

    /// Streak count as observed at `now`.
    pub fn count_at(&self, now: u64, frozen: bool) -> u32 {
        if self.is_expired(now, frozen) {
            0
        } else {
            self.state.count
        }
    }

    /// Applies lazy expiry. Returns the count that was dropped, if any.
    pub fn expire_if_due(&mut self, now: u64, frozen: bool) -> Option<u32> {
        if !self.is_expired(now, frozen) {
            return None;
        }
        let previous = self.state.count;
        self.state.count = 0;
        Some(previous)
    }

    /// Registers a confirmed target hit.
    ///
    /// While frozen the streak and deadline are held exactly as they were.
    pub fn register_hit(
        &mut self,
        now: u64,
        region: usize,
        accuracy: f64,
        frozen: bool,
        timeout_bonus_ms: u64,
        config: &ComboConfig,
    ) -> ComboUpdate {
        let previous = self.state.count;
        self.state.last_region = Some(region);

        if frozen {
            return ComboUpdate {
                previous,
                count: previous,
                deadline: self.state.deadline,
            };
        }

        let mut count = if self.is_expired(now, frozen) {
            1
        } else {
            previous.saturating_add(1)
        };
        if let Some(threshold) = config.high_accuracy_threshold
            && accuracy > threshold
        {
            count = count.saturating_add(1);
        }

        self.state.count = count.min(config.max_count);
        self.state.deadline = now
            .saturating_add(config.timeout_ms)
            .saturating_add(timeout_bonus_ms);

        ComboUpdate {
            previous,
            count: self.state.count,
            deadline: self.state.deadline,
        }
    }

    /// Breaks the streak. Returns the previous count.
    pub fn reset(&mut self) -> u32 {
        let previous = self.state.count;
        self.state.count = 0;
        previous
    }
}

/// Streak after the combo multiplier bonus: `floor(count × (1 + bonus))`.
pub fn effective_streak(count: u32, multiplier_bonus: f64) -> u32 {
    let scaled = (count as f64 * (1.0 + multiplier_bonus)).floor();
    if scaled <= 0.0 {
        0
    } else {
        scaled.min(u32::MAX as f64) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ComboConfig {
        ComboConfig {
            timeout_ms: 5_000,
            max_count: 10,
            high_accuracy_threshold: None,
        }
    }

    #[test]
    fn first_hit_starts_streak() {
        let mut combo = ComboTracker::new();
        let update = combo.register_hit(1_000, 3, 1.0, false, 0, &config());
        assert_eq!(update.count, 1);
        assert_eq!(update.deadline, 6_000);
        assert_eq!(combo.state().last_region, Some(3));
    }

    #[test]
    fn streak_expires_lazily_after_deadline() {
        let mut combo = ComboTracker::new();
        combo.register_hit(0, 0, 1.0, false, 0, &config());
        combo.register_hit(1_000, 0, 1.0, false, 0, &config());
        assert_eq!(combo.count_at(6_000, false), 2);
        assert_eq!(combo.count_at(6_001, false), 0);

        let update = combo.register_hit(7_000, 0, 1.0, false, 0, &config());
        assert_eq!(update.count, 1);
    }

    #[test]
    fn freeze_suspends_deadline_without_moving_it() {
        let mut combo = ComboTracker::new();
        combo.register_hit(0, 0, 1.0, false, 0, &config());
        combo.register_hit(100, 0, 1.0, false, 0, &config());

        assert_eq!(combo.count_at(60_000, true), 2);
        let frozen = combo.register_hit(60_000, 1, 1.0, true, 0, &config());
        assert_eq!(frozen.count, 2);
        assert_eq!(frozen.deadline, 5_100);

        // Thawed: the old deadline applies again.
        assert_eq!(combo.expire_if_due(60_001, false), Some(2));
        assert_eq!(combo.count_at(60_001, false), 0);
    }

    #[test]
    fn clamps_to_max_and_applies_timeout_bonus() {
        let mut combo = ComboTracker::new();
        let mut update = combo.register_hit(0, 0, 1.0, false, 0, &config());
        for i in 1..20 {
            update = combo.register_hit(i * 10, 0, 1.0, false, 2_000, &config());
        }
        assert_eq!(update.count, 10);
        assert_eq!(update.deadline, 190 + 7_000);
    }

    #[test]
    fn high_accuracy_bonus_is_optional() {
        let mut with_bonus = config();
        with_bonus.high_accuracy_threshold = Some(0.9);

        let mut combo = ComboTracker::new();
        assert_eq!(combo.register_hit(0, 0, 0.95, false, 0, &with_bonus).count, 2);
        assert_eq!(combo.register_hit(10, 0, 0.5, false, 0, &with_bonus).count, 3);
    }

    #[test]
    fn effective_streak_floors() {
        assert_eq!(effective_streak(5, 0.0), 5);
        assert_eq!(effective_streak(5, 0.3), 6);
        assert_eq!(effective_streak(0, 1.0), 0);
    }
}
