use arrayvec::ArrayVec;

use crate::ledger::ResourceKind;

/// Maximum number of choices a mystery box can offer.
pub const MAX_MYSTERY_CHOICES: usize = 7;

/// Progress towards registering a heavy click.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HeavyClickProgress {
    pub region: Option<usize>,
    pub count: u32,
}

/// An unclaimed mystery box.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MysteryOffer {
    pub options: ArrayVec<ResourceKind, MAX_MYSTERY_CHOICES>,
    pub amount: u64,
}

/// Non-timer effect state that outlives a single tick.
///
/// Persisted in snapshots. Reset to defaults by `clear_all`. Only counted
/// uses and the mystery-box offer survive a restore; see [`Self::into_restored`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EffectCounters {
    pub shield_charges: u32,
    pub star_power_clicks: u32,
    /// Bonus granted per star power hit; set when star power is applied.
    pub star_power_bonus: u64,
    pub frozen_combo: bool,
    pub heavy_click: HeavyClickProgress,
    pub mystery_box: Option<MysteryOffer>,
}

impl EffectCounters {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Counters as loaded from a snapshot.
    ///
    /// Combo freeze and heavy-click progress belong to a live timed effect.
    /// Active effects are never restored, so nothing would ever release them.
    pub fn into_restored(self) -> Self {
        Self {
            frozen_combo: false,
            heavy_click: HeavyClickProgress::default(),
            ..self
        }
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_keeps_counted_uses_only() {
        let saved = EffectCounters {
            shield_charges: 2,
            star_power_clicks: 4,
            star_power_bonus: 10,
            frozen_combo: true,
            heavy_click: HeavyClickProgress {
                region: Some(3),
                count: 2,
            },
            mystery_box: None,
        };

        let restored = saved.into_restored();
        assert_eq!(restored.shield_charges, 2);
        assert_eq!(restored.star_power_clicks, 4);
        assert_eq!(restored.star_power_bonus, 10);
        assert!(!restored.frozen_combo);
        assert_eq!(restored.heavy_click, HeavyClickProgress::default());
    }
}
