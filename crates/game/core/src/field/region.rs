use std::f64::consts::TAU;

/// Shape of the selectable field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum LayoutKind {
    /// `regions` equal angular sectors of a rotating ring.
    Ring { regions: usize },
    /// `size × size` grid of equal cells.
    Grid { size: usize },
}

impl LayoutKind {
    pub fn region_count(&self) -> usize {
        match *self {
            LayoutKind::Ring { regions } => regions,
            LayoutKind::Grid { size } => size.saturating_mul(size),
        }
    }
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RegionRole {
    /// The one region that scores.
    Target,
    /// Restores energy.
    Bonus,
    /// Restores energy and grants a small tradeable bonus.
    SecondaryBonus,
    #[default]
    Inactive,
}

/// Spatial extent of a region.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Extent {
    /// Angular range in radians, `start <= center < end`, in the ring's own frame.
    Sector { start: f64, end: f64, center: f64 },
    Cell { row: usize, col: usize },
}

impl Extent {
    pub fn sector(index: usize, count: usize) -> Self {
        let width = TAU / count as f64;
        let start = index as f64 * width;
        Extent::Sector {
            start,
            end: start + width,
            center: start + width / 2.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Region {
    pub index: usize,
    pub extent: Extent,
    pub role: RegionRole,
}

/// Raw input event.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HitInput {
    /// Screen-frame angle in radians; the ring's rotation is subtracted.
    Angle(f64),
    /// Point inside a `width × height` grid surface.
    Point {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
}

/// Role-specific consequences of a hit, before any effect modifiers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoleEffects {
    pub energy_cost: u64,
    pub energy_restore: u64,
    pub resource_bonus: u64,
    pub is_target: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HitResolution {
    pub region: usize,
    pub role: RegionRole,
    /// Closeness to the region centre in `[0, 1]`.
    pub accuracy: f64,
    pub effects: RoleEffects,
}

/// Normalises an angle into `[0, TAU)`.
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped >= TAU { 0.0 } else { wrapped }
}
