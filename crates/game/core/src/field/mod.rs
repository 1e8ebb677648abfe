//! Target field: the ring or grid of selectable regions.
//!
//! Invariant: exactly one region has the `Target` role. Bonus placement is
//! re-rolled every time the target moves.
mod region;

pub use region::{
    Extent, HitInput, HitResolution, LayoutKind, Region, RegionRole, RoleEffects, normalize_angle,
};

use std::f64::consts::TAU;

use tracing::{debug, warn};

use crate::config::GameConfig;
use crate::env::{Dice, RollContext};
use crate::error::{ErrorSeverity, GameError};
use crate::events::{EventSink, GameEvent};
use crate::params::LayeredValue;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("region index {index} out of range (field has {len} regions)")]
    OutOfRange { index: usize, len: usize },

    #[error("layout must contain at least one region")]
    EmptyLayout,

    #[error("layout has {count} regions, at most {max} are supported")]
    TooManyRegions { count: usize, max: usize },
}

impl GameError for FieldError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::OutOfRange { .. } => "FIELD_OUT_OF_RANGE",
            Self::EmptyLayout => "FIELD_EMPTY_LAYOUT",
            Self::TooManyRegions { .. } => "FIELD_TOO_MANY_REGIONS",
        }
    }
}

/// Amounts attached to each region role, copied from [`GameConfig`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct RoleTable {
    click_cost: u64,
    bonus_restore: u64,
    secondary_restore: u64,
    secondary_resource_bonus: u64,
}

impl RoleTable {
    fn from_config(config: &GameConfig) -> Self {
        Self {
            click_cost: config.energy.click_cost,
            bonus_restore: config.energy.bonus_restore,
            secondary_restore: config.energy.secondary_restore,
            secondary_resource_bonus: config.energy.secondary_resource_bonus,
        }
    }

    fn effects(&self, role: RegionRole) -> RoleEffects {
        match role {
            RegionRole::Target => RoleEffects {
                energy_cost: self.click_cost,
                is_target: true,
                ..RoleEffects::default()
            },
            RegionRole::Bonus => RoleEffects {
                energy_restore: self.bonus_restore,
                ..RoleEffects::default()
            },
            RegionRole::SecondaryBonus => RoleEffects {
                energy_restore: self.secondary_restore,
                resource_bonus: self.secondary_resource_bonus,
                ..RoleEffects::default()
            },
            RegionRole::Inactive => RoleEffects::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct TargetField {
    layout: LayoutKind,
    regions: Vec<Region>,
    target: usize,
    bonus_regions: usize,
    secondary_bonus_regions: usize,
    roles: RoleTable,
    rotation_angle: f64,
    rotation_speed: LayeredValue,
}

impl TargetField {
    /// Builds the field described by `config` with a random target.
    pub fn new(config: &GameConfig, dice: &mut Dice, events: &mut EventSink) -> Result<Self, FieldError> {
        let mut field = Self {
            layout: config.layout,
            regions: Vec::new(),
            target: 0,
            bonus_regions: config.bonus_regions,
            secondary_bonus_regions: config.secondary_bonus_regions,
            roles: RoleTable::from_config(config),
            rotation_angle: 0.0,
            rotation_speed: LayeredValue::new(config.base_rotation_speed),
        };
        field.generate_layout(config.layout, None, dice, events)?;
        Ok(field)
    }

    /// Rebuilds every region with equal extents.
    ///
    /// The target is `target` when supplied (and valid), otherwise random.
    pub fn generate_layout(
        &mut self,
        layout: LayoutKind,
        target: Option<usize>,
        dice: &mut Dice,
        events: &mut EventSink,
    ) -> Result<(), FieldError> {
        let count = layout.region_count();
        if count == 0 {
            return Err(FieldError::EmptyLayout);
        }
        if count > GameConfig::MAX_REGIONS {
            return Err(FieldError::TooManyRegions {
                count,
                max: GameConfig::MAX_REGIONS,
            });
        }
        if let Some(index) = target
            && index >= count
        {
            return Err(FieldError::OutOfRange { index, len: count });
        }

        self.layout = layout;
        self.regions = (0..count)
            .map(|index| Region {
                index,
                extent: match layout {
                    LayoutKind::Ring { regions } => Extent::sector(index, regions),
                    LayoutKind::Grid { size } => Extent::Cell {
                        row: index / size,
                        col: index % size,
                    },
                },
                role: RegionRole::Inactive,
            })
            .collect();

        let target = match target {
            Some(index) => index,
            None => dice.index(RollContext::Layout, count).unwrap_or(0),
        };
        self.assign_roles(target, dice, events);
        debug!(regions = count, target, "layout generated");
        Ok(())
    }

    /// Moves the target. Returns `Ok(false)` when `index` already is the target.
    pub fn set_target(
        &mut self,
        index: usize,
        dice: &mut Dice,
        events: &mut EventSink,
    ) -> Result<bool, FieldError> {
        if index >= self.regions.len() {
            warn!(index, len = self.regions.len(), "set_target out of range");
            return Err(FieldError::OutOfRange {
                index,
                len: self.regions.len(),
            });
        }
        if index == self.target {
            return Ok(false);
        }
        self.assign_roles(index, dice, events);
        Ok(true)
    }

    /// Moves the target to a uniformly random different region.
    pub fn shuffle(&mut self, dice: &mut Dice, events: &mut EventSink) -> Result<bool, FieldError> {
        let len = self.regions.len();
        if len < 2 {
            return Ok(false);
        }

        let mut next = self.target;
        for _ in 0..GameConfig::SHUFFLE_ATTEMPTS {
            next = dice.index(RollContext::Shuffle, len).unwrap_or(self.target);
            if next != self.target {
                break;
            }
        }
        if next == self.target {
            next = (self.target + 1) % len;
        }
        self.set_target(next, dice, events)
    }

    /// Maps an input to a region, or `None` when it falls outside every region.
    pub fn resolve_hit(&self, input: HitInput, dice: &mut Dice) -> Option<HitResolution> {
        let (region, accuracy) = match (self.layout, input) {
            (LayoutKind::Ring { regions }, HitInput::Angle(angle)) => {
                self.resolve_angle(regions, angle)?
            }
            (LayoutKind::Grid { size }, HitInput::Point { x, y, width, height }) => {
                let index = resolve_cell(size, x, y, width, height)?;
                // Cells carry no sub-region precision.
                let accuracy = 0.8 + dice.unit(RollContext::Accuracy) * 0.2;
                (index, accuracy)
            }
            _ => return None,
        };

        let role = self.regions.get(region)?.role;
        Some(HitResolution {
            region,
            role,
            accuracy: accuracy.clamp(0.0, 1.0),
            effects: self.roles.effects(role),
        })
    }

    /// Input that lands on the centre of `index` at the current rotation.
    pub fn aim_at(&self, index: usize) -> Option<HitInput> {
        let region = self.regions.get(index)?;
        match (self.layout, region.extent) {
            (LayoutKind::Ring { .. }, Extent::Sector { center, .. }) => Some(HitInput::Angle(
                normalize_angle(center + self.rotation_angle),
            )),
            (LayoutKind::Grid { size }, Extent::Cell { row, col }) => {
                let side = size as f64;
                Some(HitInput::Point {
                    x: col as f64 + 0.5,
                    y: row as f64 + 0.5,
                    width: side,
                    height: side,
                })
            }
            _ => None,
        }
    }

    /// Rotates the ring by the effective speed over `elapsed_ms`.
    pub fn advance_rotation(&mut self, elapsed_ms: u64) {
        if matches!(self.layout, LayoutKind::Ring { .. }) {
            let delta = self.rotation_speed.effective() * elapsed_ms as f64 / 1_000.0;
            self.rotation_angle = normalize_angle(self.rotation_angle + delta);
        }
    }

    pub fn rotation_speed(&self) -> &LayeredValue {
        &self.rotation_speed
    }

    pub fn rotation_speed_mut(&mut self) -> &mut LayeredValue {
        &mut self.rotation_speed
    }

    pub fn rotation_angle(&self) -> f64 {
        self.rotation_angle
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn layout(&self) -> LayoutKind {
        self.layout
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn role(&self, index: usize) -> Option<RegionRole> {
        self.regions.get(index).map(|r| r.role)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    fn resolve_angle(&self, count: usize, angle: f64) -> Option<(usize, f64)> {
        if !angle.is_finite() || count == 0 {
            return None;
        }
        let width = TAU / count as f64;
        let local = normalize_angle(angle - self.rotation_angle);
        let index = ((local / width) as usize).min(count - 1);
        let center = match self.regions.get(index)?.extent {
            Extent::Sector { center, .. } => center,
            Extent::Cell { .. } => return None,
        };
        let distance = (local - center).abs();
        let accuracy = (1.0 - distance / (width / 2.0)).max(0.0);
        Some((index, accuracy))
    }

    fn assign_roles(&mut self, target: usize, dice: &mut Dice, events: &mut EventSink) {
        self.target = target;
        for region in &mut self.regions {
            region.role = RegionRole::Inactive;
        }

        let mut pool: Vec<usize> = (0..self.regions.len()).filter(|i| *i != target).collect();
        let bonus = draw_distinct(&mut pool, self.bonus_regions, dice);
        let secondary = draw_distinct(&mut pool, self.secondary_bonus_regions, dice);

        self.regions[target].role = RegionRole::Target;
        for &i in &bonus {
            self.regions[i].role = RegionRole::Bonus;
        }
        for &i in &secondary {
            self.regions[i].role = RegionRole::SecondaryBonus;
        }

        events.push(GameEvent::LayoutChanged {
            target,
            bonus,
            secondary,
        });
    }
}

fn draw_distinct(pool: &mut Vec<usize>, count: usize, dice: &mut Dice) -> Vec<usize> {
    let mut drawn = Vec::with_capacity(count);
    while drawn.len() < count {
        let Some(slot) = dice.index(RollContext::Layout, pool.len()) else {
            break;
        };
        drawn.push(pool.swap_remove(slot));
    }
    drawn.sort_unstable();
    drawn
}

fn resolve_cell(size: usize, x: f64, y: f64, width: f64, height: f64) -> Option<usize> {
    if size == 0 || width <= 0.0 || height <= 0.0 {
        return None;
    }
    if !(0.0..width).contains(&x) || !(0.0..height).contains(&y) {
        return None;
    }
    let col = ((x / (width / size as f64)) as usize).min(size - 1);
    let row = ((y / (height / size as f64)) as usize).min(size - 1);
    Some(row * size + col)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(regions: usize) -> (TargetField, Dice, EventSink) {
        let config = GameConfig {
            layout: LayoutKind::Ring { regions },
            ..GameConfig::new()
        };
        let mut dice = Dice::seeded(11);
        let mut events = EventSink::new();
        let field = TargetField::new(&config, &mut dice, &mut events).unwrap();
        (field, dice, events)
    }

    fn count_role(field: &TargetField, role: RegionRole) -> usize {
        field.regions().iter().filter(|r| r.role == role).count()
    }

    #[test]
    fn layout_has_exactly_one_target() {
        let (field, _, events) = ring(8);
        assert_eq!(count_role(&field, RegionRole::Target), 1);
        assert_eq!(count_role(&field, RegionRole::Bonus), 2);
        assert_eq!(count_role(&field, RegionRole::SecondaryBonus), 1);
        assert_eq!(field.role(field.target()), Some(RegionRole::Target));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn set_target_validates_and_skips_noops() {
        let (mut field, mut dice, mut events) = ring(8);
        events.drain();

        let current = field.target();
        assert_eq!(field.set_target(current, &mut dice, &mut events), Ok(false));
        assert!(events.is_empty());

        assert_eq!(
            field.set_target(8, &mut dice, &mut events),
            Err(FieldError::OutOfRange { index: 8, len: 8 })
        );
        assert_eq!(field.target(), current);

        let next = (current + 1) % 8;
        assert_eq!(field.set_target(next, &mut dice, &mut events), Ok(true));
        assert_eq!(field.target(), next);
        assert_eq!(count_role(&field, RegionRole::Target), 1);
        assert!(matches!(
            events.pending(),
            [GameEvent::LayoutChanged { target, .. }] if *target == next
        ));
    }

    #[test]
    fn shuffle_always_moves_target() {
        let (mut field, mut dice, mut events) = ring(2);
        for _ in 0..10 {
            let before = field.target();
            assert_eq!(field.shuffle(&mut dice, &mut events), Ok(true));
            assert_ne!(field.target(), before);
        }
    }

    #[test]
    fn ring_accuracy_peaks_at_centre() {
        let (field, mut dice, _) = ring(4);
        let centre = field.aim_at(1).unwrap();
        let hit = field.resolve_hit(centre, &mut dice).unwrap();
        assert_eq!(hit.region, 1);
        assert!((hit.accuracy - 1.0).abs() < 1e-9);

        // Quarter-sector off centre → accuracy 0.5.
        let width = TAU / 4.0;
        let HitInput::Angle(angle) = centre else {
            unreachable!()
        };
        let off = field
            .resolve_hit(HitInput::Angle(angle + width / 4.0), &mut dice)
            .unwrap();
        assert_eq!(off.region, 1);
        assert!((off.accuracy - 0.5).abs() < 1e-9);
    }

    #[test]
    fn rotation_shifts_region_lookup() {
        let (mut field, mut dice, _) = ring(4);
        let before = field.resolve_hit(HitInput::Angle(0.1), &mut dice).unwrap();
        field.rotation_speed_mut().set_slot("test", 1.0);
        // Rotate by a quarter turn: base 0.5 rad/s for π s.
        field.advance_rotation((std::f64::consts::PI * 1_000.0) as u64);
        let after = field.resolve_hit(HitInput::Angle(0.1), &mut dice).unwrap();
        assert_ne!(before.region, after.region);
    }

    #[test]
    fn oversized_layout_is_refused() {
        let config = GameConfig {
            layout: LayoutKind::Grid { size: usize::MAX },
            ..GameConfig::new()
        };
        let mut dice = Dice::seeded(5);
        let mut events = EventSink::new();
        let err = TargetField::new(&config, &mut dice, &mut events).unwrap_err();
        assert_eq!(
            err,
            FieldError::TooManyRegions {
                count: usize::MAX,
                max: GameConfig::MAX_REGIONS
            }
        );
        assert!(events.is_empty());
    }

    #[test]
    fn grid_quantises_points_and_rejects_outside() {
        let config = GameConfig::grid();
        let mut dice = Dice::seeded(3);
        let mut events = EventSink::new();
        let field = TargetField::new(&config, &mut dice, &mut events).unwrap();

        let hit = field
            .resolve_hit(
                HitInput::Point {
                    x: 250.0,
                    y: 10.0,
                    width: 300.0,
                    height: 300.0,
                },
                &mut dice,
            )
            .unwrap();
        assert_eq!(hit.region, 2);
        assert!((0.8..=1.0).contains(&hit.accuracy));

        let outside = HitInput::Point {
            x: 301.0,
            y: 10.0,
            width: 300.0,
            height: 300.0,
        };
        assert!(field.resolve_hit(outside, &mut dice).is_none());
        // Angle inputs mean nothing to a grid.
        assert!(field.resolve_hit(HitInput::Angle(0.0), &mut dice).is_none());
    }

    #[test]
    fn role_effects_follow_role() {
        let (field, mut dice, _) = ring(8);
        let target = field.resolve_hit(field.aim_at(field.target()).unwrap(), &mut dice).unwrap();
        assert!(target.effects.is_target);
        assert_eq!(target.effects.energy_cost, 1);

        let bonus = field
            .regions()
            .iter()
            .find(|r| r.role == RegionRole::Bonus)
            .unwrap()
            .index;
        let hit = field.resolve_hit(field.aim_at(bonus).unwrap(), &mut dice).unwrap();
        assert!(!hit.effects.is_target);
        assert_eq!(hit.effects.energy_restore, 3);
    }
}
