//! Immutable effect definitions and the catalog that indexes them.
//!
//! Each definition carries a tagged [`EffectBehavior`] chosen once when the
//! catalog is built. The engine matches on the behavior variant, never on the
//! effect identity, when applying, ticking, or removing an effect.

use std::collections::BTreeMap;

use crate::bonus::BonusTarget;
use crate::config::{RarityWeights, SeverityWeights};
use crate::env::{Dice, RollContext};

use super::EffectError;

/// Typed identity of every effect the game knows about.
///
/// Declaration order is significant: categorical gain multipliers are applied
/// in this order when several are active.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EffectId {
    // Buffs
    Frenzy,
    Lucky,
    Waterfall,
    Roll,
    MysteryBox,
    StarPower,
    DoubleTap,
    SlotMachine,
    Shield,
    GoldenTouch,
    TimeWarp,
    CrystalFocus,
    PrismaticGlow,
    ChaosClown,
    TaxBoom,
    // Debuffs
    Ghost,
    Explosion,
    Lock,
    Freeze,
    TaxCollector,
    HeavyClick,
    Curse,
    Decay,
    AbsoluteZero,
    EnergyParasite,
    UnluckyCurse,
    Rapid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case")]
pub enum Polarity {
    Buff,
    Debuff,
}

impl Polarity {
    /// Bonus target that scales durations of this polarity.
    pub fn bonus_target(self) -> BonusTarget {
        match self {
            Polarity::Buff => BonusTarget::Buffs,
            Polarity::Debuff => BonusTarget::Debuffs,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
    Catastrophic,
}

/// Random-selection weight class. Buffs use rarities, debuffs severities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum WeightClass {
    Rarity(Rarity),
    Severity(Severity),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StackingPolicy {
    /// At most one live instance; reapplying removes the old one first.
    #[default]
    ReplaceExisting,
}

/// Side effect run on every periodic tick.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TickAction {
    /// Grant `amount` of one random tradeable resource.
    GrantRandomTradeable { amount: u64 },
    /// Remove `fraction` (floored) of every holding.
    DrainHoldings { fraction: f64 },
}

/// One row of a one-shot outcome table.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RollOutcome {
    pub label: String,
    pub chance: f64,
    /// Signed amount of a random tradeable resource.
    pub amount: i64,
}

/// Side effect resolved immediately; the effect never enters the active set.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum InstantAction {
    Roll { outcomes: Vec<RollOutcome> },
    /// Lose `fraction` of one random tradeable resource, reduced by protection bonuses.
    Explosion { fraction: f64 },
    /// Offer `choices` distinct tradeable resources; claiming one grants `amount`.
    MysteryBox { choices: usize, amount: u64 },
}

/// Counter consumed by the pipeline instead of a timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CountedUse {
    /// Each charge absorbs one incoming debuff.
    Shield,
    /// Each target hit grants `bonus` of a random resource.
    StarPower { bonus: u64 },
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EffectBehavior {
    /// Only its passive modifiers matter while active.
    Passive,
    Periodic { interval_ms: u64, action: TickAction },
    Instant(InstantAction),
    Counted { counter: CountedUse, uses: u32 },
    /// Suspends the combo deadline while active.
    ComboFreeze,
    /// Target clicks register only after `required` consecutive clicks on one region.
    HeavyClick { required: u32 },
    /// All clicks are refused while active.
    InputLock,
    /// Installs a rotation-speed layer owned by this effect.
    RotationScale { factor: f64 },
}

/// Passive contribution of an active effect to pipeline queries.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PassiveModifier {
    /// Categorical gold multiplier (applied after skills).
    GainMultiplier(f64),
    /// Click-value multiplier (applied first).
    ClickMultiplier(f64),
    EffectChanceBonus(f64),
    EffectChanceScale(f64),
    CriticalChanceBonus(f64),
    EnergyCostScale(f64),
    /// Every triggered effect has this polarity.
    ForcePolarity(Polarity),
    /// Probability that a click is ignored.
    GhostChance(f64),
    /// Building production scale, read by the economy collaborator.
    ProductionScale(f64),
    /// Market discount, read by the trading collaborator.
    MarketDiscount(f64),
    BlocksEnergyRegen,
    /// Per target hit, `chance` to win `amount` of a random resource.
    SlotMachine { chance: f64, amount: u64 },
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectDefinition {
    pub id: EffectId,
    pub name: String,
    pub polarity: Polarity,
    pub weight: WeightClass,
    /// `None` for instant and counted-use effects.
    pub base_duration_ms: Option<u64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub stacking: StackingPolicy,
    pub behavior: EffectBehavior,
    #[cfg_attr(feature = "serde", serde(default))]
    pub modifiers: Vec<PassiveModifier>,
}

impl EffectDefinition {
    fn new(
        id: EffectId,
        name: &str,
        weight: WeightClass,
        base_duration_ms: Option<u64>,
        behavior: EffectBehavior,
    ) -> Self {
        let polarity = match weight {
            WeightClass::Rarity(_) => Polarity::Buff,
            WeightClass::Severity(_) => Polarity::Debuff,
        };
        Self {
            id,
            name: name.to_owned(),
            polarity,
            weight,
            base_duration_ms,
            stacking: StackingPolicy::ReplaceExisting,
            behavior,
            modifiers: Vec::new(),
        }
    }

    fn with(mut self, modifier: PassiveModifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    pub fn is_instant(&self) -> bool {
        matches!(self.behavior, EffectBehavior::Instant(_))
    }
}

/// Read-only lookup table of effect definitions keyed by [`EffectId`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EffectCatalog {
    definitions: BTreeMap<EffectId, EffectDefinition>,
}

impl EffectCatalog {
    /// Builds a catalog, rejecting duplicate ids and malformed timings.
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = EffectDefinition>,
    ) -> Result<Self, EffectError> {
        let mut map = BTreeMap::new();
        for definition in definitions {
            validate(&definition)?;
            let id = definition.id;
            if map.insert(id, definition).is_some() {
                return Err(EffectError::DuplicateDefinition(id));
            }
        }
        Ok(Self { definitions: map })
    }

    pub fn get(&self, id: EffectId) -> Option<&EffectDefinition> {
        self.definitions.get(&id)
    }

    pub fn contains(&self, id: EffectId) -> bool {
        self.definitions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Definitions in declaration order of [`EffectId`].
    pub fn iter(&self) -> impl Iterator<Item = &EffectDefinition> {
        self.definitions.values()
    }

    pub fn of_polarity(&self, polarity: Polarity) -> impl Iterator<Item = &EffectDefinition> {
        self.iter().filter(move |d| d.polarity == polarity)
    }

    /// Draws an effect of `polarity`: first a weight class, then uniformly within it.
    ///
    /// Classes with no definitions are skipped so their weight never wastes a roll.
    pub fn pick_random(
        &self,
        polarity: Polarity,
        rarity: &RarityWeights,
        severity: &SeverityWeights,
        dice: &mut Dice,
    ) -> Option<EffectId> {
        let mut classes: BTreeMap<WeightClass, Vec<EffectId>> = BTreeMap::new();
        for definition in self.of_polarity(polarity) {
            classes
                .entry(definition.weight)
                .or_default()
                .push(definition.id);
        }

        let (keys, weights): (Vec<_>, Vec<_>) = classes
            .keys()
            .map(|class| {
                let weight = match class {
                    WeightClass::Rarity(r) => rarity.weight(*r),
                    WeightClass::Severity(s) => severity.weight(*s),
                };
                (*class, weight)
            })
            .unzip();

        let class = keys[dice.weighted(RollContext::EffectPick, &weights)?];
        let members = classes.get(&class)?;
        dice.pick(RollContext::EffectPick, members)
    }

    /// The catalog shipped with the game.
    pub fn standard() -> Self {
        use EffectBehavior as B;
        use EffectId as Id;
        use PassiveModifier as M;
        use WeightClass::{Rarity as R, Severity as S};

        let definitions = vec![
            EffectDefinition::new(Id::Frenzy, "Frenzy", R(Rarity::Common), Some(15_000), B::Passive)
                .with(M::GainMultiplier(2.0)),
            EffectDefinition::new(Id::Lucky, "Lucky", R(Rarity::Common), Some(10_000), B::Passive)
                .with(M::EffectChanceBonus(0.25)),
            EffectDefinition::new(
                Id::Waterfall,
                "Resource Waterfall",
                R(Rarity::Uncommon),
                Some(10_000),
                B::Periodic {
                    interval_ms: 1_000,
                    action: TickAction::GrantRandomTradeable { amount: 1 },
                },
            ),
            EffectDefinition::new(
                Id::Roll,
                "Roll",
                R(Rarity::Rare),
                None,
                B::Instant(InstantAction::Roll {
                    outcomes: vec![
                        outcome("jackpot", 0.15, 25),
                        outcome("big_win", 0.20, 10),
                        outcome("small_win", 0.30, 5),
                        outcome("nothing", 0.25, 0),
                        outcome("loss", 0.10, -10),
                    ],
                }),
            ),
            EffectDefinition::new(
                Id::MysteryBox,
                "Mystery Box",
                R(Rarity::Rare),
                None,
                B::Instant(InstantAction::MysteryBox {
                    choices: 3,
                    amount: 5,
                }),
            ),
            EffectDefinition::new(
                Id::StarPower,
                "Star Power",
                R(Rarity::Uncommon),
                None,
                B::Counted {
                    counter: CountedUse::StarPower { bonus: 5 },
                    uses: 10,
                },
            ),
            EffectDefinition::new(
                Id::DoubleTap,
                "Double Tap",
                R(Rarity::Uncommon),
                Some(12_000),
                B::Passive,
            )
            .with(M::ClickMultiplier(2.0)),
            EffectDefinition::new(
                Id::SlotMachine,
                "Slot Machine",
                R(Rarity::Uncommon),
                Some(15_000),
                B::Passive,
            )
            .with(M::SlotMachine {
                chance: 0.3,
                amount: 3,
            }),
            EffectDefinition::new(
                Id::Shield,
                "Shield",
                R(Rarity::Rare),
                None,
                B::Counted {
                    counter: CountedUse::Shield,
                    uses: 3,
                },
            ),
            EffectDefinition::new(
                Id::GoldenTouch,
                "Golden Touch",
                R(Rarity::Epic),
                Some(8_000),
                B::Passive,
            )
            .with(M::GainMultiplier(3.0)),
            EffectDefinition::new(Id::TimeWarp, "Time Warp", R(Rarity::Epic), Some(6_000), B::Passive)
                .with(M::ProductionScale(5.0)),
            EffectDefinition::new(
                Id::CrystalFocus,
                "Crystal Focus",
                R(Rarity::Epic),
                Some(15_000),
                B::Passive,
            )
            .with(M::CriticalChanceBonus(1.0)),
            EffectDefinition::new(
                Id::PrismaticGlow,
                "Prismatic Glow",
                R(Rarity::Rare),
                Some(10_000),
                B::Passive,
            )
            .with(M::EnergyCostScale(0.0)),
            EffectDefinition::new(
                Id::ChaosClown,
                "Chaos Clown",
                R(Rarity::Legendary),
                Some(10_000),
                B::Passive,
            )
            .with(M::ForcePolarity(Polarity::Buff)),
            EffectDefinition::new(
                Id::TaxBoom,
                "Tax Boom",
                R(Rarity::Legendary),
                Some(900_000),
                B::Passive,
            )
            .with(M::MarketDiscount(0.33)),
            EffectDefinition::new(Id::Ghost, "Ghost Click", S(Severity::Mild), Some(2_000), B::Passive)
                .with(M::GhostChance(0.5)),
            EffectDefinition::new(
                Id::Explosion,
                "Explosion",
                S(Severity::Severe),
                None,
                B::Instant(InstantAction::Explosion { fraction: 0.1 }),
            ),
            EffectDefinition::new(Id::Lock, "Lock", S(Severity::Moderate), Some(1_000), B::InputLock),
            EffectDefinition::new(
                Id::Freeze,
                "Freeze",
                S(Severity::Moderate),
                Some(10_000),
                B::ComboFreeze,
            ),
            EffectDefinition::new(
                Id::TaxCollector,
                "Tax Collector",
                S(Severity::Severe),
                Some(9_000),
                B::Periodic {
                    interval_ms: 3_000,
                    action: TickAction::DrainHoldings { fraction: 0.05 },
                },
            ),
            EffectDefinition::new(
                Id::HeavyClick,
                "Heavy Click",
                S(Severity::Moderate),
                Some(8_000),
                B::HeavyClick { required: 3 },
            ),
            EffectDefinition::new(Id::Curse, "Curse", S(Severity::Severe), Some(12_000), B::Passive)
                .with(M::EffectChanceScale(0.5)),
            EffectDefinition::new(
                Id::Decay,
                "Decay",
                S(Severity::Severe),
                Some(15_000),
                B::Periodic {
                    interval_ms: 1_000,
                    action: TickAction::DrainHoldings { fraction: 0.01 },
                },
            ),
            EffectDefinition::new(
                Id::AbsoluteZero,
                "Absolute Zero",
                S(Severity::Catastrophic),
                Some(15_000),
                B::Passive,
            )
            .with(M::BlocksEnergyRegen)
            .with(M::ProductionScale(0.0)),
            EffectDefinition::new(
                Id::EnergyParasite,
                "Energy Parasite",
                S(Severity::Severe),
                Some(15_000),
                B::Passive,
            )
            .with(M::EnergyCostScale(2.0)),
            EffectDefinition::new(
                Id::UnluckyCurse,
                "Unlucky Curse",
                S(Severity::Catastrophic),
                Some(20_000),
                B::Passive,
            )
            .with(M::ForcePolarity(Polarity::Debuff)),
            EffectDefinition::new(
                Id::Rapid,
                "Rapid Spin",
                S(Severity::Mild),
                Some(5_000),
                B::RotationScale { factor: 2.0 },
            ),
        ];

        let mut catalog = BTreeMap::new();
        for definition in definitions {
            catalog.insert(definition.id, definition);
        }
        Self {
            definitions: catalog,
        }
    }
}

fn outcome(label: &str, chance: f64, amount: i64) -> RollOutcome {
    RollOutcome {
        label: label.to_owned(),
        chance,
        amount,
    }
}

fn validate(definition: &EffectDefinition) -> Result<(), EffectError> {
    let id = definition.id;
    if definition.base_duration_ms == Some(0) {
        return Err(EffectError::InvalidDefinition {
            id,
            reason: "duration must be positive or absent",
        });
    }
    let expected = match definition.weight {
        WeightClass::Rarity(_) => Polarity::Buff,
        WeightClass::Severity(_) => Polarity::Debuff,
    };
    if definition.polarity != expected {
        return Err(EffectError::InvalidDefinition {
            id,
            reason: "buffs are weighted by rarity and debuffs by severity",
        });
    }
    match &definition.behavior {
        EffectBehavior::Periodic { interval_ms: 0, .. } => Err(EffectError::InvalidDefinition {
            id,
            reason: "tick interval must be positive",
        }),
        EffectBehavior::Periodic { .. } if definition.base_duration_ms.is_none() => {
            Err(EffectError::InvalidDefinition {
                id,
                reason: "periodic effects need a duration",
            })
        }
        EffectBehavior::Instant(_) if definition.base_duration_ms.is_some() => {
            Err(EffectError::InvalidDefinition {
                id,
                reason: "instant effects cannot have a duration",
            })
        }
        EffectBehavior::Instant(InstantAction::Roll { outcomes }) if outcomes.is_empty() => {
            Err(EffectError::InvalidDefinition {
                id,
                reason: "roll table is empty",
            })
        }
        _ => Ok(()),
    }
}
