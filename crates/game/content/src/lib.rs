//! Data-driven content definitions and loaders.
//!
//! This crate reads the static game content from RON/TOML data files:
//! - Effect catalog (data-driven via RON)
//! - Upgrade lines feeding the bonus provider (data-driven via RON)
//! - Game configuration (data-driven via TOML)
//!
//! Content is consumed by the runtime when it builds a session and never
//! appears in snapshots.
//!
//! All loaders use game-core types directly with serde for RON/TOML deserialization.

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{
    ConfigLoader, ContentFactory, EffectCatalogLoader, GameContent, SkillEntry, SkillLoader,
    SkillTable,
};
