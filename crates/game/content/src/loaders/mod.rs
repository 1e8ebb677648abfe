//! Content loaders for reading game data from files.
//!
//! Each loader turns one RON/TOML file into the game-core type it describes.
//! [`ContentFactory`] knows the file names inside a data directory.

pub mod config;
pub mod effects;
pub mod factory;
pub mod skills;

pub use config::ConfigLoader;
pub use effects::EffectCatalogLoader;
pub use factory::{ContentFactory, GameContent};
pub use skills::{SkillEntry, SkillLoader, SkillTable};

use std::path::Path;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}
