//! Content factory for loading every data file of a session.

use std::path::{Path, PathBuf};

use game_core::{EffectCatalog, GameConfig, SkillBook};

use crate::loaders::{ConfigLoader, EffectCatalogLoader, LoadResult, SkillLoader};

/// Everything a session needs from the data directory.
#[derive(Clone, Debug)]
pub struct GameContent {
    pub config: GameConfig,
    pub catalog: EffectCatalog,
    pub skills: SkillBook,
}

/// Content factory that loads all game content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── config.toml
/// ├── effects.ron
/// └── skills.ron
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    /// Creates a new content factory pointing to a data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load game configuration from `config.toml`.
    pub fn load_config(&self) -> LoadResult<GameConfig> {
        let path = self.data_dir.join("config.toml");
        ConfigLoader::load(&path)
    }

    /// Load the effect catalog from `effects.ron`.
    pub fn load_effects(&self) -> LoadResult<EffectCatalog> {
        let path = self.data_dir.join("effects.ron");
        EffectCatalogLoader::load(&path)
    }

    /// Load upgrade lines from `skills.ron` into a skill book at level 0.
    ///
    /// The file is optional; a missing file yields an empty book.
    pub fn load_skills(&self) -> LoadResult<SkillBook> {
        let path = self.data_dir.join("skills.ron");
        if !path.exists() {
            return Ok(SkillBook::new());
        }
        Ok(SkillLoader::load(&path)?.into_book())
    }

    pub fn load_all(&self) -> LoadResult<GameContent> {
        Ok(GameContent {
            config: self.load_config()?,
            catalog: self.load_effects()?,
            skills: self.load_skills()?,
        })
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shipped() -> ContentFactory {
        ContentFactory::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("data"))
    }

    #[test]
    fn test_factory_paths() {
        let factory = ContentFactory::new("/tmp/data");
        assert_eq!(factory.data_dir(), Path::new("/tmp/data"));
    }

    #[test]
    fn shipped_content_matches_builtin_defaults() {
        let content = shipped().load_all().unwrap();
        assert_eq!(content.config, GameConfig::default());
        assert_eq!(content.catalog, EffectCatalog::standard());
        assert_eq!(content.skills.grants().count(), 9);
    }

    #[test]
    fn missing_skill_file_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "").unwrap();
        std::fs::copy(shipped().data_dir().join("effects.ron"), dir.path().join("effects.ron"))
            .unwrap();

        let content = ContentFactory::new(dir.path()).load_all().unwrap();
        assert_eq!(content.skills.grants().count(), 0);
    }

    #[test]
    fn missing_config_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = ContentFactory::new(dir.path()).load_config().unwrap_err();
        assert!(err.to_string().starts_with("Failed to read file"));
    }
}
