//! Game configuration loader.

use std::path::Path;

use game_core::GameConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for game configuration from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config data from a TOML file.
    ///
    /// Keys missing from the file keep their [`GameConfig::default`] values.
    pub fn load(path: &Path) -> LoadResult<GameConfig> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<GameConfig> {
        let config: GameConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;
        validate(&config)?;
        Ok(config)
    }
}

fn validate(config: &GameConfig) -> LoadResult<()> {
    let regions = config.layout.region_count();
    if regions == 0 {
        anyhow::bail!("Invalid config: layout must contain at least one region");
    }
    if regions > GameConfig::MAX_REGIONS {
        anyhow::bail!(
            "Invalid config: layout has {} regions, at most {} are supported",
            regions,
            GameConfig::MAX_REGIONS
        );
    }
    let bonus = config
        .bonus_regions
        .saturating_add(config.secondary_bonus_regions);
    if bonus >= regions {
        anyhow::bail!(
            "Invalid config: {} bonus regions leave no room for the target in {} regions",
            bonus,
            regions
        );
    }
    let probabilities = [
        ("triggers.shuffle_chance", config.triggers.shuffle_chance),
        ("triggers.base_effect_chance", config.triggers.base_effect_chance),
    ];
    for (key, value) in probabilities {
        if !(0.0..=1.0).contains(&value) {
            anyhow::bail!("Invalid config: {} must be within [0, 1], got {}", key, value);
        }
    }
    if config.combo.max_count == 0 {
        anyhow::bail!("Invalid config: combo.max_count must be positive");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_core::LayoutKind;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = ConfigLoader::parse(
            r#"
            bonus_regions = 3

            [layout.grid]
            size = 4

            [combo]
            timeout_ms = 2500
            "#,
        )
        .unwrap();

        assert_eq!(config.layout, LayoutKind::Grid { size: 4 });
        assert_eq!(config.bonus_regions, 3);
        assert_eq!(config.combo.timeout_ms, 2_500);
        assert_eq!(config.combo.max_count, GameConfig::default().combo.max_count);
        assert_eq!(config.energy, GameConfig::default().energy);
    }

    #[test]
    fn oversized_grid_is_rejected() {
        let err = ConfigLoader::parse("[layout.grid]\nsize = 4294967296\n").unwrap_err();
        assert!(err.to_string().contains("at most 1024"));
    }

    #[test]
    fn bonus_regions_must_leave_a_target() {
        let err = ConfigLoader::parse(
            r#"
            bonus_regions = 3
            secondary_bonus_regions = 1

            [layout.ring]
            regions = 4
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("no room for the target"));

        let config = ConfigLoader::parse(
            r#"
            bonus_regions = 2
            secondary_bonus_regions = 1

            [layout.ring]
            regions = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.layout.region_count(), 4);
    }

    #[test]
    fn out_of_range_probability_is_rejected() {
        let err = ConfigLoader::parse("[triggers]\nshuffle_chance = 1.5\n").unwrap_err();
        assert!(err.to_string().contains("triggers.shuffle_chance"));
    }
}
