//! Effect catalog loader.

use std::path::Path;

use game_core::{EffectCatalog, EffectDefinition};
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

/// Effect catalog structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectCatalogFile {
    pub effects: Vec<EffectDefinition>,
}

/// Loader for the effect catalog from RON files.
pub struct EffectCatalogLoader;

impl EffectCatalogLoader {
    /// Load and validate an effect catalog from a RON file.
    pub fn load(path: &Path) -> LoadResult<EffectCatalog> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<EffectCatalog> {
        let file: EffectCatalogFile = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse effect catalog RON: {}", e))?;

        EffectCatalog::from_definitions(file.effects)
            .map_err(|e| anyhow::anyhow!("Invalid effect catalog: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_core::{EffectId, Polarity};

    #[test]
    fn parses_minimal_catalog() {
        let catalog = EffectCatalogLoader::parse(
            r#"(
                effects: [
                    (
                        id: frenzy,
                        name: "Frenzy",
                        polarity: buff,
                        weight: rarity(common),
                        base_duration_ms: Some(15000),
                        behavior: passive,
                        modifiers: [gain_multiplier(2.0)],
                    ),
                    (
                        id: lock,
                        name: "Lock",
                        polarity: debuff,
                        weight: severity(moderate),
                        base_duration_ms: Some(1000),
                        behavior: input_lock,
                    ),
                ],
            )"#,
        )
        .unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(EffectId::Lock).unwrap().polarity, Polarity::Debuff);
        assert!(catalog.get(EffectId::Lock).unwrap().modifiers.is_empty());
    }

    #[test]
    fn mismatched_weight_class_is_rejected() {
        let err = EffectCatalogLoader::parse(
            r#"(effects: [(
                id: frenzy,
                name: "Frenzy",
                polarity: buff,
                weight: severity(mild),
                base_duration_ms: Some(1000),
                behavior: passive,
            )])"#,
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("Invalid effect catalog"));
    }
}
