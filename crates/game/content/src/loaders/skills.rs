//! Upgrade table loader.

use std::path::Path;

use game_core::{BonusKind, BonusTarget, SkillBook, SkillGrant};
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

/// One upgrade line as written in `skills.ron`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillEntry {
    pub name: String,
    pub kind: BonusKind,
    pub target: BonusTarget,
    pub per_level: f64,
    pub max_level: u32,
}

/// Skill table structure for RON files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillTable {
    pub skills: Vec<SkillEntry>,
}

impl SkillTable {
    /// Skill book with every line registered at level 0.
    pub fn into_book(self) -> SkillBook {
        self.skills.into_iter().fold(SkillBook::new(), |book, entry| {
            book.with_grant(
                entry.name,
                SkillGrant {
                    kind: entry.kind,
                    target: entry.target,
                    per_level: entry.per_level,
                    max_level: entry.max_level,
                },
            )
        })
    }
}

/// Loader for upgrade lines from RON files.
pub struct SkillLoader;

impl SkillLoader {
    pub fn load(path: &Path) -> LoadResult<SkillTable> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<SkillTable> {
        let table: SkillTable = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse skill table RON: {}", e))?;

        let mut seen = std::collections::BTreeSet::new();
        for entry in &table.skills {
            if !seen.insert(entry.name.as_str()) {
                anyhow::bail!("Duplicate skill line: {}", entry.name);
            }
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_core::BonusProvider;

    const TABLE: &str = r#"(
        skills: [
            (name: "golden_fingers", kind: multiplier, target: gold, per_level: 0.1, max_level: 10),
            (name: "sharp_eye", kind: chance, target: critical, per_level: 0.02, max_level: 10),
        ],
    )"#;

    #[test]
    fn table_builds_a_skill_book() {
        let mut book = SkillLoader::parse(TABLE).unwrap().into_book();
        assert_eq!(book.bonus(BonusKind::Multiplier, BonusTarget::Gold), 0.0);

        assert_eq!(book.set_level("golden_fingers", 3), Some(3));
        assert!((book.bonus(BonusKind::Multiplier, BonusTarget::Gold) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn duplicate_lines_are_rejected() {
        let err = SkillLoader::parse(
            r#"(skills: [
                (name: "a", kind: chance, target: luck, per_level: 0.1, max_level: 1),
                (name: "a", kind: chance, target: luck, per_level: 0.2, max_level: 1),
            ])"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Duplicate skill line: a");
    }
}
