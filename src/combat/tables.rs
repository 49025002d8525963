//! Combat reference data: boss catalog, ability definitions, counterattack table and the
//! damage-by-difficulty mapping. Loaded once and shared read-only with the engine.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Damage dealt by a correct answer on a question with no recognized difficulty.
pub const DEFAULT_BASE_DAMAGE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
}

impl Difficulty {
    /// Case-insensitive parse; anything unrecognized yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Self::Easy),
            "normal" | "medium" => Some(Self::Normal),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageTable {
    pub easy: u32,
    pub normal: u32,
    pub hard: u32,
}

impl Default for DamageTable {
    fn default() -> Self {
        Self {
            easy: 1,
            normal: 2,
            hard: 3,
        }
    }
}

impl DamageTable {
    pub fn base_damage(&self, difficulty: Option<Difficulty>) -> u32 {
        match difficulty {
            Some(Difficulty::Easy) => self.easy,
            Some(Difficulty::Normal) => self.normal,
            Some(Difficulty::Hard) => self.hard,
            None => DEFAULT_BASE_DAMAGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BossDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    pub base_hp: u32,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AbilityKind {
    Shield,
    CriticalHit,
    Hint,
}

impl AbilityKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "shield" => Some(Self::Shield),
            "criticalHit" => Some(Self::CriticalHit),
            "hint" => Some(Self::Hint),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shield => "shield",
            Self::CriticalHit => "criticalHit",
            Self::Hint => "hint",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityDefinition {
    pub kind: AbilityKind,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub description: String,
    /// Answer submissions before the ability can be used again.
    #[serde(default)]
    pub cooldown_questions: u32,
    /// Mana drawn from the team pool; only meaningful for `hint`.
    #[serde(default)]
    pub mana_cost: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counterattack {
    #[serde(default)]
    pub icon: String,
    pub name: String,
    #[serde(default)]
    pub flavor: String,
    pub class_damage: u32,
    #[serde(default)]
    pub boss_heal: Option<u32>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unable to read catalog '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON catalog: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid YAML catalog: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("catalog has no bosses")]
    NoBosses,
    #[error("catalog has no counterattacks")]
    NoCounterattacks,
    #[error("boss '{0}' has zero base HP")]
    ZeroHpBoss(String),
    #[error("catalog is missing the {0} ability")]
    MissingAbility(&'static str),
}

/// Immutable combat configuration injected into the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub bosses: Vec<BossDefinition>,
    pub abilities: Vec<AbilityDefinition>,
    pub counterattacks: Vec<Counterattack>,
    #[serde(default)]
    pub damage: DamageTable,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Catalog {
    /// The stock classroom catalog.
    pub fn builtin() -> Self {
        Self {
            bosses: vec![
                boss("dragon", "Ignis the Quiz Dragon", "🐉", 30, "Breathes fire at wrong answers."),
                boss("kraken", "Kraken of Confusion", "🐙", 40, "Tangles the class in its tentacles."),
                boss("golem", "Golem of Forgetting", "🗿", 25, "Slow, heavy and very hard to crack."),
                boss("hydra", "Hydra of Homework", "🐍", 50, "Regrows a head for every mistake."),
            ],
            abilities: vec![
                AbilityDefinition {
                    kind: AbilityKind::Shield,
                    name: "Shield".to_string(),
                    icon: "🛡️".to_string(),
                    description: "Blocks the next counterattack against your team.".to_string(),
                    cooldown_questions: 3,
                    mana_cost: 0,
                },
                AbilityDefinition {
                    kind: AbilityKind::CriticalHit,
                    name: "Critical Hit".to_string(),
                    icon: "⚡".to_string(),
                    description: "Doubles the damage of your next correct answer.".to_string(),
                    cooldown_questions: 4,
                    mana_cost: 0,
                },
                AbilityDefinition {
                    kind: AbilityKind::Hint,
                    name: "Hint".to_string(),
                    icon: "💡".to_string(),
                    description: "Removes one wrong option from the current question.".to_string(),
                    cooldown_questions: 0,
                    mana_cost: 2,
                },
            ],
            counterattacks: vec![
                counter("🔥", "Fire Breath", "A wave of flame scorches the class.", 2, None),
                counter("💥", "Tail Swipe", "The boss lashes out wildly.", 1, None),
                counter("🌀", "Mind Fog", "Everyone forgets what they were doing.", 1, None),
                counter("💚", "Regenerate", "The boss feeds on the mistake.", 1, Some(2)),
                counter("🌑", "Shadow Drain", "Darkness saps the class and heals the boss.", 2, Some(1)),
            ],
            damage: DamageTable::default(),
        }
    }

    /// Load a catalog from `.yaml`/`.yml` or JSON (any other extension) and validate it.
    pub fn load(path: &str) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_string(),
            source,
        })?;
        let is_yaml = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
        let catalog: Catalog = if is_yaml {
            serde_yaml::from_str(&raw)?
        } else {
            serde_json::from_str(&raw)?
        };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.bosses.is_empty() {
            return Err(CatalogError::NoBosses);
        }
        if let Some(boss) = self.bosses.iter().find(|b| b.base_hp == 0) {
            return Err(CatalogError::ZeroHpBoss(boss.id.clone()));
        }
        if self.counterattacks.is_empty() {
            return Err(CatalogError::NoCounterattacks);
        }
        for kind in [AbilityKind::Shield, AbilityKind::CriticalHit] {
            if self.ability(kind).is_none() {
                return Err(CatalogError::MissingAbility(kind.as_str()));
            }
        }
        Ok(())
    }

    /// Resolve a boss by id, defaulting to the first entry for unknown ids.
    pub fn boss_or_default(&self, id: &str) -> Option<&BossDefinition> {
        self.bosses
            .iter()
            .find(|b| b.id == id)
            .or_else(|| self.bosses.first())
    }

    pub fn ability(&self, kind: AbilityKind) -> Option<&AbilityDefinition> {
        self.abilities.iter().find(|a| a.kind == kind)
    }

    pub fn cooldown(&self, kind: AbilityKind) -> u32 {
        self.ability(kind).map_or(0, |a| a.cooldown_questions)
    }
}

fn boss(id: &str, name: &str, icon: &str, base_hp: u32, description: &str) -> BossDefinition {
    BossDefinition {
        id: id.to_string(),
        name: name.to_string(),
        icon: icon.to_string(),
        base_hp,
        description: description.to_string(),
    }
}

fn counter(icon: &str, name: &str, flavor: &str, class_damage: u32, boss_heal: Option<u32>) -> Counterattack {
    Counterattack {
        icon: icon.to_string(),
        name: name.to_string(),
        flavor: flavor.to_string(),
        class_damage,
        boss_heal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_valid() {
        Catalog::builtin().validate().expect("builtin catalog should validate");
    }

    #[test]
    fn damage_by_difficulty_defaults_to_two() {
        let table = DamageTable::default();
        assert_eq!(table.base_damage(Some(Difficulty::Easy)), 1);
        assert_eq!(table.base_damage(Some(Difficulty::Normal)), 2);
        assert_eq!(table.base_damage(Some(Difficulty::Hard)), 3);
        assert_eq!(table.base_damage(None), 2);
    }

    #[test]
    fn unknown_boss_falls_back_to_first_entry() {
        let catalog = Catalog::builtin();
        let boss = catalog.boss_or_default("no-such-boss").expect("fallback boss");
        assert_eq!(boss.id, catalog.bosses[0].id);
        assert_eq!(catalog.boss_or_default("kraken").map(|b| b.base_hp), Some(40));
    }

    #[test]
    fn default_cooldowns() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.cooldown(AbilityKind::Shield), 3);
        assert_eq!(catalog.cooldown(AbilityKind::CriticalHit), 4);
    }

    #[test]
    fn validate_rejects_empty_tables() {
        let mut catalog = Catalog::builtin();
        catalog.counterattacks.clear();
        assert!(matches!(catalog.validate(), Err(CatalogError::NoCounterattacks)));
        catalog.bosses.clear();
        assert!(matches!(catalog.validate(), Err(CatalogError::NoBosses)));
    }

    #[test]
    fn difficulty_parse_is_case_insensitive() {
        assert_eq!(Difficulty::parse("HARD"), Some(Difficulty::Hard));
        assert_eq!(Difficulty::parse(" easy "), Some(Difficulty::Easy));
        assert_eq!(Difficulty::parse("legendary"), None);
    }

    #[test]
    fn yaml_catalog_round_trips_through_loader() {
        let path = std::env::temp_dir().join(format!("bossraid-catalog-{}.yaml", std::process::id()));
        let yaml = serde_yaml::to_string(&Catalog::builtin()).expect("serialize yaml");
        fs::write(&path, yaml).expect("write fixture");
        let loaded = Catalog::load(path.to_str().expect("utf-8 path")).expect("load yaml");
        assert_eq!(loaded, Catalog::builtin());
        let _ = fs::remove_file(path);
    }
}
