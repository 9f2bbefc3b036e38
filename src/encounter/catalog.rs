use std::collections::HashMap;
use std::path::Path;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ============================================================================
// Raw TOML Structures (direct deserialization)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootEntry {
    pub item_id: String,
    /// Probability in [0, 1] of this entry dropping
    pub drop_chance: f32,
    #[serde(default = "default_one")]
    pub amount: i32,
}

fn default_one() -> i32 {
    1
}

/// Raw enemy template as loaded directly from TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawEnemyTemplate {
    pub display_name: Option<String>,
    pub max_health: Option<i32>,
    pub damage: Option<i32>,
    pub experience: Option<i64>,
    pub scale: Option<f32>,
    pub currency_min: Option<i64>,
    pub currency_max: Option<i64>,
    #[serde(default)]
    pub loot: Vec<LootEntry>,
}

// ============================================================================
// Resolved Templates
// ============================================================================

/// Stats every spawned enemy of a type starts from
#[derive(Debug, Clone, PartialEq)]
pub struct EnemyTemplate {
    pub id: String,
    pub display_name: String,
    pub max_health: i32,
    pub damage: i32,
    pub experience: i64,
    /// Visual scale for the renderer
    pub scale: f32,
    pub currency_min: i64,
    pub currency_max: i64,
    pub loot: Vec<LootEntry>,
}

impl EnemyTemplate {
    fn from_raw(id: &str, raw: &RawEnemyTemplate) -> Self {
        let currency_min = raw.currency_min.unwrap_or(0).max(0);
        let currency_max = raw.currency_max.unwrap_or(currency_min).max(currency_min);

        let loot = raw
            .loot
            .iter()
            .filter(|entry| {
                if entry.amount <= 0 {
                    warn!(
                        "Enemy '{}' loot '{}' has amount {}, skipping",
                        id, entry.item_id, entry.amount
                    );
                    return false;
                }
                true
            })
            .map(|entry| LootEntry {
                drop_chance: clamp_chance(entry.drop_chance),
                ..entry.clone()
            })
            .collect();

        Self {
            id: id.to_string(),
            display_name: raw.display_name.clone().unwrap_or_else(|| id.to_string()),
            max_health: raw.max_health.unwrap_or(50).max(1),
            damage: raw.damage.unwrap_or(5).max(0),
            experience: raw.experience.unwrap_or(10).max(0),
            scale: raw.scale.unwrap_or(1.0),
            currency_min,
            currency_max,
            loot,
        }
    }

    /// Roll this template's currency drop. An empty or inverted range
    /// drops nothing.
    pub fn roll_currency(&self, rng: &mut impl Rng) -> i64 {
        if self.currency_max <= 0 || self.currency_max < self.currency_min {
            return 0;
        }
        rng.gen_range(self.currency_min..=self.currency_max)
    }
}

fn clamp_chance(chance: f32) -> f32 {
    if chance.is_nan() {
        0.0
    } else {
        chance.clamp(0.0, 1.0)
    }
}

/// Fixed set of enemy types the spawner picks from
#[derive(Debug, Clone)]
pub struct EnemyCatalog {
    /// Sorted by id so seeded picks are reproducible
    templates: Vec<EnemyTemplate>,
}

impl EnemyCatalog {
    pub fn new(mut templates: Vec<EnemyTemplate>) -> Self {
        templates.sort_by(|a, b| a.id.cmp(&b.id));
        templates.dedup_by(|a, b| a.id == b.id);
        Self { templates }
    }

    /// Default encounter roster
    pub fn builtin() -> Self {
        fn template(
            id: &str,
            name: &str,
            (max_health, damage, experience): (i32, i32, i64),
            scale: f32,
            (currency_min, currency_max): (i64, i64),
            loot: &[(&str, f32, i32)],
        ) -> EnemyTemplate {
            EnemyTemplate {
                id: id.to_string(),
                display_name: name.to_string(),
                max_health,
                damage,
                experience,
                scale,
                currency_min,
                currency_max,
                loot: loot
                    .iter()
                    .map(|(item_id, drop_chance, amount)| LootEntry {
                        item_id: item_id.to_string(),
                        drop_chance: *drop_chance,
                        amount: *amount,
                    })
                    .collect(),
            }
        }

        Self::new(vec![
            template(
                "slime",
                "Slime",
                (20, 2, 10),
                0.8,
                (1, 3),
                &[("slime_core", 0.3, 1), ("health_potion", 0.2, 1)],
            ),
            template(
                "goblin",
                "Goblin",
                (40, 6, 30),
                1.0,
                (2, 8),
                &[("goblin_ear", 0.5, 1), ("copper_coin", 0.25, 3)],
            ),
            template(
                "wolf",
                "Grey Wolf",
                (55, 9, 45),
                1.2,
                (0, 0),
                &[("wolf_pelt", 0.4, 1), ("raw_meat", 0.6, 2)],
            ),
            template(
                "skeleton",
                "Skeleton",
                (70, 11, 60),
                1.1,
                (3, 12),
                &[("bone", 0.7, 2), ("rusty_sword", 0.1, 1)],
            ),
            template(
                "troll",
                "Cave Troll",
                (160, 18, 150),
                1.8,
                (10, 30),
                &[("troll_hide", 0.35, 1), ("health_potion", 0.5, 2)],
            ),
        ])
    }

    /// Load templates from a TOML table of `[enemy_id]` sections
    pub fn load_from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {:?}: {}", path, e))?;

        let catalog = Self::from_toml(&content)
            .map_err(|e| format!("Failed to parse {:?}: {}", path, e))?;

        info!("Loaded {} enemy templates from {:?}", catalog.len(), path);
        Ok(catalog)
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        let table: HashMap<String, RawEnemyTemplate> =
            toml::from_str(content).map_err(|e| e.to_string())?;

        if table.is_empty() {
            return Err("enemy catalog is empty".to_string());
        }

        let templates = table
            .iter()
            .map(|(id, raw)| EnemyTemplate::from_raw(id, raw))
            .collect();
        Ok(Self::new(templates))
    }

    /// Load `<data_dir>/enemies.toml`, falling back to the built-in roster
    pub fn load_or_builtin(data_dir: &Path) -> Self {
        let path = data_dir.join("enemies.toml");
        if !path.exists() {
            warn!("No enemy catalog at {:?}, using built-in roster", path);
            return Self::builtin();
        }
        match Self::load_from_file(&path) {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!("{}; using built-in roster", e);
                Self::builtin()
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&EnemyTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Pick a template uniformly at random
    pub fn choose(&self, rng: &mut impl Rng) -> Option<&EnemyTemplate> {
        self.templates.choose(rng)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.templates.iter().map(|t| t.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl Default for EnemyCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
