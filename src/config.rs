//! Engine Configuration
//!
//! Tunables for spawning, leveling and reward display, loaded from
//! `engine.toml`. Every section is optional; missing values fall back to
//! the built-in constants.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Encounter spawner tunables
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    /// Hard cap on live enemies (dying enemies count until removed)
    pub max_enemies: usize,
    /// Outer radius of the spawn disc around the origin
    pub spawn_radius: f32,
    /// Inner radius; 0 samples the whole disc, >0 samples an annulus
    pub inner_radius: f32,
    /// Required clearance from every reserved NPC position
    pub min_npc_distance: f32,
    /// Required clearance from every other enemy
    pub min_enemy_distance: f32,
    /// Rejection-sampling attempts per spawn cycle
    pub max_attempts: u32,
    pub spawn_interval_ms: u64,
    /// Death animation length before a defeated enemy is removed
    pub death_delay_ms: u64,
    /// Schedule spawn cycles automatically on the engine clock
    pub auto_spawn: bool,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            max_enemies: 5,
            spawn_radius: 40.0,
            inner_radius: 0.0,
            min_npc_distance: 8.0,
            min_enemy_distance: 4.0,
            max_attempts: 10,
            spawn_interval_ms: 5000,
            death_delay_ms: 1000,
            auto_spawn: true,
        }
    }
}

/// Leveling curve and per-level bonuses
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LevelingConfig {
    /// Level L requires `xp_per_level * (L-1) * L / 2` total experience
    pub xp_per_level: i64,
    pub max_level: i32,
    pub health_per_level: i32,
    pub energy_per_level: i32,
    pub damage_per_level: i32,
}

impl Default for LevelingConfig {
    fn default() -> Self {
        Self {
            xp_per_level: 100,
            max_level: 99,
            health_per_level: 10,
            energy_per_level: 5,
            damage_per_level: 1,
        }
    }
}

/// Starting player stats
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub health: i32,
    pub energy: i32,
    pub damage: i32,
    pub currency: i64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            health: 100,
            energy: 50,
            damage: 10,
            currency: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// How long a reward notification stays up before it is cleared
    pub display_ms: u64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self { display_ms: 3000 }
    }
}

/// Settings only the headless session driver reads
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub tick_ms: u64,
    pub duration_secs: u64,
    /// Fixed RNG seed; entropy-seeded when absent
    pub seed: Option<u64>,
    /// Content directory (quests/, enemies.toml)
    pub data_dir: PathBuf,
    /// NPC positions the spawner must keep clear of
    pub reserved_positions: Vec<[f32; 3]>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_ms: 250,
            duration_secs: 30,
            seed: None,
            data_dir: PathBuf::from("data"),
            reserved_positions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub spawner: SpawnerConfig,
    pub leveling: LevelingConfig,
    pub player: PlayerConfig,
    pub rewards: RewardConfig,
    pub session: SessionConfig,
}

impl EngineConfig {
    /// Load config from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            warn!("Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {:?}: {}", path, e))?;

        let config = Self::from_toml(&content)
            .map_err(|e| format!("Failed to parse {:?}: {}", path, e))?;

        info!("Loaded engine config from {:?}", path);
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(content).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        let s = &self.spawner;
        if s.spawn_radius <= 0.0 {
            return Err("spawner.spawn_radius must be positive".to_string());
        }
        if s.inner_radius < 0.0 || s.inner_radius >= s.spawn_radius {
            return Err("spawner.inner_radius must be in [0, spawn_radius)".to_string());
        }
        if self.leveling.xp_per_level <= 0 {
            return Err("leveling.xp_per_level must be positive".to_string());
        }
        if self.leveling.max_level < 1 {
            return Err("leveling.max_level must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = EngineConfig::from_toml(
            r#"
[spawner]
max_enemies = 8

[leveling]
health_per_level = 20
"#,
        )
        .unwrap();

        assert_eq!(config.spawner.max_enemies, 8);
        assert_eq!(config.spawner.max_attempts, 10);
        assert_eq!(config.leveling.health_per_level, 20);
        assert_eq!(config.leveling.xp_per_level, 100);
        assert_eq!(config.rewards.display_ms, 3000);
    }

    #[test]
    fn test_reserved_positions_parse() {
        let config = EngineConfig::from_toml(
            r#"
[session]
seed = 7
reserved_positions = [[0.0, 0.0, 0.0], [10.0, 0.0, -4.5]]
"#,
        )
        .unwrap();

        assert_eq!(config.session.seed, Some(7));
        assert_eq!(config.session.reserved_positions.len(), 2);
        assert_eq!(config.session.reserved_positions[1][2], -4.5);
    }

    #[test]
    fn test_invalid_radius_rejected() {
        let result = EngineConfig::from_toml(
            r#"
[spawner]
spawn_radius = 10.0
inner_radius = 12.0
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = EngineConfig::load(&dir.path().join("engine.toml")).unwrap();
        assert_eq!(config.spawner.max_enemies, 5);
    }
}
