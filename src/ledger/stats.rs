use serde::{Deserialize, Serialize};

use crate::config::PlayerConfig;

/// Player progression and vitals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub level: i32,
    /// Cumulative experience; never reduced
    pub experience: i64,
    pub currency: i64,
    pub health: i32,
    pub max_health: i32,
    pub energy: i32,
    pub max_energy: i32,
    /// Combat power dealt per attack
    pub damage: i32,
}

impl PlayerStats {
    pub(crate) fn from_config(config: &PlayerConfig) -> Self {
        Self {
            level: 1,
            experience: 0,
            currency: config.currency.max(0),
            health: config.health,
            max_health: config.health,
            energy: config.energy,
            max_energy: config.energy,
            damage: config.damage,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }
}

/// Partial stat update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StatsPatch {
    pub level: Option<i32>,
    pub experience: Option<i64>,
    pub currency: Option<i64>,
    pub health: Option<i32>,
    pub max_health: Option<i32>,
    pub energy: Option<i32>,
    pub max_energy: Option<i32>,
    pub damage: Option<i32>,
}

impl StatsPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub(crate) fn apply(&self, stats: &mut PlayerStats) {
        if let Some(level) = self.level {
            stats.level = level;
        }
        if let Some(experience) = self.experience {
            stats.experience = experience;
        }
        if let Some(currency) = self.currency {
            stats.currency = currency;
        }
        if let Some(health) = self.health {
            stats.health = health;
        }
        if let Some(max_health) = self.max_health {
            stats.max_health = max_health;
        }
        if let Some(energy) = self.energy {
            stats.energy = energy;
        }
        if let Some(max_energy) = self.max_energy {
            stats.max_energy = max_energy;
        }
        if let Some(damage) = self.damage {
            stats.damage = damage;
        }
    }
}
