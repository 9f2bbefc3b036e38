use glam::Vec3;
use serde::Serialize;

use super::catalog::{EnemyTemplate, LootEntry};

// ============================================================================
// Enemy State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyState {
    Alive,
    /// Health reached zero; playing the death animation until removal
    Dying,
}

// ============================================================================
// Enemy Entity
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Enemy {
    pub id: String,
    /// Catalog template id (e.g. "goblin")
    pub enemy_type: String,
    pub display_name: String,
    pub position: Vec3,
    pub health: i32,
    pub max_health: i32,
    pub damage: i32,
    pub experience: i64,
    pub loot: Vec<LootEntry>,
    pub scale: f32,
    pub state: EnemyState,
}

impl Enemy {
    /// Create an enemy from a catalog template
    pub fn from_template(id: &str, template: &EnemyTemplate, position: Vec3) -> Self {
        Self {
            id: id.to_string(),
            enemy_type: template.id.clone(),
            display_name: template.display_name.clone(),
            position,
            health: template.max_health,
            max_health: template.max_health,
            damage: template.damage,
            experience: template.experience,
            loot: template.loot.clone(),
            scale: template.scale,
            state: EnemyState::Alive,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.state == EnemyState::Alive
    }

    pub fn is_dying(&self) -> bool {
        self.state == EnemyState::Dying
    }

    /// Take damage and return true if this hit killed the enemy.
    ///
    /// Dying enemies ignore further damage, so the kill is reported once.
    pub fn take_damage(&mut self, damage: i32) -> bool {
        if !self.is_alive() || damage <= 0 {
            return false;
        }
        self.health = (self.health - damage).max(0);
        if self.health <= 0 {
            self.state = EnemyState::Dying;
            true
        } else {
            false
        }
    }

    /// Horizontal distance to a point (the y axis is ignored)
    pub fn ground_distance(&self, point: Vec3) -> f32 {
        ground_distance(self.position, point)
    }
}

/// Distance on the ground plane between two world positions
pub fn ground_distance(a: Vec3, b: Vec3) -> f32 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    (dx * dx + dz * dz).sqrt()
}
