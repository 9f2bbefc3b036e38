//! Economy Ledger
//!
//! Authoritative holder of player stats and inventory. Every mutation goes
//! through here so observers hear about it and the leveling rule is applied
//! in exactly one place. Nothing in the ledger panics or blocks; invalid
//! requests are reported with `false`.

pub mod inventory;
pub mod leveling;
pub mod stats;

pub use inventory::{Inventory, InventoryEntry};
pub use stats::{PlayerStats, StatsPatch};

use tracing::{debug, info};

use crate::config::{LevelingConfig, PlayerConfig};
use crate::events::{EngineEvent, EventBus};

pub struct Ledger {
    stats: PlayerStats,
    inventory: Inventory,
    leveling: LevelingConfig,
    bus: EventBus,
}

impl Ledger {
    pub fn new(player: &PlayerConfig, leveling: LevelingConfig, bus: EventBus) -> Self {
        Self {
            stats: PlayerStats::from_config(player),
            inventory: Inventory::new(),
            leveling,
            bus,
        }
    }

    pub fn stats(&self) -> &PlayerStats {
        &self.stats
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn leveling(&self) -> &LevelingConfig {
        &self.leveling
    }

    /// Merge a partial update into the stats. Callers are trusted; no
    /// validation is performed.
    pub fn update_stats(&mut self, patch: &StatsPatch) {
        if patch.is_empty() {
            return;
        }
        patch.apply(&mut self.stats);
        self.notify_stats();
    }

    /// Add items. Returns false for non-positive amounts.
    pub fn add_item(&mut self, item_id: &str, amount: i32) -> bool {
        match self.inventory.add(item_id, amount) {
            Some(total) => {
                debug!("Added {} x{} (now {})", item_id, amount, total);
                self.bus.emit(EngineEvent::InventoryChanged {
                    item_id: item_id.to_string(),
                    amount: total,
                });
                true
            }
            None => false,
        }
    }

    /// Remove items. Returns false without mutating when the item is absent
    /// or fewer than `amount` are held.
    pub fn remove_item(&mut self, item_id: &str, amount: i32) -> bool {
        match self.inventory.remove(item_id, amount) {
            Some(remaining) => {
                debug!("Removed {} x{} (now {})", item_id, amount, remaining);
                self.bus.emit(EngineEvent::InventoryChanged {
                    item_id: item_id.to_string(),
                    amount: remaining,
                });
                true
            }
            None => false,
        }
    }

    pub fn has_item(&self, item_id: &str, amount: i32) -> bool {
        self.inventory.has(item_id, amount)
    }

    pub fn item_count(&self, item_id: &str) -> i32 {
        self.inventory.count(item_id)
    }

    /// Add experience and apply any level-ups. Returns levels gained.
    pub fn grant_experience(&mut self, amount: i64) -> i32 {
        if amount <= 0 {
            return 0;
        }

        self.stats.experience = self.stats.experience.saturating_add(amount);
        let target_level = leveling::level_for_xp(self.stats.experience, &self.leveling);

        let mut gained = 0;
        while self.stats.level < target_level {
            self.stats.level += 1;
            self.stats.max_health += self.leveling.health_per_level;
            self.stats.max_energy += self.leveling.energy_per_level;
            self.stats.damage += self.leveling.damage_per_level;
            gained += 1;
        }

        if gained > 0 {
            // Level up: full heal and energy refill
            self.stats.health = self.stats.max_health;
            self.stats.energy = self.stats.max_energy;

            info!(
                "Leveled up to {} (+{} levels, max HP {}, max energy {})",
                self.stats.level, gained, self.stats.max_health, self.stats.max_energy
            );
            self.bus.emit(EngineEvent::LeveledUp {
                level: self.stats.level,
                max_health: self.stats.max_health,
                max_energy: self.stats.max_energy,
            });
        }

        self.notify_stats();
        gained
    }

    pub fn add_currency(&mut self, amount: i64) -> bool {
        if amount <= 0 {
            return false;
        }
        self.stats.currency = self.stats.currency.saturating_add(amount);
        self.notify_stats();
        true
    }

    /// Spend currency. Returns false without mutating when funds are short.
    pub fn spend_currency(&mut self, amount: i64) -> bool {
        if amount <= 0 || self.stats.currency < amount {
            return false;
        }
        self.stats.currency -= amount;
        self.notify_stats();
        true
    }

    /// Restore energy up to the maximum
    pub fn restore_energy(&mut self, amount: i32) -> bool {
        if amount <= 0 {
            return false;
        }
        self.stats.energy = self
            .stats
            .energy
            .saturating_add(amount)
            .min(self.stats.max_energy);
        self.notify_stats();
        true
    }

    pub fn spend_energy(&mut self, amount: i32) -> bool {
        if amount <= 0 || self.stats.energy < amount {
            return false;
        }
        self.stats.energy -= amount;
        self.notify_stats();
        true
    }

    /// Reduce health, floored at zero. Returns remaining health.
    pub fn apply_damage(&mut self, amount: i32) -> i32 {
        if amount > 0 {
            self.stats.health = (self.stats.health - amount).max(0);
            self.notify_stats();
        }
        self.stats.health
    }

    /// Restore health up to the maximum. Returns current health.
    pub fn heal(&mut self, amount: i32) -> i32 {
        if amount > 0 {
            self.stats.health = self
                .stats
                .health
                .saturating_add(amount)
                .min(self.stats.max_health);
            self.notify_stats();
        }
        self.stats.health
    }

    pub fn xp_to_next_level(&self) -> i64 {
        leveling::xp_to_next_level(self.stats.level, self.stats.experience, &self.leveling)
    }

    pub fn level_progress(&self) -> f32 {
        leveling::level_progress(self.stats.level, self.stats.experience, &self.leveling)
    }

    /// Replace stats and inventory wholesale (save restore)
    pub(crate) fn restore(&mut self, stats: PlayerStats, inventory: Inventory) {
        self.stats = stats;
        self.inventory = inventory;
        self.notify_stats();
    }

    fn notify_stats(&self) {
        self.bus.emit(EngineEvent::StatsChanged {
            stats: self.stats.clone(),
        });
    }
}
