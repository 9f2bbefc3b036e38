//! Encounter Spawner
//!
//! Places enemies in open ground around the origin, tracks their health and
//! runs the defeat sequence: loot trials, currency and experience through
//! the ledger. Removal after the death animation is scheduled by the engine.

use std::f32::consts::TAU;

use glam::Vec3;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use super::catalog::EnemyCatalog;
use super::enemy::{Enemy, ground_distance};
use crate::config::SpawnerConfig;
use crate::events::{EngineEvent, EventBus};
use crate::ledger::Ledger;
use crate::reward::RewardEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpawnOutcome {
    Spawned(String),
    /// Live enemy cap reached
    AtCapacity,
    /// Every sampled position was too close to an NPC or enemy
    NoPosition,
    EmptyCatalog,
}

/// An item that dropped from a loot trial
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LootDrop {
    pub item_id: String,
    pub amount: i32,
}

/// Everything paid out by one enemy's death
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Defeat {
    pub enemy_id: String,
    pub enemy_type: String,
    /// Successful loot trials in loot-table order
    pub drops: Vec<LootDrop>,
    pub experience: i64,
    pub currency: i64,
    pub levels_gained: i32,
}

impl Defeat {
    /// Notification for the reward slot: the first drop plus the
    /// experience. `None` when nothing dropped.
    pub fn reward(&self) -> Option<RewardEvent> {
        self.drops.first().map(|drop| RewardEvent {
            item_id: drop.item_id.clone(),
            amount: drop.amount,
            experience: self.experience,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Unknown id, already dying, or a non-positive amount
    Ignored,
    Wounded { health: i32 },
    Defeated(Defeat),
}

pub struct EncounterSpawner {
    config: SpawnerConfig,
    catalog: EnemyCatalog,
    enemies: Vec<Enemy>,
    /// NPC positions supplied by the scene
    reserved: Vec<Vec3>,
    bus: EventBus,
}

impl EncounterSpawner {
    pub fn new(config: SpawnerConfig, catalog: EnemyCatalog, bus: EventBus) -> Self {
        Self {
            config,
            catalog,
            enemies: Vec::new(),
            reserved: Vec::new(),
            bus,
        }
    }

    pub fn config(&self) -> &SpawnerConfig {
        &self.config
    }

    pub fn catalog(&self) -> &EnemyCatalog {
        &self.catalog
    }

    /// Swap the roster future spawns pick from. Live enemies are unaffected.
    pub fn set_catalog(&mut self, catalog: EnemyCatalog) {
        self.catalog = catalog;
    }

    /// Live enemies, including ones playing their death animation
    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    pub fn get(&self, enemy_id: &str) -> Option<&Enemy> {
        self.enemies.iter().find(|e| e.id == enemy_id)
    }

    /// Closest enemy that can still be fought
    pub fn nearest_alive(&self, point: Vec3) -> Option<&Enemy> {
        self.enemies
            .iter()
            .filter(|e| e.is_alive())
            .min_by(|a, b| a.ground_distance(point).total_cmp(&b.ground_distance(point)))
    }

    pub fn reserved_positions(&self) -> &[Vec3] {
        &self.reserved
    }

    /// Replace the snapshot of NPC positions spawns must avoid
    pub fn set_reserved_positions(&mut self, positions: Vec<Vec3>) {
        self.reserved = positions;
    }

    /// Run one spawn cycle
    pub fn spawn_enemy(&mut self, rng: &mut impl Rng) -> SpawnOutcome {
        if self.enemies.len() >= self.config.max_enemies {
            return SpawnOutcome::AtCapacity;
        }

        let Some(position) = self.find_spawn_position(rng) else {
            debug!(
                "No clear spawn position after {} attempts, skipping cycle",
                self.config.max_attempts
            );
            return SpawnOutcome::NoPosition;
        };

        let Some(template) = self.catalog.choose(rng) else {
            return SpawnOutcome::EmptyCatalog;
        };

        let id = new_enemy_id(rng);
        let enemy = Enemy::from_template(&id, template, position);
        info!(
            "Spawned {} ({}) at ({:.1}, {:.1}, {:.1})",
            enemy.display_name, id, position.x, position.y, position.z
        );

        self.bus.emit(EngineEvent::EnemySpawned {
            enemy_id: id.clone(),
            enemy_type: enemy.enemy_type.clone(),
            position,
        });
        self.enemies.push(enemy);
        SpawnOutcome::Spawned(id)
    }

    /// Rejection-sample a clear position, up to `max_attempts` tries
    fn find_spawn_position(&self, rng: &mut impl Rng) -> Option<Vec3> {
        (0..self.config.max_attempts)
            .map(|_| self.sample_position(rng))
            .find(|candidate| self.is_clear(*candidate))
    }

    /// Uniform sample over the spawn disc (or annulus) on the ground plane.
    ///
    /// The radius is square-root scaled so points are uniform per unit area
    /// instead of bunching up at the center.
    fn sample_position(&self, rng: &mut impl Rng) -> Vec3 {
        let outer_sq = self.config.spawn_radius * self.config.spawn_radius;
        let inner_sq = self.config.inner_radius * self.config.inner_radius;

        let angle = rng.gen_range(0.0..TAU);
        let u: f32 = rng.gen_range(0.0..1.0);
        let radius = (inner_sq + u * (outer_sq - inner_sq)).sqrt();

        Vec3::new(radius * angle.cos(), 0.0, radius * angle.sin())
    }

    /// Far enough from every NPC and every existing enemy
    pub fn is_clear(&self, position: Vec3) -> bool {
        self.reserved
            .iter()
            .all(|npc| ground_distance(position, *npc) > self.config.min_npc_distance)
            && self
                .enemies
                .iter()
                .all(|enemy| enemy.ground_distance(position) > self.config.min_enemy_distance)
    }

    /// Apply damage to an enemy. The hit that drops health to zero runs the
    /// defeat sequence; later hits on the dying enemy are ignored.
    pub fn damage_enemy(
        &mut self,
        enemy_id: &str,
        amount: i32,
        ledger: &mut Ledger,
        rng: &mut impl Rng,
    ) -> DamageOutcome {
        let Some(enemy) = self.enemies.iter_mut().find(|e| e.id == enemy_id) else {
            return DamageOutcome::Ignored;
        };
        if !enemy.is_alive() || amount <= 0 {
            return DamageOutcome::Ignored;
        }

        let killed = enemy.take_damage(amount);
        self.bus.emit(EngineEvent::EnemyDamaged {
            enemy_id: enemy.id.clone(),
            health: enemy.health,
            max_health: enemy.max_health,
        });

        if !killed {
            return DamageOutcome::Wounded {
                health: enemy.health,
            };
        }

        let enemy = enemy.clone();
        self.bus.emit(EngineEvent::EnemyDying {
            enemy_id: enemy.id.clone(),
        });
        DamageOutcome::Defeated(self.pay_out(&enemy, ledger, rng))
    }

    /// Loot trials, currency and experience for a freshly killed enemy
    fn pay_out(&self, enemy: &Enemy, ledger: &mut Ledger, rng: &mut impl Rng) -> Defeat {
        let mut drops = Vec::new();
        for entry in &enemy.loot {
            let chance = f64::from(entry.drop_chance);
            if chance.is_nan() || !rng.gen_bool(chance.clamp(0.0, 1.0)) {
                continue;
            }
            if ledger.add_item(&entry.item_id, entry.amount) {
                drops.push(LootDrop {
                    item_id: entry.item_id.clone(),
                    amount: entry.amount,
                });
            }
        }

        let currency = self
            .catalog
            .get(&enemy.enemy_type)
            .map(|template| template.roll_currency(rng))
            .unwrap_or(0);
        ledger.add_currency(currency);

        let levels_gained = ledger.grant_experience(enemy.experience);

        info!(
            "{} ({}) defeated: {} drops, +{} xp, +{} currency",
            enemy.display_name,
            enemy.id,
            drops.len(),
            enemy.experience,
            currency
        );

        Defeat {
            enemy_id: enemy.id.clone(),
            enemy_type: enemy.enemy_type.clone(),
            drops,
            experience: enemy.experience,
            currency,
            levels_gained,
        }
    }

    /// A living enemy hits the player with its damage stat. Returns the
    /// player's remaining health, or `None` if the enemy can't attack.
    pub fn strike_player(&self, enemy_id: &str, ledger: &mut Ledger) -> Option<i32> {
        let enemy = self.get(enemy_id).filter(|e| e.is_alive())?;
        let health = ledger.apply_damage(enemy.damage);
        self.bus.emit(EngineEvent::PlayerDamaged {
            enemy_id: enemy.id.clone(),
            amount: enemy.damage,
            health,
        });
        Some(health)
    }

    /// Drop an enemy from the live set. Unknown ids are a no-op.
    pub fn remove_enemy(&mut self, enemy_id: &str) -> bool {
        let Some(index) = self.enemies.iter().position(|e| e.id == enemy_id) else {
            return false;
        };
        self.enemies.remove(index);
        self.bus.emit(EngineEvent::EnemyRemoved {
            enemy_id: enemy_id.to_string(),
        });
        true
    }

    /// Clear the live set. Returns how many enemies were removed.
    pub fn despawn_all(&mut self) -> usize {
        let ids: Vec<String> = self.enemies.iter().map(|e| e.id.clone()).collect();
        for id in &ids {
            self.remove_enemy(id);
        }
        ids.len()
    }
}

/// Random v4 UUID drawn from the engine RNG so seeded sessions reproduce
fn new_enemy_id(rng: &mut impl Rng) -> String {
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes);
    uuid::Builder::from_random_bytes(bytes).into_uuid().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LevelingConfig, PlayerConfig};
    use crate::encounter::catalog::{EnemyTemplate, LootEntry};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn ledger() -> Ledger {
        Ledger::new(&PlayerConfig::default(), LevelingConfig::default(), EventBus::new())
    }

    fn spawner(config: SpawnerConfig) -> EncounterSpawner {
        EncounterSpawner::new(config, EnemyCatalog::builtin(), EventBus::new())
    }

    /// Single-type catalog with fully controlled loot
    fn dummy_catalog(loot: Vec<LootEntry>) -> EnemyCatalog {
        EnemyCatalog::new(vec![EnemyTemplate {
            id: "dummy".to_string(),
            display_name: "Training Dummy".to_string(),
            max_health: 30,
            damage: 7,
            experience: 40,
            scale: 1.0,
            currency_min: 0,
            currency_max: 0,
            loot,
        }])
    }

    fn loot(item_id: &str, drop_chance: f32, amount: i32) -> LootEntry {
        LootEntry {
            item_id: item_id.to_string(),
            drop_chance,
            amount,
        }
    }

    #[test]
    fn test_respects_cap() {
        let mut spawner = spawner(SpawnerConfig {
            max_enemies: 3,
            ..SpawnerConfig::default()
        });
        let mut rng = StdRng::seed_from_u64(5);

        for _ in 0..20 {
            spawner.spawn_enemy(&mut rng);
            assert!(spawner.enemies().len() <= 3);
        }
        assert_eq!(spawner.enemies().len(), 3);
        assert_eq!(spawner.spawn_enemy(&mut rng), SpawnOutcome::AtCapacity);
    }

    #[test]
    fn test_spawn_separation_over_many_trials() {
        let config = SpawnerConfig {
            max_enemies: 5,
            spawn_radius: 30.0,
            ..SpawnerConfig::default()
        };
        let npcs = vec![
            Vec3::ZERO,
            Vec3::new(12.0, 0.0, 5.0),
            Vec3::new(-8.0, 1.5, -14.0),
            Vec3::new(20.0, 0.0, -20.0),
        ];
        let mut rng = StdRng::seed_from_u64(1234);
        let mut spawner = spawner(config.clone());
        spawner.set_reserved_positions(npcs.clone());

        let mut accepted = 0;
        for _ in 0..1000 {
            // Start each trial from an empty field sometimes to keep spawning
            if spawner.enemies().len() >= config.max_enemies {
                spawner.despawn_all();
            }
            if let SpawnOutcome::Spawned(id) = spawner.spawn_enemy(&mut rng) {
                accepted += 1;
                let enemy = spawner.get(&id).unwrap();
                assert!(enemy.position.length() <= config.spawn_radius + 1e-3);
                for npc in &npcs {
                    assert!(enemy.ground_distance(*npc) > config.min_npc_distance);
                    assert!(enemy.position.distance(*npc) > config.min_npc_distance);
                }
                for other in spawner.enemies().iter().filter(|e| e.id != id) {
                    assert!(enemy.position.distance(other.position) > config.min_enemy_distance);
                }
            }
        }
        assert!(accepted > 500);
    }

    #[test]
    fn test_annulus_sampling() {
        let spawner = spawner(SpawnerConfig {
            inner_radius: 10.0,
            spawn_radius: 20.0,
            ..SpawnerConfig::default()
        });
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let p = spawner.sample_position(&mut rng);
            let r = p.length();
            assert!(r >= 10.0 - 1e-3 && r <= 20.0 + 1e-3);
            assert_eq!(p.y, 0.0);
        }
    }

    #[test]
    fn test_exhausted_attempts_skip_cycle() {
        let mut spawner = spawner(SpawnerConfig {
            spawn_radius: 5.0,
            min_npc_distance: 50.0,
            ..SpawnerConfig::default()
        });
        spawner.set_reserved_positions(vec![Vec3::ZERO]);
        let mut rng = StdRng::seed_from_u64(8);
        assert_eq!(spawner.spawn_enemy(&mut rng), SpawnOutcome::NoPosition);
        assert!(spawner.enemies().is_empty());
    }

    #[test]
    fn test_death_sequence_runs_once() {
        let mut spawner = EncounterSpawner::new(
            SpawnerConfig::default(),
            dummy_catalog(vec![loot("straw", 1.0, 2), loot("button", 1.0, 1)]),
            EventBus::new(),
        );
        let mut ledger = ledger();
        let mut rng = StdRng::seed_from_u64(11);

        let SpawnOutcome::Spawned(id) = spawner.spawn_enemy(&mut rng) else {
            panic!("expected spawn");
        };

        assert_eq!(
            spawner.damage_enemy(&id, 10, &mut ledger, &mut rng),
            DamageOutcome::Wounded { health: 20 }
        );

        let DamageOutcome::Defeated(defeat) = spawner.damage_enemy(&id, 25, &mut ledger, &mut rng)
        else {
            panic!("expected defeat");
        };
        assert_eq!(defeat.drops.len(), 2);
        assert_eq!(defeat.experience, 40);
        assert!(spawner.get(&id).unwrap().is_dying());

        // Re-entrant damage after death
        assert_eq!(spawner.damage_enemy(&id, 25, &mut ledger, &mut rng), DamageOutcome::Ignored);
        assert_eq!(spawner.damage_enemy(&id, 25, &mut ledger, &mut rng), DamageOutcome::Ignored);

        assert_eq!(ledger.item_count("straw"), 2);
        assert_eq!(ledger.item_count("button"), 1);
        assert_eq!(ledger.stats().experience, 40);

        // First drop is surfaced even though both went to the inventory
        let reward = defeat.reward().unwrap();
        assert_eq!(reward.item_id, "straw");
        assert_eq!(reward.amount, 2);
        assert_eq!(reward.experience, 40);
    }

    #[test]
    fn test_inverted_currency_range_still_finishes_defeat() {
        let mut catalog = dummy_catalog(vec![loot("straw", 1.0, 1)]);
        let mut template = catalog.get("dummy").unwrap().clone();
        template.currency_min = 5;
        template.currency_max = 2;
        catalog = EnemyCatalog::new(vec![template]);

        let mut spawner = EncounterSpawner::new(SpawnerConfig::default(), catalog, EventBus::new());
        let mut ledger = ledger();
        let mut rng = StdRng::seed_from_u64(12);
        let SpawnOutcome::Spawned(id) = spawner.spawn_enemy(&mut rng) else {
            panic!("expected spawn");
        };

        let DamageOutcome::Defeated(defeat) = spawner.damage_enemy(&id, 50, &mut ledger, &mut rng)
        else {
            panic!("expected defeat");
        };
        assert_eq!(defeat.currency, 0);
        assert_eq!(ledger.stats().currency, 0);
        assert_eq!(ledger.stats().experience, 40);
        assert_eq!(ledger.item_count("straw"), 1);
    }

    #[test]
    fn test_no_drops_no_reward() {
        let mut spawner = EncounterSpawner::new(
            SpawnerConfig::default(),
            dummy_catalog(vec![loot("never", 0.0, 1)]),
            EventBus::new(),
        );
        let mut ledger = ledger();
        let mut rng = StdRng::seed_from_u64(2);
        let SpawnOutcome::Spawned(id) = spawner.spawn_enemy(&mut rng) else {
            panic!("expected spawn");
        };

        let DamageOutcome::Defeated(defeat) = spawner.damage_enemy(&id, 999, &mut ledger, &mut rng)
        else {
            panic!("expected defeat");
        };
        assert!(defeat.drops.is_empty());
        assert!(defeat.reward().is_none());
        assert_eq!(ledger.stats().experience, 40);
    }

    #[test]
    fn test_unknown_and_removed_ids_ignored() {
        let mut spawner = spawner(SpawnerConfig::default());
        let mut ledger = ledger();
        let mut rng = StdRng::seed_from_u64(4);

        assert_eq!(spawner.damage_enemy("nope", 5, &mut ledger, &mut rng), DamageOutcome::Ignored);

        let SpawnOutcome::Spawned(id) = spawner.spawn_enemy(&mut rng) else {
            panic!("expected spawn");
        };
        assert!(spawner.remove_enemy(&id));
        assert!(!spawner.remove_enemy(&id));
        assert_eq!(spawner.damage_enemy(&id, 5, &mut ledger, &mut rng), DamageOutcome::Ignored);
    }

    #[test]
    fn test_strike_player() {
        let mut spawner = EncounterSpawner::new(
            SpawnerConfig::default(),
            dummy_catalog(Vec::new()),
            EventBus::new(),
        );
        let mut ledger = ledger();
        let mut rng = StdRng::seed_from_u64(6);
        let SpawnOutcome::Spawned(id) = spawner.spawn_enemy(&mut rng) else {
            panic!("expected spawn");
        };

        assert_eq!(spawner.strike_player(&id, &mut ledger), Some(93));
        spawner.damage_enemy(&id, 999, &mut ledger, &mut rng);
        // Dying enemies can't strike
        assert_eq!(spawner.strike_player(&id, &mut ledger), None);
    }

    #[test]
    fn test_enemy_ids_unique_and_seeded() {
        let ids = |seed| {
            let mut spawner = spawner(SpawnerConfig::default());
            let mut rng = StdRng::seed_from_u64(seed);
            (0..5)
                .filter_map(|_| match spawner.spawn_enemy(&mut rng) {
                    SpawnOutcome::Spawned(id) => Some(id),
                    _ => None,
                })
                .collect::<Vec<_>>()
        };
        let first = ids(77);
        assert_eq!(first, ids(77));
        let mut unique = first.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), first.len());
        assert!(first.iter().all(|id| uuid::Uuid::parse_str(id).is_ok()));
    }
}
