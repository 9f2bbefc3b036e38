//! Encounter System Module
//!
//! Enemy templates, live enemies and the spawner that places them and
//! pays out their loot.

pub mod catalog;
pub mod enemy;
pub mod spawner;

pub use catalog::{EnemyCatalog, EnemyTemplate, LootEntry};
pub use enemy::{Enemy, EnemyState};
pub use spawner::{DamageOutcome, Defeat, EncounterSpawner, LootDrop, SpawnOutcome};
