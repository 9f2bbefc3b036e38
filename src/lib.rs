//! Progression & encounter engine: quests with branching dialogue, an
//! inventory and leveling economy, and wandering enemies with loot.
//!
//! Everything runs on one thread of control. Deferred effects are queued
//! on a virtual clock that the host advances with [`Engine::advance_by`].

pub mod config;
pub mod encounter;
pub mod engine;
pub mod events;
pub mod ledger;
pub mod quest;
pub mod reward;
pub mod save;
pub mod schedule;

pub use config::EngineConfig;
pub use engine::Engine;
pub use events::{EngineEvent, EventBus};
pub use ledger::{Inventory, InventoryEntry, Ledger, PlayerStats, StatsPatch};
pub use reward::{RewardEvent, RewardSurface};
pub use save::SaveData;
