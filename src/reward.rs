//! Reward notification slot.
//!
//! Holds at most one reward for the UI to show. Publishing replaces the
//! current reward; clearing an empty slot is fine.

use serde::{Deserialize, Serialize};

use crate::events::{EngineEvent, EventBus};

/// Loot and experience from a defeated encounter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardEvent {
    pub item_id: String,
    pub amount: i32,
    pub experience: i64,
}

pub struct RewardSurface {
    current: Option<RewardEvent>,
    /// Bumped on every publish so a stale timeout can tell it lost the slot
    generation: u64,
    bus: EventBus,
}

impl RewardSurface {
    pub fn new(bus: EventBus) -> Self {
        Self {
            current: None,
            generation: 0,
            bus,
        }
    }

    pub fn current(&self) -> Option<&RewardEvent> {
        self.current.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Overwrite the slot. Returns the generation of the new reward.
    pub fn publish(&mut self, reward: RewardEvent) -> u64 {
        self.generation += 1;
        self.current = Some(reward.clone());
        self.bus.emit(EngineEvent::RewardPublished { reward });
        self.generation
    }

    /// Empty the slot. Returns whether anything was cleared.
    pub fn clear(&mut self) -> bool {
        if self.current.take().is_some() {
            self.bus.emit(EngineEvent::RewardCleared);
            true
        } else {
            false
        }
    }

    /// Clear only if the slot still holds the reward from `generation`
    pub fn clear_if_current(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            return false;
        }
        self.clear()
    }
}
