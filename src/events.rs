//! Engine Events
//!
//! Change notifications emitted by the engine's services. Renderers and UI
//! subscribe to the bus instead of polling every frame.

use glam::Vec3;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::ledger::PlayerStats;
use crate::reward::RewardEvent;

/// Buffered events per subscriber before slow readers start lagging
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Everything observable that happens inside the engine
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Any stat field changed
    StatsChanged { stats: PlayerStats },

    /// Inventory count for an item changed (0 = entry removed)
    InventoryChanged { item_id: String, amount: i32 },

    LeveledUp {
        level: i32,
        max_health: i32,
        max_energy: i32,
    },

    QuestStarted { quest_id: String },

    /// Displayed dialogue node moved
    DialogueAdvanced { quest_id: String, dialogue_index: usize },

    /// Dialogue pointer cleared
    DialogueClosed,

    QuestCompleted { quest_id: String },

    QuestFailed { quest_id: String },

    EnemySpawned {
        enemy_id: String,
        enemy_type: String,
        position: Vec3,
    },

    EnemyDamaged {
        enemy_id: String,
        health: i32,
        max_health: i32,
    },

    /// Enemy reached zero health and is playing its death animation
    EnemyDying { enemy_id: String },

    EnemyRemoved { enemy_id: String },

    PlayerDamaged {
        enemy_id: String,
        amount: i32,
        health: i32,
    },

    RewardPublished { reward: RewardEvent },

    RewardCleared,
}

impl EngineEvent {
    /// Get event type as string (for logging/debugging)
    pub fn event_type(&self) -> &'static str {
        match self {
            EngineEvent::StatsChanged { .. } => "stats_changed",
            EngineEvent::InventoryChanged { .. } => "inventory_changed",
            EngineEvent::LeveledUp { .. } => "leveled_up",
            EngineEvent::QuestStarted { .. } => "quest_started",
            EngineEvent::DialogueAdvanced { .. } => "dialogue_advanced",
            EngineEvent::DialogueClosed => "dialogue_closed",
            EngineEvent::QuestCompleted { .. } => "quest_completed",
            EngineEvent::QuestFailed { .. } => "quest_failed",
            EngineEvent::EnemySpawned { .. } => "enemy_spawned",
            EngineEvent::EnemyDamaged { .. } => "enemy_damaged",
            EngineEvent::EnemyDying { .. } => "enemy_dying",
            EngineEvent::EnemyRemoved { .. } => "enemy_removed",
            EngineEvent::PlayerDamaged { .. } => "player_damaged",
            EngineEvent::RewardPublished { .. } => "reward_published",
            EngineEvent::RewardCleared => "reward_cleared",
        }
    }
}

/// Fan-out channel shared by every engine service.
///
/// Cloning the bus shares the same channel. Emitting with no subscribers
/// is not an error; the event is simply dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: EngineEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Drain every event currently buffered for a receiver
pub fn drain(receiver: &mut broadcast::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    loop {
        match receiver.try_recv() {
            Ok(event) => events.push(event),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    events
}
