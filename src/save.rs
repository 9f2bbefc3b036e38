//! Save blob handed to the external persistence layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger::{InventoryEntry, PlayerStats};
use crate::quest::QuestLog;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    pub saved_at: DateTime<Utc>,
    pub stats: PlayerStats,
    pub inventory: Vec<InventoryEntry>,
    pub quest_log: QuestLog,
}

impl SaveData {
    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self).map_err(|e| format!("Failed to serialize save: {}", e))
    }

    pub fn from_json(json: &str) -> Result<Self, String> {
        let save: Self =
            serde_json::from_str(json).map_err(|e| format!("Failed to parse save: {}", e))?;
        save.quest_log.validate()?;
        Ok(save)
    }
}
