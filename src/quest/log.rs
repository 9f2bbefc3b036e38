//! Quest Log
//!
//! The active/completed/failed partition. A quest id lives in at most one
//! of the three collections; every mutator here preserves that.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::definition::Quest;

/// Where a started quest currently sits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestStatus {
    Active,
    Completed,
    Failed,
}

impl QuestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestStatus::Active => "active",
            QuestStatus::Completed => "completed",
            QuestStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, QuestStatus::Completed | QuestStatus::Failed)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestLog {
    active: Vec<Quest>,
    completed: Vec<Quest>,
    failed: Vec<Quest>,
}

impl QuestLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> &[Quest] {
        &self.active
    }

    pub fn completed(&self) -> &[Quest] {
        &self.completed
    }

    pub fn failed(&self) -> &[Quest] {
        &self.failed
    }

    pub fn status(&self, quest_id: &str) -> Option<QuestStatus> {
        if self.is_active(quest_id) {
            Some(QuestStatus::Active)
        } else if self.completed.iter().any(|q| q.id == quest_id) {
            Some(QuestStatus::Completed)
        } else if self.failed.iter().any(|q| q.id == quest_id) {
            Some(QuestStatus::Failed)
        } else {
            None
        }
    }

    pub fn is_active(&self, quest_id: &str) -> bool {
        self.active.iter().any(|q| q.id == quest_id)
    }

    pub fn get_active(&self, quest_id: &str) -> Option<&Quest> {
        self.active.iter().find(|q| q.id == quest_id)
    }

    /// Insert into active, pulling the id out of completed/failed first.
    /// Returns false if already active.
    pub(crate) fn activate(&mut self, quest: Quest) -> bool {
        if self.is_active(&quest.id) {
            return false;
        }
        self.completed.retain(|q| q.id != quest.id);
        self.failed.retain(|q| q.id != quest.id);
        self.active.push(Quest {
            completed: false,
            ..quest
        });
        true
    }

    /// Move an active quest to completed, returning the completed copy
    pub(crate) fn complete(&mut self, quest_id: &str) -> Option<Quest> {
        let quest = self.take_active(quest_id)?;
        let done = quest.completed_copy();
        self.completed.push(done.clone());
        Some(done)
    }

    /// Move an active quest to failed unmodified
    pub(crate) fn fail(&mut self, quest_id: &str) -> Option<Quest> {
        let quest = self.take_active(quest_id)?;
        self.failed.push(quest.clone());
        Some(quest)
    }

    fn take_active(&mut self, quest_id: &str) -> Option<Quest> {
        let index = self.active.iter().position(|q| q.id == quest_id)?;
        Some(self.active.remove(index))
    }

    /// Check that no id appears twice across (or within) the collections
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for quest in self.active.iter().chain(&self.completed).chain(&self.failed) {
            if !seen.insert(quest.id.as_str()) {
                return Err(format!("Quest '{}' appears more than once in the log", quest.id));
            }
        }
        Ok(())
    }
}
