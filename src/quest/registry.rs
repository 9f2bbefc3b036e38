//! Quest Registry
//!
//! Owns quest definitions, the quest log and the dialogue cursor. Drives
//! dialogue traversal and the completion/failure transitions, applying
//! rewards through the ledger.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::definition::{
    Choice, ChoiceAction, ChoiceOutcome, CompletionCondition, DialogueNode, Quest, RawQuestFile,
};
use super::log::{QuestLog, QuestStatus};
use crate::events::{EngineEvent, EventBus};
use crate::ledger::Ledger;

/// Result of trying to start a quest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// Already in the active collection; nothing changed
    AlreadyActive,
    /// Finished before and not marked repeatable
    NotRepeatable,
    UnknownQuest,
    /// Stat thresholds or item costs not met
    RequirementsUnmet,
}

impl StartOutcome {
    pub fn is_started(&self) -> bool {
        *self == StartOutcome::Started
    }
}

/// Result of picking a dialogue choice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueOutcome {
    /// No displayed dialogue, quest not active, or no such choice
    Ignored,
    /// The choice's requirements or item hand-in are not met
    Blocked,
    Moved(usize),
    Completed,
    Failed,
}

/// Which quest and dialogue node the UI is showing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialogueCursor {
    pub quest_id: String,
    pub dialogue_index: usize,
}

/// A displayed choice and whether the player may take it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceView {
    pub index: usize,
    pub text: String,
    pub available: bool,
}

/// Registry for quest definitions and the player's quest log
pub struct QuestRegistry {
    /// Loaded quest definitions
    definitions: HashMap<String, Arc<Quest>>,
    log: QuestLog,
    cursor: Option<DialogueCursor>,
    /// Defeats counted per active defeat_enemies quest
    defeat_progress: HashMap<String, u32>,
    bus: EventBus,
}

impl QuestRegistry {
    pub fn new(bus: EventBus) -> Self {
        Self {
            definitions: HashMap::new(),
            log: QuestLog::new(),
            cursor: None,
            defeat_progress: HashMap::new(),
            bus,
        }
    }

    // ========================================================================
    // Definitions
    // ========================================================================

    /// Load all quest definitions under `<data_dir>/quests`. Files that fail
    /// to parse are logged and skipped. Returns the number loaded.
    pub fn load_from_directory(&mut self, data_dir: &Path) -> Result<usize, String> {
        let quest_dir = data_dir.join("quests");
        info!("Loading quests from {:?}", quest_dir);

        if !quest_dir.exists() {
            warn!("Quest directory does not exist: {:?}", quest_dir);
            return Ok(0);
        }

        let mut paths = Vec::new();
        collect_toml_files(&quest_dir, &mut paths)?;
        paths.sort();

        let mut count = 0;
        for path in paths {
            match load_quest_file(&path) {
                Ok(quest) => {
                    info!("Loaded quest: {} ({})", quest.title, quest.id);
                    self.register(quest);
                    count += 1;
                }
                Err(e) => warn!("Failed to load quest {:?}: {}", path, e),
            }
        }

        info!("Loaded {} quest definitions", count);
        Ok(count)
    }

    /// Add or replace a quest definition
    pub fn register(&mut self, quest: Quest) {
        if self.definitions.contains_key(&quest.id) {
            warn!("Duplicate quest ID '{}', overwriting", quest.id);
        }
        self.definitions.insert(quest.id.clone(), Arc::new(quest));
    }

    /// Get a quest definition by ID
    pub fn get(&self, quest_id: &str) -> Option<Arc<Quest>> {
        self.definitions.get(quest_id).cloned()
    }

    /// Get all quest IDs, sorted
    pub fn all_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.definitions.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn count(&self) -> usize {
        self.definitions.len()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn log(&self) -> &QuestLog {
        &self.log
    }

    pub fn status(&self, quest_id: &str) -> Option<QuestStatus> {
        self.log.status(quest_id)
    }

    pub fn cursor(&self) -> Option<&DialogueCursor> {
        self.cursor.as_ref()
    }

    /// The displayed quest and dialogue node
    pub fn current_dialogue(&self) -> Option<(&Quest, &DialogueNode)> {
        let cursor = self.cursor.as_ref()?;
        let quest = self.log.get_active(&cursor.quest_id)?;
        let node = quest.dialogue_node(cursor.dialogue_index)?;
        Some((quest, node))
    }

    /// Choices of the displayed node with their availability for `ledger`
    pub fn available_choices(&self, ledger: &Ledger) -> Vec<ChoiceView> {
        let Some((_, node)) = self.current_dialogue() else {
            return Vec::new();
        };
        node.choices
            .iter()
            .enumerate()
            .map(|(index, choice)| ChoiceView {
                index,
                text: choice.text.clone(),
                available: choice_allowed(choice, ledger),
            })
            .collect()
    }

    /// Defeats counted so far toward an active defeat_enemies quest
    pub fn defeat_progress(&self, quest_id: &str) -> u32 {
        self.defeat_progress.get(quest_id).copied().unwrap_or(0)
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Start a quest and display its first dialogue node.
    ///
    /// No-op if the quest is already active. A quest that was completed or
    /// failed may only start again when its definition is `repeatable`.
    pub fn start_quest(&mut self, quest: Quest) -> StartOutcome {
        match self.log.status(&quest.id) {
            Some(QuestStatus::Active) => return StartOutcome::AlreadyActive,
            Some(status) if !quest.repeatable => {
                debug!("Quest '{}' is {} and not repeatable", quest.id, status.as_str());
                return StartOutcome::NotRepeatable;
            }
            _ => {}
        }

        let quest_id = quest.id.clone();
        let title = quest.title.clone();
        if matches!(quest.completion, CompletionCondition::DefeatEnemies { .. }) {
            self.defeat_progress.insert(quest_id.clone(), 0);
        }
        self.log.activate(quest);
        self.set_cursor(&quest_id, 0);

        info!("Quest started: {} ({})", title, quest_id);
        self.bus.emit(EngineEvent::QuestStarted { quest_id });
        StartOutcome::Started
    }

    /// Start a registered quest by id, without requirement checks
    pub fn start_quest_by_id(&mut self, quest_id: &str) -> StartOutcome {
        match self.get(quest_id) {
            Some(quest) => self.start_quest(quest.as_ref().clone()),
            None => StartOutcome::UnknownQuest,
        }
    }

    /// Whether the player meets a registered quest's requirements, including
    /// holding its item costs
    pub fn can_accept(&self, quest_id: &str, ledger: &Ledger) -> bool {
        let Some(quest) = self.definitions.get(quest_id) else {
            return false;
        };
        quest.requirements.is_met_by(ledger.stats())
            && quest
                .requirements
                .item_costs()
                .iter()
                .all(|cost| ledger.has_item(&cost.item_id, cost.amount))
    }

    /// Gated start: check requirements, consume item costs, then start
    pub fn accept_quest(&mut self, quest_id: &str, ledger: &mut Ledger) -> StartOutcome {
        let Some(quest) = self.get(quest_id) else {
            return StartOutcome::UnknownQuest;
        };
        match self.log.status(quest_id) {
            Some(QuestStatus::Active) => return StartOutcome::AlreadyActive,
            Some(_) if !quest.repeatable => return StartOutcome::NotRepeatable,
            _ => {}
        }
        if !self.can_accept(quest_id, ledger) {
            debug!("Requirements not met for quest '{}'", quest_id);
            return StartOutcome::RequirementsUnmet;
        }

        let costs = quest.requirements.item_costs();
        for (paid, cost) in costs.iter().enumerate() {
            if !ledger.remove_item(&cost.item_id, cost.amount) {
                // Refund what was already taken so acceptance is all or nothing
                warn!(
                    "Quest '{}' cost {} x{} could not be paid",
                    quest_id, cost.item_id, cost.amount
                );
                for refund in &costs[..paid] {
                    ledger.add_item(&refund.item_id, refund.amount);
                }
                return StartOutcome::RequirementsUnmet;
            }
        }
        self.start_quest(quest.as_ref().clone())
    }

    /// Take a choice on the displayed dialogue node
    pub fn advance_dialogue(
        &mut self,
        choice_index: usize,
        ledger: &mut Ledger,
    ) -> DialogueOutcome {
        let Some(cursor) = self.cursor.clone() else {
            return DialogueOutcome::Ignored;
        };
        let Some(choice) = self
            .log
            .get_active(&cursor.quest_id)
            .and_then(|quest| quest.dialogue_node(cursor.dialogue_index))
            .and_then(|node| node.choices.get(choice_index))
            .cloned()
        else {
            return DialogueOutcome::Ignored;
        };

        if !choice_allowed(&choice, ledger) {
            debug!(
                "Choice {} on quest '{}' dialogue {} is gated",
                choice_index, cursor.quest_id, cursor.dialogue_index
            );
            return DialogueOutcome::Blocked;
        }

        if let Some(action) = &choice.action {
            apply_action(action, ledger);
        }

        match choice.outcome {
            ChoiceOutcome::Goto(index) => {
                self.set_cursor(&cursor.quest_id, index);
                DialogueOutcome::Moved(index)
            }
            ChoiceOutcome::Complete => {
                self.complete_quest(&cursor.quest_id, ledger);
                DialogueOutcome::Completed
            }
            ChoiceOutcome::Fail => {
                self.fail_quest(&cursor.quest_id);
                DialogueOutcome::Failed
            }
        }
    }

    /// Complete an active quest and pay out its rewards. Returns false if
    /// the quest is not active.
    pub fn complete_quest(&mut self, quest_id: &str, ledger: &mut Ledger) -> bool {
        let Some(done) = self.log.complete(quest_id) else {
            return false;
        };
        self.defeat_progress.remove(quest_id);

        let rewards = &done.rewards;
        ledger.grant_experience(rewards.experience);
        ledger.add_currency(rewards.currency);
        ledger.restore_energy(rewards.energy);
        for item in &rewards.items {
            ledger.add_item(&item.item_id, item.amount);
        }

        self.clear_cursor_for(quest_id);
        info!(
            "Quest completed: {} ({}) +{} xp +{} currency",
            done.title, quest_id, rewards.experience, rewards.currency
        );
        self.bus.emit(EngineEvent::QuestCompleted {
            quest_id: quest_id.to_string(),
        });
        true
    }

    /// Fail an active quest. No rewards are applied and nothing is taken
    /// back. Returns false if the quest is not active.
    pub fn fail_quest(&mut self, quest_id: &str) -> bool {
        let Some(failed) = self.log.fail(quest_id) else {
            return false;
        };
        self.defeat_progress.remove(quest_id);

        self.clear_cursor_for(quest_id);
        info!("Quest failed: {} ({})", failed.title, quest_id);
        self.bus.emit(EngineEvent::QuestFailed {
            quest_id: quest_id.to_string(),
        });
        true
    }

    /// Re-display an active quest from its first dialogue node
    pub fn open_dialogue(&mut self, quest_id: &str) -> bool {
        if !self.log.is_active(quest_id) {
            return false;
        }
        self.set_cursor(quest_id, 0);
        true
    }

    /// Hide the dialogue without touching quest state
    pub fn close_dialogue(&mut self) {
        if self.cursor.take().is_some() {
            self.bus.emit(EngineEvent::DialogueClosed);
        }
    }

    // ========================================================================
    // External completion conditions
    // ========================================================================

    /// Complete every active collect_items quest whose items are all held.
    /// Reward items can satisfy further quests, so this repeats until stable.
    pub fn check_collect_conditions(&mut self, ledger: &mut Ledger) -> Vec<String> {
        let mut completed = Vec::new();
        loop {
            let ready = self.log.active().iter().find_map(|quest| match &quest.completion {
                CompletionCondition::CollectItems { items }
                    if items
                        .iter()
                        .all(|item| ledger.has_item(&item.item_id, item.amount)) =>
                {
                    Some(quest.id.clone())
                }
                _ => None,
            });

            match ready {
                Some(quest_id) => {
                    self.complete_quest(&quest_id, ledger);
                    completed.push(quest_id);
                }
                None => break,
            }
        }
        completed
    }

    /// Count a defeat toward matching defeat_enemies quests, completing any
    /// that reach their count
    pub fn record_enemy_defeat(&mut self, enemy_type: &str, ledger: &mut Ledger) -> Vec<String> {
        let mut ready = Vec::new();
        for quest in self.log.active() {
            let CompletionCondition::DefeatEnemies { enemy_type: target, count } = &quest.completion
            else {
                continue;
            };
            if target.as_deref().is_some_and(|t| t != enemy_type) {
                continue;
            }

            let progress = self.defeat_progress.entry(quest.id.clone()).or_insert(0);
            *progress += 1;
            debug!("Quest '{}' defeats: {}/{}", quest.id, progress, count);
            if *progress >= *count {
                ready.push(quest.id.clone());
            }
        }

        for quest_id in &ready {
            self.complete_quest(quest_id, ledger);
        }
        ready
    }

    /// Complete active reach_location quests targeting `location`
    pub fn reach_location(&mut self, location: &str, ledger: &mut Ledger) -> Vec<String> {
        let ready: Vec<String> = self
            .log
            .active()
            .iter()
            .filter(|quest| {
                matches!(&quest.completion,
                    CompletionCondition::ReachLocation { location: target } if target == location)
            })
            .map(|quest| quest.id.clone())
            .collect();

        for quest_id in &ready {
            self.complete_quest(quest_id, ledger);
        }
        ready
    }

    /// Replace the quest log wholesale (save restore)
    pub(crate) fn restore_log(&mut self, log: QuestLog) -> Result<(), String> {
        log.validate()?;
        self.defeat_progress = log
            .active()
            .iter()
            .filter(|q| matches!(q.completion, CompletionCondition::DefeatEnemies { .. }))
            .map(|q| (q.id.clone(), 0))
            .collect();
        self.log = log;
        self.cursor = None;
        Ok(())
    }

    fn set_cursor(&mut self, quest_id: &str, dialogue_index: usize) {
        self.cursor = Some(DialogueCursor {
            quest_id: quest_id.to_string(),
            dialogue_index,
        });
        self.bus.emit(EngineEvent::DialogueAdvanced {
            quest_id: quest_id.to_string(),
            dialogue_index,
        });
    }

    /// Clear the cursor if it points at `quest_id`
    fn clear_cursor_for(&mut self, quest_id: &str) {
        if self.cursor.as_ref().is_some_and(|c| c.quest_id == quest_id) {
            self.close_dialogue();
        }
    }
}

/// Gating check for a choice: stat requirements plus any item hand-in
fn choice_allowed(choice: &Choice, ledger: &Ledger) -> bool {
    if !choice.is_available(ledger.stats()) {
        return false;
    }
    match &choice.action {
        Some(ChoiceAction::TakeItem { item_id, amount }) => ledger.has_item(item_id, *amount),
        _ => true,
    }
}

fn apply_action(action: &ChoiceAction, ledger: &mut Ledger) {
    match action {
        ChoiceAction::GrantItem { item_id, amount } => {
            ledger.add_item(item_id, *amount);
        }
        ChoiceAction::TakeItem { item_id, amount } => {
            ledger.remove_item(item_id, *amount);
        }
        ChoiceAction::GrantCurrency { amount } => {
            ledger.add_currency(*amount);
        }
        ChoiceAction::RestoreEnergy { amount } => {
            ledger.restore_energy(*amount);
        }
    }
}

fn collect_toml_files(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<(), String> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| format!("Failed to read directory {:?}: {}", dir, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| format!("Failed to read entry: {}", e))?;
        let path = entry.path();

        if path.is_dir() {
            collect_toml_files(&path, paths)?;
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            paths.push(path);
        }
    }

    Ok(())
}

fn load_quest_file(path: &Path) -> Result<Quest, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {:?}: {}", path, e))?;

    let raw: RawQuestFile = toml::from_str(&content)
        .map_err(|e| format!("Failed to parse {:?}: {}", path, e))?;

    Quest::from_raw(&raw.quest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LevelingConfig, PlayerConfig};
    use crate::events::drain;
    use crate::ledger::StatsPatch;
    use crate::quest::definition::{ItemStack, Requirements, Rewards};
    use tempfile::TempDir;

    fn ledger() -> Ledger {
        Ledger::new(&PlayerConfig::default(), LevelingConfig::default(), EventBus::new())
    }

    fn choice(text: &str, outcome: ChoiceOutcome) -> Choice {
        Choice {
            text: text.to_string(),
            requirements: None,
            outcome,
            action: None,
        }
    }

    fn node(id: usize, choices: Vec<Choice>) -> DialogueNode {
        DialogueNode {
            id,
            speaker: "Elder".to_string(),
            text: format!("line {}", id),
            choices,
        }
    }

    /// Two-node quest: 0 -> 1 -> complete, with a fail branch on node 0
    fn quest(id: &str) -> Quest {
        Quest {
            id: id.to_string(),
            title: format!("Quest {}", id),
            description: String::new(),
            repeatable: false,
            time_limit_ms: None,
            requirements: Requirements::default(),
            rewards: Rewards {
                experience: 100,
                currency: 50,
                energy: 0,
                items: vec![ItemStack::new("oak_log", 2)],
            },
            dialogue: vec![
                node(
                    0,
                    vec![
                        choice("continue", ChoiceOutcome::Goto(1)),
                        choice("refuse", ChoiceOutcome::Fail),
                    ],
                ),
                node(1, vec![choice("done", ChoiceOutcome::Complete)]),
            ],
            completion: CompletionCondition::Dialogue,
            completed: false,
        }
    }

    fn membership(registry: &QuestRegistry, quest_id: &str) -> usize {
        let log = registry.log();
        [log.active(), log.completed(), log.failed()]
            .iter()
            .filter(|set| set.iter().any(|q| q.id == quest_id))
            .count()
    }

    #[test]
    fn test_start_and_complete_with_rewards() {
        let mut registry = QuestRegistry::new(EventBus::new());
        let mut ledger = ledger();

        assert_eq!(registry.start_quest(quest("q")), StartOutcome::Started);
        assert_eq!(registry.status("q"), Some(QuestStatus::Active));
        assert_eq!(
            registry.cursor(),
            Some(&DialogueCursor { quest_id: "q".to_string(), dialogue_index: 0 })
        );

        assert!(registry.complete_quest("q", &mut ledger));
        assert_eq!(registry.status("q"), Some(QuestStatus::Completed));
        assert!(registry.log().completed()[0].completed);
        assert_eq!(membership(&registry, "q"), 1);
        assert!(registry.cursor().is_none());

        assert_eq!(ledger.stats().experience, 100);
        assert_eq!(ledger.stats().currency, 50);
        assert_eq!(ledger.item_count("oak_log"), 2);

        // Completing twice pays nothing
        assert!(!registry.complete_quest("q", &mut ledger));
        assert_eq!(ledger.stats().currency, 50);
    }

    #[test]
    fn test_start_is_noop_when_active() {
        let mut registry = QuestRegistry::new(EventBus::new());
        let mut ledger = ledger();
        registry.start_quest(quest("q"));
        registry.advance_dialogue(0, &mut ledger);

        assert_eq!(registry.start_quest(quest("q")), StartOutcome::AlreadyActive);
        assert_eq!(registry.log().active().len(), 1);
        // Cursor was not reset
        assert_eq!(registry.cursor().unwrap().dialogue_index, 1);
    }

    #[test]
    fn test_dialogue_traversal_completes() {
        let mut registry = QuestRegistry::new(EventBus::new());
        let mut ledger = ledger();
        registry.start_quest(quest("q"));

        assert_eq!(registry.advance_dialogue(0, &mut ledger), DialogueOutcome::Moved(1));
        assert_eq!(registry.current_dialogue().unwrap().1.id, 1);
        assert_eq!(registry.advance_dialogue(0, &mut ledger), DialogueOutcome::Completed);
        assert_eq!(registry.status("q"), Some(QuestStatus::Completed));
        assert_eq!(ledger.stats().level, 2);

        // Nothing displayed anymore
        assert_eq!(registry.advance_dialogue(0, &mut ledger), DialogueOutcome::Ignored);
    }

    #[test]
    fn test_fail_choice() {
        let mut registry = QuestRegistry::new(EventBus::new());
        let mut ledger = ledger();
        registry.start_quest(quest("q"));

        assert_eq!(registry.advance_dialogue(1, &mut ledger), DialogueOutcome::Failed);
        assert_eq!(registry.status("q"), Some(QuestStatus::Failed));
        assert!(!registry.log().failed()[0].completed);
        assert_eq!(ledger.stats().experience, 0);
        assert_eq!(membership(&registry, "q"), 1);
    }

    #[test]
    fn test_gated_choice_is_inert() {
        let mut registry = QuestRegistry::new(EventBus::new());
        let mut ledger = ledger();

        let mut gated = quest("gated");
        gated.dialogue[0].choices[0].requirements = Some(Requirements {
            level: Some(5),
            ..Requirements::default()
        });
        registry.start_quest(gated);

        for _ in 0..3 {
            assert_eq!(registry.advance_dialogue(0, &mut ledger), DialogueOutcome::Blocked);
            assert_eq!(registry.cursor().unwrap().dialogue_index, 0);
        }

        let views = registry.available_choices(&ledger);
        assert!(!views[0].available);
        assert!(views[1].available);

        ledger.update_stats(&StatsPatch { level: Some(5), ..StatsPatch::default() });
        assert_eq!(registry.advance_dialogue(0, &mut ledger), DialogueOutcome::Moved(1));
    }

    #[test]
    fn test_take_item_choice_requires_items() {
        let mut registry = QuestRegistry::new(EventBus::new());
        let mut ledger = ledger();

        let mut handin = quest("handin");
        handin.dialogue[1].choices[0].action = Some(ChoiceAction::TakeItem {
            item_id: "goblin_ear".to_string(),
            amount: 2,
        });
        registry.start_quest(handin);
        registry.advance_dialogue(0, &mut ledger);

        ledger.add_item("goblin_ear", 1);
        assert_eq!(registry.advance_dialogue(0, &mut ledger), DialogueOutcome::Blocked);
        assert_eq!(ledger.item_count("goblin_ear"), 1);

        ledger.add_item("goblin_ear", 1);
        assert_eq!(registry.advance_dialogue(0, &mut ledger), DialogueOutcome::Completed);
        assert_eq!(ledger.item_count("goblin_ear"), 0);
    }

    #[test]
    fn test_invalid_choice_index_ignored() {
        let mut registry = QuestRegistry::new(EventBus::new());
        let mut ledger = ledger();
        registry.start_quest(quest("q"));
        assert_eq!(registry.advance_dialogue(9, &mut ledger), DialogueOutcome::Ignored);
    }

    #[test]
    fn test_advance_on_inactive_quest_is_noop() {
        let mut registry = QuestRegistry::new(EventBus::new());
        let mut ledger = ledger();
        registry.start_quest(quest("a"));
        registry.start_quest(quest("b"));
        // Cursor now on b; fail it externally while displayed elsewhere
        registry.open_dialogue("a");
        assert!(registry.fail_quest("a"));
        assert!(registry.cursor().is_none());
        assert_eq!(registry.advance_dialogue(0, &mut ledger), DialogueOutcome::Ignored);
        assert_eq!(registry.status("b"), Some(QuestStatus::Active));
    }

    #[test]
    fn test_repeat_policy() {
        let mut registry = QuestRegistry::new(EventBus::new());
        let mut ledger = ledger();

        registry.start_quest(quest("once"));
        registry.complete_quest("once", &mut ledger);
        assert_eq!(registry.start_quest(quest("once")), StartOutcome::NotRepeatable);

        let mut daily = quest("daily");
        daily.repeatable = true;
        registry.start_quest(daily.clone());
        registry.fail_quest("daily");
        assert_eq!(registry.start_quest(daily), StartOutcome::Started);
        assert_eq!(membership(&registry, "daily"), 1);
        assert_eq!(registry.status("daily"), Some(QuestStatus::Active));
    }

    #[test]
    fn test_accept_consumes_item_costs() {
        let mut registry = QuestRegistry::new(EventBus::new());
        let mut ledger = ledger();

        let mut costly = quest("costly");
        costly.requirements = Requirements {
            level: Some(1),
            currency: Some(10),
            items: vec![ItemStack::new("map_fragment", 2)],
            ..Requirements::default()
        };
        registry.register(costly);

        assert_eq!(registry.accept_quest("costly", &mut ledger), StartOutcome::RequirementsUnmet);

        ledger.add_currency(10);
        ledger.add_item("map_fragment", 2);
        assert!(registry.can_accept("costly", &ledger));
        assert_eq!(registry.accept_quest("costly", &mut ledger), StartOutcome::Started);
        assert_eq!(ledger.item_count("map_fragment"), 0);
        // Currency is a threshold, not a cost
        assert_eq!(ledger.stats().currency, 10);

        assert_eq!(registry.accept_quest("missing", &mut ledger), StartOutcome::UnknownQuest);
    }

    #[test]
    fn test_repeated_cost_ids_are_totalled() {
        let mut registry = QuestRegistry::new(EventBus::new());
        let mut ledger = ledger();

        let mut dup = quest("dup");
        dup.requirements.items = vec![ItemStack::new("gem", 2), ItemStack::new("gem", 2)];
        registry.register(dup);

        ledger.add_item("gem", 3);
        assert!(!registry.can_accept("dup", &ledger));
        assert_eq!(registry.accept_quest("dup", &mut ledger), StartOutcome::RequirementsUnmet);
        assert_eq!(ledger.item_count("gem"), 3);
        assert_eq!(registry.status("dup"), None);

        ledger.add_item("gem", 1);
        assert_eq!(registry.accept_quest("dup", &mut ledger), StartOutcome::Started);
        assert_eq!(ledger.item_count("gem"), 0);
    }

    #[test]
    fn test_completing_background_quest_keeps_displayed_dialogue() {
        let mut registry = QuestRegistry::new(EventBus::new());
        let mut ledger = ledger();
        registry.start_quest(quest("a"));
        registry.start_quest(quest("b"));
        registry.advance_dialogue(0, &mut ledger);

        assert!(registry.complete_quest("a", &mut ledger));
        assert_eq!(
            registry.cursor(),
            Some(&DialogueCursor { quest_id: "b".to_string(), dialogue_index: 1 })
        );
        assert_eq!(registry.current_dialogue().unwrap().0.id, "b");

        assert!(registry.fail_quest("b"));
        assert!(registry.cursor().is_none());
    }

    #[test]
    fn test_partition_holds_over_random_transitions() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let ids = ["a", "b", "c"];
        let mut rng = StdRng::seed_from_u64(2024);
        let mut registry = QuestRegistry::new(EventBus::new());
        let mut ledger = ledger();

        for _ in 0..2000 {
            let id = ids[rng.gen_range(0..ids.len())];
            match rng.gen_range(0..6) {
                0 => {
                    let mut q = quest(id);
                    q.repeatable = id != "a";
                    registry.start_quest(q);
                }
                1 => {
                    registry.advance_dialogue(rng.gen_range(0..3), &mut ledger);
                }
                2 => {
                    registry.complete_quest(id, &mut ledger);
                }
                3 => {
                    registry.fail_quest(id);
                }
                4 => {
                    registry.open_dialogue(id);
                }
                _ => registry.close_dialogue(),
            }

            for id in ids {
                assert!(membership(&registry, id) <= 1);
            }
            assert!(registry.log().validate().is_ok());
            if let Some(cursor) = registry.cursor() {
                assert_eq!(registry.status(&cursor.quest_id), Some(QuestStatus::Active));
            }
        }
    }

    #[test]
    fn test_collect_condition() {
        let mut registry = QuestRegistry::new(EventBus::new());
        let mut ledger = ledger();

        let mut gather = quest("gather");
        gather.completion = CompletionCondition::CollectItems {
            items: vec![ItemStack::new("herb", 3)],
        };
        registry.start_quest(gather);

        ledger.add_item("herb", 2);
        assert!(registry.check_collect_conditions(&mut ledger).is_empty());

        ledger.add_item("herb", 1);
        assert_eq!(registry.check_collect_conditions(&mut ledger), vec!["gather".to_string()]);
        assert_eq!(registry.status("gather"), Some(QuestStatus::Completed));
    }

    #[test]
    fn test_defeat_condition() {
        let mut registry = QuestRegistry::new(EventBus::new());
        let mut ledger = ledger();

        let mut hunt = quest("hunt");
        hunt.completion = CompletionCondition::DefeatEnemies {
            enemy_type: Some("goblin".to_string()),
            count: 2,
        };
        registry.start_quest(hunt);

        assert!(registry.record_enemy_defeat("wolf", &mut ledger).is_empty());
        assert!(registry.record_enemy_defeat("goblin", &mut ledger).is_empty());
        assert_eq!(registry.defeat_progress("hunt"), 1);
        assert_eq!(registry.record_enemy_defeat("goblin", &mut ledger), vec!["hunt".to_string()]);
        assert_eq!(registry.status("hunt"), Some(QuestStatus::Completed));
        assert_eq!(registry.defeat_progress("hunt"), 0);
    }

    #[test]
    fn test_location_condition() {
        let mut registry = QuestRegistry::new(EventBus::new());
        let mut ledger = ledger();

        let mut travel = quest("travel");
        travel.completion = CompletionCondition::ReachLocation {
            location: "old_mill".to_string(),
        };
        registry.start_quest(travel);

        assert!(registry.reach_location("tavern", &mut ledger).is_empty());
        assert_eq!(registry.reach_location("old_mill", &mut ledger), vec!["travel".to_string()]);
    }

    #[test]
    fn test_events_emitted() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let mut registry = QuestRegistry::new(bus);
        let mut ledger = ledger();

        registry.start_quest(quest("q"));
        registry.complete_quest("q", &mut ledger);

        let kinds: Vec<&str> = drain(&mut rx).iter().map(|e| e.event_type()).collect();
        assert_eq!(
            kinds,
            vec!["dialogue_advanced", "quest_started", "dialogue_closed", "quest_completed"]
        );
    }

    #[test]
    fn test_load_quests() {
        let temp_dir = TempDir::new().unwrap();
        let quest_dir = temp_dir.path().join("quests").join("village");
        std::fs::create_dir_all(&quest_dir).unwrap();

        std::fs::write(
            quest_dir.join("greeting.toml"),
            r#"
[quest]
id = "greeting"
title = "Say Hello"

[quest.rewards]
experience = 50

[[quest.dialogue]]
speaker = "Elder"
text = "Welcome, traveler."
choices = [{ text = "Thanks!" }]
"#,
        )
        .unwrap();
        std::fs::write(quest_dir.join("broken.toml"), "[quest]\nid = 3").unwrap();

        let mut registry = QuestRegistry::new(EventBus::new());
        let count = registry.load_from_directory(temp_dir.path()).unwrap();

        assert_eq!(count, 1);
        let quest = registry.get("greeting").unwrap();
        assert_eq!(quest.rewards.experience, 50);
        assert_eq!(quest.dialogue[0].choices[0].outcome, ChoiceOutcome::Complete);
    }

    #[test]
    fn test_missing_quest_dir() {
        let temp_dir = TempDir::new().unwrap();
        let mut registry = QuestRegistry::new(EventBus::new());
        assert_eq!(registry.load_from_directory(temp_dir.path()).unwrap(), 0);
    }
}
