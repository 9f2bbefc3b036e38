//! Progression Engine
//!
//! Composes the ledger, quest registry, encounter spawner and reward slot
//! behind one command surface, and owns the virtual clock that drives
//! every deferred effect: enemy removal after the death animation, reward
//! display timeouts, quest time limits and the periodic spawn cycle.

use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;
use glam::Vec3;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::encounter::{DamageOutcome, EncounterSpawner, Enemy, EnemyCatalog, SpawnOutcome};
use crate::events::{EngineEvent, EventBus};
use crate::ledger::{Inventory, Ledger, PlayerStats, StatsPatch};
use crate::quest::{
    ChoiceView, DialogueNode, DialogueOutcome, Quest, QuestLog, QuestRegistry, StartOutcome,
};
use crate::reward::{RewardEvent, RewardSurface};
use crate::save::SaveData;
use crate::schedule::{Scheduler, TaskHandle};

/// Effects that fire later on the virtual clock
#[derive(Debug, Clone, PartialEq, Eq)]
enum DeferredTask {
    RemoveEnemy { enemy_id: String },
    ClearReward { generation: u64 },
    QuestDeadline { quest_id: String },
    SpawnCycle,
}

pub struct Engine {
    config: EngineConfig,
    ledger: Ledger,
    quests: QuestRegistry,
    spawner: EncounterSpawner,
    rewards: RewardSurface,
    scheduler: Scheduler<DeferredTask>,
    bus: EventBus,
    rng: StdRng,
    /// Live deadline per timed quest; a firing deadline must match its entry
    deadlines: HashMap<String, TaskHandle>,
    reward_clear: Option<TaskHandle>,
}

impl Engine {
    /// Build an engine, seeding from `session.seed` when set
    pub fn new(config: EngineConfig) -> Self {
        let rng = match config.session.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }

    pub fn with_seed(config: EngineConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: EngineConfig, rng: StdRng) -> Self {
        let bus = EventBus::new();
        let ledger = Ledger::new(&config.player, config.leveling.clone(), bus.clone());
        let quests = QuestRegistry::new(bus.clone());
        let mut spawner =
            EncounterSpawner::new(config.spawner.clone(), EnemyCatalog::builtin(), bus.clone());
        spawner.set_reserved_positions(
            config
                .session
                .reserved_positions
                .iter()
                .map(|p| Vec3::from_array(*p))
                .collect(),
        );
        let rewards = RewardSurface::new(bus.clone());

        let mut engine = Self {
            config,
            ledger,
            quests,
            spawner,
            rewards,
            scheduler: Scheduler::new(),
            bus,
            rng,
            deadlines: HashMap::new(),
            reward_clear: None,
        };
        engine.schedule_spawn_cycle();
        engine
    }

    /// Load quests and the enemy catalog from a content directory. Returns
    /// the number of quests loaded.
    pub fn load_content(&mut self, data_dir: &Path) -> Result<usize, String> {
        let count = self.quests.load_from_directory(data_dir)?;
        self.spawner.set_catalog(EnemyCatalog::load_or_builtin(data_dir));
        info!(
            "Content ready: {} quests, {} enemy types",
            count,
            self.spawner.catalog().len()
        );
        Ok(count)
    }

    pub fn register_quest(&mut self, quest: Quest) {
        self.quests.register(quest);
    }

    pub fn set_enemy_catalog(&mut self, catalog: EnemyCatalog) {
        self.spawner.set_catalog(catalog);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.bus.subscribe()
    }

    pub fn now_ms(&self) -> u64 {
        self.scheduler.now_ms()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn stats(&self) -> &PlayerStats {
        self.ledger.stats()
    }

    pub fn inventory(&self) -> &Inventory {
        self.ledger.inventory()
    }

    pub fn has_item(&self, item_id: &str, amount: i32) -> bool {
        self.ledger.has_item(item_id, amount)
    }

    pub fn item_count(&self, item_id: &str) -> i32 {
        self.ledger.item_count(item_id)
    }

    pub fn quests(&self) -> &QuestRegistry {
        &self.quests
    }

    pub fn quest_log(&self) -> &QuestLog {
        self.quests.log()
    }

    /// Displayed quest and dialogue node, if any
    pub fn current_dialogue(&self) -> Option<(&Quest, &DialogueNode)> {
        self.quests.current_dialogue()
    }

    pub fn available_choices(&self) -> Vec<ChoiceView> {
        self.quests.available_choices(&self.ledger)
    }

    pub fn can_accept(&self, quest_id: &str) -> bool {
        self.quests.can_accept(quest_id, &self.ledger)
    }

    pub fn enemies(&self) -> &[Enemy] {
        self.spawner.enemies()
    }

    pub fn enemy(&self, enemy_id: &str) -> Option<&Enemy> {
        self.spawner.get(enemy_id)
    }

    pub fn nearest_enemy(&self, point: Vec3) -> Option<&Enemy> {
        self.spawner.nearest_alive(point)
    }

    pub fn reward(&self) -> Option<&RewardEvent> {
        self.rewards.current()
    }

    // ========================================================================
    // Quest commands
    // ========================================================================

    /// Start a quest without requirement checks
    pub fn start_quest(&mut self, quest: Quest) -> StartOutcome {
        let time_limit = quest.time_limit_ms;
        let quest_id = quest.id.clone();
        let outcome = self.quests.start_quest(quest);
        if outcome.is_started() {
            self.arm_deadline(&quest_id, time_limit);
            self.after_quest_change();
        }
        outcome
    }

    pub fn start_quest_by_id(&mut self, quest_id: &str) -> StartOutcome {
        match self.quests.get(quest_id) {
            Some(quest) => self.start_quest(quest.as_ref().clone()),
            None => StartOutcome::UnknownQuest,
        }
    }

    /// Requirement-gated start that consumes item costs
    pub fn accept_quest(&mut self, quest_id: &str) -> StartOutcome {
        let outcome = self.quests.accept_quest(quest_id, &mut self.ledger);
        if outcome.is_started() {
            let time_limit = self.quests.get(quest_id).and_then(|q| q.time_limit_ms);
            self.arm_deadline(quest_id, time_limit);
            self.after_quest_change();
        }
        outcome
    }

    pub fn advance_dialogue(&mut self, choice_index: usize) -> DialogueOutcome {
        let outcome = self.quests.advance_dialogue(choice_index, &mut self.ledger);
        if outcome != DialogueOutcome::Ignored && outcome != DialogueOutcome::Blocked {
            self.after_quest_change();
        }
        outcome
    }

    pub fn complete_quest(&mut self, quest_id: &str) -> bool {
        let completed = self.quests.complete_quest(quest_id, &mut self.ledger);
        if completed {
            self.after_quest_change();
        }
        completed
    }

    pub fn fail_quest(&mut self, quest_id: &str) -> bool {
        let failed = self.quests.fail_quest(quest_id);
        if failed {
            self.disarm_finished_deadlines();
        }
        failed
    }

    pub fn open_dialogue(&mut self, quest_id: &str) -> bool {
        self.quests.open_dialogue(quest_id)
    }

    pub fn close_dialogue(&mut self) {
        self.quests.close_dialogue();
    }

    /// Location trigger from the scene. Returns the quests it completed.
    pub fn reach_location(&mut self, location: &str) -> Vec<String> {
        let completed = self.quests.reach_location(location, &mut self.ledger);
        if !completed.is_empty() {
            self.after_quest_change();
        }
        completed
    }

    // ========================================================================
    // Ledger commands
    // ========================================================================

    pub fn update_stats(&mut self, patch: &StatsPatch) {
        self.ledger.update_stats(patch);
    }

    pub fn add_item(&mut self, item_id: &str, amount: i32) -> bool {
        let added = self.ledger.add_item(item_id, amount);
        if added {
            self.after_quest_change();
        }
        added
    }

    pub fn remove_item(&mut self, item_id: &str, amount: i32) -> bool {
        self.ledger.remove_item(item_id, amount)
    }

    pub fn grant_experience(&mut self, amount: i64) -> i32 {
        self.ledger.grant_experience(amount)
    }

    // ========================================================================
    // Encounter commands
    // ========================================================================

    pub fn spawn_enemy(&mut self) -> SpawnOutcome {
        self.spawner.spawn_enemy(&mut self.rng)
    }

    pub fn damage_enemy(&mut self, enemy_id: &str, amount: i32) -> DamageOutcome {
        let outcome = self
            .spawner
            .damage_enemy(enemy_id, amount, &mut self.ledger, &mut self.rng);

        if let DamageOutcome::Defeated(defeat) = &outcome {
            self.scheduler.schedule_in(
                self.config.spawner.death_delay_ms,
                DeferredTask::RemoveEnemy {
                    enemy_id: defeat.enemy_id.clone(),
                },
            );

            if let Some(reward) = defeat.reward() {
                self.publish_reward(reward);
            }

            self.quests.record_enemy_defeat(&defeat.enemy_type, &mut self.ledger);
            self.after_quest_change();
        }
        outcome
    }

    /// Hit an enemy with the player's damage stat
    pub fn attack_enemy(&mut self, enemy_id: &str) -> DamageOutcome {
        if !self.ledger.stats().is_alive() {
            return DamageOutcome::Ignored;
        }
        let damage = self.ledger.stats().damage;
        self.damage_enemy(enemy_id, damage)
    }

    /// A living enemy hits the player. Returns the player's remaining health.
    pub fn enemy_strike(&mut self, enemy_id: &str) -> Option<i32> {
        self.spawner.strike_player(enemy_id, &mut self.ledger)
    }

    pub fn set_reserved_positions(&mut self, positions: Vec<Vec3>) {
        self.spawner.set_reserved_positions(positions);
    }

    /// Remove every enemy now. Pending removals are dropped with them.
    pub fn despawn_all(&mut self) -> usize {
        self.scheduler
            .cancel_where(|task| matches!(task, DeferredTask::RemoveEnemy { .. }));
        self.spawner.despawn_all()
    }

    // ========================================================================
    // Rewards
    // ========================================================================

    fn publish_reward(&mut self, reward: RewardEvent) {
        let generation = self.rewards.publish(reward);
        if let Some(previous) = self.reward_clear.take() {
            self.scheduler.cancel(previous);
        }
        self.reward_clear = Some(self.scheduler.schedule_in(
            self.config.rewards.display_ms,
            DeferredTask::ClearReward { generation },
        ));
    }

    pub fn clear_reward(&mut self) -> bool {
        if let Some(pending) = self.reward_clear.take() {
            self.scheduler.cancel(pending);
        }
        self.rewards.clear()
    }

    // ========================================================================
    // Time
    // ========================================================================

    /// Run every task due up to `now_ms`, in time order. Returns how many ran.
    pub fn advance_to(&mut self, now_ms: u64) -> usize {
        let mut ran = 0;
        while let Some((handle, task)) = self.scheduler.pop_due(now_ms) {
            self.run_task(handle, task);
            ran += 1;
        }
        self.scheduler.set_now(now_ms);
        ran
    }

    pub fn advance_by(&mut self, delta_ms: u64) -> usize {
        self.advance_to(self.scheduler.now_ms().saturating_add(delta_ms))
    }

    fn run_task(&mut self, handle: TaskHandle, task: DeferredTask) {
        match task {
            DeferredTask::RemoveEnemy { enemy_id } => {
                self.spawner.remove_enemy(&enemy_id);
            }
            DeferredTask::ClearReward { generation } => {
                if self.reward_clear == Some(handle) {
                    self.reward_clear = None;
                }
                self.rewards.clear_if_current(generation);
            }
            DeferredTask::QuestDeadline { quest_id } => {
                if self.deadlines.get(&quest_id) != Some(&handle) {
                    return;
                }
                self.deadlines.remove(&quest_id);
                if self.quests.fail_quest(&quest_id) {
                    info!("Quest '{}' ran out of time", quest_id);
                }
            }
            DeferredTask::SpawnCycle => {
                self.spawner.spawn_enemy(&mut self.rng);
                self.schedule_spawn_cycle();
            }
        }
    }

    fn schedule_spawn_cycle(&mut self) {
        let interval = self.config.spawner.spawn_interval_ms;
        if self.config.spawner.auto_spawn && interval > 0 {
            self.scheduler.schedule_in(interval, DeferredTask::SpawnCycle);
        }
    }

    fn arm_deadline(&mut self, quest_id: &str, time_limit_ms: Option<u64>) {
        if let Some(previous) = self.deadlines.remove(quest_id) {
            self.scheduler.cancel(previous);
        }
        let Some(limit) = time_limit_ms else {
            return;
        };
        let handle = self.scheduler.schedule_in(
            limit,
            DeferredTask::QuestDeadline {
                quest_id: quest_id.to_string(),
            },
        );
        debug!("Quest '{}' deadline at {}ms", quest_id, handle.due_ms());
        self.deadlines.insert(quest_id.to_string(), handle);
    }

    /// Cancel deadlines of quests that are no longer active
    fn disarm_finished_deadlines(&mut self) {
        let finished: Vec<String> = self
            .deadlines
            .keys()
            .filter(|id| !self.quests.log().is_active(id))
            .cloned()
            .collect();
        for quest_id in finished {
            if let Some(handle) = self.deadlines.remove(&quest_id) {
                self.scheduler.cancel(handle);
            }
        }
    }

    /// Inventory or quest state moved: settle collect conditions and timers
    fn after_quest_change(&mut self) {
        self.quests.check_collect_conditions(&mut self.ledger);
        self.disarm_finished_deadlines();
    }

    // ========================================================================
    // Save / load
    // ========================================================================

    pub fn save_data(&self) -> SaveData {
        SaveData {
            saved_at: Utc::now(),
            stats: self.ledger.stats().clone(),
            inventory: self.ledger.inventory().entries().to_vec(),
            quest_log: self.quests.log().clone(),
        }
    }

    pub fn save_json(&self) -> Result<String, String> {
        self.save_data().to_json()
    }

    /// Restore stats, inventory and quest log. Timed active quests get a
    /// fresh deadline from the current time.
    pub fn load_save(&mut self, json: &str) -> Result<(), String> {
        let save = SaveData::from_json(json)?;

        let timed: Vec<(String, Option<u64>)> = save
            .quest_log
            .active()
            .iter()
            .map(|q| (q.id.clone(), q.time_limit_ms))
            .collect();

        self.quests.restore_log(save.quest_log)?;
        self.ledger
            .restore(save.stats, Inventory::from_entries(save.inventory));

        for (quest_id, handle) in self.deadlines.drain() {
            debug!("Dropping deadline for '{}' on load", quest_id);
            self.scheduler.cancel(handle);
        }
        for (quest_id, limit) in timed {
            self.arm_deadline(&quest_id, limit);
        }

        info!("Loaded save from {}", save.saved_at);
        Ok(())
    }
}
