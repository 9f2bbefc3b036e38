//! Quest Definition Structures
//!
//! Raw structures are deserialized from TOML quest files and resolved into
//! the typed definitions the registry runs.

use serde::{Deserialize, Serialize};

use crate::ledger::PlayerStats;

/// A quest definition loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuestFile {
    pub quest: RawQuest,
}

/// Raw quest data as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuest {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Content-authored repeat policy
    #[serde(default)]
    pub repeatable: bool,
    /// Fail the quest if still active this long after it starts
    pub time_limit_ms: Option<u64>,
    #[serde(default)]
    pub requirements: Requirements,
    #[serde(default)]
    pub rewards: Rewards,
    #[serde(default)]
    pub completion: CompletionCondition,
    #[serde(default)]
    pub dialogue: Vec<RawDialogueNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDialogueNode {
    pub speaker: String,
    pub text: String,
    #[serde(default)]
    pub choices: Vec<RawChoice>,
}

/// Raw dialogue choice as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawChoice {
    pub text: String,
    /// Dialogue index to move to; absent completes the quest
    pub next: Option<usize>,
    /// Taking this choice fails the quest
    #[serde(default)]
    pub fail: bool,
    pub requirements: Option<Requirements>,
    pub action: Option<ChoiceAction>,
}

// ============================================================================
// Resolved Quest Structures (after parsing)
// ============================================================================

/// Item id + amount pair used for costs and rewards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    #[serde(alias = "id")]
    pub item_id: String,
    #[serde(default = "default_amount")]
    pub amount: i32,
}

fn default_amount() -> i32 {
    1
}

impl ItemStack {
    pub fn new(item_id: &str, amount: i32) -> Self {
        Self {
            item_id: item_id.to_string(),
            amount,
        }
    }
}

/// Gate for quest acceptance and dialogue choices.
///
/// Absent stat fields impose no constraint. Item costs only apply to quest
/// acceptance, where they are consumed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Requirements {
    pub level: Option<i32>,
    pub energy: Option<i32>,
    pub currency: Option<i64>,
    pub items: Vec<ItemStack>,
}

impl Requirements {
    /// All present stat thresholds are met simultaneously
    pub fn is_met_by(&self, stats: &PlayerStats) -> bool {
        self.level.map_or(true, |level| stats.level >= level)
            && self.energy.map_or(true, |energy| stats.energy >= energy)
            && self.currency.map_or(true, |currency| stats.currency >= currency)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Item costs totalled per item id, in first-listed order
    pub fn item_costs(&self) -> Vec<ItemStack> {
        let mut totals: Vec<ItemStack> = Vec::new();
        for item in &self.items {
            match totals.iter_mut().find(|t| t.item_id == item.item_id) {
                Some(total) => total.amount = total.amount.saturating_add(item.amount),
                None => totals.push(item.clone()),
            }
        }
        totals
    }
}

/// Quest rewards, applied through the ledger on completion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rewards {
    pub experience: i64,
    pub currency: i64,
    pub energy: i32,
    pub items: Vec<ItemStack>,
}

/// Side effect applied when a dialogue choice is taken
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChoiceAction {
    GrantItem { item_id: String, amount: i32 },
    /// Hand items over; the choice is inert if they are not held
    TakeItem { item_id: String, amount: i32 },
    GrantCurrency { amount: i64 },
    RestoreEnergy { amount: i32 },
}

/// Where a dialogue choice leads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "index", rename_all = "snake_case")]
pub enum ChoiceOutcome {
    Goto(usize),
    Complete,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
    pub requirements: Option<Requirements>,
    pub outcome: ChoiceOutcome,
    pub action: Option<ChoiceAction>,
}

impl Choice {
    pub fn is_available(&self, stats: &PlayerStats) -> bool {
        self.requirements
            .as_ref()
            .map_or(true, |req| req.is_met_by(stats))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueNode {
    /// Index of this node within the quest's dialogue list
    pub id: usize,
    pub speaker: String,
    pub text: String,
    pub choices: Vec<Choice>,
}

/// External condition that completes an active quest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompletionCondition {
    /// Only a dialogue choice completes the quest
    #[default]
    Dialogue,
    /// Completes as soon as every listed item is held
    CollectItems { items: Vec<ItemStack> },
    /// Completes after `count` defeats of `enemy_type` (any type when absent)
    DefeatEnemies {
        enemy_type: Option<String>,
        #[serde(default = "default_count")]
        count: u32,
    },
    ReachLocation { location: String },
}

fn default_count() -> u32 {
    1
}

/// A fully resolved quest definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quest {
    pub id: String,
    pub title: String,
    pub description: String,
    pub repeatable: bool,
    pub time_limit_ms: Option<u64>,
    pub requirements: Requirements,
    pub rewards: Rewards,
    pub dialogue: Vec<DialogueNode>,
    pub completion: CompletionCondition,
    pub completed: bool,
}

impl Quest {
    /// Create a Quest from raw TOML data
    pub fn from_raw(raw: &RawQuest) -> Result<Self, String> {
        if raw.id.trim().is_empty() {
            return Err("Quest has an empty id".to_string());
        }
        if raw.dialogue.is_empty() {
            return Err(format!("Quest '{}' has no dialogue", raw.id));
        }

        let node_count = raw.dialogue.len();
        let dialogue = raw
            .dialogue
            .iter()
            .enumerate()
            .map(|(index, node)| {
                let choices = node
                    .choices
                    .iter()
                    .map(|choice| resolve_choice(&raw.id, index, choice, node_count))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(DialogueNode {
                    id: index,
                    speaker: node.speaker.clone(),
                    text: node.text.clone(),
                    choices,
                })
            })
            .collect::<Result<Vec<_>, String>>()?;

        validate_rewards(&raw.id, &raw.rewards)?;
        validate_items(&raw.id, "requirement", &raw.requirements.items)?;
        validate_completion(&raw.id, &raw.completion)?;

        Ok(Self {
            id: raw.id.clone(),
            title: raw.title.clone(),
            description: raw.description.clone(),
            repeatable: raw.repeatable,
            time_limit_ms: raw.time_limit_ms,
            requirements: raw.requirements.clone(),
            rewards: raw.rewards.clone(),
            dialogue,
            completion: raw.completion.clone(),
            completed: false,
        })
    }

    pub fn dialogue_node(&self, index: usize) -> Option<&DialogueNode> {
        self.dialogue.get(index)
    }

    /// Copy of this quest marked completed
    pub fn completed_copy(&self) -> Self {
        Self {
            completed: true,
            ..self.clone()
        }
    }
}

fn resolve_choice(
    quest_id: &str,
    node: usize,
    raw: &RawChoice,
    node_count: usize,
) -> Result<Choice, String> {
    let outcome = match (raw.fail, raw.next) {
        (true, Some(_)) => {
            return Err(format!(
                "Quest '{}' dialogue {}: choice '{}' sets both next and fail",
                quest_id, node, raw.text
            ));
        }
        (true, None) => ChoiceOutcome::Fail,
        (false, Some(next)) if next >= node_count => {
            return Err(format!(
                "Quest '{}' dialogue {}: choice '{}' points at missing dialogue {}",
                quest_id, node, raw.text, next
            ));
        }
        (false, Some(next)) => ChoiceOutcome::Goto(next),
        (false, None) => ChoiceOutcome::Complete,
    };

    if let Some(action) = &raw.action {
        let amount_ok = match action {
            ChoiceAction::GrantItem { amount, .. } | ChoiceAction::TakeItem { amount, .. } => {
                *amount > 0
            }
            ChoiceAction::GrantCurrency { amount } => *amount > 0,
            ChoiceAction::RestoreEnergy { amount } => *amount > 0,
        };
        if !amount_ok {
            return Err(format!(
                "Quest '{}' dialogue {}: choice '{}' has a non-positive action amount",
                quest_id, node, raw.text
            ));
        }
    }

    Ok(Choice {
        text: raw.text.clone(),
        requirements: raw.requirements.clone(),
        outcome,
        action: raw.action.clone(),
    })
}

fn validate_items(quest_id: &str, what: &str, items: &[ItemStack]) -> Result<(), String> {
    match items.iter().find(|item| item.amount <= 0) {
        Some(item) => Err(format!(
            "Quest '{}' {} item '{}' has non-positive amount {}",
            quest_id, what, item.item_id, item.amount
        )),
        None => Ok(()),
    }
}

fn validate_rewards(quest_id: &str, rewards: &Rewards) -> Result<(), String> {
    if rewards.experience < 0 || rewards.currency < 0 || rewards.energy < 0 {
        return Err(format!("Quest '{}' has a negative reward", quest_id));
    }
    validate_items(quest_id, "reward", &rewards.items)
}

fn validate_completion(quest_id: &str, completion: &CompletionCondition) -> Result<(), String> {
    match completion {
        CompletionCondition::CollectItems { items } if items.is_empty() => Err(format!(
            "Quest '{}' collect_items completion lists no items",
            quest_id
        )),
        CompletionCondition::CollectItems { items } => validate_items(quest_id, "collect", items),
        CompletionCondition::DefeatEnemies { count: 0, .. } => Err(format!(
            "Quest '{}' defeat_enemies completion needs a positive count",
            quest_id
        )),
        _ => Ok(()),
    }
}
