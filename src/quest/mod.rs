//! Quest System Module
//!
//! Data-driven quests with branching dialogue, loaded from TOML. The
//! registry owns the definitions and the active/completed/failed log.

pub mod definition;
pub mod log;
pub mod registry;

pub use definition::{
    Choice, ChoiceAction, ChoiceOutcome, CompletionCondition, DialogueNode, ItemStack, Quest,
    Requirements, Rewards,
};
pub use log::{QuestLog, QuestStatus};
pub use registry::{ChoiceView, DialogueCursor, DialogueOutcome, QuestRegistry, StartOutcome};
