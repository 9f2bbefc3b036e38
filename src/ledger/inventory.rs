use serde::{Deserialize, Serialize};

// ============================================================================
// Inventory
// ============================================================================

/// One held item stack. Entries with a non-positive amount are never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub item_id: String,
    pub amount: i32,
}

impl InventoryEntry {
    pub fn new(item_id: &str, amount: i32) -> Self {
        Self {
            item_id: item_id.to_string(),
            amount,
        }
    }
}

/// Sparse item -> amount list, kept in acquisition order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Inventory {
    entries: Vec<InventoryEntry>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stored entries, merging duplicates and dropping empty ones
    pub fn from_entries(entries: Vec<InventoryEntry>) -> Self {
        let mut inventory = Self::new();
        for entry in entries {
            inventory.add(&entry.item_id, entry.amount);
        }
        inventory
    }

    /// Add to an item's stack, creating it if needed. Returns the new amount,
    /// or `None` if `amount` is not positive.
    pub fn add(&mut self, item_id: &str, amount: i32) -> Option<i32> {
        if amount <= 0 {
            return None;
        }

        if let Some(entry) = self.entries.iter_mut().find(|e| e.item_id == item_id) {
            entry.amount = entry.amount.saturating_add(amount);
            return Some(entry.amount);
        }

        self.entries.push(InventoryEntry::new(item_id, amount));
        Some(amount)
    }

    /// Remove from an item's stack. Returns the remaining amount, or `None`
    /// (without mutating) if the item is absent, `amount` is not positive,
    /// or more is requested than held.
    pub fn remove(&mut self, item_id: &str, amount: i32) -> Option<i32> {
        if amount <= 0 {
            return None;
        }

        let index = self.entries.iter().position(|e| e.item_id == item_id)?;
        let entry = &mut self.entries[index];
        if entry.amount < amount {
            return None;
        }

        entry.amount -= amount;
        let remaining = entry.amount;
        if remaining <= 0 {
            self.entries.remove(index);
        }
        Some(remaining)
    }

    pub fn count(&self, item_id: &str) -> i32 {
        self.entries
            .iter()
            .find(|e| e.item_id == item_id)
            .map(|e| e.amount)
            .unwrap_or(0)
    }

    pub fn has(&self, item_id: &str, amount: i32) -> bool {
        self.count(item_id) >= amount
    }

    pub fn entries(&self) -> &[InventoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
