//! Deferred Task Scheduler
//!
//! A virtual millisecond clock plus a queue of cancellable tasks. Nothing
//! here reads wall-clock time; the owner advances `now` explicitly, which
//! lets tests step through death animations and timeouts deterministically.

use std::collections::BTreeMap;

/// Handle for cancelling a scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle {
    due_ms: u64,
    seq: u64,
}

impl TaskHandle {
    pub fn due_ms(&self) -> u64 {
        self.due_ms
    }
}

/// Time-ordered queue of pending tasks of type `T`.
///
/// Tasks due at the same instant fire in scheduling order.
#[derive(Debug)]
pub struct Scheduler<T> {
    now_ms: u64,
    next_seq: u64,
    pending: BTreeMap<TaskHandle, T>,
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            next_seq: 0,
            pending: BTreeMap::new(),
        }
    }

    /// Current virtual time in milliseconds
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Schedule a task `delay_ms` after the current time
    pub fn schedule_in(&mut self, delay_ms: u64, task: T) -> TaskHandle {
        self.schedule_at(self.now_ms.saturating_add(delay_ms), task)
    }

    /// Schedule a task at an absolute time. Times in the past fire on the
    /// next `pop_due`.
    pub fn schedule_at(&mut self, due_ms: u64, task: T) -> TaskHandle {
        let handle = TaskHandle {
            due_ms,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.pending.insert(handle, task);
        handle
    }

    /// Cancel a pending task. Returns false if it already fired or was
    /// cancelled.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        self.pending.remove(&handle).is_some()
    }

    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.pending.contains_key(&handle)
    }

    /// Pop the earliest task due at or before `until_ms`, moving the clock to
    /// that task's due time. Returns `None` once nothing else is due, at which
    /// point the clock is left untouched so the caller can finish with
    /// `set_now`.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<(TaskHandle, T)> {
        let handle = *self.pending.keys().next()?;
        if handle.due_ms > until_ms {
            return None;
        }
        let task = self.pending.remove(&handle)?;
        self.now_ms = self.now_ms.max(handle.due_ms);
        Some((handle, task))
    }

    /// Move the clock forward. The clock never runs backwards.
    pub fn set_now(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop every pending task matching the predicate
    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&T) -> bool) -> usize {
        let before = self.pending.len();
        self.pending.retain(|_, task| !predicate(task));
        before - self.pending.len()
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}
