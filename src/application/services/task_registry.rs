//! At most one active fetch per slot.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::domain::entities::SlotId;

use super::fetch_task::FetchTask;

/// Tracks the active fetch task of every slot.
///
/// Registering a task for a slot cancels whatever that slot was fetching
/// before, so a recycled slot can never receive an older item's result.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    active: Mutex<HashMap<SlotId, Arc<FetchTask>>>,
}

impl TaskRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `task` the active task for `slot`, cancelling the previous one.
    pub fn register(&self, slot: SlotId, task: Arc<FetchTask>) {
        let id = task.id();
        let previous = self.active.lock().insert(slot, task);

        if let Some(previous) = previous {
            if previous.id() != id && previous.cancel() {
                debug!(
                    slot = %slot,
                    key = %previous.key(),
                    "Replaced in-flight fetch for reassigned slot"
                );
            }
        }
    }

    /// Cancels and removes the active task for `slot`.
    ///
    /// Returns true if a task was registered.
    pub fn clear(&self, slot: SlotId) -> bool {
        let removed = self.active.lock().remove(&slot);
        match removed {
            Some(task) => {
                task.cancel();
                trace!(slot = %slot, key = %task.key(), "Cleared slot");
                true
            }
            None => false,
        }
    }

    /// Removes the entry for `slot` if it still belongs to `task`.
    ///
    /// A late terminal notification from a replaced task leaves the newer
    /// task's entry alone. Returns true if the entry was removed.
    pub fn on_terminal(&self, slot: SlotId, task: &FetchTask) -> bool {
        let mut active = self.active.lock();
        if active.get(&slot).is_some_and(|current| current.id() == task.id()) {
            active.remove(&slot);
            true
        } else {
            false
        }
    }

    /// Returns the active task for `slot`.
    pub fn active(&self, slot: SlotId) -> Option<Arc<FetchTask>> {
        self.active.lock().get(&slot).cloned()
    }

    /// Number of slots with an active task.
    pub fn len(&self) -> usize {
        self.active.lock().len()
    }

    /// Returns true if no slot has an active task.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cancels and removes every task. Returns how many were removed.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<_> = self.active.lock().drain().map(|(_, task)| task).collect();
        for task in &drained {
            task.cancel();
        }
        if !drained.is_empty() {
            debug!(count = drained.len(), "Cancelled all active fetches");
        }
        drained.len()
    }
}
