use std::sync::Arc;

use parking_lot::Mutex;

/// A pre-allocated output destination for exactly one task.
///
/// The orchestrator creates the slot, hands a clone to the task that fills it,
/// and takes the value out after the phase barrier drained. Each slot has a
/// single writer, so the lock is never contended.
pub struct Slot<T> {
    value: Mutex<Option<T>>,
}

impl<T> Slot<T> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            value: Mutex::new(None),
        })
    }

    pub fn fill(&self, value: T) {
        let previous = self.value.lock().replace(value);
        debug_assert!(previous.is_none(), "slot filled twice");
    }

    pub fn is_filled(&self) -> bool {
        self.value.lock().is_some()
    }

    /// `None` when the task never wrote its result, for example because it panicked.
    pub fn take(&self) -> Option<T> {
        self.value.lock().take()
    }
}

/// Takes every slot in order, or reports the index of the first one left empty.
pub fn take_all<T>(slots: &[Arc<Slot<T>>]) -> Result<Vec<T>, usize> {
    slots
        .iter()
        .enumerate()
        .map(|(index, slot)| slot.take().ok_or(index))
        .collect()
}
