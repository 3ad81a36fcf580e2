//! In-flight computation table
//!
//! One gate per key with a computation underway. Callers that miss on the
//! same key queue on the gate, so only one of them runs the computation
//! while the rest read its stored result.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};

// == In-Flight Slot ==
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    gate: AsyncMutex<()>,
    /// Set when the key is invalidated while a computation holds the gate
    invalidated: AtomicBool,
}

impl InFlight {
    /// Waits for exclusive use of the key's computation.
    pub(crate) async fn enter(&self) -> AsyncMutexGuard<'_, ()> {
        let permit = self.gate.lock().await;
        self.invalidated.store(false, Ordering::SeqCst);
        permit
    }

    /// Whether the key was invalidated after [`InFlight::enter`] returned.
    pub(crate) fn was_invalidated(&self) -> bool {
        self.invalidated.load(Ordering::SeqCst)
    }

    fn invalidate(&self) {
        self.invalidated.store(true, Ordering::SeqCst);
    }
}

// == In-Flight Table ==
#[derive(Debug, Default)]
pub(crate) struct InFlightTable {
    slots: Mutex<HashMap<String, Arc<InFlight>>>,
}

impl InFlightTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the slot for `key`, creating it if nobody is computing it yet.
    ///
    /// The returned guard releases the caller's claim on drop, including when
    /// the caller's future is cancelled mid-computation.
    pub(crate) fn acquire<'a>(&'a self, key: &str) -> SlotGuard<'a> {
        let slot = {
            let mut slots = self.slots.lock();
            Arc::clone(slots.entry(key.to_string()).or_default())
        };

        SlotGuard {
            table: self,
            key: key.to_string(),
            slot,
        }
    }

    pub(crate) fn invalidate(&self, key: &str) {
        if let Some(slot) = self.slots.lock().get(key) {
            slot.invalidate();
        }
    }

    pub(crate) fn invalidate_prefix(&self, prefix: &str) {
        self.slots
            .lock()
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .for_each(|(_, slot)| slot.invalidate());
    }

    pub(crate) fn invalidate_all(&self) {
        self.slots.lock().values().for_each(|slot| slot.invalidate());
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.lock().len()
    }

    fn release(&self, key: &str, slot: &Arc<InFlight>) {
        let mut slots = self.slots.lock();
        let last_claim = slots
            .get(key)
            .map(|current| Arc::ptr_eq(current, slot) && Arc::strong_count(slot) == 2)
            .unwrap_or(false);

        if last_claim {
            slots.remove(key);
        }
    }
}

// == Slot Guard ==
/// A caller's claim on a key's in-flight slot.
pub(crate) struct SlotGuard<'a> {
    table: &'a InFlightTable,
    key: String,
    slot: Arc<InFlight>,
}

impl std::ops::Deref for SlotGuard<'_> {
    type Target = InFlight;

    fn deref(&self) -> &InFlight {
        &self.slot
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.table.release(&self.key, &self.slot);
    }
}
