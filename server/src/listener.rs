use std::sync::{Arc, RwLock};

use log::warn;

use proxysend_shared::{ClientSlot, EntityIndex};

/// Observer of the packing pass. Every method has a no-op default.
pub trait PackListener: Send + Sync {
    /// Whether the host may pack in parallel this tick. A single `false`
    /// vetoes it.
    fn is_parallel_pack_allowed(&self) -> bool {
        true
    }

    /// Called before the per-client encodes of `entity`
    fn on_pre_pack_entity(&self, _entity: EntityIndex) {}

    /// Called before the host writes delta entities for `slot`
    fn on_pre_write_deltas(&self, _slot: ClientSlot) {}

    /// Called after the host wrote delta entities for `slot`
    fn on_post_write_deltas(&self, _slot: ClientSlot) {}
}

fn same_listener(a: &Arc<dyn PackListener>, b: &Arc<dyn PackListener>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// The set of registered listeners, shared with the interceptors
#[derive(Default)]
pub struct PackListeners {
    listeners: RwLock<Vec<Arc<dyn PackListener>>>,
}

impl PackListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if `listener` was already registered
    pub fn add(&self, listener: Arc<dyn PackListener>) -> bool {
        let Ok(mut listeners) = self.listeners.write() else {
            warn!("PackListeners: lock poisoned, listener not added");
            return false;
        };
        if listeners.iter().any(|known| same_listener(known, &listener)) {
            return false;
        }
        listeners.push(listener);
        true
    }

    /// Returns false if `listener` was not registered
    pub fn remove(&self, listener: &Arc<dyn PackListener>) -> bool {
        let Ok(mut listeners) = self.listeners.write() else {
            warn!("PackListeners: lock poisoned, listener not removed");
            return false;
        };
        let before = listeners.len();
        listeners.retain(|known| !same_listener(known, listener));
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.read().map_or(0, |listeners| listeners.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<Arc<dyn PackListener>> {
        match self.listeners.read() {
            Ok(listeners) => listeners.clone(),
            Err(_) => {
                warn!("PackListeners: lock poisoned, skipping notification");
                Vec::new()
            }
        }
    }

    /// Unanimous consent of every listener
    pub fn is_parallel_pack_allowed(&self) -> bool {
        let Ok(listeners) = self.listeners.read() else {
            return false;
        };
        listeners
            .iter()
            .all(|listener| listener.is_parallel_pack_allowed())
    }

    pub fn pre_pack_entity(&self, entity: EntityIndex) {
        for listener in self.snapshot() {
            listener.on_pre_pack_entity(entity);
        }
    }

    pub fn pre_write_deltas(&self, slot: ClientSlot) {
        for listener in self.snapshot() {
            listener.on_pre_write_deltas(slot);
        }
    }

    pub fn post_write_deltas(&self, slot: ClientSlot) {
        for listener in self.snapshot() {
            listener.on_post_write_deltas(slot);
        }
    }
}
