use proxysend_shared::{ClientSlot, DeltaClientScope};

use crate::listener::PackListeners;

/// Handed to the host's transmission step. Each client's delta entities
/// must be written inside `write_for`, which marks the client so packed
/// entity fetches resolve to its private buffers.
pub struct DeltaWriter<'l> {
    listeners: &'l PackListeners,
}

impl<'l> DeltaWriter<'l> {
    pub fn new(listeners: &'l PackListeners) -> Self {
        Self { listeners }
    }

    pub fn write_for<R>(&self, slot: ClientSlot, write: impl FnOnce() -> R) -> R {
        self.listeners.pre_write_deltas(slot);
        let result = {
            let _client = DeltaClientScope::enter(slot);
            write()
        };
        self.listeners.post_write_deltas(slot);
        result
    }
}
