//! Per-thread packing context.
//!
//! The host calls the intercepted encode, diff and fetch functions with fixed
//! signatures, so the client being encoded for and the current tick's packing
//! parameters cannot be passed as arguments. They live here instead, one copy
//! per thread, and are only ever set through the scope guards below, which
//! put back the previous value when dropped (including on unwind).

use std::{
    cell::{Cell, RefCell},
    marker::PhantomData,
    sync::Arc,
};

use crate::ClientSlot;

use super::tick_params::TickPackingParams;

thread_local! {
    static PARAMS: RefCell<Option<Arc<TickPackingParams>>> = const { RefCell::new(None) };
    static IN_PACKING: Cell<bool> = const { Cell::new(false) };
    static IN_DIFF: Cell<bool> = const { Cell::new(false) };
    static ACTIVE_SLOT: Cell<Option<ClientSlot>> = const { Cell::new(None) };
    static DELTA_CLIENT: Cell<Option<ClientSlot>> = const { Cell::new(None) };
}

// guards must be dropped on the thread that created them
type NotSend = PhantomData<*const ()>;

/// Parameters of the tick being packed or transmitted on this thread
pub fn current_params() -> Option<Arc<TickPackingParams>> {
    PARAMS.with(|params| params.borrow().clone())
}

/// Whether this thread is inside the host's multi-client packing pass
pub fn in_packing_pass() -> bool {
    IN_PACKING.with(Cell::get)
}

/// Whether this thread is inside a per-client diff
pub fn in_diff_step() -> bool {
    IN_DIFF.with(Cell::get)
}

/// The client slot currently being encoded for on this thread
pub fn active_slot() -> Option<ClientSlot> {
    ACTIVE_SLOT.with(Cell::get)
}

/// The client whose delta entities are currently being written on this thread
pub fn delta_client() -> Option<ClientSlot> {
    DELTA_CLIENT.with(Cell::get)
}

/// Installs a tick's parameters on this thread, either for the packing pass
/// or for transmission
pub struct PackScope {
    previous_params: Option<Arc<TickPackingParams>>,
    previous_packing: bool,
    _not_send: NotSend,
}

impl PackScope {
    pub fn packing(params: Arc<TickPackingParams>) -> Self {
        Self::enter(params, true)
    }

    pub fn transmitting(params: Arc<TickPackingParams>) -> Self {
        Self::enter(params, false)
    }

    fn enter(params: Arc<TickPackingParams>, packing: bool) -> Self {
        let previous_params = PARAMS.with(|slot| slot.replace(Some(params)));
        let previous_packing = IN_PACKING.with(|flag| flag.replace(packing));
        Self {
            previous_params,
            previous_packing,
            _not_send: PhantomData,
        }
    }
}

impl Drop for PackScope {
    fn drop(&mut self) {
        let previous = self.previous_params.take();
        PARAMS.with(|slot| slot.replace(previous));
        IN_PACKING.with(|flag| flag.set(self.previous_packing));
    }
}

/// Marks this thread as encoding for one client slot
pub struct ActiveSlotScope {
    previous: Option<ClientSlot>,
    _not_send: NotSend,
}

impl ActiveSlotScope {
    pub fn enter(slot: ClientSlot) -> Self {
        let previous = ACTIVE_SLOT.with(|active| active.replace(Some(slot)));
        Self {
            previous,
            _not_send: PhantomData,
        }
    }
}

impl Drop for ActiveSlotScope {
    fn drop(&mut self) {
        ACTIVE_SLOT.with(|active| active.set(self.previous));
    }
}

/// Marks this thread as inside a per-client diff
pub struct DiffScope {
    previous: bool,
    _not_send: NotSend,
}

impl DiffScope {
    pub fn enter() -> Self {
        let previous = IN_DIFF.with(|flag| flag.replace(true));
        Self {
            previous,
            _not_send: PhantomData,
        }
    }
}

impl Drop for DiffScope {
    fn drop(&mut self) {
        IN_DIFF.with(|flag| flag.set(self.previous));
    }
}

/// Marks this thread as writing delta entities for one client
pub struct DeltaClientScope {
    previous: Option<ClientSlot>,
    _not_send: NotSend,
}

impl DeltaClientScope {
    pub fn enter(slot: ClientSlot) -> Self {
        let previous = DELTA_CLIENT.with(|client| client.replace(Some(slot)));
        Self {
            previous,
            _not_send: PhantomData,
        }
    }
}

impl Drop for DeltaClientScope {
    fn drop(&mut self) {
        DELTA_CLIENT.with(|client| client.set(self.previous));
    }
}
