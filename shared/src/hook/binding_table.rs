use std::{collections::HashMap, sync::Arc};

use log::{debug, info, warn};

use crate::{same_proxy, PropKey, PropKind, SendProp, SendProxy};

use super::dispatcher::{DispatchContext, PropertyDispatcher};

/// The installed interception of one property: the encode function that was
/// in place before, the dispatcher that replaced it, and how many override
/// entries currently rely on it
pub struct Binding {
    prop: Arc<SendProp>,
    original: Arc<dyn SendProxy>,
    dispatcher: Arc<dyn SendProxy>,
    ref_count: usize,
    kind: PropKind,
}

impl Binding {
    pub fn prop(&self) -> &Arc<SendProp> {
        &self.prop
    }

    pub fn original(&self) -> &Arc<dyn SendProxy> {
        &self.original
    }

    pub fn dispatcher(&self) -> &Arc<dyn SendProxy> {
        &self.dispatcher
    }

    pub fn ref_count(&self) -> usize {
        self.ref_count
    }

    pub fn kind(&self) -> PropKind {
        self.kind
    }

    fn restore(self) {
        if same_proxy(&self.prop.proxy(), &self.dispatcher) {
            self.prop.set_proxy(self.original);
            info!("BindingTable: restored original encoder on {}", self.prop.name());
        } else {
            warn!(
                "BindingTable: encoder on {} was replaced while bound, leaving the replacement in place",
                self.prop.name()
            );
        }
    }
}

/// Handle to a live binding, returned by `acquire` and consumed by `release`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BindingHandle(PropKey);

/// Reference-counted table of interception bindings keyed by property
/// identity. This is the only place a dispatcher is ever installed, so a
/// property carries at most one dispatcher and every binding knows exactly
/// which encoder to put back.
pub struct BindingTable {
    bindings: HashMap<PropKey, Binding>,
    context: DispatchContext,
}

impl BindingTable {
    pub fn new(context: DispatchContext) -> Self {
        Self {
            bindings: HashMap::new(),
            context,
        }
    }

    /// Takes a reference on the binding for `prop`, installing the
    /// dispatcher if this is the first one
    pub fn acquire(&mut self, prop: &Arc<SendProp>, kind: PropKind) -> BindingHandle {
        let key = prop.key();

        if let Some(binding) = self.bindings.get_mut(&key) {
            binding.ref_count += 1;
            debug!(
                "BindingTable: added ref {} for {}",
                binding.ref_count,
                prop.name()
            );
            return BindingHandle(key);
        }

        let original = prop.proxy();
        let dispatcher: Arc<dyn SendProxy> = Arc::new(PropertyDispatcher::new(
            original.clone(),
            kind,
            self.context.clone(),
        ));
        prop.set_proxy(dispatcher.clone());
        info!(
            "BindingTable: installed dispatcher on {} ({})",
            prop.name(),
            kind.name()
        );

        self.bindings.insert(
            key,
            Binding {
                prop: prop.clone(),
                original,
                dispatcher,
                ref_count: 1,
                kind,
            },
        );

        BindingHandle(key)
    }

    /// Drops a reference. The last release restores the original encoder.
    /// Returns false if the handle names no live binding.
    pub fn release(&mut self, handle: BindingHandle) -> bool {
        let Some(binding) = self.bindings.get_mut(&handle.0) else {
            warn!("BindingTable: release of unknown binding {:?}", handle);
            return false;
        };

        binding.ref_count -= 1;
        debug!(
            "BindingTable: removed ref {} for {}",
            binding.ref_count,
            binding.prop.name()
        );
        if binding.ref_count > 0 {
            return true;
        }

        if let Some(binding) = self.bindings.remove(&handle.0) {
            binding.restore();
        }
        true
    }

    pub fn get(&self, handle: BindingHandle) -> Option<&Binding> {
        self.bindings.get(&handle.0)
    }

    pub fn binding_for(&self, prop: &SendProp) -> Option<&Binding> {
        self.bindings.get(&prop.key())
    }

    pub fn ref_count(&self, prop: &SendProp) -> usize {
        self.binding_for(prop).map_or(0, |binding| binding.ref_count)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Removes every binding, restoring all original encoders
    pub fn clear(&mut self) {
        for (_, binding) in self.bindings.drain() {
            binding.restore();
        }
    }
}

impl Drop for BindingTable {
    fn drop(&mut self) {
        self.clear();
    }
}
