use std::{
    sync::{Arc, RwLock, Weak},
    thread::{self, ThreadId},
};

use log::warn;

use crate::{
    client_number, context::pack_context, EntityIndex, PropKind, PropValue, SendProp, SendProxy,
};

use super::{
    callback::{CallbackArgs, CallbackResult, CallbackValue},
    override_registry::OverrideRegistry,
};

/// What every dispatcher needs to reach the registry: a weak handle to it,
/// the thread callbacks may run on, and the string copy-back size
#[derive(Clone)]
pub struct DispatchContext {
    registry: Weak<RwLock<OverrideRegistry>>,
    control_thread: ThreadId,
    max_string_length: usize,
}

impl DispatchContext {
    /// Captures the calling thread as the control thread
    pub fn new(registry: Weak<RwLock<OverrideRegistry>>, max_string_length: usize) -> Self {
        Self {
            registry,
            control_thread: thread::current().id(),
            max_string_length,
        }
    }

    pub fn control_thread(&self) -> ThreadId {
        self.control_thread
    }

    pub fn max_string_length(&self) -> usize {
        self.max_string_length
    }
}

/// The encode function installed on every bound property. Looks up the
/// callbacks registered for the entity being encoded, lets them rewrite the
/// value, and encodes the result with the property's original encoder.
pub struct PropertyDispatcher {
    original: Arc<dyn SendProxy>,
    kind: PropKind,
    context: DispatchContext,
}

impl PropertyDispatcher {
    pub fn new(original: Arc<dyn SendProxy>, kind: PropKind, context: DispatchContext) -> Self {
        Self {
            original,
            kind,
            context,
        }
    }

    fn encode_original(
        &self,
        prop: &SendProp,
        value: &PropValue,
        element: usize,
        entity: EntityIndex,
    ) -> PropValue {
        self.original.encode(prop, value, element, entity)
    }
}

impl SendProxy for PropertyDispatcher {
    fn encode(
        &self,
        prop: &SendProp,
        value: &PropValue,
        element: usize,
        entity: EntityIndex,
    ) -> PropValue {
        // callbacks belong to the control thread's script runtime
        if thread::current().id() != self.context.control_thread {
            return self.encode_original(prop, value, element, entity);
        }

        let Some(registry) = self.context.registry.upgrade() else {
            warn!(
                "PropertyDispatcher: registry gone, encoding {} with its original encoder",
                prop.name()
            );
            return self.encode_original(prop, value, element, entity);
        };

        let active_slot = pack_context::active_slot();

        // clone the callbacks out so none of them runs under the registry lock
        let callbacks = {
            let Ok(registry) = registry.read() else {
                warn!(
                    "PropertyDispatcher: registry lock poisoned, encoding {} with its original encoder",
                    prop.name()
                );
                return self.encode_original(prop, value, element, entity);
            };
            registry.callbacks_for(entity, prop.key(), element, active_slot.is_some())
        };
        if callbacks.is_empty() {
            return self.encode_original(prop, value, element, entity);
        }

        let max_length = self.context.max_string_length;
        let Some(mut cell) = CallbackValue::marshal(self.kind, value, max_length) else {
            warn!(
                "PropertyDispatcher: value of {} does not match kind {}",
                prop.name(),
                self.kind.name()
            );
            return self.encode_original(prop, value, element, entity);
        };

        let mut changed = false;
        for callback in &callbacks {
            let client = if callback.per_client() {
                active_slot.map(client_number)
            } else {
                None
            };
            let mut args = CallbackArgs {
                entity,
                property: prop.name(),
                value: &mut cell,
                element,
                client,
                max_length,
            };
            if callback.call(&mut args) == CallbackResult::Changed {
                changed = true;
            }
        }

        if !changed {
            return self.encode_original(prop, value, element, entity);
        }

        match cell.unmarshal(self.kind, max_length) {
            Some(new_value) => self.encode_original(prop, &new_value, element, entity),
            None => {
                warn!(
                    "PropertyDispatcher: callback on {} returned a value that is not a {}",
                    prop.name(),
                    self.kind.name()
                );
                self.encode_original(prop, value, element, entity)
            }
        }
    }
}
