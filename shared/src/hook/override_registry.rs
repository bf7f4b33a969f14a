use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use log::{debug, info};

use crate::{CallbackId, EntityIndex, PluginId, PropKey, PropKind, SendProp};

use super::{
    binding_table::{BindingHandle, BindingTable},
    callback::HookCallback,
    dispatcher::DispatchContext,
};

/// An entry is unique per property element of one entity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OverrideKey {
    pub prop: PropKey,
    pub element: usize,
}

impl OverrideKey {
    pub fn new(prop: &SendProp, element: usize) -> Self {
        Self {
            prop: prop.key(),
            element,
        }
    }
}

/// The callbacks registered on one property element of one entity
pub struct OverrideEntry {
    prop: Arc<SendProp>,
    element: usize,
    offset: usize,
    kind: PropKind,
    callbacks: Vec<HookCallback>,
    per_client: bool,
    binding: BindingHandle,
}

impl OverrideEntry {
    pub fn prop(&self) -> &Arc<SendProp> {
        &self.prop
    }

    pub fn element(&self) -> usize {
        self.element
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn kind(&self) -> PropKind {
        self.kind
    }

    pub fn callbacks(&self) -> &[HookCallback] {
        &self.callbacks
    }

    /// Whether any callback on this entry wants per-client values
    pub fn per_client(&self) -> bool {
        self.per_client
    }

    /// Whether any callback on this entry applies to the shared encoding
    pub fn has_global_callbacks(&self) -> bool {
        self.callbacks.iter().any(|callback| !callback.per_client())
    }

    fn add_callback(&mut self, callback: HookCallback) -> bool {
        let existed = self.remove_callback(callback.id());
        self.callbacks.push(callback);
        self.refresh_per_client();
        !existed
    }

    fn remove_callback(&mut self, id: CallbackId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|callback| callback.id() != id);
        self.refresh_per_client();
        self.callbacks.len() != before
    }

    fn remove_plugin(&mut self, plugin: PluginId) -> usize {
        let before = self.callbacks.len();
        self.callbacks.retain(|callback| callback.plugin() != plugin);
        self.refresh_per_client();
        before - self.callbacks.len()
    }

    fn refresh_per_client(&mut self) {
        self.per_client = self.callbacks.iter().any(HookCallback::per_client);
    }
}

/// Every override entry of one entity
pub struct EntityHookSet {
    entity: EntityIndex,
    entries: HashMap<OverrideKey, OverrideEntry>,
}

impl EntityHookSet {
    fn new(entity: EntityIndex) -> Self {
        Self {
            entity,
            entries: HashMap::new(),
        }
    }

    pub fn entity(&self) -> EntityIndex {
        self.entity
    }

    pub fn entry(&self, key: &OverrideKey) -> Option<&OverrideEntry> {
        self.entries.get(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = &OverrideEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_per_client_entries(&self) -> bool {
        self.entries.values().any(OverrideEntry::per_client)
    }

    pub fn has_global_entries(&self) -> bool {
        self.entries.values().any(OverrideEntry::has_global_callbacks)
    }

    /// Byte offsets of every hooked property, for marking state dirty
    pub fn offsets(&self) -> Vec<usize> {
        self.entries.values().map(|entry| entry.offset).collect()
    }
}

/// Registry of property overrides: entity -> property element -> callbacks.
/// Owns the binding table, so every entry's binding reference is released
/// exactly when the entry goes away.
pub struct OverrideRegistry {
    hook_sets: HashMap<EntityIndex, EntityHookSet>,
    bindings: BindingTable,
}

impl OverrideRegistry {
    pub fn new(context: DispatchContext) -> Self {
        Self {
            hook_sets: HashMap::new(),
            bindings: BindingTable::new(context),
        }
    }

    /// Creates a registry whose dispatchers point back at it. The calling
    /// thread becomes the control thread.
    pub fn new_shared(max_string_length: usize) -> Arc<RwLock<Self>> {
        Arc::new_cyclic(|registry| {
            RwLock::new(Self::new(DispatchContext::new(
                registry.clone(),
                max_string_length,
            )))
        })
    }

    /// Adds `callback` to the entry for `(entity, prop, element)`, creating
    /// the hook set, entry and binding as needed. Re-registering the same
    /// callback id replaces it. Returns true if the callback was new.
    pub fn register(
        &mut self,
        entity: EntityIndex,
        prop: &Arc<SendProp>,
        element: usize,
        offset: usize,
        kind: PropKind,
        callback: HookCallback,
    ) -> bool {
        let key = OverrideKey::new(prop, element);
        let bindings = &mut self.bindings;

        let hook_set = self.hook_sets.entry(entity).or_insert_with(|| {
            info!("OverrideRegistry: created hook set for entity {}", entity);
            EntityHookSet::new(entity)
        });

        let entry = hook_set.entries.entry(key).or_insert_with(|| OverrideEntry {
            prop: prop.clone(),
            element,
            offset,
            kind,
            callbacks: Vec::new(),
            per_client: false,
            binding: bindings.acquire(prop, kind),
        });

        debug!(
            "OverrideRegistry: added {} hook for entity {} ({:?})",
            prop.name(),
            entity,
            callback.id()
        );
        entry.add_callback(callback)
    }

    /// Removes one callback from one entry, cascading entry and hook set
    /// removal. Returns false if nothing matched.
    pub fn unregister(
        &mut self,
        entity: EntityIndex,
        prop: &SendProp,
        element: usize,
        id: CallbackId,
    ) -> bool {
        let key = OverrideKey::new(prop, element);
        let Some(hook_set) = self.hook_sets.get_mut(&entity) else {
            return false;
        };
        let Some(entry) = hook_set.entries.get_mut(&key) else {
            return false;
        };

        let removed = entry.remove_callback(id);
        if entry.callbacks.is_empty() {
            if let Some(entry) = hook_set.entries.remove(&key) {
                debug!("OverrideRegistry: removed {} hook for entity {}", prop.name(), entity);
                self.bindings.release(entry.binding);
            }
        }
        if hook_set.is_empty() {
            self.drop_hook_set(entity);
        }
        removed
    }

    /// Removes every callback owned by `plugin`. Returns the number removed.
    pub fn unregister_all_for_plugin(&mut self, plugin: PluginId) -> usize {
        let mut removed = 0;
        let mut released = Vec::new();

        self.hook_sets.retain(|entity, hook_set| {
            hook_set.entries.retain(|_, entry| {
                removed += entry.remove_plugin(plugin);
                if entry.callbacks.is_empty() {
                    released.push(entry.binding);
                    return false;
                }
                true
            });
            if hook_set.is_empty() {
                info!("OverrideRegistry: dropped hook set for entity {}", entity);
                return false;
            }
            true
        });

        for binding in released {
            self.bindings.release(binding);
        }
        if removed > 0 {
            info!(
                "OverrideRegistry: removed {} callbacks of plugin {:?}",
                removed, plugin
            );
        }
        removed
    }

    /// Drops every hook on `entity`. Returns false if it had none.
    pub fn on_entity_destroyed(&mut self, entity: EntityIndex) -> bool {
        self.drop_hook_set(entity)
    }

    /// Drops every hook set and binding, restoring all original encoders
    pub fn clear(&mut self) {
        self.hook_sets.clear();
        self.bindings.clear();
    }

    fn drop_hook_set(&mut self, entity: EntityIndex) -> bool {
        let Some(hook_set) = self.hook_sets.remove(&entity) else {
            return false;
        };
        for (_, entry) in hook_set.entries {
            self.bindings.release(entry.binding);
        }
        info!("OverrideRegistry: dropped hook set for entity {}", entity);
        true
    }

    /// The callbacks that apply when encoding `(entity, prop, element)`.
    /// The shared encoding only runs callbacks that did not ask for
    /// per-client values; a per-client encoding runs all of them.
    pub fn callbacks_for(
        &self,
        entity: EntityIndex,
        prop: PropKey,
        element: usize,
        per_client_pass: bool,
    ) -> Vec<HookCallback> {
        let Some(entry) = self
            .hook_sets
            .get(&entity)
            .and_then(|hook_set| hook_set.entries.get(&OverrideKey { prop, element }))
        else {
            return Vec::new();
        };

        entry
            .callbacks
            .iter()
            .filter(|callback| per_client_pass || !callback.per_client())
            .cloned()
            .collect()
    }

    pub fn hook_set(&self, entity: EntityIndex) -> Option<&EntityHookSet> {
        self.hook_sets.get(&entity)
    }

    pub fn hook_sets(&self) -> impl Iterator<Item = &EntityHookSet> {
        self.hook_sets.values()
    }

    pub fn has_per_client_entries(&self, entity: EntityIndex) -> bool {
        self.hook_sets
            .get(&entity)
            .is_some_and(EntityHookSet::has_per_client_entries)
    }

    pub fn has_global_entries(&self) -> bool {
        self.hook_sets.values().any(EntityHookSet::has_global_entries)
    }

    pub fn entity_count(&self) -> usize {
        self.hook_sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hook_sets.is_empty()
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }
}
