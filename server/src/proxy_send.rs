use std::sync::{Arc, RwLock};

use log::{info, warn};

use proxysend_shared::{
    CallbackId, EncodeError, EntityIndex, HookCallback, HookError, OverrideRegistry, PluginId,
    PropClassifier, PropKind, StandardProxies,
};

use crate::{
    error::PackError,
    host::{ClientInfo, EntityMetadata, FrameSnapshot, PackedEntitySource, PropertyLeaf, TableEncoder},
    intercept::{
        BufferSupplyInterceptor, DeltaWriter, DiffInterceptor, EncodeInterceptor,
        InterceptorSwitch,
    },
    listener::{PackListener, PackListeners},
    orchestrator::{PackState, SnapshotOrchestrator},
    server_config::ProxySendConfig,
};

/// The per-client property interception service.
///
/// Owns the override registry (and through it every installed dispatcher),
/// the listener set and the snapshot orchestrator. The thread that creates
/// it becomes the control thread: registration and packing calls must be
/// made from it, and callbacks only ever run on it.
pub struct ProxySend {
    config: ProxySendConfig,
    classifier: PropClassifier,
    registry: Arc<RwLock<OverrideRegistry>>,
    listeners: Arc<PackListeners>,
    switch: InterceptorSwitch,
    orchestrator: SnapshotOrchestrator,
}

impl ProxySend {
    /// Create a new ProxySend service
    pub fn new(config: ProxySendConfig, standard_proxies: StandardProxies) -> Self {
        let classifier = PropClassifier::new(standard_proxies, config.unsigned_bitfields.clone());
        let registry = OverrideRegistry::new_shared(config.max_string_length);
        let listeners = Arc::new(PackListeners::new());
        let switch = InterceptorSwitch::new();
        let orchestrator = SnapshotOrchestrator::new(
            &config,
            registry.clone(),
            listeners.clone(),
            switch.clone(),
        );

        Self {
            config,
            classifier,
            registry,
            listeners,
            switch,
            orchestrator,
        }
    }

    pub fn config(&self) -> &ProxySendConfig {
        &self.config
    }

    /// Shared handle to the override registry, for inspection
    pub fn registry(&self) -> &Arc<RwLock<OverrideRegistry>> {
        &self.registry
    }

    fn resolve(
        metadata: &dyn EntityMetadata,
        entity: EntityIndex,
        property: &str,
    ) -> Result<Vec<PropertyLeaf>, HookError> {
        if !metadata.entity_exists(entity) {
            return Err(HookError::InvalidEntity { entity });
        }
        match metadata.resolve(entity, property) {
            Some(leaves) if !leaves.is_empty() => Ok(leaves),
            _ => Err(HookError::PropertyNotFound {
                entity,
                property: property.to_string(),
            }),
        }
    }

    // Registration

    /// Registers `callback` on every leaf element of `property` on
    /// `entity`. Either every element is hooked or, on error, none is.
    pub fn hook(
        &mut self,
        metadata: &dyn EntityMetadata,
        entity: EntityIndex,
        property: &str,
        callback: HookCallback,
    ) -> Result<(), HookError> {
        let leaves = Self::resolve(metadata, entity, property)?;

        // a bound property already carries its kind, and its installed
        // encoder is the dispatcher rather than anything classifiable
        let cached: Vec<Option<PropKind>> = {
            let Ok(registry) = self.registry.read() else {
                return Err(HookError::RegistryUnavailable);
            };
            leaves
                .iter()
                .map(|leaf| registry.bindings().binding_for(&leaf.prop).map(|binding| binding.kind()))
                .collect()
        };

        let kinds = leaves
            .iter()
            .zip(cached)
            .map(|(leaf, cached)| match cached {
                Some(kind) => Ok(kind),
                None => self
                    .classifier
                    .classify(&leaf.prop, &leaf.table)
                    .map_err(|source| HookError::UnsupportedProperty {
                        property: property.to_string(),
                        source,
                    }),
            })
            .collect::<Result<Vec<PropKind>, HookError>>()?;

        {
            let Ok(mut registry) = self.registry.write() else {
                return Err(HookError::RegistryUnavailable);
            };
            for (leaf, kind) in leaves.iter().zip(kinds) {
                registry.register(
                    entity,
                    &leaf.prop,
                    leaf.element,
                    leaf.offset,
                    kind,
                    callback.clone(),
                );
            }
        }

        for leaf in &leaves {
            metadata.mark_state_changed(entity, leaf.offset);
        }
        info!(
            "ProxySend: hooked {} on entity {} ({} elements, per client: {})",
            property,
            entity,
            leaves.len(),
            callback.per_client()
        );
        Ok(())
    }

    /// Removes the callback `id` from every leaf element of `property` on
    /// `entity`. Returns whether anything was removed.
    pub fn unhook(
        &mut self,
        metadata: &dyn EntityMetadata,
        entity: EntityIndex,
        property: &str,
        id: CallbackId,
    ) -> Result<bool, HookError> {
        let leaves = Self::resolve(metadata, entity, property)?;

        let Ok(mut registry) = self.registry.write() else {
            return Err(HookError::RegistryUnavailable);
        };
        let mut removed = false;
        for leaf in &leaves {
            removed |= registry.unregister(entity, &leaf.prop, leaf.element, id);
        }
        Ok(removed)
    }

    // Lifecycle

    pub fn on_entity_destroyed(&mut self, entity: EntityIndex) -> bool {
        self.orchestrator.discard_entity(entity);
        let Ok(mut registry) = self.registry.write() else {
            warn!("ProxySend: registry unavailable, hooks of entity {} kept", entity);
            return false;
        };
        registry.on_entity_destroyed(entity)
    }

    /// Returns the number of callbacks removed
    pub fn on_plugin_unloaded(&mut self, plugin: PluginId) -> usize {
        let Ok(mut registry) = self.registry.write() else {
            warn!("ProxySend: registry unavailable, hooks of plugin {:?} kept", plugin);
            return 0;
        };
        registry.unregister_all_for_plugin(plugin)
    }

    /// Drops every hook and restores every intercepted encoder
    pub fn on_map_end(&mut self) {
        self.orchestrator.end_tick();
        match self.registry.write() {
            Ok(mut registry) => registry.clear(),
            // the bindings must still be put back
            Err(poisoned) => poisoned.into_inner().clear(),
        }
        info!("ProxySend: cleared all hooks");
    }

    // Listeners

    pub fn add_listener(&self, listener: Arc<dyn PackListener>) -> bool {
        self.listeners.add(listener)
    }

    pub fn remove_listener(&self, listener: &Arc<dyn PackListener>) -> bool {
        self.listeners.remove(listener)
    }

    /// Whether the host may pack in parallel this tick. Requires the
    /// configuration to allow it, no registered overrides, and every
    /// listener's consent.
    pub fn parallel_packing_allowed(&self) -> bool {
        if !self.config.allow_parallel_packing {
            return false;
        }
        let has_overrides = self
            .registry
            .read()
            .map_or(true, |registry| !registry.is_empty());
        !has_overrides && self.listeners.is_parallel_pack_allowed()
    }

    // Interceptors

    /// Wraps the host's table encode call
    pub fn encode_interceptor<T: TableEncoder>(&self, original: T) -> EncodeInterceptor<T> {
        EncodeInterceptor::new(original, self.switch.clone(), self.listeners.clone())
    }

    /// Wraps the host's table delta call
    pub fn diff_interceptor<T: TableEncoder>(&self, original: T) -> DiffInterceptor<T> {
        DiffInterceptor::new(original, self.switch.clone())
    }

    /// Wraps both the encode and delta calls of the host's table encoder
    pub fn intercept<T: TableEncoder>(&self, original: T) -> DiffInterceptor<EncodeInterceptor<T>> {
        self.diff_interceptor(self.encode_interceptor(original))
    }

    /// Wraps the host's packed-entity fetch
    pub fn buffer_supply<S: PackedEntitySource>(&self, original: S) -> BufferSupplyInterceptor<S> {
        BufferSupplyInterceptor::new(original, self.switch.clone())
    }

    // Tick

    pub fn compute_client_packs<F>(
        &mut self,
        clients: &[ClientInfo],
        snapshot: &FrameSnapshot,
        metadata: &dyn EntityMetadata,
        pack: F,
    ) -> Result<(), PackError>
    where
        F: FnOnce() -> Result<(), EncodeError>,
    {
        self.orchestrator
            .compute_client_packs(clients, snapshot, metadata, pack)
    }

    pub fn send_client_messages<R>(&mut self, send: impl FnOnce(&DeltaWriter<'_>) -> R) -> R {
        self.orchestrator.send_client_messages(send)
    }

    pub fn end_tick(&mut self) -> bool {
        self.orchestrator.end_tick()
    }

    pub fn pack_state(&self) -> PackState {
        self.orchestrator.state()
    }

    pub fn allows_packed_entity_reuse(&self) -> bool {
        self.orchestrator.allows_packed_entity_reuse()
    }
}

impl Drop for ProxySend {
    fn drop(&mut self) {
        self.on_map_end();
    }
}
