use std::sync::{Arc, RwLock};

use log::{debug, error, warn};

use proxysend_shared::{
    ClientSlot, EncodeError, EntityIndex, OverrideRegistry, PackScope, TickPackingParams,
};

use crate::{
    error::PackError,
    host::{ClientInfo, ClientKind, EntityMetadata, FrameSnapshot},
    intercept::{DeltaWriter, InterceptorSwitch},
    listener::PackListeners,
    server_config::ProxySendConfig,
};

/// Where the orchestrator is within one tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PackState {
    Idle,
    Scanning,
    PerClientPacking,
}

/// Result of scanning one snapshot against the registry
struct ScanResult {
    entities: Vec<EntityIndex>,
    has_global_overrides: bool,
}

/// Runs once per tick around the host's multi-client packing pass: decides
/// which clients and entities need per-client encoding, turns the
/// interceptors on for exactly that pass, and frees everything once the
/// tick has been transmitted.
pub struct SnapshotOrchestrator {
    registry: Arc<RwLock<OverrideRegistry>>,
    listeners: Arc<PackListeners>,
    switch: InterceptorSwitch,
    include_bots: bool,
    include_relays: bool,
    include_replays: bool,
    state: PackState,
    params: Option<Arc<TickPackingParams>>,
    packed_entity_reuse: bool,
}

impl SnapshotOrchestrator {
    pub fn new(
        config: &ProxySendConfig,
        registry: Arc<RwLock<OverrideRegistry>>,
        listeners: Arc<PackListeners>,
        switch: InterceptorSwitch,
    ) -> Self {
        Self {
            registry,
            listeners,
            switch,
            include_bots: config.include_bots,
            include_relays: config.include_relays,
            include_replays: config.include_replays,
            state: PackState::Idle,
            params: None,
            packed_entity_reuse: true,
        }
    }

    pub fn state(&self) -> PackState {
        self.state
    }

    /// Parameters of the tick currently being packed or transmitted
    pub fn params(&self) -> Option<&Arc<TickPackingParams>> {
        self.params.as_ref()
    }

    /// False while any override applies to the shared encoding, in which
    /// case the host must not reuse a previous tick's packed data
    pub fn allows_packed_entity_reuse(&self) -> bool {
        self.packed_entity_reuse
    }

    /// Slots of the clients that receive per-client packs
    pub fn eligible_slots(&self, clients: &[ClientInfo]) -> Vec<ClientSlot> {
        clients
            .iter()
            .filter(|client| client.is_ready())
            .filter(|client| match client.kind {
                ClientKind::Human => true,
                ClientKind::Bot => self.include_bots,
                ClientKind::Relay => self.include_relays,
                ClientKind::Replay => self.include_replays,
            })
            .map(|client| client.slot)
            .collect()
    }

    fn scan_entities(
        &self,
        snapshot: &FrameSnapshot,
        metadata: &dyn EntityMetadata,
    ) -> Result<ScanResult, PackError> {
        let Ok(registry) = self.registry.read() else {
            return Err(PackError::StateUnavailable);
        };

        let mut entities = Vec::new();
        for entity in &snapshot.valid_entities {
            let Some(hook_set) = registry.hook_set(*entity) else {
                continue;
            };
            // hooked values may change without the entity's state changing
            for offset in hook_set.offsets() {
                metadata.mark_state_changed(*entity, offset);
            }
            if hook_set.has_per_client_entries() {
                entities.push(*entity);
            }
        }

        Ok(ScanResult {
            entities,
            has_global_overrides: registry.has_global_entries(),
        })
    }

    /// Wraps the host's client-pack computation for one snapshot. `pack`
    /// is the host's own packing pass; it runs with the interceptors on
    /// only when some eligible client needs per-client values.
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
        if self.params.is_some() {
            warn!(
                "SnapshotOrchestrator: discarding parameters left over from an untransmitted tick"
            );
            self.end_tick();
        }

        self.state = PackState::Scanning;
        let scan = match self.scan_entities(snapshot, metadata) {
            Ok(scan) => scan,
            Err(err) => {
                self.state = PackState::Idle;
                return Err(err);
            }
        };
        self.packed_entity_reuse = !scan.has_global_overrides;

        let slots = if scan.entities.is_empty() {
            Vec::new()
        } else {
            self.eligible_slots(clients)
        };

        if slots.is_empty() || scan.entities.is_empty() {
            debug!(
                "SnapshotOrchestrator: snapshot {} needs no per-client packing",
                snapshot.id
            );
            self.state = PackState::Idle;
            return pack().map_err(PackError::from);
        }

        debug!(
            "SnapshotOrchestrator: snapshot {} packs {} entities for {} clients",
            snapshot.id,
            scan.entities.len(),
            slots.len()
        );
        let params = Arc::new(TickPackingParams::new(snapshot.id, slots, scan.entities));
        self.params = Some(params.clone());
        self.switch.enable();
        self.state = PackState::PerClientPacking;

        let packed = {
            let _scope = PackScope::packing(params.clone());
            pack()
        };

        if let Err(err) = packed {
            error!("SnapshotOrchestrator: packing snapshot {} failed: {}", snapshot.id, err);
            self.end_tick();
            return Err(err.into());
        }
        if params.has_failed() {
            error!(
                "SnapshotOrchestrator: an encode failed while packing snapshot {}",
                snapshot.id
            );
            self.end_tick();
            return Err(PackError::PackingFailed {
                snapshot: snapshot.id,
            });
        }

        Ok(())
    }

    /// Wraps the host's transmission step. The tick's parameters are
    /// visible to packed-entity fetches made inside `send`, and freed once
    /// it returns.
    pub fn send_client_messages<R>(&mut self, send: impl FnOnce(&DeltaWriter<'_>) -> R) -> R {
        let result = {
            let _scope = self.params.clone().map(PackScope::transmitting);
            send(&DeltaWriter::new(&self.listeners))
        };
        self.end_tick();
        result
    }

    /// Frees the tick's parameters and turns the interceptors off.
    /// Returns false if there was nothing to free.
    pub fn end_tick(&mut self) -> bool {
        self.switch.disable();
        self.state = PackState::Idle;
        self.params.take().is_some()
    }

    /// Drops any private buffers held for `entity`
    pub fn discard_entity(&self, entity: EntityIndex) {
        if let Some(params) = &self.params {
            params.discard_entity(entity);
        }
    }
}
