use std::{collections::HashMap, sync::RwLock};

use proxysend_server::{FrameSnapshot, PackedEntity, PackedEntitySource, TableEncoder};
use proxysend_shared::{ChangeList, EncodeError, EntityIndex, PackedBits, PackedWriter, SnapshotId};

use super::test_host::TestHost;

/// The host's store of authoritative packed entities, per snapshot
#[derive(Default)]
pub struct TestPackedStore {
    packed: RwLock<HashMap<(SnapshotId, EntityIndex), PackedBits>>,
}

impl TestPackedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, snapshot: SnapshotId, entity: EntityIndex, bits: PackedBits) {
        self.packed.write().unwrap().insert((snapshot, entity), bits);
    }

    pub fn get(&self, snapshot: SnapshotId, entity: EntityIndex) -> Option<PackedBits> {
        self.packed.read().unwrap().get(&(snapshot, entity)).cloned()
    }
}

impl PackedEntitySource for TestPackedStore {
    fn packed_entity(&self, snapshot: &FrameSnapshot, entity: EntityIndex) -> Option<PackedEntity> {
        let bits = self.get(snapshot.id, entity)?;
        Some(PackedEntity::new(entity, snapshot.id, &bits))
    }
}

/// The host's packing pass: encodes every entity of `snapshot`, stores the
/// result and diffs it against the entity's packed state in `baseline`
/// (everything counts as changed without one). Returns each entity's
/// change-list.
pub fn pack_entities<E: TableEncoder>(
    encoder: &E,
    host: &TestHost,
    store: &TestPackedStore,
    snapshot: &FrameSnapshot,
    baseline: Option<SnapshotId>,
) -> Result<HashMap<EntityIndex, ChangeList>, EncodeError> {
    let capacity = host.table().flat_len();
    let mut changes = HashMap::new();

    for entity in &snapshot.valid_entities {
        let state = host.state(*entity);
        let mut writer = PackedWriter::new();
        encoder.encode(host.table(), state.as_ref(), &mut writer, *entity)?;
        let bits = writer.finish();

        let from = baseline
            .and_then(|baseline| store.get(baseline, *entity))
            .unwrap_or_default();
        let mut list = ChangeList::new(capacity);
        encoder.calc_delta(host.table(), &from, &bits, &mut list, *entity);

        store.store(snapshot.id, *entity, bits);
        changes.insert(*entity, list);
    }

    Ok(changes)
}
