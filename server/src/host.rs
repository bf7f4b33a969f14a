//! The host simulation's side of the interception: the calls that get
//! wrapped, and the metadata the registration API resolves against.

use std::sync::Arc;

use proxysend_shared::{
    ChangeList, ClientSlot, EncodeError, EntityIndex, EntityState, PackedBits, PackedWriter,
    SendProp, SendTable, SnapshotId,
};

/// The host's table encode and delta routines
pub trait TableEncoder: Send + Sync {
    /// Encodes every property of `state` through its installed encode
    /// function into `out`
    fn encode(
        &self,
        table: &SendTable,
        state: &dyn EntityState,
        out: &mut PackedWriter,
        entity: EntityIndex,
    ) -> Result<(), EncodeError>;

    /// Appends the flat indices of properties that differ between `from`
    /// and `to`, stopping at the list's capacity. Returns the list length.
    fn calc_delta(
        &self,
        table: &SendTable,
        from: &PackedBits,
        to: &PackedBits,
        changes: &mut ChangeList,
        entity: EntityIndex,
    ) -> usize;
}

impl<T: TableEncoder + ?Sized> TableEncoder for Arc<T> {
    fn encode(
        &self,
        table: &SendTable,
        state: &dyn EntityState,
        out: &mut PackedWriter,
        entity: EntityIndex,
    ) -> Result<(), EncodeError> {
        (**self).encode(table, state, out, entity)
    }

    fn calc_delta(
        &self,
        table: &SendTable,
        from: &PackedBits,
        to: &PackedBits,
        changes: &mut ChangeList,
        entity: EntityIndex,
    ) -> usize {
        (**self).calc_delta(table, from, to, changes, entity)
    }
}

/// The host's packed-entity store
pub trait PackedEntitySource: Send + Sync {
    fn packed_entity(&self, snapshot: &FrameSnapshot, entity: EntityIndex) -> Option<PackedEntity>;
}

impl<T: PackedEntitySource + ?Sized> PackedEntitySource for Arc<T> {
    fn packed_entity(&self, snapshot: &FrameSnapshot, entity: EntityIndex) -> Option<PackedEntity> {
        (**self).packed_entity(snapshot, entity)
    }
}

/// Entity and property reflection
pub trait EntityMetadata {
    fn entity_exists(&self, entity: EntityIndex) -> bool;

    /// Resolves a property name on an entity's class into its leaf
    /// elements, descending into nested tables and expanding arrays.
    /// Returns None when the name does not resolve.
    fn resolve(&self, entity: EntityIndex, property: &str) -> Option<Vec<PropertyLeaf>>;

    /// Flags the entity's replicated state as changed at `offset` so the
    /// host re-encodes it this tick
    fn mark_state_changed(&self, entity: EntityIndex, offset: usize);
}

/// One encodable element of a resolved property
#[derive(Clone)]
pub struct PropertyLeaf {
    pub prop: Arc<SendProp>,
    /// Name of the table that declares `prop`
    pub table: String,
    pub element: usize,
    /// Byte offset of the element in the entity's state
    pub offset: usize,
}

/// The entities a host snapshot covers
#[derive(Clone, Debug)]
pub struct FrameSnapshot {
    pub id: SnapshotId,
    pub valid_entities: Vec<EntityIndex>,
}

impl FrameSnapshot {
    pub fn new(id: SnapshotId, valid_entities: Vec<EntityIndex>) -> Self {
        Self { id, valid_entities }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientKind {
    Human,
    Bot,
    Relay,
    Replay,
}

/// Connection state of one client, as seen when computing packs
#[derive(Clone, Copy, Debug)]
pub struct ClientInfo {
    pub slot: ClientSlot,
    pub kind: ClientKind,
    pub connected: bool,
    pub active: bool,
    pub spawned: bool,
}

impl ClientInfo {
    /// A connected, active and spawned client
    pub fn ready(slot: ClientSlot, kind: ClientKind) -> Self {
        Self {
            slot,
            kind,
            connected: true,
            active: true,
            spawned: true,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.connected && self.active && self.spawned
    }
}

/// Packed bytes of one entity in one snapshot, as handed to delta writing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedEntity {
    pub entity: EntityIndex,
    pub snapshot: SnapshotId,
    data: Vec<u8>,
    bit_len: u32,
}

impl PackedEntity {
    pub fn new(entity: EntityIndex, snapshot: SnapshotId, bits: &PackedBits) -> Self {
        let mut packed = Self {
            entity,
            snapshot,
            data: Vec::new(),
            bit_len: 0,
        };
        packed.alloc_and_copy_padded(bits);
        packed
    }

    /// Replaces the packed bytes with a copy of `bits`, zero-padded to a
    /// 4-byte boundary
    pub fn alloc_and_copy_padded(&mut self, bits: &PackedBits) {
        let padded_len = bits.byte_len().div_ceil(4) * 4;
        let mut data = Vec::with_capacity(padded_len);
        data.extend_from_slice(bits.bytes());
        data.resize(padded_len, 0);
        self.data = data;
        self.bit_len = bits.bit_len();
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn bit_len(&self) -> u32 {
        self.bit_len
    }

    /// The packed bits without padding
    pub fn bits(&self) -> PackedBits {
        let byte_len = self.bit_len.div_ceil(8) as usize;
        PackedBits::new(self.data[..byte_len.min(self.data.len())].to_vec(), self.bit_len)
    }
}
