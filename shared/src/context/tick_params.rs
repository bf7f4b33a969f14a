use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, MutexGuard,
    },
};

use log::warn;

use crate::{ClientSlot, EntityIndex, PackedBits, PackedEntityData, SnapshotId};

/// Everything one tick's per-client packing needs: which clients and
/// entities participate, and the private buffers produced for them.
///
/// The slot and entity lists are fixed at construction. Buffers are kept in
/// one container per slot, so inserts for different clients never contend.
pub struct TickPackingParams {
    snapshot: SnapshotId,
    slots: Vec<ClientSlot>,
    entities: Vec<EntityIndex>,
    entity_set: HashSet<EntityIndex>,
    buffers: Vec<Mutex<HashMap<EntityIndex, PackedEntityData>>>,
    failed: AtomicBool,
}

impl TickPackingParams {
    pub fn new(snapshot: SnapshotId, slots: Vec<ClientSlot>, entities: Vec<EntityIndex>) -> Self {
        let buffers = slots
            .iter()
            .map(|_| Mutex::new(HashMap::with_capacity(entities.len())))
            .collect();
        let entity_set = entities.iter().copied().collect();
        Self {
            snapshot,
            slots,
            entities,
            entity_set,
            buffers,
            failed: AtomicBool::new(false),
        }
    }

    pub fn snapshot(&self) -> SnapshotId {
        self.snapshot
    }

    /// Participating client slots, in packing order
    pub fn slots(&self) -> &[ClientSlot] {
        &self.slots
    }

    pub fn entities(&self) -> &[EntityIndex] {
        &self.entities
    }

    pub fn is_participating(&self, entity: EntityIndex) -> bool {
        self.entity_set.contains(&entity)
    }

    /// Position of `slot` in the participating slot list
    pub fn slot_position(&self, slot: ClientSlot) -> Option<usize> {
        self.slots.iter().position(|candidate| *candidate == slot)
    }

    fn slot_buffers(
        &self,
        position: usize,
    ) -> Option<MutexGuard<'_, HashMap<EntityIndex, PackedEntityData>>> {
        let buffers = self.buffers.get(position)?;
        match buffers.lock() {
            Ok(guard) => Some(guard),
            Err(_) => {
                warn!(
                    "TickPackingParams: buffers of slot position {} are poisoned",
                    position
                );
                None
            }
        }
    }

    /// Stores the private buffer of one entity for the slot at `position`,
    /// replacing any earlier one
    pub fn store_buffer(&self, position: usize, data: PackedEntityData) -> bool {
        let Some(mut buffers) = self.slot_buffers(position) else {
            return false;
        };
        buffers.insert(data.entity(), data);
        true
    }

    /// Runs `f` on the private buffer of `entity` for the slot at `position`
    pub fn with_buffer<R>(
        &self,
        position: usize,
        entity: EntityIndex,
        f: impl FnOnce(&PackedBits) -> R,
    ) -> Option<R> {
        let buffers = self.slot_buffers(position)?;
        buffers.get(&entity).map(|data| f(data.bits()))
    }

    pub fn has_buffers_for(&self, entity: EntityIndex) -> bool {
        (0..self.slots.len()).any(|position| {
            self.slot_buffers(position)
                .is_some_and(|buffers| buffers.contains_key(&entity))
        })
    }

    pub fn buffer_count(&self) -> usize {
        (0..self.slots.len())
            .filter_map(|position| self.slot_buffers(position).map(|buffers| buffers.len()))
            .sum()
    }

    /// Drops every private buffer of `entity`
    pub fn discard_entity(&self, entity: EntityIndex) {
        for position in 0..self.slots.len() {
            if let Some(mut buffers) = self.slot_buffers(position) {
                buffers.remove(&entity);
            }
        }
    }

    pub fn mark_failed(&self) {
        self.failed.store(true, Ordering::Release);
    }

    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }
}
