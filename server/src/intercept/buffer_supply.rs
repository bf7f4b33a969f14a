use log::debug;

use proxysend_shared::{context::pack_context, EntityIndex};

use crate::host::{FrameSnapshot, PackedEntity, PackedEntitySource};

use super::switch::InterceptorSwitch;

/// Wraps the host's packed-entity fetch. While delta entities are written
/// for a client, the client's private buffer replaces the authoritative
/// bytes, but only for the snapshot the buffer was packed from.
pub struct BufferSupplyInterceptor<S: PackedEntitySource> {
    original: S,
    switch: InterceptorSwitch,
}

impl<S: PackedEntitySource> BufferSupplyInterceptor<S> {
    pub fn new(original: S, switch: InterceptorSwitch) -> Self {
        Self { original, switch }
    }

    pub fn original(&self) -> &S {
        &self.original
    }
}

impl<S: PackedEntitySource> PackedEntitySource for BufferSupplyInterceptor<S> {
    fn packed_entity(&self, snapshot: &FrameSnapshot, entity: EntityIndex) -> Option<PackedEntity> {
        if !self.switch.is_enabled() {
            return self.original.packed_entity(snapshot, entity);
        }
        let (Some(slot), Some(params)) = (
            pack_context::delta_client(),
            pack_context::current_params(),
        ) else {
            return self.original.packed_entity(snapshot, entity);
        };

        let mut packed = self.original.packed_entity(snapshot, entity)?;

        if !params.is_participating(entity) {
            return Some(packed);
        }
        if snapshot.id != params.snapshot() {
            debug!(
                "BufferSupplyInterceptor: entity {} fetched from snapshot {}, buffers belong to {}",
                entity,
                snapshot.id,
                params.snapshot()
            );
            return Some(packed);
        }
        let Some(position) = params.slot_position(slot) else {
            return Some(packed);
        };

        params.with_buffer(position, entity, |bits| packed.alloc_and_copy_padded(bits));
        Some(packed)
    }
}
