use std::sync::Arc;

use log::error;

use proxysend_shared::{
    context::pack_context, ActiveSlotScope, ChangeList, EncodeError, EntityIndex, EntityState,
    PackedBits, PackedEntityData, PackedWriter, SendTable, TickPackingParams,
    MAX_PACKED_ENTITY_BYTES,
};

use crate::{host::TableEncoder, listener::PackListeners};

use super::switch::InterceptorSwitch;

/// Wraps the host's table encoder. Inside a packing pass, an entity that
/// needs per-client values is encoded once authoritatively and then once
/// more per participating client slot, each into a private buffer.
pub struct EncodeInterceptor<T: TableEncoder> {
    original: T,
    switch: InterceptorSwitch,
    listeners: Arc<PackListeners>,
}

impl<T: TableEncoder> EncodeInterceptor<T> {
    pub fn new(original: T, switch: InterceptorSwitch, listeners: Arc<PackListeners>) -> Self {
        Self {
            original,
            switch,
            listeners,
        }
    }

    pub fn original(&self) -> &T {
        &self.original
    }

    fn encode_per_client(
        &self,
        params: &TickPackingParams,
        table: &SendTable,
        state: &dyn EntityState,
        entity: EntityIndex,
    ) -> Result<(), EncodeError> {
        self.listeners.pre_pack_entity(entity);

        for (position, slot) in params.slots().iter().enumerate() {
            let mut writer = PackedWriter::with_max_bytes(MAX_PACKED_ENTITY_BYTES);
            let encoded = {
                let _slot = ActiveSlotScope::enter(*slot);
                self.original.encode(table, state, &mut writer, entity)
            };

            if let Err(err) = encoded {
                return Err(EncodeError::PerClientEncodeFailed {
                    entity,
                    slot: *slot,
                    reason: err.to_string(),
                });
            }
            if writer.is_overflowed() {
                return Err(EncodeError::BufferOverflow {
                    entity,
                    max_bytes: MAX_PACKED_ENTITY_BYTES,
                });
            }

            if !params.store_buffer(position, PackedEntityData::new(entity, writer.finish())) {
                return Err(EncodeError::PerClientEncodeFailed {
                    entity,
                    slot: *slot,
                    reason: "client buffer unavailable".to_string(),
                });
            }
        }

        Ok(())
    }
}

impl<T: TableEncoder> TableEncoder for EncodeInterceptor<T> {
    fn encode(
        &self,
        table: &SendTable,
        state: &dyn EntityState,
        out: &mut PackedWriter,
        entity: EntityIndex,
    ) -> Result<(), EncodeError> {
        if !self.switch.is_enabled()
            || !pack_context::in_packing_pass()
            || pack_context::in_diff_step()
        {
            return self.original.encode(table, state, out, entity);
        }
        let Some(params) = pack_context::current_params() else {
            return self.original.encode(table, state, out, entity);
        };

        if let Err(err) = self.original.encode(table, state, out, entity) {
            error!("EncodeInterceptor: {}", err);
            params.mark_failed();
            params.discard_entity(entity);
            return Err(err);
        }

        if !params.is_participating(entity) {
            return Ok(());
        }

        if let Err(err) = self.encode_per_client(&params, table, state, entity) {
            error!("EncodeInterceptor: {}", err);
            params.mark_failed();
            params.discard_entity(entity);
            return Err(err);
        }

        Ok(())
    }

    fn calc_delta(
        &self,
        table: &SendTable,
        from: &PackedBits,
        to: &PackedBits,
        changes: &mut ChangeList,
        entity: EntityIndex,
    ) -> usize {
        self.original.calc_delta(table, from, to, changes, entity)
    }
}
