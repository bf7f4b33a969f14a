use proxysend_shared::{
    context::pack_context, ChangeList, DiffScope, EncodeError, EntityIndex, EntityState,
    PackedBits, PackedWriter, SendTable,
};

use crate::host::TableEncoder;

use super::switch::InterceptorSwitch;

/// Wraps the host's delta routine. For an entity with private buffers, the
/// authoritative change-list is extended with every index any client's
/// buffer changed against the same baseline, so each client is sent every
/// property that differs for it.
pub struct DiffInterceptor<T: TableEncoder> {
    original: T,
    switch: InterceptorSwitch,
}

impl<T: TableEncoder> DiffInterceptor<T> {
    pub fn new(original: T, switch: InterceptorSwitch) -> Self {
        Self { original, switch }
    }

    pub fn original(&self) -> &T {
        &self.original
    }
}

impl<T: TableEncoder> TableEncoder for DiffInterceptor<T> {
    fn encode(
        &self,
        table: &SendTable,
        state: &dyn EntityState,
        out: &mut PackedWriter,
        entity: EntityIndex,
    ) -> Result<(), EncodeError> {
        self.original.encode(table, state, out, entity)
    }

    fn calc_delta(
        &self,
        table: &SendTable,
        from: &PackedBits,
        to: &PackedBits,
        changes: &mut ChangeList,
        entity: EntityIndex,
    ) -> usize {
        if !self.switch.is_enabled()
            || !pack_context::in_packing_pass()
            || pack_context::in_diff_step()
        {
            return self.original.calc_delta(table, from, to, changes, entity);
        }
        let Some(params) = pack_context::current_params() else {
            return self.original.calc_delta(table, from, to, changes, entity);
        };

        let count = self.original.calc_delta(table, from, to, changes, entity);
        if !params.is_participating(entity) || changes.is_full() {
            return count;
        }

        let _diff = DiffScope::enter();
        let mut client_changes = ChangeList::new(changes.capacity());

        for position in 0..params.slots().len() {
            client_changes.clear();
            let diffed = params.with_buffer(position, entity, |client_bits| {
                self.original
                    .calc_delta(table, from, client_bits, &mut client_changes, entity)
            });
            if diffed.is_none() {
                continue;
            }
            // capacity reached, the rest is dropped
            if !changes.merge_unique(client_changes.as_slice()) {
                break;
            }
        }

        changes.len()
    }
}
