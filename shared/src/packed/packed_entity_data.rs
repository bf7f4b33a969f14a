use crate::EntityIndex;

use super::packed_writer::PackedBits;

/// A private, client-specific encoding of one entity produced during one
/// tick's packing pass
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedEntityData {
    entity: EntityIndex,
    bits: PackedBits,
}

impl PackedEntityData {
    pub fn new(entity: EntityIndex, bits: PackedBits) -> Self {
        Self { entity, bits }
    }

    pub fn entity(&self) -> EntityIndex {
        self.entity
    }

    pub fn bits(&self) -> &PackedBits {
        &self.bits
    }
}
