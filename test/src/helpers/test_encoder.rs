use std::sync::atomic::{AtomicUsize, Ordering};

use proxysend_server::TableEncoder;
use proxysend_shared::{
    BitReader, BitWrite, ChangeList, EncodeError, EntityIndex, EntityState, PackedBits,
    PackedWriter, PropValue, SendProp, SendPropType, SendTable, Serde, SerdeErr,
    MAX_PACKED_ENTITY_BYTES,
};

fn encodes_values(prop: &SendProp) -> bool {
    !matches!(
        prop.prop_type(),
        SendPropType::Array | SendPropType::DataTable
    )
}

fn write_value(out: &mut PackedWriter, prop: &SendProp, value: &PropValue) -> bool {
    match (prop.prop_type(), value) {
        (SendPropType::Int, PropValue::Int(value)) => {
            out.write_bits(*value as u64, prop.bits());
        }
        (SendPropType::Float, PropValue::Float(value)) => {
            value.to_bits().ser(out);
        }
        (SendPropType::Vector | SendPropType::VectorXY, PropValue::Vector(value)) => {
            for component in value {
                component.to_bits().ser(out);
            }
        }
        (SendPropType::String, PropValue::String(value)) => {
            out.write_bits(value.len() as u64, 16);
            for byte in value.bytes() {
                out.write_byte(byte);
            }
        }
        _ => return false,
    }
    true
}

fn read_bits(reader: &mut BitReader, bits: u8) -> Result<u64, SerdeErr> {
    let mut value = 0u64;
    for i in 0..bits.min(64) {
        if reader.read_bit()? {
            value |= 1 << i;
        }
    }
    Ok(value)
}

fn read_value(reader: &mut BitReader, prop: &SendProp) -> Result<PropValue, SerdeErr> {
    Ok(match prop.prop_type() {
        SendPropType::Int => {
            let bits = prop.bits();
            let raw = read_bits(reader, bits)?;
            if prop.is_unsigned() || bits >= 64 {
                PropValue::Int(raw as i64)
            } else {
                let shift = 64 - u32::from(bits);
                PropValue::Int(((raw << shift) as i64) >> shift)
            }
        }
        SendPropType::Float => PropValue::Float(f32::from_bits(u32::de(reader)?)),
        SendPropType::Vector | SendPropType::VectorXY => {
            let mut vector = [0.0; 3];
            for component in &mut vector {
                *component = f32::from_bits(u32::de(reader)?);
            }
            PropValue::Vector(vector)
        }
        SendPropType::String => {
            let len = read_bits(reader, 16)? as usize;
            let mut bytes = Vec::with_capacity(len);
            for _ in 0..len {
                bytes.push(read_bits(reader, 8)? as u8);
            }
            PropValue::String(String::from_utf8_lossy(&bytes).into_owned())
        }
        SendPropType::Array | SendPropType::DataTable => unreachable!(),
    })
}

/// Decodes packed bits into one value per flat property element. Elements
/// that carry no value, or that the buffer runs out before, are None.
pub fn decode_entity(table: &SendTable, bits: &PackedBits) -> Vec<Option<PropValue>> {
    let mut reader = bits.reader();
    let mut values = Vec::with_capacity(table.flat_len());
    let mut exhausted = false;

    for prop in table.props() {
        for _ in 0..prop.elements() {
            if exhausted || !encodes_values(prop) {
                values.push(None);
                continue;
            }
            match read_value(&mut reader, prop) {
                Ok(value) => values.push(Some(value)),
                Err(_) => {
                    exhausted = true;
                    values.push(None);
                }
            }
        }
    }
    values
}

/// The test host's table encoder: every element is run through its
/// property's installed encode function and written at the declared width
#[derive(Default)]
pub struct TestEncoder {
    encodes: AtomicUsize,
}

impl TestEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of encode calls made so far
    pub fn encode_count(&self) -> usize {
        self.encodes.load(Ordering::Relaxed)
    }
}

impl TableEncoder for TestEncoder {
    fn encode(
        &self,
        table: &SendTable,
        state: &dyn EntityState,
        out: &mut PackedWriter,
        entity: EntityIndex,
    ) -> Result<(), EncodeError> {
        self.encodes.fetch_add(1, Ordering::Relaxed);

        for prop in table.props().iter().filter(|prop| encodes_values(prop)) {
            for element in 0..prop.elements() {
                let value = state
                    .read(prop, element)
                    .ok_or(EncodeError::EncodeFailed { entity })?;
                let encoded = prop.encode(&value, element, entity);
                if !write_value(out, prop, &encoded) {
                    return Err(EncodeError::EncodeFailed { entity });
                }
            }
        }

        if out.is_overflowed() {
            return Err(EncodeError::BufferOverflow {
                entity,
                max_bytes: MAX_PACKED_ENTITY_BYTES,
            });
        }
        Ok(())
    }

    fn calc_delta(
        &self,
        table: &SendTable,
        from: &PackedBits,
        to: &PackedBits,
        changes: &mut ChangeList,
        _entity: EntityIndex,
    ) -> usize {
        let before = decode_entity(table, from);
        let after = decode_entity(table, to);

        for (index, value) in after.iter().enumerate() {
            if value.is_some() && before.get(index) != Some(value) && !changes.push(index as u32) {
                break;
            }
        }
        changes.len()
    }
}

/// Treats every byte of a buffer as one property. Used to drive the diff
/// merge directly with hand-built buffers.
#[derive(Default)]
pub struct ByteDeltaEncoder;

impl TableEncoder for ByteDeltaEncoder {
    fn encode(
        &self,
        _table: &SendTable,
        _state: &dyn EntityState,
        _out: &mut PackedWriter,
        _entity: EntityIndex,
    ) -> Result<(), EncodeError> {
        Ok(())
    }

    fn calc_delta(
        &self,
        _table: &SendTable,
        from: &PackedBits,
        to: &PackedBits,
        changes: &mut ChangeList,
        _entity: EntityIndex,
    ) -> usize {
        let len = from.byte_len().max(to.byte_len());
        for index in 0..len {
            if from.bytes().get(index) != to.bytes().get(index) && !changes.push(index as u32) {
                break;
            }
        }
        changes.len()
    }
}
