use naia_serde::{BitReader, BitWrite, FileBitWriter};

/// Upper bound on the packed size of a single entity
pub const MAX_PACKED_ENTITY_BYTES: usize = 2048;

/// Output of one entity encode. Bits go into a growable naia bit writer
/// until `max_bytes` is reached; anything past that is dropped and flags
/// the writer as overflowed.
pub struct PackedWriter {
    writer: FileBitWriter,
    bits_written: u32,
    max_bits: u32,
    overflowed: bool,
}

impl PackedWriter {
    pub fn new() -> Self {
        Self::with_max_bytes(MAX_PACKED_ENTITY_BYTES)
    }

    pub fn with_max_bytes(max_bytes: usize) -> Self {
        let max_bits = u32::try_from(max_bytes.saturating_mul(8)).unwrap_or(u32::MAX);
        Self {
            writer: FileBitWriter::new(),
            bits_written: 0,
            max_bits,
            overflowed: false,
        }
    }

    /// Writes the low `bits` bits of `value`, least significant first
    pub fn write_bits(&mut self, value: u64, bits: u8) {
        for i in 0..bits.min(64) {
            self.write_bit((value >> i) & 1 != 0);
        }
    }

    pub fn bits_written(&self) -> u32 {
        self.bits_written
    }

    pub fn bits_free(&self) -> u32 {
        self.max_bits - self.bits_written
    }

    pub fn is_overflowed(&self) -> bool {
        self.overflowed
    }

    pub fn finish(self) -> PackedBits {
        PackedBits {
            data: Vec::from(self.writer.to_bytes()),
            bit_len: self.bits_written,
        }
    }
}

impl Default for PackedWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BitWrite for PackedWriter {
    fn write_bit(&mut self, bit: bool) {
        if self.bits_written >= self.max_bits {
            self.overflowed = true;
            return;
        }
        self.writer.write_bit(bit);
        self.bits_written += 1;
    }

    fn write_byte(&mut self, byte: u8) {
        let mut temp = byte;
        for _ in 0..8 {
            self.write_bit(temp & 1 != 0);
            temp >>= 1;
        }
    }

    fn is_counter(&self) -> bool {
        false
    }

    fn count_bits(&mut self, _bits: u32) {}
}

/// An encoded entity state: the packed bytes plus the exact bit length
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PackedBits {
    data: Vec<u8>,
    bit_len: u32,
}

impl PackedBits {
    pub fn new(data: Vec<u8>, bit_len: u32) -> Self {
        Self { data, bit_len }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn bit_len(&self) -> u32 {
        self.bit_len
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bit_len == 0
    }

    pub fn reader(&self) -> BitReader<'_> {
        BitReader::new(&self.data)
    }
}
