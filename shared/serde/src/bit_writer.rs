use crate::{bit_reader::BitReader, error::SerdeErr};

pub trait BitWrite {
    fn write_bit(&mut self, bit: bool);
    fn write_byte(&mut self, byte: u8);
    fn write_bytes(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.write_byte(*byte);
        }
    }
    fn count_bits(&mut self, bits: u32);
    fn is_counter(&self) -> bool;
}

/// A growable bit-packed writer.
///
/// Bits are packed least-significant first into each byte, so a byte written
/// with [`BitWrite::write_byte`] on a byte boundary appears verbatim in the
/// output. The buffer has no upper bound; framing and fragmentation happen
/// below the replication layer.
pub struct BitWriter {
    scratch: u8,
    scratch_index: u8,
    buffer: Vec<u8>,
    bits_written: u32,
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BitWriter {
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            scratch: 0,
            scratch_index: 0,
            buffer: Vec::with_capacity(bytes),
            bits_written: 0,
        }
    }

    fn flush_scratch(&mut self) {
        if self.scratch_index > 0 {
            let byte = (self.scratch << (8 - self.scratch_index)).reverse_bits();
            self.buffer.push(byte);
            self.scratch = 0;
            self.scratch_index = 0;
        }
    }

    pub fn bits_written(&self) -> u32 {
        self.bits_written
    }

    pub fn is_byte_aligned(&self) -> bool {
        self.scratch_index == 0
    }

    /// Pads with zero bits up to the next byte boundary.
    pub fn align_to_byte(&mut self) {
        while self.scratch_index != 0 {
            self.write_bit(false);
        }
    }

    /// Copies `count` bits out of `reader` into this writer.
    pub fn write_bits_from(&mut self, reader: &mut BitReader, count: u32) -> Result<(), SerdeErr> {
        for _ in 0..count {
            let bit = reader.read_bit()?;
            self.write_bit(bit);
        }
        Ok(())
    }

    pub fn counter(&self) -> BitCounter {
        BitCounter::new(self.bits_written)
    }

    pub fn to_bytes(mut self) -> Vec<u8> {
        self.flush_scratch();
        self.buffer
    }
}

impl BitWrite for BitWriter {
    fn write_bit(&mut self, bit: bool) {
        self.scratch <<= 1;

        if bit {
            self.scratch |= 1;
        }

        self.scratch_index += 1;
        self.bits_written += 1;

        if self.scratch_index >= 8 {
            self.buffer.push(self.scratch.reverse_bits());
            self.scratch_index = 0;
            self.scratch = 0;
        }
    }

    fn write_byte(&mut self, byte: u8) {
        if self.scratch_index == 0 {
            self.buffer.push(byte);
            self.bits_written += 8;
            return;
        }
        let mut temp = byte;
        for _ in 0..8 {
            self.write_bit(temp & 1 != 0);
            temp >>= 1;
        }
    }

    fn count_bits(&mut self, _bits: u32) {
        // writers account for bits as they go
    }

    fn is_counter(&self) -> bool {
        false
    }
}

/// Measures how many bits a value would take without writing it anywhere.
pub struct BitCounter {
    start_bits: u32,
    current_bits: u32,
}

impl BitCounter {
    pub fn new(start_bits: u32) -> Self {
        Self {
            start_bits,
            current_bits: start_bits,
        }
    }

    /// Bits counted since this counter was created.
    pub fn bits_needed(&self) -> u32 {
        self.current_bits - self.start_bits
    }
}

impl BitWrite for BitCounter {
    fn write_bit(&mut self, _: bool) {
        self.current_bits += 1;
    }

    fn write_byte(&mut self, _: u8) {
        self.current_bits += 8;
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.current_bits += 8 * bytes.len() as u32;
    }

    fn count_bits(&mut self, bits: u32) {
        self.current_bits += bits;
    }

    fn is_counter(&self) -> bool {
        true
    }
}
