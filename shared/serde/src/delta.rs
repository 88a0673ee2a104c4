use crate::{
    bit_reader::BitReader, bit_writer::BitWrite, error::SerdeErr, integer::UnsignedVariableInteger,
    serde::Serde,
};

/// Maps signed integers onto unsigned ones so small magnitudes stay small.
pub fn zigzag_encode(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

pub fn zigzag_decode(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

fn write_uvarint(writer: &mut dyn BitWrite, value: u32) {
    UnsignedVariableInteger::<7>::new(value).ser(writer);
}

fn read_uvarint(reader: &mut BitReader) -> Result<u32, SerdeErr> {
    UnsignedVariableInteger::<7>::de(reader)?.try_to()
}

/// Delta-predictive unsigned coder.
///
/// Each value is written as the wrapping difference from the previous value
/// in the same sequence. Ascending id lists therefore cost about one byte per
/// entry. Reader and writer must walk the sequence in the same order, starting
/// from a fresh coder.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsignedDelta {
    last: u32,
}

impl UnsignedDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, writer: &mut dyn BitWrite, value: u32) {
        write_uvarint(writer, value.wrapping_sub(self.last));
        self.last = value;
    }

    pub fn read(&mut self, reader: &mut BitReader) -> Result<u32, SerdeErr> {
        let diff = read_uvarint(reader)?;
        self.last = self.last.wrapping_add(diff);
        Ok(self.last)
    }
}

/// Delta-predictive signed coder, zigzag-mapping each difference.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignedDelta {
    last: i32,
}

impl SignedDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, writer: &mut dyn BitWrite, value: i32) {
        write_uvarint(writer, zigzag_encode(value.wrapping_sub(self.last)));
        self.last = value;
    }

    pub fn read(&mut self, reader: &mut BitReader) -> Result<i32, SerdeErr> {
        let diff = zigzag_decode(read_uvarint(reader)?);
        self.last = self.last.wrapping_add(diff);
        Ok(self.last)
    }
}

/// Plain unsigned varint, for counts and lengths.
pub fn write_count(writer: &mut dyn BitWrite, count: usize) {
    UnsignedVariableInteger::<7>::new(count as u64).ser(writer);
}

pub fn read_count(reader: &mut BitReader) -> Result<usize, SerdeErr> {
    UnsignedVariableInteger::<7>::de(reader)?.try_to()
}
