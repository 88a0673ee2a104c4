use crate::{bit_reader::BitReader, bit_writer::BitWrite, error::SerdeErr};

/// A type that can be written to and read back from a bit stream.
pub trait Serde: Sized + Clone + PartialEq {
    /// Writes the value into the bit stream.
    fn ser(&self, writer: &mut dyn BitWrite);

    /// Parses a value out of the bit stream.
    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr>;

    /// Number of bits [`Serde::ser`] will write for this value.
    fn bit_length(&self) -> u32;
}

pub trait ConstBitLength {
    fn const_bit_length() -> u32;
}
