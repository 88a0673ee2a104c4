use crate::{
    bit_reader::BitReader, bit_writer::BitWrite, error::SerdeErr, serde::Serde, ConstBitLength,
};

pub type UnsignedInteger<const BITS: u8> = SerdeInteger<false, false, BITS>;
pub type SignedInteger<const BITS: u8> = SerdeInteger<true, false, BITS>;
pub type UnsignedVariableInteger<const BITS: u8> = SerdeInteger<false, true, BITS>;
pub type SignedVariableInteger<const BITS: u8> = SerdeInteger<true, true, BITS>;

/// An integer written with an explicit bit budget.
///
/// Fixed integers always take `BITS` bits (plus a sign bit when signed).
/// Variable integers are written in chunks of `BITS` bits, each preceded by a
/// continuation bit, so small values stay small on the wire. With `BITS == 7`
/// every chunk is exactly one byte.
// The generic wrapper delegates to a non-generic inner type to keep monomorphized code small.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct SerdeInteger<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> {
    inner: SerdeIntegerInner,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
struct SerdeIntegerInner {
    magnitude: u64,
    negative: bool,
    signed: bool,
    variable: bool,
    bits: u8,
}

impl SerdeIntegerInner {
    fn try_new(signed: bool, variable: bool, bits: u8, value: i128) -> Result<Self, SerdeErr> {
        if bits == 0 || bits > 64 {
            panic!("SerdeInteger must use between 1 and 64 bits, got {}", bits);
        }

        let out_of_range = SerdeErr::OutOfRange {
            value: value.clamp(i64::MIN as i128, i64::MAX as i128) as i64,
        };

        if !signed && value < 0 {
            return Err(out_of_range);
        }
        let magnitude = value.unsigned_abs();
        if magnitude > u64::MAX as u128 {
            return Err(out_of_range);
        }
        if !variable && magnitude >= (1u128 << bits) {
            return Err(out_of_range);
        }

        Ok(Self {
            magnitude: magnitude as u64,
            negative: value < 0,
            signed,
            variable,
            bits,
        })
    }

    fn get(&self) -> i128 {
        if self.negative {
            -(self.magnitude as i128)
        } else {
            self.magnitude as i128
        }
    }

    fn chunk_mask(&self) -> u128 {
        (1u128 << self.bits) - 1
    }

    fn ser(&self, writer: &mut dyn BitWrite) {
        if self.signed {
            writer.write_bit(self.negative);
        }

        let mut value = self.magnitude as u128;

        if self.variable {
            loop {
                let proceed = value > self.chunk_mask();
                writer.write_bit(proceed);
                for _ in 0..self.bits {
                    writer.write_bit(value & 1 != 0);
                    value >>= 1;
                }
                if !proceed {
                    return;
                }
            }
        } else {
            for _ in 0..self.bits {
                writer.write_bit(value & 1 != 0);
                value >>= 1;
            }
        }
    }

    fn de(reader: &mut BitReader, signed: bool, variable: bool, bits: u8) -> Result<Self, SerdeErr> {
        let negative = if signed { reader.read_bit()? } else { false };

        let mut output: u128 = 0;
        let mut shift: u32 = 0;

        loop {
            let proceed = if variable { reader.read_bit()? } else { false };

            for _ in 0..bits {
                if reader.read_bit()? {
                    if shift >= 64 {
                        return Err(SerdeErr::IntegerOverflow);
                    }
                    output |= 1u128 << shift;
                }
                shift += 1;
            }

            if !proceed {
                break;
            }
        }

        if output > u64::MAX as u128 {
            return Err(SerdeErr::IntegerOverflow);
        }

        Ok(Self {
            magnitude: output as u64,
            negative: negative && output != 0,
            signed,
            variable,
            bits,
        })
    }

    fn bit_length(&self) -> u32 {
        let mut output: u32 = 0;

        if self.signed {
            output += 1;
        }

        if self.variable {
            let mut value = self.magnitude as u128;
            loop {
                let proceed = value > self.chunk_mask();
                output += 1 + self.bits as u32;
                value >>= self.bits;
                if !proceed {
                    break;
                }
            }
        } else {
            output += self.bits as u32;
        }
        output
    }
}

impl<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> SerdeInteger<SIGNED, VARIABLE, BITS> {
    /// # Panics
    ///
    /// Panics if the value cannot be represented with this encoding.
    /// Use [`SerdeInteger::try_new`] for a fallible constructor.
    pub fn new<T: Into<i128>>(value: T) -> Self {
        let value = value.into();
        Self::try_new(value).unwrap_or_else(|_| {
            panic!(
                "can't encode {} as a {} {}-bit integer",
                value,
                if SIGNED { "signed" } else { "unsigned" },
                BITS
            )
        })
    }

    pub fn try_new<T: Into<i128>>(value: T) -> Result<Self, SerdeErr> {
        Ok(Self {
            inner: SerdeIntegerInner::try_new(SIGNED, VARIABLE, BITS, value.into())?,
        })
    }

    pub fn get(&self) -> i128 {
        self.inner.get()
    }

    /// Converts into a concrete integer type, failing when out of range.
    pub fn try_to<T: TryFrom<i128>>(&self) -> Result<T, SerdeErr> {
        let value = self.get();
        T::try_from(value).map_err(|_| SerdeErr::OutOfRange {
            value: value.clamp(i64::MIN as i128, i64::MAX as i128) as i64,
        })
    }
}

impl<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> Serde for SerdeInteger<SIGNED, VARIABLE, BITS> {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.inner.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let inner = SerdeIntegerInner::de(reader, SIGNED, VARIABLE, BITS)?;
        Ok(Self { inner })
    }

    fn bit_length(&self) -> u32 {
        self.inner.bit_length()
    }
}

impl<const SIGNED: bool, const BITS: u8> ConstBitLength for SerdeInteger<SIGNED, false, BITS> {
    fn const_bit_length() -> u32 {
        let mut output: u32 = 0;
        if SIGNED {
            output += 1;
        }
        output + BITS as u32
    }
}
