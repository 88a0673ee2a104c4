use crate::error::SerdeErr;

/// Reads back a buffer produced by [`crate::BitWriter`].
///
/// The cursor is tracked in bits. Any read that would run past the end of the
/// buffer fails with [`SerdeErr::OverRead`] and leaves the cursor untouched.
pub struct BitReader<'b> {
    buffer: &'b [u8],
    cursor: u32,
}

impl<'b> BitReader<'b> {
    pub fn new(buffer: &'b [u8]) -> Self {
        Self { buffer, cursor: 0 }
    }

    pub fn bits_read(&self) -> u32 {
        self.cursor
    }

    pub fn bits_remaining(&self) -> u32 {
        let total = (self.buffer.len() as u64).saturating_mul(8);
        u32::try_from(total.saturating_sub(self.cursor as u64)).unwrap_or(u32::MAX)
    }

    pub fn is_byte_aligned(&self) -> bool {
        self.cursor % 8 == 0
    }

    /// Skips the padding bits up to the next byte boundary.
    pub fn align_to_byte(&mut self) {
        let remainder = self.cursor % 8;
        if remainder != 0 {
            let padding = (8 - remainder).min(self.bits_remaining());
            self.cursor += padding;
        }
    }

    fn check(&self, needed: u32) -> Result<(), SerdeErr> {
        let remaining = self.bits_remaining();
        if needed > remaining {
            return Err(SerdeErr::OverRead { needed, remaining });
        }
        Ok(())
    }

    pub fn read_bit(&mut self) -> Result<bool, SerdeErr> {
        self.check(1)?;
        let byte = self.buffer[(self.cursor / 8) as usize];
        let bit = (byte >> (self.cursor % 8)) & 1 != 0;
        self.cursor += 1;
        Ok(bit)
    }

    pub fn read_byte(&mut self) -> Result<u8, SerdeErr> {
        self.check(8)?;
        if self.is_byte_aligned() {
            let byte = self.buffer[(self.cursor / 8) as usize];
            self.cursor += 8;
            return Ok(byte);
        }
        let mut output: u8 = 0;
        for index in 0..8 {
            if self.read_bit()? {
                output |= 1 << index;
            }
        }
        Ok(output)
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, SerdeErr> {
        let remaining = self.bits_remaining();
        let needed = (count as u64).saturating_mul(8);
        if needed > remaining as u64 {
            return Err(SerdeErr::OverRead {
                needed: u32::try_from(needed).unwrap_or(u32::MAX),
                remaining,
            });
        }
        if self.is_byte_aligned() {
            let start = (self.cursor / 8) as usize;
            self.cursor += needed as u32;
            return Ok(self.buffer[start..start + count].to_vec());
        }
        let mut output = Vec::with_capacity(count);
        for _ in 0..count {
            output.push(self.read_byte()?);
        }
        Ok(output)
    }
}
