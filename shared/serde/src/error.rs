use thiserror::Error;

/// The error produced when the bit stream cannot be read back into a value.
///
/// Either the reader ran past the end of its buffer, or the bits it found do not
/// describe a legal value for the type being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SerdeErr {
    #[error("bit stream over-read: needed {needed} more bit(s), {remaining} remaining")]
    OverRead { needed: u32, remaining: u32 },
    #[error("variable-length integer exceeds 64 bits")]
    IntegerOverflow,
    #[error("decoded value {value} does not fit the target type")]
    OutOfRange { value: i64 },
}
