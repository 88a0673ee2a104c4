use mirra_serde::{BitReader, BitWrite, Serde, SerdeErr};

/// The wire representation of a replicated value.
///
/// `write_delta`/`read_delta` encode a value relative to the last value the
/// receiver holds. The default writes one "changed" bit, followed by the full
/// value only when it differs from the baseline.
pub trait Snapshot: Clone + PartialEq + Send + Sync + 'static {
    fn write_full(&self, writer: &mut dyn BitWrite);

    fn read_full(reader: &mut BitReader) -> Result<Self, SerdeErr>;

    fn write_delta(&self, baseline: &Self, writer: &mut dyn BitWrite) {
        if self == baseline {
            writer.write_bit(false);
        } else {
            writer.write_bit(true);
            self.write_full(writer);
        }
    }

    fn read_delta(baseline: &Self, reader: &mut BitReader) -> Result<Self, SerdeErr> {
        if reader.read_bit()? {
            Self::read_full(reader)
        } else {
            Ok(baseline.clone())
        }
    }
}

macro_rules! impl_snapshot_for_serde {
    ($($ty:ty),*) => {
        $(
            impl Snapshot for $ty {
                fn write_full(&self, writer: &mut dyn BitWrite) {
                    self.ser(writer);
                }

                fn read_full(reader: &mut BitReader) -> Result<Self, SerdeErr> {
                    <$ty as Serde>::de(reader)
                }
            }
        )*
    };
}

impl_snapshot_for_serde!(bool, u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);
