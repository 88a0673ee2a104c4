use mirra_serde::{read_count, write_count, BitReader, BitWrite, BitWriter, SerdeErr};

use crate::{
    error::ReplicationError,
    system::{adapter::SnapshotAdapter, baseline_column::BaselineColumn, serializer_system::DeserializeTarget},
    types::SystemId,
    world::entity_ref::EntityRef,
};

// Block layout:
//   bit_len: uvarint        bits that follow, up to the padding
//   count: uvarint
//   per entity: has_baseline bit, then a delta (1) or a full value (0)
//   zero padding to a whole byte

/// Encodes `values` for `entities` against `column`, and moves the column
/// forward to `values`.
pub fn encode_block<A: SnapshotAdapter>(
    entities: &[EntityRef],
    values: &[A::Value],
    column: &mut BaselineColumn<A::Value>,
) -> Vec<u8> {
    let mut body = BitWriter::new();
    write_count(&mut body, entities.len());

    for (entity, value) in entities.iter().zip(values.iter()) {
        match column.get(entity) {
            Some(baseline) => {
                body.write_bit(true);
                A::write_delta(value, baseline, &mut body);
            }
            None => {
                body.write_bit(false);
                A::write_full(value, &mut body);
            }
        }
        column.set(entity, value.clone());
    }

    let bit_len = body.bits_written();
    let body = body.to_bytes();

    let mut output = BitWriter::with_capacity(body.len() + 5);
    write_count(&mut output, bit_len as usize);
    output.write_bytes(&body);
    output.to_bytes()
}

/// One decoded block, not yet applied to anything.
#[derive(Debug, PartialEq)]
pub struct DecodedBlock<V> {
    /// Values for entities not masked out, keyed by local entity.
    pub values: Vec<(EntityRef, V)>,
    /// The next baseline of every entity in the block, keyed by remote entity.
    pub baselines: Vec<(EntityRef, V)>,
}

impl<V: Clone> DecodedBlock<V> {
    /// Moves `column` forward to this block.
    pub fn advance(&mut self, column: &mut BaselineColumn<V>) {
        for (remote, value) in self.baselines.drain(..) {
            column.set(&remote, value);
        }
    }
}

/// Decodes one block against `column`. The column is only read; the caller
/// advances it once every block of the message has decoded.
pub fn decode_block<A: SnapshotAdapter>(
    system_id: SystemId,
    bytes: &[u8],
    target: &DeserializeTarget,
    column: &BaselineColumn<A::Value>,
) -> Result<DecodedBlock<A::Value>, ReplicationError> {
    let mut reader = BitReader::new(bytes);
    let expected_bits: u32 = read_count(&mut reader)?
        .try_into()
        .map_err(|_| SerdeErr::IntegerOverflow)?;
    let start = reader.bits_read();

    let framing = |reader: &BitReader| ReplicationError::FramingCorruption {
        system_id,
        expected_bits,
        consumed_bits: reader.bits_read() - start,
    };

    let count = read_count(&mut reader).map_err(|_| framing(&reader))?;
    if count != target.len() {
        return Err(ReplicationError::EntityCountMismatch {
            system_id,
            expected: target.len(),
            found: count,
        });
    }

    let mut values = Vec::with_capacity(count);
    let mut baselines = Vec::with_capacity(count);
    for index in 0..count {
        let remote = target.remote_entities[index];

        let has_baseline = reader.read_bit().map_err(|_| framing(&reader))?;
        let value = if has_baseline {
            let Some(baseline) = column.get(&remote) else {
                return Err(ReplicationError::MissingBaseline {
                    system_id,
                    entity: remote,
                });
            };
            A::read_delta(baseline, &mut reader)
        } else {
            A::read_full(&mut reader)
        }
        .map_err(|_| framing(&reader))?;

        if !target.ignore_mask[index] {
            values.push((target.self_entities[index], value.clone()));
        }
        baselines.push((remote, value));
    }

    let consumed_bits = reader.bits_read() - start;
    if consumed_bits != expected_bits {
        return Err(framing(&reader));
    }

    Ok(DecodedBlock { values, baselines })
}
