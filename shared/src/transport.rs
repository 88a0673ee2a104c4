use crate::types::InstigatorId;

/// Moves whole snapshot payloads between instigators.
///
/// Ordering, acknowledgement and fragmentation are the implementor's concern.
pub trait Transport {
    fn send(&mut self, peer: InstigatorId, payload: Vec<u8>);
    fn receive(&mut self) -> Option<(InstigatorId, Vec<u8>)>;
}
