use crate::{types::InstigatorId, world::entity_ref::EntityRef};

/// Attached to every replicated entity.
///
/// Records which instigator first created the entity and the ref it had
/// there. Written once per local entity instance: a fresh entity at a
/// recycled id gets a fresh `SnapshotEntity`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SnapshotEntity {
    pub origin: EntityRef,
    pub origin_instigator: InstigatorId,
}

impl SnapshotEntity {
    pub fn new(origin: EntityRef, origin_instigator: InstigatorId) -> Self {
        Self {
            origin,
            origin_instigator,
        }
    }

    /// Stamp for an entity this instigator created itself.
    pub fn local(entity: EntityRef, local_id: InstigatorId) -> Self {
        Self::new(entity, local_id)
    }

    pub fn originated_by(&self, instigator: InstigatorId) -> bool {
        self.origin_instigator == instigator
    }
}
