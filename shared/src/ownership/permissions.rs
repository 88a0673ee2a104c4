use bitflags::bitflags;

use crate::{archetype::archetype_table::ArchetypeId, world::entity_ref::EntityRef};

bitflags! {
    /// What a downstream peer may do with the entities it uploads.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct OwnershipPermissions: u32 {
        const CREATE_ENTITY = 1 << 0;
        const DESTROY_CREATED_ENTITY = 1 << 1;
        const MODIFY_OWNED_ARCHETYPE = 1 << 2;
        const DESTROY_OWNED_ENTITY = 1 << 3;
    }
}

/// Write authority over part of an entity, delegated to one peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OwnershipRecord {
    pub entity: EntityRef,
    /// Systems the owner may write. [`ArchetypeId::EMPTY`] revokes the grant.
    pub writable_archetype: ArchetypeId,
    pub permissions: OwnershipPermissions,
}

impl OwnershipRecord {
    pub fn grant(
        entity: EntityRef,
        writable_archetype: ArchetypeId,
        permissions: OwnershipPermissions,
    ) -> Self {
        Self {
            entity,
            writable_archetype,
            permissions,
        }
    }

    pub fn revoke(entity: EntityRef) -> Self {
        Self {
            entity,
            writable_archetype: ArchetypeId::EMPTY,
            permissions: OwnershipPermissions::empty(),
        }
    }

    pub fn is_revoke(&self) -> bool {
        self.writable_archetype.is_empty()
    }
}
