use std::collections::{BTreeMap, HashMap};

use crate::{
    archetype::archetype_table::ArchetypeId,
    ownership::permissions::OwnershipPermissions,
    types::{InstigatorId, SystemId},
    wire::snapshot_message::ArchetypeEntry,
    world::entity_ref::EntityRef,
};

/// What a receiver knows about one entity of its peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RemoteRecord {
    /// The peer's local ref.
    pub remote: EntityRef,
    /// Our local entity, or `None` when the peer's entity was rejected.
    pub self_entity: Option<EntityRef>,
    pub archetype: ArchetypeId,
    pub origin: EntityRef,
    pub origin_instigator: InstigatorId,
    /// Listed in the current message.
    pub seen: bool,
}

impl RemoteRecord {
    pub fn is_rejected(&self) -> bool {
        self.self_entity.is_none()
    }
}

/// A grant received from upstream and mirrored into local authority.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalGrant {
    pub self_entity: EntityRef,
    pub writable_archetype: ArchetypeId,
    pub permissions: OwnershipPermissions,
    pub systems: Vec<SystemId>,
}

/// Receiver-side mirror of what one peer has told us.
///
/// Records are keyed by the peer's entity id, ordered so every walk over them
/// is ascending by remote id. The archetype table holds the
/// peer's handles and is replaced wholesale by a full remake.
#[derive(Default)]
pub struct ClientSnapshotState {
    records: BTreeMap<u32, RemoteRecord>,
    self_to_remote: HashMap<EntityRef, EntityRef>,
    archetypes: HashMap<ArchetypeId, Vec<SystemId>>,
    grants: HashMap<EntityRef, LocalGrant>,
}

impl ClientSnapshotState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge_archetypes(&mut self, full_remake: bool, entries: &[ArchetypeEntry]) {
        if full_remake {
            self.archetypes.clear();
        }
        for entry in entries {
            self.archetypes.insert(entry.id, entry.systems.clone());
        }
    }

    pub fn archetype_systems(&self, archetype: &ArchetypeId) -> Option<&[SystemId]> {
        if archetype.is_empty() {
            return Some(&[][..]);
        }
        self.archetypes.get(archetype).map(|systems| systems.as_slice())
    }

    pub fn archetype_contains(&self, archetype: &ArchetypeId, system: SystemId) -> bool {
        self.archetype_systems(archetype)
            .map(|systems| systems.binary_search(&system).is_ok())
            .unwrap_or(false)
    }

    /// The record for this exact remote ref.
    pub fn record(&self, remote: &EntityRef) -> Option<&RemoteRecord> {
        match self.records.get(&remote.id) {
            Some(record) if record.remote == *remote => Some(record),
            _ => None,
        }
    }

    pub fn record_mut(&mut self, remote: &EntityRef) -> Option<&mut RemoteRecord> {
        match self.records.get_mut(&remote.id) {
            Some(record) if record.remote == *remote => Some(record),
            _ => None,
        }
    }

    /// Whatever record occupies `remote`'s id, of any version.
    pub fn record_at(&self, id: u32) -> Option<&RemoteRecord> {
        self.records.get(&id)
    }

    pub fn insert_record(&mut self, record: RemoteRecord) {
        if let Some(self_entity) = record.self_entity {
            self.self_to_remote.insert(self_entity, record.remote);
        }
        self.records.insert(record.remote.id, record);
    }

    /// Removes whatever record occupies `id`.
    pub fn remove_at(&mut self, id: u32) -> Option<RemoteRecord> {
        let record = self.records.remove(&id)?;
        if let Some(self_entity) = record.self_entity {
            if self.self_to_remote.get(&self_entity) == Some(&record.remote) {
                self.self_to_remote.remove(&self_entity);
            }
        }
        Some(record)
    }

    pub fn remote_of(&self, self_entity: &EntityRef) -> Option<EntityRef> {
        self.self_to_remote.get(self_entity).copied()
    }

    pub fn is_mapped(&self, self_entity: &EntityRef) -> bool {
        self.self_to_remote.contains_key(self_entity)
    }

    pub fn self_entity_of(&self, remote: &EntityRef) -> Option<EntityRef> {
        self.record(remote).and_then(|record| record.self_entity)
    }

    pub fn mark_all_unseen(&mut self) {
        for record in self.records.values_mut() {
            record.seen = false;
        }
    }

    /// Ids of records not listed in the current message, ascending.
    pub fn unseen(&self) -> Vec<EntityRef> {
        self.records
            .values()
            .filter(|record| !record.seen)
            .map(|record| record.remote)
            .collect()
    }

    /// Every record, ascending by remote id.
    pub fn records(&self) -> impl Iterator<Item = &RemoteRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn grant(&self, remote: &EntityRef) -> Option<&LocalGrant> {
        self.grants.get(remote)
    }

    pub fn insert_grant(&mut self, remote: EntityRef, grant: LocalGrant) -> Option<LocalGrant> {
        self.grants.insert(remote, grant)
    }

    pub fn remove_grant(&mut self, remote: &EntityRef) -> Option<LocalGrant> {
        self.grants.remove(remote)
    }

    pub fn drain_grants(&mut self) -> Vec<LocalGrant> {
        self.grants.drain().map(|(_, grant)| grant).collect()
    }
}
