use log::debug;

use crate::{
    archetype::archetype_table::{ArchetypeId, ArchetypeTable},
    system::registry::SystemRegistry,
    types::{InstigatorId, SystemId},
    world::{component_kind::LocalArchetype, entity_ref::EntityRef, snapshot_entity::SnapshotEntity},
};

struct HostEntityRecord {
    entity: EntityRef,
    created: bool,
    owned: bool,
    /// Registered during the previous `finalize_register`.
    live: bool,
    seen: bool,
    changed: bool,
    local_archetype: Option<LocalArchetype>,
    replication: ArchetypeId,
    /// Replication archetype as of the previous `finalize_register`.
    previous_replication: ArchetypeId,
    authority: ArchetypeId,
    origin: SnapshotEntity,
}

impl HostEntityRecord {
    fn new(entity: EntityRef, created: bool, owned: bool) -> Self {
        Self {
            entity,
            created,
            owned,
            live: false,
            seen: false,
            changed: true,
            local_archetype: None,
            replication: ArchetypeId::EMPTY,
            previous_replication: ArchetypeId::EMPTY,
            authority: ArchetypeId::EMPTY,
            origin: SnapshotEntity::new(entity, 0),
        }
    }
}

/// An entity whose replication archetype changed since the previous tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArchetypeChange {
    pub entity: EntityRef,
    pub previous: ArchetypeId,
    pub current: ArchetypeId,
}

/// Outcome of one registration pass. Every list is ascending by entity id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegisterSummary {
    /// Entities live last tick and not registered this tick, plus previous
    /// holders of ids that now carry a new version.
    pub removed: Vec<EntityRef>,
    /// Entities that are new or whose replication archetype changed.
    pub updated: Vec<EntityRef>,
    /// Every entity registered this tick.
    pub total: Vec<EntityRef>,
    pub changes: Vec<ArchetypeChange>,
    pub new_archetypes: Vec<ArchetypeId>,
}

/// Producer-side registry of the entities an instigator replicates.
///
/// Records are dense and indexed by entity id. Each tick every replicated
/// entity is registered again; `finalize_register` then diffs the tick
/// against the previous one.
pub struct HostSnapshotState {
    records: Vec<Option<HostEntityRecord>>,
    replication: ArchetypeTable,
    authority: ArchetypeTable,
    replaced: Vec<EntityRef>,
}

impl Default for HostSnapshotState {
    fn default() -> Self {
        Self::new()
    }
}

impl HostSnapshotState {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            replication: ArchetypeTable::new(),
            authority: ArchetypeTable::new(),
            replaced: Vec::new(),
        }
    }

    /// Marks `entity` live for this tick.
    ///
    /// `created` means this process created the entity; `owned` means it is
    /// held on lease from an upstream producer.
    pub fn register_entity(&mut self, entity: EntityRef, created: bool, owned: bool) {
        let index = entity.id as usize;
        if index >= self.records.len() {
            self.records.resize_with(index + 1, || None);
        }

        if let Some(record) = self.records[index].as_mut() {
            if record.entity == entity {
                record.seen = true;
                record.created = created;
                record.owned = owned;
                return;
            }
            if record.live {
                debug!(
                    "entity id {} replaced: {} -> {}",
                    entity.id, record.entity, entity
                );
                self.replaced.push(record.entity);
            }
        }

        let mut record = HostEntityRecord::new(entity, created, owned);
        record.seen = true;
        self.records[index] = Some(record);
    }

    /// Takes back a registration made earlier in the current pass.
    pub fn unregister_entity(&mut self, entity: &EntityRef) {
        if let Some(record) = self.record_mut(entity) {
            record.seen = false;
        }
    }

    pub fn set_origin(&mut self, entity: &EntityRef, origin: SnapshotEntity) {
        if let Some(record) = self.record_mut(entity) {
            record.origin = origin;
        }
    }

    /// Derives the replication and authority archetypes of `entity` from its
    /// local archetype. Nothing is recomputed when the local archetype is the
    /// same as last time.
    pub fn assign_archetype(
        &mut self,
        entity: &EntityRef,
        local_archetype: LocalArchetype,
        registry: &SystemRegistry,
    ) {
        let index = entity.id as usize;
        let Some(Some(record)) = self.records.get_mut(index) else {
            return;
        };
        if record.entity != *entity {
            return;
        }
        if record.local_archetype.as_ref() == Some(&local_archetype) {
            return;
        }

        let replication = self
            .replication
            .intern(registry.derive_archetype(&local_archetype));
        let authority = self
            .authority
            .intern(registry.derive_authority(&local_archetype));

        if replication != record.replication {
            record.changed = true;
        }
        record.replication = replication;
        record.authority = authority;
        record.local_archetype = Some(local_archetype);
    }

    /// Closes the registration pass of this tick.
    pub fn finalize_register(&mut self) -> RegisterSummary {
        let mut summary = RegisterSummary {
            removed: std::mem::take(&mut self.replaced),
            ..Default::default()
        };

        for slot in self.records.iter_mut() {
            let Some(record) = slot.as_mut() else {
                continue;
            };

            if !record.seen {
                if record.live {
                    summary.removed.push(record.entity);
                }
                *slot = None;
                continue;
            }

            summary.total.push(record.entity);
            if record.changed {
                summary.updated.push(record.entity);
                if record.previous_replication != record.replication || !record.live {
                    summary.changes.push(ArchetypeChange {
                        entity: record.entity,
                        previous: record.previous_replication,
                        current: record.replication,
                    });
                }
            }

            record.previous_replication = record.replication;
            record.live = true;
            record.seen = false;
            record.changed = false;
        }

        summary.removed.sort();
        summary.new_archetypes = self.replication.take_new();

        debug!(
            "register: {} total, {} updated, {} removed, {} new archetype(s)",
            summary.total.len(),
            summary.updated.len(),
            summary.removed.len(),
            summary.new_archetypes.len()
        );

        summary
    }

    fn record(&self, entity: &EntityRef) -> Option<&HostEntityRecord> {
        match self.records.get(entity.id as usize) {
            Some(Some(record)) if record.entity == *entity => Some(record),
            _ => None,
        }
    }

    fn record_mut(&mut self, entity: &EntityRef) -> Option<&mut HostEntityRecord> {
        match self.records.get_mut(entity.id as usize) {
            Some(Some(record)) if record.entity == *entity => Some(record),
            _ => None,
        }
    }

    pub fn is_registered(&self, entity: &EntityRef) -> bool {
        self.record(entity).is_some()
    }

    /// Entities registered so far in the current pass, ascending.
    pub fn seen_entities(&self) -> Vec<EntityRef> {
        self.records
            .iter()
            .flatten()
            .filter(|record| record.seen)
            .map(|record| record.entity)
            .collect()
    }

    pub fn replication_archetype(&self, entity: &EntityRef) -> Option<ArchetypeId> {
        self.record(entity).map(|record| record.replication)
    }

    pub fn authority_systems(&self, entity: &EntityRef) -> Option<&[SystemId]> {
        let record = self.record(entity)?;
        self.authority.get(&record.authority)
    }

    pub fn origin(&self, entity: &EntityRef) -> Option<SnapshotEntity> {
        self.record(entity).map(|record| record.origin)
    }

    pub fn origin_instigator(&self, entity: &EntityRef) -> Option<InstigatorId> {
        self.record(entity).map(|record| record.origin.origin_instigator)
    }

    pub fn is_created(&self, entity: &EntityRef) -> bool {
        self.record(entity).map(|record| record.created).unwrap_or(false)
    }

    pub fn is_owned(&self, entity: &EntityRef) -> bool {
        self.record(entity).map(|record| record.owned).unwrap_or(false)
    }

    pub fn replication_table(&self) -> &ArchetypeTable {
        &self.replication
    }

    pub fn replication_table_mut(&mut self) -> &mut ArchetypeTable {
        &mut self.replication
    }

    pub fn systems_of(&self, archetype: &ArchetypeId) -> &[SystemId] {
        self.replication.get(archetype).unwrap_or(&[])
    }
}
