use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, trace, warn};

use crate::{
    archetype::archetype_table::ArchetypeId,
    error::ReceiveError,
    instigator::receive_report::ReceiveReport,
    ownership::{
        local_authority::LocalAuthority,
        pending_ownership::PendingOwnership,
        permissions::{OwnershipPermissions, OwnershipRecord},
    },
    snapshot::client_snapshot_state::{ClientSnapshotState, LocalGrant, RemoteRecord},
    system::{
        registry::SystemRegistry,
        serializer_system::{ArchetypeUpdate, DeserializeTarget},
    },
    types::{InstigatorId, PeerRole, SystemId, Tick},
    wire::snapshot_message::{EntityEntry, SnapshotMessage},
    work_group::WorkGroup,
    world::{
        entity_ref::EntityRef,
        snapshot_entity::SnapshotEntity,
        world_commands::WorldCommands,
        world_type::{WorldMutExt, WorldMutType},
    },
};

/// Write authority this instigator has handed to its peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedGrant {
    pub record: OwnershipRecord,
    /// Systems of the writable archetype, ascending.
    pub systems: Vec<SystemId>,
}

impl OwnedGrant {
    pub fn contains(&self, system: SystemId) -> bool {
        self.systems.binary_search(&system).is_ok()
    }
}

#[derive(Clone, Copy)]
struct IncomingChange {
    remote: EntityRef,
    previous: ArchetypeId,
    current: ArchetypeId,
}

/// Everything one instigator tracks about one peer.
///
/// Holds the receive side (what the peer told us) and the send side (full
/// remake requests and the ownership leases handed to the peer).
pub struct ClientInstigator {
    peer: InstigatorId,
    role: PeerRole,
    permissions: OwnershipPermissions,
    state: ClientSnapshotState,
    pending_ownership: PendingOwnership,
    full_remake_pending: bool,
    owned: BTreeMap<EntityRef, OwnedGrant>,
    outgoing_ownership: Vec<OwnershipRecord>,
    warned_systems: HashSet<SystemId>,
}

impl ClientInstigator {
    pub fn new(
        peer: InstigatorId,
        role: PeerRole,
        permissions: OwnershipPermissions,
        pending_ownership_ttl: Tick,
    ) -> Self {
        Self {
            peer,
            role,
            permissions,
            state: ClientSnapshotState::new(),
            pending_ownership: PendingOwnership::new(pending_ownership_ttl),
            full_remake_pending: true,
            owned: BTreeMap::new(),
            outgoing_ownership: Vec::new(),
            warned_systems: HashSet::new(),
        }
    }

    pub fn peer(&self) -> InstigatorId {
        self.peer
    }

    pub fn role(&self) -> PeerRole {
        self.role
    }

    pub fn permissions(&self) -> OwnershipPermissions {
        self.permissions
    }

    pub fn set_permissions(&mut self, permissions: OwnershipPermissions) {
        self.permissions = permissions;
    }

    pub fn state(&self) -> &ClientSnapshotState {
        &self.state
    }

    pub fn pending_ownership(&self) -> &PendingOwnership {
        &self.pending_ownership
    }

    // Send side

    /// The next message to this peer restates everything.
    pub fn request_full_remake(&mut self) {
        self.full_remake_pending = true;
    }

    pub fn is_full_remake_pending(&self) -> bool {
        self.full_remake_pending
    }

    pub(crate) fn take_full_remake(&mut self) -> bool {
        std::mem::replace(&mut self.full_remake_pending, false)
    }

    pub fn owns(&self, entity: &EntityRef) -> bool {
        self.owned.contains_key(entity)
    }

    pub fn owned_grant(&self, entity: &EntityRef) -> Option<&OwnedGrant> {
        self.owned.get(entity)
    }

    pub fn owned_entities(&self) -> impl Iterator<Item = &EntityRef> {
        self.owned.keys()
    }

    pub(crate) fn insert_grant(&mut self, entity: EntityRef, grant: OwnedGrant) {
        self.outgoing_ownership.retain(|record| record.entity != entity);
        self.outgoing_ownership.push(grant.record);
        self.owned.insert(entity, grant);
    }

    /// Ends the lease on `entity`, telling the peer when `notify` is set.
    pub(crate) fn remove_grant(&mut self, entity: &EntityRef, notify: bool) -> Option<OwnedGrant> {
        let grant = self.owned.remove(entity)?;
        self.outgoing_ownership.retain(|record| record.entity != *entity);
        if notify {
            self.outgoing_ownership.push(OwnershipRecord::revoke(*entity));
        }
        Some(grant)
    }

    /// Drops all send-side knowledge of an entity that stopped being replicated.
    pub(crate) fn forget_entity(&mut self, entity: &EntityRef) {
        self.owned.remove(entity);
        self.outgoing_ownership.retain(|record| record.entity != *entity);
    }

    /// Ownership entries for the next message. A full remake restates every
    /// live grant.
    pub(crate) fn take_outgoing_ownership(&mut self, full_remake: bool) -> Vec<OwnershipRecord> {
        let queued = std::mem::take(&mut self.outgoing_ownership);
        if !full_remake {
            return queued;
        }

        let mut records: Vec<OwnershipRecord> = queued
            .into_iter()
            .filter(|record| record.is_revoke() && !self.owned.contains_key(&record.entity))
            .collect();
        records.extend(self.owned.values().map(|grant| grant.record));
        records
    }

    /// Releases every grant this peer handed us.
    pub(crate) fn release_local_grants(&mut self, authority: &mut LocalAuthority) {
        for grant in self.state.drain_grants() {
            authority.release(&grant.self_entity, &grant.systems);
        }
        self.pending_ownership.clear();
    }

    // Receive side

    /// Applies one message from this peer to `world`.
    ///
    /// When a system block fails to decode, every value of the message is
    /// dropped and the baselines stay where they were. The entity tables are
    /// kept: their spawns, despawns and archetype hooks take effect, and the
    /// error carries the report of them.
    pub fn receive<W: WorldMutType>(
        &mut self,
        local_id: InstigatorId,
        bytes: &[u8],
        world: &mut W,
        registry: &mut SystemRegistry,
        authority: &mut LocalAuthority,
    ) -> Result<ReceiveReport, ReceiveError> {
        let message = SnapshotMessage::read(bytes)?;
        let tick = message.tick;
        let mut report = ReceiveReport::new(self.peer, tick, message.full_remake);
        let mut commands = WorldCommands::new();
        let mut changes = Vec::new();

        trace!(
            "peer {} tick {}: {} entities, {} removed, {} blocks",
            self.peer,
            tick,
            message.entities.len(),
            message.removed.len(),
            message.blocks.len()
        );

        if message.full_remake {
            debug!("full remake from peer {} at tick {}", self.peer, tick);
            registry.remake_source(self.peer);
            self.state.mark_all_unseen();
        }
        self.state
            .merge_archetypes(message.full_remake, &message.archetypes);

        for entry in &message.entities {
            self.apply_entity_entry(
                local_id,
                entry,
                world,
                registry,
                authority,
                &mut commands,
                &mut changes,
                &mut report,
            );
        }

        let removed = if message.full_remake {
            self.state.unseen()
        } else {
            message.removed.clone()
        };
        for remote in removed {
            self.remove_record(&remote, registry, authority, &mut commands, &mut report);
        }

        self.apply_ownership(tick, &message.ownership, authority, &mut report);

        self.run_archetype_hooks(&changes, registry, authority, &mut commands);

        let mut targets = self.deserialize_targets(authority);

        let mut work = WorkGroup::new();
        let mut prepared = Vec::new();
        for block in message.blocks {
            let Some(system) = registry.get_mut(block.system_id) else {
                if self.warned_systems.insert(block.system_id) {
                    warn!(
                        "peer {} sent a block for unknown system {}, skipping",
                        self.peer, block.system_id
                    );
                }
                report.skipped_systems.push(block.system_id);
                continue;
            };
            let target = targets
                .remove(&block.system_id)
                .unwrap_or_else(|| DeserializeTarget::empty(self.peer));
            system.prepare_deserialize(tick, block.bytes, target, &mut work);
            prepared.push(block.system_id);
        }

        if let Err(error) = work.join() {
            for system_id in &prepared {
                if let Some(system) = registry.get_mut(*system_id) {
                    system.abort_deserialize();
                }
            }
            warn!(
                "dropping values of tick {} from peer {}: {}",
                tick, self.peer, error
            );
            commands.apply(world);
            return Err(ReceiveError::partial(error, report));
        }

        for system_id in &prepared {
            if let Some(system) = registry.get_mut(*system_id) {
                system.finalize_deserialize(&mut *world);
            }
        }
        commands.apply(world);

        report.applied_systems = prepared;
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_entity_entry<W: WorldMutType>(
        &mut self,
        local_id: InstigatorId,
        entry: &EntityEntry,
        world: &mut W,
        registry: &mut SystemRegistry,
        authority: &mut LocalAuthority,
        commands: &mut WorldCommands,
        changes: &mut Vec<IncomingChange>,
        report: &mut ReceiveReport,
    ) {
        let remote = entry.entity;

        if let Some(record) = self.state.record_mut(&remote) {
            record.seen = true;
            if record.archetype != entry.archetype {
                changes.push(IncomingChange {
                    remote,
                    previous: record.archetype,
                    current: entry.archetype,
                });
                record.archetype = entry.archetype;
            }
            return;
        }

        // Another version at the same id is a different entity.
        if let Some(stale) = self.state.record_at(remote.id).map(|record| record.remote) {
            self.remove_record(&stale, registry, authority, commands, report);
        }

        let self_entity = self.resolve_entity(local_id, entry, world, report);
        self.state.insert_record(RemoteRecord {
            remote,
            self_entity,
            archetype: entry.archetype,
            origin: entry.origin,
            origin_instigator: entry.origin_instigator,
            seen: true,
        });
        changes.push(IncomingChange {
            remote,
            previous: ArchetypeId::EMPTY,
            current: entry.archetype,
        });
    }

    /// Picks the local entity for a remote entity seen for the first time.
    fn resolve_entity<W: WorldMutType>(
        &mut self,
        local_id: InstigatorId,
        entry: &EntityEntry,
        world: &mut W,
        report: &mut ReceiveReport,
    ) -> Option<EntityRef> {
        let adoptable = entry.origin_instigator == local_id
            && !entry.origin.is_null()
            && world.has_entity(&entry.origin)
            && !self.state.is_mapped(&entry.origin);

        if adoptable {
            debug!(
                "peer {} entity {} adopted as {}",
                self.peer, entry.entity, entry.origin
            );
            report.adopted.push(entry.origin);
            return Some(entry.origin);
        }

        if self.role == PeerRole::Downstream {
            if entry.origin_instigator != self.peer {
                warn!(
                    "peer {} sent entity {} it did not create, rejecting",
                    self.peer, entry.entity
                );
                report.rejected.push(entry.entity);
                return None;
            }
            if !self.permissions.contains(OwnershipPermissions::CREATE_ENTITY) {
                warn!(
                    "peer {} may not create entities, rejecting {}",
                    self.peer, entry.entity
                );
                report.rejected.push(entry.entity);
                return None;
            }
        }

        let entity = world.spawn_entity();
        world.insert_component(
            &entity,
            SnapshotEntity::new(entry.origin, entry.origin_instigator),
        );
        debug!(
            "peer {} entity {} spawned as {}",
            self.peer, entry.entity, entity
        );
        report.spawned.push(entity);
        Some(entity)
    }

    /// Forgets `remote` and destroys its local entity when the peer may do so.
    fn remove_record(
        &mut self,
        remote: &EntityRef,
        registry: &mut SystemRegistry,
        authority: &mut LocalAuthority,
        commands: &mut WorldCommands,
        report: &mut ReceiveReport,
    ) {
        let Some(record) = self.state.record(remote).copied() else {
            debug!("peer {} removed unknown entity {}", self.peer, remote);
            return;
        };

        let systems = registry.ids();
        registry.invalidate_received(&systems, self.peer, remote);

        if let Some(grant) = self.state.remove_grant(remote) {
            authority.release(&grant.self_entity, &grant.systems);
        }
        self.state.remove_at(remote.id);

        let Some(self_entity) = record.self_entity else {
            return;
        };
        let destroy = self.may_destroy(&record, &self_entity);
        if self.remove_grant(&self_entity, true).is_some() {
            debug!(
                "peer {} dropped owned entity {}, lease ended",
                self.peer, self_entity
            );
        }
        if destroy {
            commands.despawn(self_entity);
            authority.forget_entity(&self_entity);
            report.despawned.push(self_entity);
        }
    }

    fn may_destroy(&self, record: &RemoteRecord, self_entity: &EntityRef) -> bool {
        if self.role == PeerRole::Upstream {
            return true;
        }

        if self.owned.contains_key(self_entity) {
            let allowed = self
                .permissions
                .contains(OwnershipPermissions::DESTROY_OWNED_ENTITY);
            if !allowed {
                debug!(
                    "peer {} released owned entity {} without destroying it",
                    self.peer, self_entity
                );
            }
            return allowed;
        }

        if record.origin_instigator == self.peer {
            let allowed = self
                .permissions
                .contains(OwnershipPermissions::DESTROY_CREATED_ENTITY);
            if !allowed {
                warn!(
                    "peer {} may not destroy its entity {}, keeping it",
                    self.peer, self_entity
                );
            }
            return allowed;
        }

        false
    }

    fn apply_ownership(
        &mut self,
        tick: Tick,
        entries: &[OwnershipRecord],
        authority: &mut LocalAuthority,
        report: &mut ReceiveReport,
    ) {
        if self.role == PeerRole::Downstream {
            if !entries.is_empty() {
                warn!(
                    "ignoring {} ownership entries from downstream peer {}",
                    entries.len(),
                    self.peer
                );
            }
            return;
        }

        let state = &mut self.state;
        self.pending_ownership
            .retry(tick, |record| try_apply_ownership(state, authority, record, report));

        for record in entries {
            self.pending_ownership.cancel(record);
            if try_apply_ownership(&mut self.state, authority, record, report) {
                continue;
            }
            if record.is_revoke() {
                continue;
            }
            debug!(
                "grant for unknown entity {} from peer {} held back",
                record.entity, self.peer
            );
            self.pending_ownership.queue(tick, *record);
        }
    }

    fn run_archetype_hooks(
        &self,
        changes: &[IncomingChange],
        registry: &mut SystemRegistry,
        authority: &LocalAuthority,
        commands: &mut WorldCommands,
    ) {
        let mut updates: BTreeMap<SystemId, Vec<ArchetypeUpdate>> = BTreeMap::new();

        for change in changes {
            let previous = self
                .state
                .archetype_systems(&change.previous)
                .unwrap_or(&[]);
            let Some(current) = self.state.archetype_systems(&change.current) else {
                warn!(
                    "peer {} entity {} uses unknown archetype {}",
                    self.peer, change.remote, change.current
                );
                continue;
            };

            let left: Vec<SystemId> = previous
                .iter()
                .filter(|system| current.binary_search(system).is_err())
                .copied()
                .collect();
            let entered: Vec<SystemId> = current
                .iter()
                .filter(|system| previous.binary_search(system).is_err())
                .copied()
                .collect();

            registry.invalidate_received(&left, self.peer, &change.remote);

            let Some(record) = self.state.record(&change.remote) else {
                continue;
            };
            let Some(self_entity) = record.self_entity else {
                continue;
            };
            if !self.hooks_permitted(record, &self_entity, change.previous.is_empty()) {
                continue;
            }

            let batches = [(left, false), (entered, true)];
            for (systems, contains) in batches {
                for system in systems {
                    if authority.has_authority(&self_entity, system) {
                        continue;
                    }
                    updates.entry(system).or_default().push(ArchetypeUpdate {
                        self_entity,
                        remote_entity: change.remote,
                        contains,
                    });
                }
            }
        }

        for (system_id, batch) in updates {
            if let Some(system) = registry.get_mut(system_id) {
                system.on_archetype_update(self.peer, &batch, commands);
            }
        }
    }

    fn hooks_permitted(&self, record: &RemoteRecord, self_entity: &EntityRef, is_new: bool) -> bool {
        if self.role == PeerRole::Upstream || is_new {
            return true;
        }
        if self.owned.contains_key(self_entity) {
            let allowed = self
                .permissions
                .contains(OwnershipPermissions::MODIFY_OWNED_ARCHETYPE);
            if !allowed {
                debug!(
                    "peer {} may not change the archetype of owned entity {}",
                    self.peer, self_entity
                );
            }
            return allowed;
        }
        record.origin_instigator == self.peer
    }

    /// Per-system entity lists, each ascending by remote id.
    fn deserialize_targets(&self, authority: &LocalAuthority) -> HashMap<SystemId, DeserializeTarget> {
        let mut targets: HashMap<SystemId, DeserializeTarget> = HashMap::new();

        for record in self.state.records() {
            let Some(systems) = self.state.archetype_systems(&record.archetype) else {
                continue;
            };
            for system in systems {
                let target = targets
                    .entry(*system)
                    .or_insert_with(|| DeserializeTarget::empty(self.peer));
                match record.self_entity {
                    Some(self_entity) => target.push(
                        self_entity,
                        record.remote,
                        self.is_ignored(record, &self_entity, *system, authority),
                    ),
                    None => target.push(EntityRef::NULL, record.remote, true),
                }
            }
        }

        targets
    }

    fn is_ignored(
        &self,
        record: &RemoteRecord,
        self_entity: &EntityRef,
        system: SystemId,
        authority: &LocalAuthority,
    ) -> bool {
        if authority.has_authority(self_entity, system) {
            return true;
        }
        if let Some(grant) = self.owned.get(self_entity) {
            return !grant.contains(system);
        }
        self.role == PeerRole::Downstream && record.origin_instigator != self.peer
    }
}

/// Applies one ownership entry received from upstream. Returns false while
/// the entity or its writable archetype is still unknown.
fn try_apply_ownership(
    state: &mut ClientSnapshotState,
    authority: &mut LocalAuthority,
    record: &OwnershipRecord,
    report: &mut ReceiveReport,
) -> bool {
    let Some(self_entity) = state.self_entity_of(&record.entity) else {
        return false;
    };

    if record.is_revoke() {
        if let Some(grant) = state.remove_grant(&record.entity) {
            authority.release(&grant.self_entity, &grant.systems);
            report.revoked.push(self_entity);
        }
        return true;
    }

    if authority.is_created(&self_entity) {
        return true;
    }

    let Some(systems) = state
        .archetype_systems(&record.writable_archetype)
        .map(<[SystemId]>::to_vec)
    else {
        return false;
    };

    if let Some(previous) = state.remove_grant(&record.entity) {
        authority.release(&previous.self_entity, &previous.systems);
    }
    authority.grant(self_entity, &systems);
    state.insert_grant(
        record.entity,
        LocalGrant {
            self_entity,
            writable_archetype: record.writable_archetype,
            permissions: record.permissions,
            systems,
        },
    );
    report.granted.push(self_entity);
    true
}
