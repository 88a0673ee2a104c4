use std::collections::HashMap;

use log::{debug, info, trace, warn};

use crate::{
    archetype::archetype_table::ArchetypeId,
    config::InstigatorConfig,
    error::{ReceiveError, ReplicationError},
    instigator::{
        client_instigator::{ClientInstigator, OwnedGrant},
        receive_report::ReceiveReport,
    },
    ownership::{
        error::OwnershipError,
        local_authority::LocalAuthority,
        permissions::{OwnershipPermissions, OwnershipRecord},
    },
    snapshot::host_snapshot_state::{HostSnapshotState, RegisterSummary},
    system::{merge_group::{MergeGroupCollection, PeerInfo}, registry::SystemRegistry},
    types::{InstigatorId, PeerRole, SystemId, Tick},
    wire::snapshot_message::{ArchetypeEntry, EntityEntry, SnapshotMessage, SystemBlock},
    work_group::WorkGroup,
    world::{
        entity_ref::EntityRef,
        snapshot_entity::SnapshotEntity,
        world_type::{WorldMutExt, WorldMutType, WorldRefExt, WorldRefType},
    },
};

/// The replication state of one process.
///
/// Owns the producer-side state shared by every peer, one
/// [`ClientInstigator`] per peer, and the write authority this process holds.
/// A server keeps one downstream peer per connected client; a client keeps a
/// single upstream peer for its server.
pub struct BroadcastInstigator {
    config: InstigatorConfig,
    host: HostSnapshotState,
    clients: Vec<ClientInstigator>,
    authority: LocalAuthority,
}

impl BroadcastInstigator {
    pub fn new(config: InstigatorConfig) -> Self {
        Self {
            config,
            host: HostSnapshotState::new(),
            clients: Vec::new(),
            authority: LocalAuthority::new(),
        }
    }

    pub fn local_id(&self) -> InstigatorId {
        self.config.local_id
    }

    pub fn config(&self) -> &InstigatorConfig {
        &self.config
    }

    pub fn host(&self) -> &HostSnapshotState {
        &self.host
    }

    pub fn authority(&self) -> &LocalAuthority {
        &self.authority
    }

    // Peers

    /// Starts tracking `peer`. A peer that is already known starts over.
    pub fn add_client(
        &mut self,
        peer: InstigatorId,
        role: PeerRole,
        permissions: OwnershipPermissions,
    ) -> &mut ClientInstigator {
        self.clients.retain(|client| client.peer() != peer);
        info!("peer {} added as {:?}", peer, role);
        self.clients.push(ClientInstigator::new(
            peer,
            role,
            permissions,
            self.config.pending_ownership_ttl,
        ));
        let index = self.clients.len() - 1;
        &mut self.clients[index]
    }

    /// Stops tracking `peer`, dropping its baselines and every lease it held
    /// in either direction.
    pub fn remove_client(&mut self, peer: InstigatorId, registry: &mut SystemRegistry) -> bool {
        let Some(index) = self.clients.iter().position(|client| client.peer() == peer) else {
            return false;
        };
        let mut client = self.clients.remove(index);
        client.release_local_grants(&mut self.authority);
        registry.forget_instigator(peer);
        info!("peer {} removed", peer);
        true
    }

    /// Restarts the stream toward `peer`: its sent baselines are dropped and
    /// the next message is a full remake.
    pub fn reset_client(
        &mut self,
        peer: InstigatorId,
        registry: &mut SystemRegistry,
    ) -> Result<(), ReplicationError> {
        let client = self
            .clients
            .iter_mut()
            .find(|client| client.peer() == peer)
            .ok_or(ReplicationError::UnknownPeer { peer })?;
        registry.reset_instigator(peer);
        client.request_full_remake();
        debug!("peer {} reset", peer);
        Ok(())
    }

    pub fn client(&self, peer: InstigatorId) -> Option<&ClientInstigator> {
        self.clients.iter().find(|client| client.peer() == peer)
    }

    pub fn client_mut(&mut self, peer: InstigatorId) -> Option<&mut ClientInstigator> {
        self.clients.iter_mut().find(|client| client.peer() == peer)
    }

    pub fn clients(&self) -> impl Iterator<Item = &ClientInstigator> {
        self.clients.iter()
    }

    pub fn peers(&self) -> Vec<PeerInfo> {
        self.clients
            .iter()
            .map(|client| PeerInfo::new(client.peer(), client.role()))
            .collect()
    }

    // Entities

    /// Marks `entity` as replicated for the coming tick. Must be called again
    /// every tick the entity should stay replicated.
    pub fn register_entity(&mut self, entity: EntityRef, created: bool, owned: bool) {
        self.host.register_entity(entity, created, owned);
    }

    /// Gives this process write authority over every system of `entity`.
    pub fn mark_created(&mut self, entity: EntityRef) {
        self.authority.mark_created(entity);
    }

    pub fn has_authority(&self, entity: &EntityRef, system: SystemId) -> bool {
        self.authority.has_authority(entity, system)
    }

    // Ownership

    /// Leases the delegable systems of `entity` to the downstream `peer`.
    ///
    /// A lease held by another peer is revoked first. The entity must have
    /// been replicated at least once.
    pub fn grant_ownership(
        &mut self,
        entity: EntityRef,
        peer: InstigatorId,
    ) -> Result<ArchetypeId, OwnershipError> {
        if !self.host.is_registered(&entity) {
            return Err(OwnershipError::EntityNotRegistered {
                entity_id: entity.to_string(),
            });
        }
        if self.host.is_owned(&entity) {
            return Err(OwnershipError::NotGrantable {
                entity_id: entity.to_string(),
            });
        }
        let index = self
            .clients
            .iter()
            .position(|client| client.peer() == peer)
            .ok_or(OwnershipError::UnknownClient { peer })?;
        if self.clients[index].role() != PeerRole::Downstream {
            return Err(OwnershipError::NotGrantable {
                entity_id: entity.to_string(),
            });
        }

        let systems = self
            .host
            .authority_systems(&entity)
            .map(<[SystemId]>::to_vec)
            .unwrap_or_default();
        if systems.is_empty() {
            return Err(OwnershipError::NoDelegableSystems {
                entity_id: entity.to_string(),
            });
        }

        let writable_archetype = self.host.replication_table_mut().intern(systems.clone());

        for (other, client) in self.clients.iter_mut().enumerate() {
            if other != index && client.remove_grant(&entity, true).is_some() {
                debug!("lease on {} moved away from peer {}", entity, client.peer());
            }
        }

        let client = &mut self.clients[index];
        let record = OwnershipRecord::grant(entity, writable_archetype, client.permissions());
        client.insert_grant(entity, OwnedGrant { record, systems });
        info!(
            "entity {} leased to peer {} (archetype {})",
            entity, peer, writable_archetype
        );
        Ok(writable_archetype)
    }

    /// Ends the lease on `entity`, returning the peer that held it.
    pub fn revoke_ownership(&mut self, entity: &EntityRef) -> Option<InstigatorId> {
        for client in self.clients.iter_mut() {
            if client.remove_grant(entity, true).is_some() {
                info!("lease on {} revoked from peer {}", entity, client.peer());
                return Some(client.peer());
            }
        }
        None
    }

    pub fn owner_of(&self, entity: &EntityRef) -> Option<InstigatorId> {
        self.clients
            .iter()
            .find(|client| client.owns(entity))
            .map(|client| client.peer())
    }

    // Ticks

    /// Closes the tick: diffs the registered entities against the previous
    /// tick, encodes every system once per merge group and returns one
    /// message per peer.
    pub fn serialize<W: WorldMutType>(
        &mut self,
        tick: Tick,
        world: &mut W,
        registry: &mut SystemRegistry,
    ) -> Result<Vec<(InstigatorId, Vec<u8>)>, ReplicationError> {
        self.register_archetypes(world, registry);
        let summary = self.host.finalize_register();
        self.invalidate_departures(&summary, registry);

        let lists = self.system_lists(&summary, registry);
        let peers = self.peers();

        let mut work = WorkGroup::new();
        let mut prepared: Vec<(SystemId, MergeGroupCollection)> = Vec::new();
        {
            let world: &dyn WorldRefType = &*world;
            for (system_id, entities) in &lists {
                let Some(system) = registry.get_mut(*system_id) else {
                    continue;
                };
                let mut groups = MergeGroupCollection::new();
                system.update_merge_groups(&peers, &mut groups);
                if groups.is_empty() {
                    continue;
                }
                system.prepare_serialize(tick, world, &groups, entities, &mut work)?;
                prepared.push((*system_id, groups));
            }
        }
        work.join()?;

        let mut blocks: HashMap<InstigatorId, Vec<SystemBlock>> = HashMap::new();
        for (system_id, groups) in &prepared {
            let Some(system) = registry.get_mut(*system_id) else {
                continue;
            };
            for (index, members) in groups.groups().iter().enumerate() {
                let bytes = system.finalize_serialize(index)?;
                for member in members {
                    blocks.entry(*member).or_default().push(SystemBlock {
                        system_id: *system_id,
                        bytes: bytes.clone(),
                    });
                }
            }
        }

        let mut output = Vec::with_capacity(self.clients.len());
        for client in self.clients.iter_mut() {
            let full_remake = client.take_full_remake();
            let mut message = SnapshotMessage::new(tick, full_remake);
            let table = self.host.replication_table();

            let archetypes: Vec<ArchetypeId> = if full_remake {
                table.ids().collect()
            } else {
                summary.new_archetypes.clone()
            };
            message.archetypes = archetypes
                .into_iter()
                .map(|id| ArchetypeEntry {
                    id,
                    systems: table.get(&id).map(<[SystemId]>::to_vec).unwrap_or_default(),
                })
                .collect();

            let listed = if full_remake {
                &summary.total
            } else {
                &summary.updated
            };
            message.entities = listed
                .iter()
                .filter_map(|entity| entity_entry(&self.host, entity))
                .collect();
            if !full_remake {
                message.removed = summary.removed.clone();
            }
            message.ownership = client.take_outgoing_ownership(full_remake);
            message.blocks = blocks.remove(&client.peer()).unwrap_or_default();

            let bytes = message.write();
            trace!(
                "tick {}: {} bytes to peer {}{}",
                tick,
                bytes.len(),
                client.peer(),
                if full_remake { " (full remake)" } else { "" }
            );
            output.push((client.peer(), bytes));
        }

        Ok(output)
    }

    /// Applies one message from `peer`.
    pub fn receive<W: WorldMutType>(
        &mut self,
        peer: InstigatorId,
        bytes: &[u8],
        world: &mut W,
        registry: &mut SystemRegistry,
    ) -> Result<ReceiveReport, ReceiveError> {
        let local_id = self.config.local_id;
        let client = self
            .clients
            .iter_mut()
            .find(|client| client.peer() == peer)
            .ok_or(ReplicationError::UnknownPeer { peer })?;
        client.receive(local_id, bytes, world, registry, &mut self.authority)
    }

    /// Stamps origins and derives archetypes for everything registered this tick.
    fn register_archetypes<W: WorldMutType>(&mut self, world: &mut W, registry: &SystemRegistry) {
        let local_id = self.config.local_id;

        for entity in self.host.seen_entities() {
            if !world.has_entity(&entity) {
                warn!("registered entity {} is not in the world", entity);
                self.host.unregister_entity(&entity);
                continue;
            }

            let stamped = world.component::<SnapshotEntity>(&entity).copied();
            let origin = match stamped {
                Some(origin) => origin,
                None => {
                    let origin = SnapshotEntity::local(entity, local_id);
                    world.insert_component(&entity, origin);
                    origin
                }
            };
            self.host.set_origin(&entity, origin);

            if let Some(local_archetype) = world.local_archetype(&entity) {
                self.host.assign_archetype(&entity, local_archetype, registry);
            }
        }
    }

    fn invalidate_departures(&mut self, summary: &RegisterSummary, registry: &mut SystemRegistry) {
        let systems = registry.ids();
        for entity in &summary.removed {
            registry.invalidate_sent(&systems, entity);
            for client in self.clients.iter_mut() {
                client.forget_entity(entity);
            }
        }

        for change in &summary.changes {
            let current = self.host.systems_of(&change.current);
            let left: Vec<SystemId> = self
                .host
                .systems_of(&change.previous)
                .iter()
                .filter(|system| current.binary_search(system).is_err())
                .copied()
                .collect();
            if !left.is_empty() {
                registry.invalidate_sent(&left, &change.entity);
            }
        }
    }

    /// Entities of each system this tick, ascending. Systems with no entity
    /// send no block.
    fn system_lists(
        &self,
        summary: &RegisterSummary,
        registry: &SystemRegistry,
    ) -> Vec<(SystemId, Vec<EntityRef>)> {
        let table = self.host.replication_table();
        let mut lists = Vec::new();

        for system_id in registry.ids() {
            let entities: Vec<EntityRef> = summary
                .total
                .iter()
                .filter(|entity| {
                    self.host
                        .replication_archetype(entity)
                        .map(|archetype| table.contains_system(&archetype, system_id))
                        .unwrap_or(false)
                })
                .copied()
                .collect();
            if !entities.is_empty() {
                lists.push((system_id, entities));
            }
        }

        lists
    }
}

fn entity_entry(host: &HostSnapshotState, entity: &EntityRef) -> Option<EntityEntry> {
    let origin = host.origin(entity)?;
    Some(EntityEntry {
        entity: *entity,
        origin: origin.origin,
        archetype: host.replication_archetype(entity)?,
        origin_instigator: origin.origin_instigator,
    })
}
