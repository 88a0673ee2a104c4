use std::collections::BTreeSet;

use log::{debug, warn};

use mirra_shared::{
    ArchetypeId, BroadcastInstigator, EntityRef, InstigatorConfig, InstigatorId,
    OwnershipPermissions, PeerRole, ReceiveError, ReceiveReport, SnapshotEntity,
    SystemRegistry, Tick, Transport, WorldMutType, WorldRefExt,
};

use crate::{error::MirraServerError, server_config::ServerConfig};

/// A server that replicates registered entities to every connected client
/// and applies the entities clients upload.
pub struct Server<T: Transport> {
    config: ServerConfig,
    instigator: BroadcastInstigator,
    registry: SystemRegistry,
    transport: T,
    replicated: BTreeSet<EntityRef>,
    tick: Tick,
}

impl<T: Transport> Server<T> {
    /// Create a new Server
    pub fn new(config: ServerConfig, registry: SystemRegistry, transport: T) -> Self {
        let instigator = BroadcastInstigator::new(InstigatorConfig {
            local_id: config.instigator_id,
            pending_ownership_ttl: config.pending_ownership_ttl,
        });
        Self {
            config,
            instigator,
            registry,
            transport,
            replicated: BTreeSet::new(),
            tick: 0,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn current_tick(&self) -> Tick {
        self.tick
    }

    pub fn instigator(&self) -> &BroadcastInstigator {
        &self.instigator
    }

    pub fn registry(&self) -> &SystemRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut SystemRegistry {
        &mut self.registry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // Clients

    /// Starts replicating to `client`. Its first message is a full remake.
    pub fn connect_client(&mut self, client: InstigatorId) -> Result<(), MirraServerError> {
        if client == self.config.instigator_id {
            return Err(MirraServerError::ReservedClientId(client));
        }
        self.instigator
            .add_client(client, PeerRole::Downstream, self.config.client_permissions);
        Ok(())
    }

    /// Forgets `client`, its baselines and the leases it held. Entities it
    /// uploaded stay in the world.
    pub fn disconnect_client(&mut self, client: InstigatorId) -> bool {
        self.instigator.remove_client(client, &mut self.registry)
    }

    /// Drops the baselines toward `client` and sends it a full remake next tick.
    pub fn reset_client(&mut self, client: InstigatorId) -> Result<(), MirraServerError> {
        self.instigator
            .reset_client(client, &mut self.registry)
            .map_err(|_| MirraServerError::UnknownClient(client))
    }

    pub fn set_client_permissions(
        &mut self,
        client: InstigatorId,
        permissions: OwnershipPermissions,
    ) -> Result<(), MirraServerError> {
        let instigator = self
            .instigator
            .client_mut(client)
            .ok_or(MirraServerError::UnknownClient(client))?;
        instigator.set_permissions(permissions);
        Ok(())
    }

    pub fn client_ids(&self) -> Vec<InstigatorId> {
        self.instigator.clients().map(|client| client.peer()).collect()
    }

    pub fn client_exists(&self, client: InstigatorId) -> bool {
        self.instigator.client(client).is_some()
    }

    // Entities

    /// Replicates `entity` from the next tick on, until it is despawned or
    /// [`Server::unreplicate`] is called.
    pub fn replicate(&mut self, entity: EntityRef) {
        self.replicated.insert(entity);
    }

    pub fn unreplicate(&mut self, entity: &EntityRef) -> bool {
        self.replicated.remove(entity)
    }

    pub fn is_replicated(&self, entity: &EntityRef) -> bool {
        self.replicated.contains(entity)
    }

    pub fn replicated_entities(&self) -> impl Iterator<Item = &EntityRef> {
        self.replicated.iter()
    }

    // Ownership

    /// Leases the delegable systems of `entity` to `client`. Any lease held by
    /// another client is revoked.
    pub fn grant_ownership(
        &mut self,
        entity: EntityRef,
        client: InstigatorId,
    ) -> Result<ArchetypeId, MirraServerError> {
        Ok(self.instigator.grant_ownership(entity, client)?)
    }

    pub fn revoke_ownership(&mut self, entity: &EntityRef) -> Option<InstigatorId> {
        self.instigator.revoke_ownership(entity)
    }

    pub fn owner_of(&self, entity: &EntityRef) -> Option<InstigatorId> {
        self.instigator.owner_of(entity)
    }

    // Ticks

    /// Sends one snapshot to every connected client and advances the tick.
    pub fn send_tick<W: WorldMutType>(&mut self, world: &mut W) -> Result<Tick, MirraServerError> {
        let tick = self.tick;
        let local_id = self.config.instigator_id;

        self.replicated.retain(|entity| world.has_entity(entity));
        for entity in &self.replicated {
            let created = world
                .component::<SnapshotEntity>(entity)
                .map(|origin| origin.originated_by(local_id))
                .unwrap_or(true);
            self.instigator.register_entity(*entity, created, false);
        }

        let messages = self
            .instigator
            .serialize(tick, world, &mut self.registry)?;
        for (client, payload) in messages {
            self.transport.send(client, payload);
        }

        self.tick = self.tick.wrapping_add(1);
        Ok(tick)
    }

    /// Applies every queued client upload. Entities spawned for uploads are
    /// replicated onward to the other clients, including those spawned by an
    /// upload whose values were dropped.
    pub fn receive<W: WorldMutType>(
        &mut self,
        world: &mut W,
    ) -> Vec<(InstigatorId, Result<ReceiveReport, ReceiveError>)> {
        let mut results = Vec::new();

        while let Some((client, payload)) = self.transport.receive() {
            let result = self
                .instigator
                .receive(client, &payload, world, &mut self.registry);
            match &result {
                Ok(report) => {
                    self.track_upload(report);
                    debug!(
                        "client {} tick {}: {} spawned, {} despawned",
                        client,
                        report.tick,
                        report.spawned.len(),
                        report.despawned.len()
                    );
                }
                Err(error) => {
                    if let Some(report) = &error.applied {
                        self.track_upload(report);
                    }
                    warn!("upload from client {} dropped: {}", client, error);
                }
            }
            results.push((client, result));
        }

        results
    }

    fn track_upload(&mut self, report: &ReceiveReport) {
        for entity in &report.spawned {
            self.replicated.insert(*entity);
        }
        for entity in &report.despawned {
            self.replicated.remove(entity);
        }
    }
}
