use std::collections::BTreeSet;

use log::{debug, warn};

use mirra_shared::{
    BroadcastInstigator, EntityRef, InstigatorConfig, InstigatorId, OwnershipPermissions,
    PeerRole, ReceiveError, ReceiveReport, ReplicationError, SystemId, SystemRegistry, Tick, Transport,
    WorldMutType,
};

use crate::client_config::ClientConfig;

/// A client that mirrors the entities of one server and uploads the
/// entities it created or holds on lease.
pub struct Client<T: Transport> {
    id: InstigatorId,
    config: ClientConfig,
    instigator: BroadcastInstigator,
    registry: SystemRegistry,
    transport: T,
    created: BTreeSet<EntityRef>,
    tick: Tick,
}

impl<T: Transport> Client<T> {
    /// Create a new Client identified by `id`, which must be unique among the
    /// server's clients.
    pub fn new(id: InstigatorId, config: ClientConfig, registry: SystemRegistry, transport: T) -> Self {
        let mut instigator = BroadcastInstigator::new(InstigatorConfig {
            local_id: id,
            pending_ownership_ttl: config.pending_ownership_ttl,
        });
        instigator.add_client(
            config.server_instigator_id,
            PeerRole::Upstream,
            OwnershipPermissions::empty(),
        );
        Self {
            id,
            config,
            instigator,
            registry,
            transport,
            created: BTreeSet::new(),
            tick: 0,
        }
    }

    pub fn id(&self) -> InstigatorId {
        self.id
    }

    pub fn config(&self) -> &ClientConfig {
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

    // Entities

    /// Uploads `entity` from the next tick on. The client keeps write
    /// authority over all of its systems.
    pub fn replicate(&mut self, entity: EntityRef) {
        self.instigator.mark_created(entity);
        self.created.insert(entity);
    }

    /// Stops uploading `entity`. The server removes its copy when this client
    /// may destroy the entities it created.
    pub fn unreplicate(&mut self, entity: &EntityRef) -> bool {
        self.created.remove(entity)
    }

    pub fn is_replicated(&self, entity: &EntityRef) -> bool {
        self.created.contains(entity)
    }

    /// Whether this client writes `system` of `entity`, either as creator or
    /// through a lease.
    pub fn has_authority(&self, entity: &EntityRef, system: SystemId) -> bool {
        self.instigator.has_authority(entity, system)
    }

    /// Local entities held on lease from the server, ascending.
    pub fn owned_entities(&self) -> Vec<EntityRef> {
        self.instigator.authority().granted_entities()
    }

    /// Local entity mirroring the server's `remote` entity.
    pub fn local_entity(&self, remote: &EntityRef) -> Option<EntityRef> {
        self.instigator
            .client(self.config.server_instigator_id)?
            .state()
            .self_entity_of(remote)
    }

    // Ticks

    /// Uploads created and leased entities to the server and advances the tick.
    pub fn send_tick<W: WorldMutType>(&mut self, world: &mut W) -> Result<Tick, ReplicationError> {
        let tick = self.tick;

        self.created.retain(|entity| world.has_entity(entity));
        for entity in &self.created {
            self.instigator.register_entity(*entity, true, false);
        }
        for entity in self.instigator.authority().granted_entities() {
            if world.has_entity(&entity) && !self.created.contains(&entity) {
                self.instigator.register_entity(entity, false, true);
            }
        }

        let messages = self
            .instigator
            .serialize(tick, world, &mut self.registry)?;
        for (peer, payload) in messages {
            self.transport.send(peer, payload);
        }

        self.tick = self.tick.wrapping_add(1);
        Ok(tick)
    }

    /// Applies every queued message from the server.
    pub fn receive<W: WorldMutType>(
        &mut self,
        world: &mut W,
    ) -> Vec<Result<ReceiveReport, ReceiveError>> {
        let server = self.config.server_instigator_id;
        let mut results = Vec::new();

        while let Some((peer, payload)) = self.transport.receive() {
            if peer != server {
                warn!("dropping message from unknown peer {}", peer);
                continue;
            }
            let result = self
                .instigator
                .receive(peer, &payload, world, &mut self.registry);
            match &result {
                Ok(report) => {
                    self.forget_despawned(report);
                    debug!(
                        "server tick {}: {} spawned, {} despawned, {} granted, {} revoked",
                        report.tick,
                        report.spawned.len(),
                        report.despawned.len(),
                        report.granted.len(),
                        report.revoked.len()
                    );
                }
                Err(error) => {
                    if let Some(report) = &error.applied {
                        self.forget_despawned(report);
                    }
                    warn!("server tick dropped: {}", error);
                }
            }
            results.push(result);
        }

        results
    }

    fn forget_despawned(&mut self, report: &ReceiveReport) {
        for entity in &report.despawned {
            self.created.remove(entity);
        }
    }

    /// Restarts the upload stream, as after a reconnect: the next upload is
    /// a full remake.
    pub fn reset(&mut self) -> Result<(), ReplicationError> {
        self.instigator
            .reset_client(self.config.server_instigator_id, &mut self.registry)
    }
}
