use crate::{
    error::ReplicationError,
    system::merge_group::{MergeGroupCollection, PeerInfo},
    types::{InstigatorId, PeerRole, SystemId, Tick},
    work_group::WorkGroup,
    world::{
        component_kind::LocalArchetype, entity_ref::EntityRef, world_commands::WorldCommands,
        world_type::{WorldMutType, WorldRefType},
    },
};

/// An entity entering or leaving a system's replication archetype on the
/// receiving side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArchetypeUpdate {
    pub self_entity: EntityRef,
    pub remote_entity: EntityRef,
    /// Whether the entity's new archetype contains the system.
    pub contains: bool,
}

/// The entities one received block covers, in wire order.
pub struct DeserializeTarget {
    pub source: InstigatorId,
    /// Local entity to write to, or [`EntityRef::NULL`] for rejected entities.
    pub self_entities: Vec<EntityRef>,
    /// The producer's ref for each entity, keying the baseline column.
    pub remote_entities: Vec<EntityRef>,
    /// Entries set to `true` are parsed but not written to the world.
    pub ignore_mask: Vec<bool>,
}

impl DeserializeTarget {
    pub fn empty(source: InstigatorId) -> Self {
        Self {
            source,
            self_entities: Vec::new(),
            remote_entities: Vec::new(),
            ignore_mask: Vec::new(),
        }
    }

    pub fn push(&mut self, self_entity: EntityRef, remote_entity: EntityRef, ignore: bool) {
        self.self_entities.push(self_entity);
        self.remote_entities.push(remote_entity);
        self.ignore_mask.push(ignore);
    }

    pub fn len(&self) -> usize {
        self.remote_entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remote_entities.is_empty()
    }
}

/// Replicates one component (or component group) between instigators.
///
/// Implementations own one baseline column per peer for each direction. A
/// tick on the producer runs `prepare_serialize`, joins the work group, then
/// calls `finalize_serialize` once per merge group. A message on the receiver
/// runs `prepare_deserialize` per block, joins, then `finalize_deserialize`.
pub trait SerializerSystem: Send {
    fn id(&self) -> SystemId;

    fn name(&self) -> &str;

    /// Whether entities with this local archetype are replicated by the system.
    fn is_archetype_valid(&self, archetype: &LocalArchetype) -> bool;

    /// Whether write authority over this system may be delegated for
    /// entities with this local archetype.
    fn is_authority_valid(&self, archetype: &LocalArchetype) -> bool {
        self.is_archetype_valid(archetype)
    }

    /// Whether the system sends data to upstream peers.
    fn is_upload_enabled(&self) -> bool {
        true
    }

    /// Whether a baseline column toward `instigator` exists.
    fn has_initial_data(&self, instigator: InstigatorId) -> bool;

    /// Partitions `peers` into groups that receive identical output.
    ///
    /// Peers with and without a baseline are kept apart. Upstream peers are
    /// left out entirely unless the system uploads.
    fn update_merge_groups(&self, peers: &[PeerInfo], collection: &mut MergeGroupCollection) {
        let mut fresh = Vec::new();
        let mut primed = Vec::new();
        for peer in peers {
            if peer.role == PeerRole::Upstream && !self.is_upload_enabled() {
                continue;
            }
            if self.has_initial_data(peer.id) {
                primed.push(peer.id);
            } else {
                fresh.push(peer.id);
            }
        }
        collection.push_group(fresh);
        collection.push_group(primed);
    }

    /// Captures the current values of `entities` and queues one encode job
    /// per merge group.
    fn prepare_serialize(
        &mut self,
        tick: Tick,
        world: &dyn WorldRefType,
        groups: &MergeGroupCollection,
        entities: &[EntityRef],
        work: &mut WorkGroup,
    ) -> Result<(), ReplicationError>;

    /// Returns the finished block of merge group `group`. Only valid after
    /// the work group has been joined.
    fn finalize_serialize(&mut self, group: usize) -> Result<Vec<u8>, ReplicationError>;

    /// Forgets the sent baseline of `entity` toward every peer.
    fn invalidate_sent(&mut self, entity: &EntityRef);

    /// Forgets the received baseline of `remote` from `source`.
    fn invalidate_received(&mut self, source: InstigatorId, remote: &EntityRef);

    /// Queues a decode job for one received block.
    fn prepare_deserialize(
        &mut self,
        tick: Tick,
        bytes: Vec<u8>,
        target: DeserializeTarget,
        work: &mut WorkGroup,
    );

    /// Writes decoded values onto the world. Only valid after the work group
    /// has been joined successfully.
    fn finalize_deserialize(&mut self, world: &mut dyn WorldMutType);

    /// Discards the output of pending decode jobs, keeping their baselines.
    fn abort_deserialize(&mut self);

    /// Reacts to entities entering or leaving this system on the receiving side.
    fn on_archetype_update(
        &mut self,
        source: InstigatorId,
        updates: &[ArchetypeUpdate],
        commands: &mut WorldCommands,
    );

    /// Drops the sent baseline column toward `instigator`.
    fn on_reset(&mut self, instigator: InstigatorId);

    /// Drops the received baseline column from `source`.
    fn on_remake(&mut self, source: InstigatorId);
}
