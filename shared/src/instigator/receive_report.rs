use crate::{
    types::{InstigatorId, SystemId, Tick},
    world::entity_ref::EntityRef,
};

/// What applying one message changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReceiveReport {
    pub peer: InstigatorId,
    pub tick: Tick,
    pub full_remake: bool,
    /// Local entities created for new remote entities.
    pub spawned: Vec<EntityRef>,
    /// Existing local entities linked to a remote entity.
    pub adopted: Vec<EntityRef>,
    pub despawned: Vec<EntityRef>,
    /// Remote refs of entities refused for lack of permission.
    pub rejected: Vec<EntityRef>,
    pub granted: Vec<EntityRef>,
    pub revoked: Vec<EntityRef>,
    /// Systems whose blocks were applied.
    pub applied_systems: Vec<SystemId>,
    /// Block ids with no matching system.
    pub skipped_systems: Vec<SystemId>,
}

impl ReceiveReport {
    pub fn new(peer: InstigatorId, tick: Tick, full_remake: bool) -> Self {
        Self {
            peer,
            tick,
            full_remake,
            ..Default::default()
        }
    }
}
