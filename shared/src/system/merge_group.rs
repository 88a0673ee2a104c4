use crate::types::{InstigatorId, PeerRole};

/// A peer as seen when partitioning output for a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeerInfo {
    pub id: InstigatorId,
    pub role: PeerRole,
}

impl PeerInfo {
    pub fn new(id: InstigatorId, role: PeerRole) -> Self {
        Self { id, role }
    }
}

/// One system's partition of the peers for one tick.
///
/// Every member of a group receives byte-identical output. Peers in no group
/// receive nothing from the system this tick.
#[derive(Clone, Debug, Default)]
pub struct MergeGroupCollection {
    groups: Vec<Vec<InstigatorId>>,
}

impl MergeGroupCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a group. Empty groups are ignored.
    pub fn push_group(&mut self, members: Vec<InstigatorId>) {
        if !members.is_empty() {
            self.groups.push(members);
        }
    }

    pub fn groups(&self) -> &[Vec<InstigatorId>] {
        &self.groups
    }

    pub fn group(&self, index: usize) -> Option<&[InstigatorId]> {
        self.groups.get(index).map(|members| members.as_slice())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn contains(&self, peer: InstigatorId) -> bool {
        self.groups.iter().any(|members| members.contains(&peer))
    }
}
