pub type Tick = u32;
pub type SystemId = u32;
pub type InstigatorId = i32;

/// How a peer relates to the instigator holding its state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PeerRole {
    /// The peer produces the entities we mirror (a client's view of its server).
    Upstream,
    /// The peer mirrors our entities and may upload the ones it created or owns.
    Downstream,
}
