use std::fmt;

/// A versioned entity handle.
///
/// An id that has been recycled by the world comes back with a new version,
/// and is a different entity from every earlier holder of that id. The id `0`
/// is never handed out for a live entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityRef {
    pub id: u32,
    pub version: u32,
}

impl EntityRef {
    pub const NULL: EntityRef = EntityRef { id: 0, version: 0 };

    pub fn new(id: u32, version: u32) -> Self {
        Self { id, version }
    }

    pub fn is_null(&self) -> bool {
        self.id == 0
    }

    /// True when both refs name the same id, whatever their versions.
    pub fn same_slot(&self, other: &EntityRef) -> bool {
        self.id == other.id
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.id, self.version)
    }
}
