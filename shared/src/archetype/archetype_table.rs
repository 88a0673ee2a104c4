use std::{collections::HashMap, fmt};

use crate::types::SystemId;

/// Handle of an interned, ordered set of system ids.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArchetypeId(u32);

impl ArchetypeId {
    /// The empty set. Always present in every table; on the wire it also
    /// stands for "no writable systems", which revokes ownership.
    pub const EMPTY: ArchetypeId = ArchetypeId(0);

    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ArchetypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Append-only interning table of system-id sets.
///
/// Handles are stable for the lifetime of the table. Identical sets always
/// map to the same handle.
pub struct ArchetypeTable {
    archetypes: Vec<Vec<SystemId>>,
    lookup: HashMap<Vec<SystemId>, ArchetypeId>,
    new_archetypes: Vec<ArchetypeId>,
}

impl Default for ArchetypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchetypeTable {
    pub fn new() -> Self {
        let mut lookup = HashMap::new();
        lookup.insert(Vec::new(), ArchetypeId::EMPTY);
        Self {
            archetypes: vec![Vec::new()],
            lookup,
            new_archetypes: Vec::new(),
        }
    }

    /// Returns the handle for `systems`, creating one if the set is new.
    /// The input does not need to be sorted.
    pub fn intern(&mut self, mut systems: Vec<SystemId>) -> ArchetypeId {
        systems.sort_unstable();
        systems.dedup();

        if let Some(id) = self.lookup.get(&systems) {
            return *id;
        }

        let id = ArchetypeId(self.archetypes.len() as u32);
        self.archetypes.push(systems.clone());
        self.lookup.insert(systems, id);
        self.new_archetypes.push(id);
        id
    }

    pub fn get(&self, id: &ArchetypeId) -> Option<&[SystemId]> {
        self.archetypes.get(id.0 as usize).map(|systems| systems.as_slice())
    }

    pub fn contains_system(&self, id: &ArchetypeId, system: SystemId) -> bool {
        self.get(id)
            .map(|systems| systems.binary_search(&system).is_ok())
            .unwrap_or(false)
    }

    /// Handles interned since the last call, ascending.
    pub fn take_new(&mut self) -> Vec<ArchetypeId> {
        std::mem::take(&mut self.new_archetypes)
    }

    /// Every non-empty handle, ascending.
    pub fn ids(&self) -> impl Iterator<Item = ArchetypeId> + '_ {
        (1..self.archetypes.len() as u32).map(ArchetypeId)
    }

    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archetypes.len() <= 1
    }
}
