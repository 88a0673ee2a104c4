use std::collections::HashMap;

use crate::world::entity_ref::EntityRef;

#[derive(Clone)]
struct BaselineEntry<V> {
    version: u32,
    value: V,
}

/// Last value sent to, or received from, one instigator for one system.
///
/// Keyed by entity id and guarded by entity version, so an entry written
/// for a previous holder of an id is never handed to its successor. Ids on
/// the receive side come off the wire, so the map stays sparse.
#[derive(Clone)]
pub struct BaselineColumn<V> {
    entries: HashMap<u32, BaselineEntry<V>>,
}

impl<V> Default for BaselineColumn<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V: Clone> BaselineColumn<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, entity: &EntityRef) -> Option<&V> {
        match self.entries.get(&entity.id) {
            Some(entry) if entry.version == entity.version => Some(&entry.value),
            _ => None,
        }
    }

    pub fn set(&mut self, entity: &EntityRef, value: V) {
        self.entries.insert(
            entity.id,
            BaselineEntry {
                version: entity.version,
                value,
            },
        );
    }

    /// Drops the entry for `entity`. Entries of other versions are left alone.
    pub fn invalidate(&mut self, entity: &EntityRef) {
        if matches!(self.entries.get(&entity.id), Some(entry) if entry.version == entity.version) {
            self.entries.remove(&entity.id);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of valid entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
