use std::collections::{HashMap, HashSet};

use crate::{types::SystemId, world::entity_ref::EntityRef};

/// Which systems this process may write for each local entity.
///
/// Entities the process created itself hold authority over every system.
/// Grants received from upstream are reference counted per system, so
/// releasing one grant never takes away authority another grant still holds.
#[derive(Default)]
pub struct LocalAuthority {
    created: HashSet<EntityRef>,
    grants: HashMap<EntityRef, HashMap<SystemId, u32>>,
}

impl LocalAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_created(&mut self, entity: EntityRef) {
        self.created.insert(entity);
    }

    pub fn is_created(&self, entity: &EntityRef) -> bool {
        self.created.contains(entity)
    }

    pub fn grant(&mut self, entity: EntityRef, systems: &[SystemId]) {
        let counts = self.grants.entry(entity).or_default();
        for system in systems {
            *counts.entry(*system).or_insert(0) += 1;
        }
    }

    pub fn release(&mut self, entity: &EntityRef, systems: &[SystemId]) {
        let Some(counts) = self.grants.get_mut(entity) else {
            return;
        };
        for system in systems {
            if let Some(count) = counts.get_mut(system) {
                *count -= 1;
                if *count == 0 {
                    counts.remove(system);
                }
            }
        }
        if counts.is_empty() {
            self.grants.remove(entity);
        }
    }

    pub fn has_authority(&self, entity: &EntityRef, system: SystemId) -> bool {
        if self.created.contains(entity) {
            return true;
        }
        self.grants
            .get(entity)
            .map(|counts| counts.contains_key(&system))
            .unwrap_or(false)
    }

    /// Entities holding at least one upstream grant, ascending.
    pub fn granted_entities(&self) -> Vec<EntityRef> {
        let mut output: Vec<EntityRef> = self.grants.keys().copied().collect();
        output.sort();
        output
    }

    /// Entities this process created, ascending.
    pub fn created_entities(&self) -> Vec<EntityRef> {
        let mut output: Vec<EntityRef> = self.created.iter().copied().collect();
        output.sort();
        output
    }

    pub fn forget_entity(&mut self, entity: &EntityRef) {
        self.created.remove(entity);
        self.grants.remove(entity);
    }

    /// Drops every upstream grant, keeping creation authority.
    pub fn clear_grants(&mut self) {
        self.grants.clear();
    }
}
