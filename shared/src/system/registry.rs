use std::collections::HashMap;

use log::info;

use crate::{
    system::{error::RegistryError, serializer_system::SerializerSystem},
    types::{InstigatorId, SystemId},
    world::{component_kind::LocalArchetype, entity_ref::EntityRef},
};

/// Every serializer system of a process, keyed by its stable id.
///
/// Built once at startup. Iteration is in ascending id order.
pub struct SystemRegistry {
    systems: Vec<Box<dyn SerializerSystem>>,
    index: HashMap<SystemId, usize>,
}

#[derive(Default)]
pub struct SystemRegistryBuilder {
    systems: Vec<Box<dyn SerializerSystem>>,
}

impl SystemRegistryBuilder {
    pub fn add<S: SerializerSystem + 'static>(mut self, system: S) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    pub fn add_boxed(mut self, system: Box<dyn SerializerSystem>) -> Self {
        self.systems.push(system);
        self
    }

    pub fn build(mut self) -> Result<SystemRegistry, RegistryError> {
        self.systems.sort_by_key(|system| system.id());

        let mut index = HashMap::new();
        for (position, system) in self.systems.iter().enumerate() {
            if system.id() == 0 {
                return Err(RegistryError::ReservedSystemId {
                    name: system.name().to_string(),
                });
            }
            if let Some(previous) = index.insert(system.id(), position) {
                return Err(RegistryError::DuplicateSystemId {
                    id: system.id(),
                    first: self.systems[previous].name().to_string(),
                    second: system.name().to_string(),
                });
            }
        }

        info!("system registry built with {} system(s)", self.systems.len());

        Ok(SystemRegistry {
            systems: self.systems,
            index,
        })
    }
}

impl SystemRegistry {
    pub fn builder() -> SystemRegistryBuilder {
        SystemRegistryBuilder::default()
    }

    pub fn get(&self, id: SystemId) -> Option<&dyn SerializerSystem> {
        let position = *self.index.get(&id)?;
        Some(self.systems[position].as_ref())
    }

    pub fn get_mut(&mut self, id: SystemId) -> Option<&mut (dyn SerializerSystem + 'static)> {
        let position = *self.index.get(&id)?;
        Some(self.systems[position].as_mut())
    }

    pub fn contains(&self, id: SystemId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn ids(&self) -> Vec<SystemId> {
        self.systems.iter().map(|system| system.id()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn SerializerSystem> {
        self.systems.iter().map(|system| system.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn SerializerSystem>> {
        self.systems.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Ids of the systems replicating entities with `archetype`, ascending.
    pub fn derive_archetype(&self, archetype: &LocalArchetype) -> Vec<SystemId> {
        self.systems
            .iter()
            .filter(|system| system.is_archetype_valid(archetype))
            .map(|system| system.id())
            .collect()
    }

    /// Ids of the systems whose authority may be delegated for `archetype`,
    /// ascending.
    pub fn derive_authority(&self, archetype: &LocalArchetype) -> Vec<SystemId> {
        self.systems
            .iter()
            .filter(|system| {
                system.is_archetype_valid(archetype) && system.is_authority_valid(archetype)
            })
            .map(|system| system.id())
            .collect()
    }

    pub fn invalidate_sent(&mut self, systems: &[SystemId], entity: &EntityRef) {
        for id in systems {
            if let Some(system) = self.get_mut(*id) {
                system.invalidate_sent(entity);
            }
        }
    }

    pub fn invalidate_received(&mut self, systems: &[SystemId], source: InstigatorId, remote: &EntityRef) {
        for id in systems {
            if let Some(system) = self.get_mut(*id) {
                system.invalidate_received(source, remote);
            }
        }
    }

    /// Drops every sent baseline toward `instigator`.
    pub fn reset_instigator(&mut self, instigator: InstigatorId) {
        for system in self.systems.iter_mut() {
            system.on_reset(instigator);
        }
    }

    /// Drops every received baseline from `source`.
    pub fn remake_source(&mut self, source: InstigatorId) {
        for system in self.systems.iter_mut() {
            system.on_remake(source);
        }
    }

    pub fn forget_instigator(&mut self, instigator: InstigatorId) {
        self.reset_instigator(instigator);
        self.remake_source(instigator);
    }
}
