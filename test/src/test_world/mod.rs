//! In-memory world for integration tests.

use std::{any::Any, collections::HashMap};

use mirra_shared::{
    BoxedComponent, ComponentKind, EntityRef, LocalArchetype, WorldMutType, WorldRefType,
};

struct Slot {
    version: u32,
    components: Option<HashMap<ComponentKind, BoxedComponent>>,
}

/// Entities live in dense slots. A freed id is reused with its version bumped,
/// and id `0` is never handed out.
pub struct TestWorld {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self {
            slots: vec![Slot {
                version: 0,
                components: None,
            }],
            free: Vec::new(),
        }
    }
}

impl TestWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.components.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn components(&self, entity: &EntityRef) -> Option<&HashMap<ComponentKind, BoxedComponent>> {
        let slot = self.slots.get(entity.id as usize)?;
        if slot.version != entity.version {
            return None;
        }
        slot.components.as_ref()
    }

    fn components_mut(
        &mut self,
        entity: &EntityRef,
    ) -> Option<&mut HashMap<ComponentKind, BoxedComponent>> {
        let slot = self.slots.get_mut(entity.id as usize)?;
        if slot.version != entity.version {
            return None;
        }
        slot.components.as_mut()
    }
}

impl WorldRefType for TestWorld {
    fn has_entity(&self, entity: &EntityRef) -> bool {
        self.components(entity).is_some()
    }

    fn entities(&self) -> Vec<EntityRef> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.components.is_some())
            .map(|(id, slot)| EntityRef::new(id as u32, slot.version))
            .collect()
    }

    fn has_component_of_kind(&self, entity: &EntityRef, kind: &ComponentKind) -> bool {
        self.components(entity)
            .map(|components| components.contains_key(kind))
            .unwrap_or(false)
    }

    fn local_archetype(&self, entity: &EntityRef) -> Option<LocalArchetype> {
        self.components(entity)
            .map(|components| LocalArchetype::from_kinds(components.keys().copied()))
    }

    fn component_of_kind(
        &self,
        entity: &EntityRef,
        kind: &ComponentKind,
    ) -> Option<&(dyn Any + Send + Sync)> {
        let boxed = self.components(entity)?.get(kind)?;
        Some(boxed.as_ref())
    }
}

impl WorldMutType for TestWorld {
    fn spawn_entity(&mut self) -> EntityRef {
        if let Some(id) = self.free.pop() {
            let slot = &mut self.slots[id as usize];
            slot.version += 1;
            slot.components = Some(HashMap::new());
            return EntityRef::new(id, slot.version);
        }

        let id = self.slots.len() as u32;
        self.slots.push(Slot {
            version: 1,
            components: Some(HashMap::new()),
        });
        EntityRef::new(id, 1)
    }

    fn despawn_entity(&mut self, entity: &EntityRef) {
        if self.components_mut(entity).is_none() {
            return;
        }
        self.slots[entity.id as usize].components = None;
        self.free.push(entity.id);
    }

    fn insert_boxed_component(
        &mut self,
        entity: &EntityRef,
        kind: ComponentKind,
        component: BoxedComponent,
    ) {
        if let Some(components) = self.components_mut(entity) {
            components.insert(kind, component);
        }
    }

    fn remove_component_of_kind(
        &mut self,
        entity: &EntityRef,
        kind: &ComponentKind,
    ) -> Option<BoxedComponent> {
        self.components_mut(entity)?.remove(kind)
    }

    fn component_of_kind_mut(
        &mut self,
        entity: &EntityRef,
        kind: &ComponentKind,
    ) -> Option<&mut (dyn Any + Send + Sync)> {
        let boxed = self.components_mut(entity)?.get_mut(kind)?;
        Some(boxed.as_mut())
    }
}

#[cfg(test)]
mod tests {
    use mirra_shared::{WorldMutExt, WorldRefExt};

    use super::*;

    #[test]
    fn recycled_ids_get_a_new_version() {
        let mut world = TestWorld::new();
        let first = world.spawn_entity();
        assert_eq!(first, EntityRef::new(1, 1));

        world.insert_component(&first, 7u8);
        world.despawn_entity(&first);
        assert!(!world.has_entity(&first));

        let second = world.spawn_entity();
        assert_eq!(second, EntityRef::new(1, 2));
        assert!(world.component::<u8>(&second).is_none());
        assert!(world.component::<u8>(&first).is_none());
    }
}
