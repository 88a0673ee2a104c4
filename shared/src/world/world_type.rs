use std::any::Any;

use crate::world::{
    component_kind::{ComponentKind, LocalArchetype},
    entity_ref::EntityRef,
};

/// Boxed component storage handed across the world boundary.
pub type BoxedComponent = Box<dyn Any + Send + Sync>;

/// Read access to the entity/component storage of the host application.
pub trait WorldRefType {
    fn has_entity(&self, entity: &EntityRef) -> bool;
    fn entities(&self) -> Vec<EntityRef>;
    fn has_component_of_kind(&self, entity: &EntityRef, kind: &ComponentKind) -> bool;
    /// `None` when the entity does not exist.
    fn local_archetype(&self, entity: &EntityRef) -> Option<LocalArchetype>;
    fn component_of_kind(
        &self,
        entity: &EntityRef,
        kind: &ComponentKind,
    ) -> Option<&(dyn Any + Send + Sync)>;
}

/// Mutable access to the entity/component storage of the host application.
pub trait WorldMutType: WorldRefType {
    fn spawn_entity(&mut self) -> EntityRef;
    fn despawn_entity(&mut self, entity: &EntityRef);
    fn insert_boxed_component(
        &mut self,
        entity: &EntityRef,
        kind: ComponentKind,
        component: BoxedComponent,
    );
    fn remove_component_of_kind(
        &mut self,
        entity: &EntityRef,
        kind: &ComponentKind,
    ) -> Option<BoxedComponent>;
    fn component_of_kind_mut(
        &mut self,
        entity: &EntityRef,
        kind: &ComponentKind,
    ) -> Option<&mut (dyn Any + Send + Sync)>;
}

/// Typed helpers over [`WorldRefType`].
pub trait WorldRefExt: WorldRefType {
    fn has_component<C: Any>(&self, entity: &EntityRef) -> bool {
        self.has_component_of_kind(entity, &ComponentKind::of::<C>())
    }

    fn component<C: Any>(&self, entity: &EntityRef) -> Option<&C> {
        self.component_of_kind(entity, &ComponentKind::of::<C>())
            .and_then(|component| component.downcast_ref::<C>())
    }
}

impl<T: WorldRefType + ?Sized> WorldRefExt for T {}

/// Typed helpers over [`WorldMutType`].
pub trait WorldMutExt: WorldMutType {
    fn insert_component<C: Any + Send + Sync>(&mut self, entity: &EntityRef, component: C) {
        self.insert_boxed_component(entity, ComponentKind::of::<C>(), Box::new(component));
    }

    fn remove_component<C: Any + Send + Sync>(&mut self, entity: &EntityRef) -> Option<C> {
        self.remove_component_of_kind(entity, &ComponentKind::of::<C>())
            .and_then(|boxed| boxed.downcast::<C>().ok())
            .map(|boxed| *boxed)
    }

    fn component_mut<C: Any>(&mut self, entity: &EntityRef) -> Option<&mut C> {
        self.component_of_kind_mut(entity, &ComponentKind::of::<C>())
            .and_then(|component| component.downcast_mut::<C>())
    }
}

impl<T: WorldMutType + ?Sized> WorldMutExt for T {}
