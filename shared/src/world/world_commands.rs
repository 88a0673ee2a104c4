use std::any::Any;

use crate::world::{
    component_kind::ComponentKind,
    entity_ref::EntityRef,
    world_type::{BoxedComponent, WorldMutType},
};

pub enum WorldCommand {
    Despawn(EntityRef),
    RemoveComponent(EntityRef, ComponentKind),
    InsertComponent(EntityRef, ComponentKind, BoxedComponent),
}

/// World mutations deferred until every block of a message has been parsed.
#[derive(Default)]
pub struct WorldCommands {
    commands: Vec<WorldCommand>,
}

impl WorldCommands {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn despawn(&mut self, entity: EntityRef) {
        self.commands.push(WorldCommand::Despawn(entity));
    }

    pub fn remove_component_of_kind(&mut self, entity: EntityRef, kind: ComponentKind) {
        self.commands.push(WorldCommand::RemoveComponent(entity, kind));
    }

    pub fn remove_component<C: Any>(&mut self, entity: EntityRef) {
        self.remove_component_of_kind(entity, ComponentKind::of::<C>());
    }

    pub fn insert_component<C: Any + Send + Sync>(&mut self, entity: EntityRef, component: C) {
        self.commands.push(WorldCommand::InsertComponent(
            entity,
            ComponentKind::of::<C>(),
            Box::new(component),
        ));
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorldCommand> {
        self.commands.iter()
    }

    /// Applies every queued command in order. Commands naming an entity that
    /// no longer exists are skipped.
    pub fn apply<W: WorldMutType + ?Sized>(self, world: &mut W) {
        for command in self.commands {
            match command {
                WorldCommand::Despawn(entity) => {
                    if world.has_entity(&entity) {
                        world.despawn_entity(&entity);
                    }
                }
                WorldCommand::RemoveComponent(entity, kind) => {
                    if world.has_entity(&entity) {
                        world.remove_component_of_kind(&entity, &kind);
                    }
                }
                WorldCommand::InsertComponent(entity, kind, component) => {
                    if world.has_entity(&entity) {
                        world.insert_boxed_component(&entity, kind, component);
                    }
                }
            }
        }
    }
}
