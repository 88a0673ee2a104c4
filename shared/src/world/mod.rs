pub mod component_kind;
pub mod entity_ref;
pub mod snapshot_entity;
pub mod world_commands;
pub mod world_type;
