pub mod adapter;
pub mod baseline_column;
pub mod block;
pub mod delta_serializer;
pub mod error;
pub mod merge_group;
pub mod registry;
pub mod replicated;
pub mod serializer_system;
pub mod snapshot;
