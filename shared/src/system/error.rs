use thiserror::Error;

use crate::types::SystemId;

/// Errors that can occur while building a system registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("System id {id} is registered twice ('{first}' and '{second}')")]
    DuplicateSystemId {
        id: SystemId,
        first: String,
        second: String,
    },
    #[error("System '{name}' uses the reserved system id 0")]
    ReservedSystemId { name: String },
}
