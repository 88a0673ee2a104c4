use thiserror::Error;

use crate::types::InstigatorId;

/// Errors that can occur when delegating entity ownership
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OwnershipError {
    #[error("Entity {entity_id} is not registered for replication")]
    EntityNotRegistered { entity_id: String },
    #[error("No downstream peer with instigator id {peer}")]
    UnknownClient { peer: InstigatorId },
    #[error("Entity {entity_id} is held on lease from upstream and cannot be granted")]
    NotGrantable { entity_id: String },
    #[error("Entity {entity_id} has no systems whose authority can be delegated")]
    NoDelegableSystems { entity_id: String },
}
