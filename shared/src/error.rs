use thiserror::Error;

use mirra_serde::SerdeErr;

use crate::{
    instigator::receive_report::ReceiveReport,
    types::{InstigatorId, SystemId},
    world::entity_ref::EntityRef,
};

/// Errors that abort a replication pass
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplicationError {
    #[error(
        "Framing corruption in block for system {system_id}: block declared {expected_bits} bit(s), decoder consumed {consumed_bits}"
    )]
    FramingCorruption {
        system_id: SystemId,
        expected_bits: u32,
        consumed_bits: u32,
    },
    #[error("Block for system {system_id} carries {found} entities, receiver expected {expected}")]
    EntityCountMismatch {
        system_id: SystemId,
        expected: usize,
        found: usize,
    },
    #[error("Delta for entity {entity} in system {system_id} has no baseline to apply to")]
    MissingBaseline { system_id: SystemId, entity: EntityRef },
    #[error("Entity {entity} has no `{component}` component, required by system {system_id}")]
    ComponentMissing {
        system_id: SystemId,
        entity: EntityRef,
        component: &'static str,
    },
    #[error("System {system_id} has no prepared output for merge group {group}")]
    GroupNotPrepared { system_id: SystemId, group: usize },
    #[error("No instigator is tracking peer {peer}")]
    UnknownPeer { peer: InstigatorId },
    #[error("Malformed snapshot message: {0}")]
    Serde(#[from] SerdeErr),
}

impl ReplicationError {
    /// True for errors meaning the bit stream cannot be trusted any more.
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            ReplicationError::FramingCorruption { .. }
                | ReplicationError::EntityCountMismatch { .. }
                | ReplicationError::MissingBaseline { .. }
                | ReplicationError::Serde(_)
        )
    }
}

/// A message that was not applied in full.
///
/// When the entity tables were applied before a system block failed,
/// `applied` reports those changes; the message's values were dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error}")]
pub struct ReceiveError {
    pub error: ReplicationError,
    pub applied: Option<ReceiveReport>,
}

impl ReceiveError {
    pub fn partial(error: ReplicationError, applied: ReceiveReport) -> Self {
        Self {
            error,
            applied: Some(applied),
        }
    }

    pub fn is_framing(&self) -> bool {
        self.error.is_framing()
    }
}

impl From<ReplicationError> for ReceiveError {
    fn from(error: ReplicationError) -> Self {
        Self {
            error,
            applied: None,
        }
    }
}

impl From<SerdeErr> for ReceiveError {
    fn from(error: SerdeErr) -> Self {
        ReplicationError::from(error).into()
    }
}
