use std::{error::Error, fmt};

use mirra_shared::{InstigatorId, OwnershipError, ReplicationError};

#[derive(Debug)]
pub enum MirraServerError {
    /// The client id is the server's own instigator id.
    ReservedClientId(InstigatorId),
    UnknownClient(InstigatorId),
    Replication(ReplicationError),
    Ownership(OwnershipError),
}

impl fmt::Display for MirraServerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MirraServerError::ReservedClientId(id) => {
                write!(f, "Client id {} is reserved for the server", id)
            }
            MirraServerError::UnknownClient(id) => write!(f, "No client with id {}", id),
            MirraServerError::Replication(error) => fmt::Display::fmt(error, f),
            MirraServerError::Ownership(error) => fmt::Display::fmt(error, f),
        }
    }
}

impl Error for MirraServerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MirraServerError::Replication(error) => Some(error),
            MirraServerError::Ownership(error) => Some(error),
            _ => None,
        }
    }
}

impl From<ReplicationError> for MirraServerError {
    fn from(error: ReplicationError) -> Self {
        MirraServerError::Replication(error)
    }
}

impl From<OwnershipError> for MirraServerError {
    fn from(error: OwnershipError) -> Self {
        MirraServerError::Ownership(error)
    }
}
