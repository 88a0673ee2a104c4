use std::default::Default;

use mirra_shared::{InstigatorId, OwnershipPermissions, Tick};

/// Contains Config properties which will be used by the Server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Instigator id the server writes as the origin of the entities it
    /// creates. Clients must not use it.
    pub instigator_id: InstigatorId,
    /// Permissions handed to every client on connect.
    pub client_permissions: OwnershipPermissions,
    /// Number of ticks an ownership entry naming an unknown entity is kept.
    pub pending_ownership_ttl: Tick,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            instigator_id: 0,
            client_permissions: OwnershipPermissions::all(),
            pending_ownership_ttl: 60,
        }
    }
}
