use std::default::Default;

use mirra_shared::{InstigatorId, Tick};

/// Contains Config properties which will be used by a Client
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Instigator id of the server this client mirrors.
    pub server_instigator_id: InstigatorId,
    /// Number of ticks an ownership grant for a not-yet-received entity is
    /// kept before it is dropped.
    pub pending_ownership_ttl: Tick,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_instigator_id: 0,
            pending_ownership_ttl: 60,
        }
    }
}
