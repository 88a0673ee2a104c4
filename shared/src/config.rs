use std::default::Default;

use crate::types::{InstigatorId, Tick};

/// Contains Config properties which will be used by a Broadcast Instigator
#[derive(Clone, Debug)]
pub struct InstigatorConfig {
    /// Identity this process writes as the origin instigator of the entities
    /// it creates.
    pub local_id: InstigatorId,
    /// Number of ticks an ownership grant for a not-yet-known entity is kept
    /// before it is dropped.
    pub pending_ownership_ttl: Tick,
}

impl Default for InstigatorConfig {
    fn default() -> Self {
        Self {
            local_id: 0,
            pending_ownership_ttl: 60,
        }
    }
}
