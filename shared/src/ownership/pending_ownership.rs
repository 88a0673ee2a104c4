use log::warn;

use crate::{ownership::permissions::OwnershipRecord, types::Tick};

struct PendingGrant {
    record: OwnershipRecord,
    expires_at: Tick,
}

/// Ownership entries naming entities this instigator does not know yet.
///
/// Entries are retried on every message and dropped once their time to live
/// has passed.
pub struct PendingOwnership {
    ttl: Tick,
    entries: Vec<PendingGrant>,
}

impl PendingOwnership {
    pub fn new(ttl: Tick) -> Self {
        Self {
            ttl,
            entries: Vec::new(),
        }
    }

    /// Queues an entry, replacing any older entry for the same entity.
    pub fn queue(&mut self, tick: Tick, record: OwnershipRecord) {
        self.cancel(&record);
        self.entries.push(PendingGrant {
            record,
            expires_at: tick.wrapping_add(self.ttl),
        });
    }

    /// Removes any entry for the same entity as `record`.
    pub fn cancel(&mut self, record: &OwnershipRecord) {
        self.entries.retain(|entry| entry.record.entity != record.entity);
    }

    /// Hands every entry to `resolve`, oldest first. Entries it resolves are
    /// removed; unresolved entries past their deadline are dropped.
    pub fn retry<F: FnMut(&OwnershipRecord) -> bool>(&mut self, tick: Tick, mut resolve: F) {
        self.entries.retain(|entry| {
            if resolve(&entry.record) {
                return false;
            }
            if tick > entry.expires_at {
                warn!(
                    "dropping ownership grant for unknown entity {} after {} ticks",
                    entry.record.entity,
                    tick.wrapping_sub(entry.expires_at)
                );
                return false;
            }
            true
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
