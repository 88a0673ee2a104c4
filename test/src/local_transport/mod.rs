//! In-memory transport: one inbox per instigator, shared through a hub.

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use parking_lot::Mutex;

use mirra_shared::{InstigatorId, Transport};

type Inbox = VecDeque<(InstigatorId, Vec<u8>)>;

/// Routes payloads between every [`LocalTransport`] created from it.
#[derive(Clone, Default)]
pub struct LocalHub {
    inboxes: Arc<Mutex<HashMap<InstigatorId, Inbox>>>,
}

impl LocalHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport sending and receiving as `id`.
    pub fn endpoint(&self, id: InstigatorId) -> LocalTransport {
        self.inboxes.lock().entry(id).or_default();
        LocalTransport {
            id,
            hub: self.clone(),
        }
    }

    /// Number of payloads waiting for `id`.
    pub fn pending(&self, id: InstigatorId) -> usize {
        self.inboxes.lock().get(&id).map(|inbox| inbox.len()).unwrap_or(0)
    }

    /// Takes every payload waiting for `id`, as `(sender, payload)`.
    pub fn drain(&self, id: InstigatorId) -> Vec<(InstigatorId, Vec<u8>)> {
        self.inboxes
            .lock()
            .get_mut(&id)
            .map(|inbox| inbox.drain(..).collect())
            .unwrap_or_default()
    }

    /// Queues `payload` for `to` as if `from` had sent it.
    pub fn deliver(&self, from: InstigatorId, to: InstigatorId, payload: Vec<u8>) {
        self.inboxes
            .lock()
            .entry(to)
            .or_default()
            .push_back((from, payload));
    }
}

pub struct LocalTransport {
    id: InstigatorId,
    hub: LocalHub,
}

impl LocalTransport {
    pub fn id(&self) -> InstigatorId {
        self.id
    }
}

impl Transport for LocalTransport {
    fn send(&mut self, peer: InstigatorId, payload: Vec<u8>) {
        self.hub.deliver(self.id, peer, payload);
    }

    fn receive(&mut self) -> Option<(InstigatorId, Vec<u8>)> {
        self.hub.inboxes.lock().get_mut(&self.id)?.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payloads_arrive_in_order_with_sender() {
        let hub = LocalHub::new();
        let mut server = hub.endpoint(0);
        let mut client = hub.endpoint(1);

        server.send(1, vec![1]);
        server.send(1, vec![2]);
        assert_eq!(hub.pending(1), 2);

        assert_eq!(client.receive(), Some((0, vec![1])));
        assert_eq!(client.receive(), Some((0, vec![2])));
        assert_eq!(client.receive(), None);
        assert_eq!(server.receive(), None);
    }
}
