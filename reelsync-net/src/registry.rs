//! The set of live connections for one viewer.
//!
//! The member list is the only state shared between connections. Its mutex
//! guards membership changes and snapshotting; delivery always happens on a
//! snapshot after the lock is released.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;

use crate::connection::ConnectionInfo;
use crate::protocol::ConnectionId;

/// What the registry needs from a connection.
pub trait Peer: Send + Sync {
    fn id(&self) -> ConnectionId;

    /// Queue `message` for sending. Must not block on socket I/O.
    fn deliver(&self, message: &[u8]);

    fn stop(&self);

    fn info(&self) -> ConnectionInfo;
}

#[derive(Default)]
pub struct SessionRegistry {
    peers: Mutex<Vec<Arc<dyn Peer>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<dyn Peer>>> {
        self.peers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> Vec<Arc<dyn Peer>> {
        self.lock().clone()
    }

    /// Add `peer` unless a peer with the same id is already present.
    pub fn register(&self, peer: Arc<dyn Peer>) -> bool {
        let mut peers = self.lock();
        let id = peer.id();
        if peers.iter().any(|p| p.id() == id) {
            return false;
        }
        peers.push(peer);
        debug!("registered connection {} ({} live)", id, peers.len());
        true
    }

    /// Remove the peer with `id`. Removing an absent peer is not an error.
    pub fn unregister(&self, id: ConnectionId) -> bool {
        let mut peers = self.lock();
        let before = peers.len();
        peers.retain(|p| p.id() != id);
        let removed = peers.len() != before;
        if removed {
            debug!("unregistered connection {} ({} live)", id, peers.len());
        }
        removed
    }

    /// Deliver `message` to every peer except `exclude`. Returns how many
    /// peers it was queued for.
    pub fn broadcast(&self, message: &[u8], exclude: Option<ConnectionId>) -> usize {
        let targets: Vec<_> = self
            .snapshot()
            .into_iter()
            .filter(|p| Some(p.id()) != exclude)
            .collect();
        for peer in &targets {
            peer.deliver(message);
        }
        targets.len()
    }

    pub fn connections(&self) -> Vec<ConnectionInfo> {
        self.snapshot().iter().map(|p| p.info()).collect()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.lock().iter().any(|p| p.id() == id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Stop every registered peer. Peers unregister themselves as they stop.
    pub fn stop_all(&self) {
        for peer in self.snapshot() {
            peer.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{ConnectionState, Role};
    use std::sync::Weak;

    struct MockPeer {
        id: ConnectionId,
        received: Mutex<Vec<Vec<u8>>>,
        registry: Weak<SessionRegistry>,
    }

    impl MockPeer {
        fn new(id: u64, registry: &Arc<SessionRegistry>) -> Arc<Self> {
            Arc::new(Self {
                id: ConnectionId::new(id),
                received: Mutex::new(Vec::new()),
                registry: Arc::downgrade(registry),
            })
        }

        fn received(&self) -> Vec<Vec<u8>> {
            self.received.lock().unwrap().clone()
        }
    }

    impl Peer for MockPeer {
        fn id(&self) -> ConnectionId {
            self.id
        }

        fn deliver(&self, message: &[u8]) {
            self.received.lock().unwrap().push(message.to_vec());
        }

        fn stop(&self) {
            if let Some(registry) = self.registry.upgrade() {
                registry.unregister(self.id);
            }
        }

        fn info(&self) -> ConnectionInfo {
            ConnectionInfo {
                id: self.id,
                peer: "127.0.0.1:1".parse().unwrap(),
                role: Role::Server,
                state: ConnectionState::Open,
            }
        }
    }

    #[test]
    fn register_and_unregister_are_idempotent() {
        let registry = Arc::new(SessionRegistry::new());
        let a = MockPeer::new(1, &registry);

        assert!(registry.register(a.clone()));
        assert!(!registry.register(a.clone()));
        assert_eq!(registry.len(), 1);

        assert!(registry.unregister(a.id));
        assert!(!registry.unregister(a.id));
        assert!(registry.is_empty());
    }

    #[test]
    fn broadcast_skips_the_excluded_peer() {
        let registry = Arc::new(SessionRegistry::new());
        let peers: Vec<_> = (1..=3).map(|i| MockPeer::new(i, &registry)).collect();
        for p in &peers {
            registry.register(p.clone());
        }

        let sent = registry.broadcast(b"seek 120\n", Some(ConnectionId::new(2)));

        assert_eq!(sent, 2);
        assert_eq!(peers[0].received(), vec![b"seek 120\n".to_vec()]);
        assert!(peers[1].received().is_empty());
        assert_eq!(peers[2].received(), vec![b"seek 120\n".to_vec()]);
    }

    #[test]
    fn broadcast_without_exclusion_reaches_everyone() {
        let registry = Arc::new(SessionRegistry::new());
        let a = MockPeer::new(1, &registry);
        let b = MockPeer::new(2, &registry);
        registry.register(a.clone());
        registry.register(b.clone());

        assert_eq!(registry.broadcast(b"Gain 2\n", None), 2);
        assert_eq!(a.received().len(), 1);
        assert_eq!(b.received().len(), 1);
    }

    #[test]
    fn stop_all_empties_the_registry() {
        let registry = Arc::new(SessionRegistry::new());
        for i in 1..=4 {
            registry.register(MockPeer::new(i, &registry));
        }
        assert_eq!(registry.connections().len(), 4);

        registry.stop_all();
        assert!(registry.is_empty());
    }
}
