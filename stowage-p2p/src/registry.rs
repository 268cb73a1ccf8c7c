//! Registry of live peers.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::peer::Peer;

/// The authoritative set of currently connected peers.
///
/// A peer is present iff its connection is open and its handshake succeeded:
/// the accept/dial paths insert, read-loop teardown removes, nothing else
/// mutates. All access goes through one reader/writer lock; query methods
/// return owned snapshots so no caller ever holds the lock across I/O.
#[derive(Default)]
pub struct PeerRegistry {
    peers: RwLock<HashMap<SocketAddr, Arc<dyn Peer>>>,
}

impl PeerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a peer after a successful handshake.
    ///
    /// Returns false if the address is already registered; the caller keeps
    /// the existing connection and drops the new one.
    pub async fn insert(&self, peer: Arc<dyn Peer>) -> bool {
        let mut peers = self.peers.write().await;
        match peers.entry(peer.remote_addr()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(peer);
                true
            }
        }
    }

    /// Remove the peer registered at `addr`.
    pub async fn remove(&self, addr: &SocketAddr) -> Option<Arc<dyn Peer>> {
        self.peers.write().await.remove(addr)
    }

    /// Look up a peer by address.
    pub async fn get(&self, addr: &SocketAddr) -> Option<Arc<dyn Peer>> {
        self.peers.read().await.get(addr).cloned()
    }

    /// Whether a peer is registered at `addr`.
    pub async fn contains(&self, addr: &SocketAddr) -> bool {
        self.peers.read().await.contains_key(addr)
    }

    /// Snapshot of all live peers.
    pub async fn peers(&self) -> Vec<Arc<dyn Peer>> {
        self.peers.read().await.values().cloned().collect()
    }

    /// Snapshot of all live peer addresses.
    pub async fn addrs(&self) -> Vec<SocketAddr> {
        self.peers.read().await.keys().copied().collect()
    }

    /// Number of live peers.
    pub async fn len(&self) -> usize {
        self.peers.read().await.len()
    }

    /// Whether the registry holds no peers.
    pub async fn is_empty(&self) -> bool {
        self.peers.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportResult;
    use crate::peer::Direction;

    use async_trait::async_trait;
    use bytes::Bytes;

    #[derive(Debug)]
    struct StubPeer {
        addr: SocketAddr,
        direction: Direction,
    }

    #[async_trait]
    impl Peer for StubPeer {
        fn remote_addr(&self) -> SocketAddr {
            self.addr
        }

        fn direction(&self) -> Direction {
            self.direction
        }

        async fn send(&self, _payload: Bytes) -> TransportResult<()> {
            Ok(())
        }

        async fn close(&self) -> TransportResult<()> {
            Ok(())
        }
    }

    fn stub(port: u16) -> Arc<dyn Peer> {
        Arc::new(StubPeer {
            addr: format!("127.0.0.1:{port}").parse().unwrap(),
            direction: Direction::Inbound,
        })
    }

    #[tokio::test]
    async fn test_insert_and_remove() {
        let registry = PeerRegistry::new();
        let peer = stub(4044);
        let addr = peer.remote_addr();

        assert!(registry.insert(peer).await);
        assert!(registry.contains(&addr).await);
        assert_eq!(registry.len().await, 1);

        let removed = registry.remove(&addr).await;
        assert!(removed.is_some());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_rejected() {
        let registry = PeerRegistry::new();

        assert!(registry.insert(stub(4044)).await);
        assert!(!registry.insert(stub(4044)).await);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_snapshots() {
        let registry = PeerRegistry::new();
        registry.insert(stub(1)).await;
        registry.insert(stub(2)).await;

        let mut ports: Vec<u16> = registry.addrs().await.iter().map(|a| a.port()).collect();
        ports.sort_unstable();
        assert_eq!(ports, vec![1, 2]);
        assert_eq!(registry.peers().await.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_and_removes() {
        let registry = Arc::new(PeerRegistry::new());

        let mut tasks = Vec::new();
        for port in 1..=50u16 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                assert!(registry.insert(stub(port)).await);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(registry.len().await, 50);

        let mut tasks = Vec::new();
        for port in 1..=25u16 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                let addr: SocketAddr = format!("127.0.0.1:{port}").parse().unwrap();
                assert!(registry.remove(&addr).await.is_some());
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(registry.len().await, 25);
    }
}
