use std::collections::HashMap;

use cs_core::{DeviceId, DiscoveredPeer};

/// Relays heard from recently, keyed by peer id.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: HashMap<DeviceId, DiscoveredPeer>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh a peer. Returns the peer when it was not known before.
    pub fn observe(&mut self, peer: DiscoveredPeer) -> Option<DiscoveredPeer> {
        match self.peers.get_mut(&peer.peer_id) {
            Some(existing) => {
                existing.refresh_from(peer);
                None
            }
            None => {
                self.peers.insert(peer.peer_id.clone(), peer.clone());
                Some(peer)
            }
        }
    }

    /// Remove every peer silent for longer than `timeout_ms`.
    ///
    /// Evicted peers are returned once; they are gone from the registry
    /// afterwards, so a later sweep cannot report them again.
    pub fn evict_stale(&mut self, now_ms: i64, timeout_ms: i64) -> Vec<DiscoveredPeer> {
        let stale: Vec<DeviceId> = self
            .peers
            .values()
            .filter(|peer| peer.is_stale(now_ms, timeout_ms))
            .map(|peer| peer.peer_id.clone())
            .collect();

        stale
            .into_iter()
            .filter_map(|id| self.peers.remove(&id))
            .map(|mut peer| {
                peer.online = false;
                peer
            })
            .collect()
    }

    /// Snapshot ordered by peer id.
    pub fn snapshot(&self) -> Vec<DiscoveredPeer> {
        let mut peers: Vec<DiscoveredPeer> = self.peers.values().cloned().collect();
        peers.sort_by(|a, b| a.peer_id.as_str().cmp(b.peer_id.as_str()));
        peers
    }

    pub fn clear(&mut self) {
        self.peers.clear();
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
