use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use cs_core::ports::DiscoveryPort;
use cs_core::{DiscoveredPeer, DiscoveryEvent};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

/// Time allowed for other relays to answer once the first one is heard.
const DEFAULT_SETTLE: Duration = Duration::from_millis(500);

/// Decide which relay URL to connect to.
///
/// A configured address is used verbatim. Otherwise discovery runs until a
/// relay answers or the timeout passes, and the least loaded relay wins.
pub struct ResolveRelayUseCase {
    discovery: Arc<dyn DiscoveryPort>,
    configured_address: String,
    timeout: Duration,
    settle: Duration,
}

impl ResolveRelayUseCase {
    pub fn new(
        discovery: Arc<dyn DiscoveryPort>,
        configured_address: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            discovery,
            configured_address: configured_address.into(),
            timeout,
            settle: DEFAULT_SETTLE,
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn discovery(&self) -> &Arc<dyn DiscoveryPort> {
        &self.discovery
    }

    pub async fn execute(&self) -> Result<Option<String>> {
        let span = info_span!(
            "usecase.network.resolve_relay.execute",
            configured = !self.configured_address.trim().is_empty(),
        );

        async move {
            let configured = self.configured_address.trim();
            if !configured.is_empty() {
                debug!(url = configured, "using configured relay address");
                return Ok(Some(configured.to_string()));
            }

            let mut events = self.discovery.subscribe();
            if let Err(e) = self.discovery.start().await {
                warn!(error = %e, "relay discovery unavailable");
                return Ok(None);
            }

            let deadline = Instant::now() + self.timeout;
            if self.discovery.peers().await.is_empty() && wait_for_first_peer(&mut events, deadline).await {
                let remaining = deadline.saturating_duration_since(Instant::now());
                tokio::time::sleep(self.settle.min(remaining)).await;
            }

            let peers = self.discovery.peers().await;
            match pick_relay(&peers) {
                Some(peer) => {
                    info!(
                        peer_id = %peer.peer_id,
                        connected = peer.connected_device_count,
                        candidates = peers.len(),
                        "relay selected"
                    );
                    Ok(Some(peer.relay_url()))
                }
                None => {
                    info!(timeout_ms = self.timeout.as_millis() as u64, "no relay discovered");
                    Ok(None)
                }
            }
        }
        .instrument(span)
        .await
    }
}

/// The relay with the fewest connected devices; ties go to the first.
pub fn pick_relay(peers: &[DiscoveredPeer]) -> Option<&DiscoveredPeer> {
    peers
        .iter()
        .filter(|peer| peer.online)
        .min_by_key(|peer| peer.connected_device_count)
}

async fn wait_for_first_peer(
    events: &mut tokio::sync::broadcast::Receiver<DiscoveryEvent>,
    deadline: Instant,
) -> bool {
    loop {
        match tokio::time::timeout_at(deadline, events.recv()).await {
            Ok(Ok(DiscoveryEvent::PeerDiscovered(_))) => return true,
            Ok(Ok(_)) | Ok(Err(RecvError::Lagged(_))) => continue,
            Ok(Err(RecvError::Closed)) | Err(_) => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockDiscovery;
    use cs_core::ports::DiscoveryError;
    use cs_core::DeviceId;
    use tokio::sync::broadcast;

    fn peer(id: &str, address: &str, connected: u32) -> DiscoveredPeer {
        DiscoveredPeer {
            peer_id: DeviceId::new(id),
            display_name: id.to_string(),
            address: address.to_string(),
            port: 8080,
            connected_device_count: connected,
            last_seen_ms: 0,
            online: true,
        }
    }

    #[tokio::test]
    async fn configured_address_skips_discovery() {
        let mut discovery = MockDiscovery::new();
        discovery.expect_start().times(0);
        discovery.expect_subscribe().times(0);

        let uc = ResolveRelayUseCase::new(
            Arc::new(discovery),
            " ws://10.0.0.9:8080/sync ",
            Duration::from_millis(10),
        );
        assert_eq!(
            uc.execute().await.expect("resolve").as_deref(),
            Some("ws://10.0.0.9:8080/sync")
        );
    }

    #[tokio::test]
    async fn least_loaded_relay_is_chosen() {
        let (tx, _) = broadcast::channel(4);
        let mut discovery = MockDiscovery::new();
        discovery.expect_subscribe().returning(move || tx.subscribe());
        discovery.expect_start().returning(|| Ok(()));
        discovery.expect_peers().returning(|| {
            vec![
                peer("server-a", "192.168.1.2", 4),
                peer("server-b", "192.168.1.3", 1),
                peer("server-c", "192.168.1.4", 2),
            ]
        });

        let uc = ResolveRelayUseCase::new(Arc::new(discovery), "", Duration::from_millis(50));
        assert_eq!(
            uc.execute().await.expect("resolve").as_deref(),
            Some("ws://192.168.1.3:8080/sync")
        );
    }

    #[tokio::test]
    async fn timeout_without_relays_yields_none() {
        let (tx, _) = broadcast::channel(4);
        let mut discovery = MockDiscovery::new();
        discovery.expect_subscribe().returning(move || tx.subscribe());
        discovery.expect_start().returning(|| Ok(()));
        discovery.expect_peers().returning(Vec::new);

        let uc = ResolveRelayUseCase::new(Arc::new(discovery), "", Duration::from_millis(50));
        assert!(uc.execute().await.expect("resolve").is_none());
    }

    #[tokio::test]
    async fn discovery_failure_is_not_fatal() {
        let (tx, _) = broadcast::channel(4);
        let mut discovery = MockDiscovery::new();
        discovery.expect_subscribe().returning(move || tx.subscribe());
        discovery
            .expect_start()
            .returning(|| Err(DiscoveryError::Socket("multicast unsupported".to_string())));

        let uc = ResolveRelayUseCase::new(Arc::new(discovery), "", Duration::from_millis(50));
        assert!(uc.execute().await.expect("resolve").is_none());
    }

    #[test]
    fn offline_peers_are_not_picked() {
        let mut offline = peer("server-a", "192.168.1.2", 0);
        offline.online = false;
        let peers = vec![offline, peer("server-b", "192.168.1.3", 5)];
        assert_eq!(
            pick_relay(&peers).map(|p| p.peer_id.as_str()),
            Some("server-b")
        );
        assert!(pick_relay(&[]).is_none());
    }
}
