use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cs_core::ports::{ClockPort, DeviceIdentityPort, DiscoveryError, DiscoveryPort};
use cs_core::settings::DiscoverySettings;
use cs_core::{DeviceId, DiscoveredPeer, DiscoveryEvent, DiscoveryMessage};
use tokio::net::UdpSocket;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use super::registry::PeerRegistry;
use super::socket::{bind_multicast, group_addr};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Client-side discovery of relays on the local subnet.
///
/// While running, one task listens for advertisements and another evicts
/// relays that have gone quiet. Both observe the same cancellation token.
pub struct NetworkDiscoverer {
    settings: DiscoverySettings,
    state: Arc<DiscoveryState>,
    runtime: Mutex<Option<DiscoveryRuntime>>,
}

struct DiscoveryRuntime {
    socket: Arc<UdpSocket>,
    group: SocketAddr,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

struct DiscoveryState {
    local_id: DeviceId,
    clock: Arc<dyn ClockPort>,
    registry: Mutex<PeerRegistry>,
    events: broadcast::Sender<DiscoveryEvent>,
    active: AtomicBool,
    server_timeout_ms: i64,
    max_message_bytes: usize,
}

impl NetworkDiscoverer {
    pub fn new(
        settings: DiscoverySettings,
        identity: Arc<dyn DeviceIdentityPort>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let state = DiscoveryState {
            local_id: identity.current_device_id(),
            clock,
            registry: Mutex::new(PeerRegistry::new()),
            events,
            active: AtomicBool::new(false),
            server_timeout_ms: settings.server_timeout_ms as i64,
            max_message_bytes: settings.max_message_bytes,
        };
        Self {
            settings,
            state: Arc::new(state),
            runtime: Mutex::new(None),
        }
    }
}

#[async_trait]
impl DiscoveryPort for NetworkDiscoverer {
    async fn start(&self) -> Result<(), DiscoveryError> {
        let mut runtime = self.runtime.lock().await;
        if runtime.is_some() {
            return Ok(());
        }

        let group = group_addr(&self.settings)?;
        let socket = match bind_multicast(&self.settings) {
            Ok(socket) => Arc::new(socket),
            Err(e) => {
                warn!(error = %e, "discovery disabled for this run");
                return Err(e);
            }
        };

        let cancel = CancellationToken::new();
        let listen = tokio::spawn(
            listen_loop(
                socket.clone(),
                self.state.clone(),
                self.settings.socket_timeout(),
                cancel.clone(),
            )
            .instrument(info_span!("network.discovery.listen", group = %group)),
        );
        let sweep = tokio::spawn(
            sweep_loop(
                self.state.clone(),
                self.settings.sweep_interval(),
                cancel.clone(),
            )
            .instrument(info_span!("network.discovery.sweep")),
        );

        self.state.set_active(true);
        info!(group = %group, device_id = %self.state.local_id, "discovery started");

        if let Err(e) = self.state.send_request(&socket, group).await {
            warn!(error = %e, "initial discovery request failed");
        }

        *runtime = Some(DiscoveryRuntime {
            socket,
            group,
            cancel,
            tasks: vec![listen, sweep],
        });
        Ok(())
    }

    async fn stop(&self) {
        let Some(runtime) = self.runtime.lock().await.take() else {
            return;
        };

        runtime.cancel.cancel();
        for task in runtime.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "discovery task ended abnormally");
            }
        }
        drop(runtime.socket);

        self.state.registry.lock().await.clear();
        self.state.set_active(false);
        info!("discovery stopped");
    }

    async fn refresh(&self) -> Result<(), DiscoveryError> {
        let runtime = self.runtime.lock().await;
        let Some(runtime) = runtime.as_ref() else {
            return Err(DiscoveryError::Socket("discovery is not running".to_string()));
        };
        self.state.send_request(&runtime.socket, runtime.group).await
    }

    async fn peers(&self) -> Vec<DiscoveredPeer> {
        self.state.registry.lock().await.snapshot()
    }

    fn subscribe(&self) -> broadcast::Receiver<DiscoveryEvent> {
        self.state.events.subscribe()
    }

    fn is_active(&self) -> bool {
        self.state.active.load(Ordering::SeqCst)
    }
}

impl DiscoveryState {
    fn set_active(&self, active: bool) {
        if self.active.swap(active, Ordering::SeqCst) != active {
            let _ = self.events.send(DiscoveryEvent::StatusChanged { active });
        }
    }

    async fn send_request(&self, socket: &UdpSocket, group: SocketAddr) -> Result<(), DiscoveryError> {
        let request = DiscoveryMessage::discovery_request(self.local_id.clone(), self.clock.now_ms());
        let bytes = request
            .to_bytes()
            .map_err(|e| DiscoveryError::Codec(e.to_string()))?;
        socket
            .send_to(&bytes, group)
            .await
            .map_err(|e| DiscoveryError::Socket(e.to_string()))?;
        debug!("discovery request sent");
        Ok(())
    }

    /// Apply one received datagram. Anything that is not a well-formed
    /// advertisement from another device is dropped.
    async fn handle_datagram(&self, bytes: &[u8], from: SocketAddr) {
        if bytes.len() > self.max_message_bytes {
            debug!(%from, len = bytes.len(), "oversized discovery datagram dropped");
            return;
        }

        let message = match DiscoveryMessage::from_bytes(bytes) {
            Ok(message) => message,
            Err(e) => {
                warn!(%from, error = %e, "malformed discovery datagram dropped");
                return;
            }
        };

        if !message.is_advertisement() || message.device_id == self.local_id {
            return;
        }

        let Some(peer) = DiscoveredPeer::from_advertisement(&message, self.clock.now_ms()) else {
            debug!(%from, "advertisement without address dropped");
            return;
        };

        let discovered = self.registry.lock().await.observe(peer);
        if let Some(peer) = discovered {
            info!(
                peer_id = %peer.peer_id,
                address = %peer.address,
                port = peer.port,
                connected = peer.connected_device_count,
                "relay discovered"
            );
            let _ = self.events.send(DiscoveryEvent::PeerDiscovered(peer));
        }
    }

    async fn sweep(&self) -> usize {
        let lost = self
            .registry
            .lock()
            .await
            .evict_stale(self.clock.now_ms(), self.server_timeout_ms);
        let count = lost.len();
        for peer in lost {
            info!(peer_id = %peer.peer_id, "relay lost");
            let _ = self.events.send(DiscoveryEvent::PeerLost(peer));
        }
        count
    }
}

async fn listen_loop(
    socket: Arc<UdpSocket>,
    state: Arc<DiscoveryState>,
    recv_timeout: Duration,
    cancel: CancellationToken,
) {
    let mut buf = vec![0u8; state.max_message_bytes + 1];
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            received = tokio::time::timeout(recv_timeout, socket.recv_from(&mut buf)) => {
                match received {
                    Err(_elapsed) => continue,
                    Ok(Ok((len, from))) => state.handle_datagram(&buf[..len], from).await,
                    Ok(Err(e)) => {
                        if cancel.is_cancelled() {
                            break;
                        }
                        warn!(error = %e, "discovery receive failed");
                    }
                }
            }
        }
    }
    debug!("discovery listen loop exited");
}

async fn sweep_loop(state: Arc<DiscoveryState>, period: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                state.sweep().await;
            }
        }
    }
    debug!("discovery sweep loop exited");
}
