use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cs_core::ports::{ClockPort, DeviceIdentityPort, DiscoveryError};
use cs_core::settings::DiscoverySettings;
use cs_core::{DeviceId, DiscoveryMessage};
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use super::socket::{bind_multicast, group_addr};
use crate::net_utils::preferred_lan_ip;
use crate::relay::SessionCount;

/// Periodically announces a relay on the discovery group.
///
/// Every advertisement carries the relay's live session count. Discovery
/// requests from clients are answered straight away.
pub struct ServerAdvertiser {
    core: Arc<AdvertiserCore>,
    runtime: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

struct AdvertiserCore {
    settings: DiscoverySettings,
    server_name: String,
    server_ip: String,
    server_port: u16,
    device_id: DeviceId,
    clock: Arc<dyn ClockPort>,
    sessions: Arc<dyn SessionCount>,
}

impl ServerAdvertiser {
    pub fn new(
        settings: DiscoverySettings,
        server_name: impl Into<String>,
        server_port: u16,
        identity: Arc<dyn DeviceIdentityPort>,
        clock: Arc<dyn ClockPort>,
        sessions: Arc<dyn SessionCount>,
    ) -> Self {
        Self::with_server_ip(
            settings,
            server_name,
            preferred_lan_ip().to_string(),
            server_port,
            identity,
            clock,
            sessions,
        )
    }

    pub fn with_server_ip(
        settings: DiscoverySettings,
        server_name: impl Into<String>,
        server_ip: impl Into<String>,
        server_port: u16,
        identity: Arc<dyn DeviceIdentityPort>,
        clock: Arc<dyn ClockPort>,
        sessions: Arc<dyn SessionCount>,
    ) -> Self {
        Self {
            core: Arc::new(AdvertiserCore {
                settings,
                server_name: server_name.into(),
                server_ip: server_ip.into(),
                server_port,
                device_id: identity.current_device_id(),
                clock,
                sessions,
            }),
            runtime: Mutex::new(None),
        }
    }

    /// The advertisement as it would be sent right now.
    pub fn advertisement(&self) -> DiscoveryMessage {
        self.core.advertisement()
    }

    pub async fn start(&self) -> Result<(), DiscoveryError> {
        let mut runtime = self.runtime.lock().await;
        if runtime.is_some() {
            return Ok(());
        }

        let group = group_addr(&self.core.settings)?;
        let socket = match bind_multicast(&self.core.settings) {
            Ok(socket) => socket,
            Err(e) => {
                warn!(error = %e, "relay advertising disabled for this run");
                return Err(e);
            }
        };

        let cancel = CancellationToken::new();
        let task = tokio::spawn(
            advertise_loop(self.core.clone(), socket, group, cancel.clone())
                .instrument(info_span!("network.discovery.advertise", group = %group)),
        );
        info!(
            server_name = %self.core.server_name,
            server_ip = %self.core.server_ip,
            server_port = self.core.server_port,
            "relay advertising started"
        );

        *runtime = Some((cancel, task));
        Ok(())
    }

    /// Idempotent.
    pub async fn stop(&self) {
        let Some((cancel, task)) = self.runtime.lock().await.take() else {
            return;
        };
        cancel.cancel();
        if let Err(e) = task.await {
            warn!(error = %e, "advertiser task ended abnormally");
        }
        info!("relay advertising stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.runtime.lock().await.is_some()
    }
}

impl AdvertiserCore {
    fn advertisement(&self) -> DiscoveryMessage {
        let connected = u32::try_from(self.sessions.connected_count()).unwrap_or(u32::MAX);
        DiscoveryMessage::advertisement(
            self.server_name.clone(),
            self.server_ip.clone(),
            self.server_port,
            self.device_id.clone(),
            connected,
            self.clock.now_ms(),
        )
    }

    /// Encoded advertisement, or `None` when it would not fit one datagram.
    fn encoded_advertisement(&self) -> Option<Vec<u8>> {
        let bytes = match self.advertisement().to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "failed to encode advertisement");
                return None;
            }
        };
        if bytes.len() > self.settings.max_message_bytes {
            warn!(
                len = bytes.len(),
                limit = self.settings.max_message_bytes,
                "advertisement exceeds datagram limit, not sent"
            );
            return None;
        }
        Some(bytes)
    }

    async fn announce(&self, socket: &UdpSocket, group: SocketAddr) {
        let Some(bytes) = self.encoded_advertisement() else {
            return;
        };
        match socket.send_to(&bytes, group).await {
            Ok(_) => debug!(connected = self.sessions.connected_count(), "advertisement sent"),
            Err(e) => warn!(error = %e, "failed to send advertisement"),
        }
    }

    fn is_request(&self, bytes: &[u8]) -> bool {
        if bytes.len() > self.settings.max_message_bytes {
            return false;
        }
        match DiscoveryMessage::from_bytes(bytes) {
            Ok(message) => message.is_discovery_request(),
            Err(e) => {
                debug!(error = %e, "ignoring undecodable datagram");
                false
            }
        }
    }
}

async fn advertise_loop(
    core: Arc<AdvertiserCore>,
    socket: UdpSocket,
    group: SocketAddr,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(core.settings.advertisement_interval());
    let recv_timeout: Duration = core.settings.socket_timeout();
    let mut buf = vec![0u8; core.settings.max_message_bytes + 1];

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => core.announce(&socket, group).await,
            received = tokio::time::timeout(recv_timeout, socket.recv_from(&mut buf)) => {
                match received {
                    Err(_elapsed) => {}
                    Ok(Ok((len, from))) => {
                        if core.is_request(&buf[..len]) {
                            debug!(%from, "answering discovery request");
                            core.announce(&socket, group).await;
                        }
                    }
                    Ok(Err(e)) => {
                        if cancel.is_cancelled() {
                            break;
                        }
                        warn!(error = %e, "advertiser receive failed");
                    }
                }
            }
        }
    }
    debug!("advertise loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Sessions(AtomicUsize);

    impl SessionCount for Sessions {
        fn connected_count(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    struct FixedClock;

    impl ClockPort for FixedClock {
        fn now_ms(&self) -> i64 {
            42
        }
    }

    struct RelayIdentity;

    impl DeviceIdentityPort for RelayIdentity {
        fn current_device_id(&self) -> DeviceId {
            DeviceId::new("server-abcd1234")
        }
    }

    fn advertiser(settings: DiscoverySettings, sessions: Arc<Sessions>) -> ServerAdvertiser {
        ServerAdvertiser::with_server_ip(
            settings,
            "Office Relay",
            "192.168.1.7",
            8080,
            Arc::new(RelayIdentity),
            Arc::new(FixedClock),
            sessions,
        )
    }

    #[test]
    fn advertisement_reports_live_session_count() {
        let sessions = Arc::new(Sessions(AtomicUsize::new(0)));
        let advertiser = advertiser(DiscoverySettings::default(), sessions.clone());

        assert_eq!(advertiser.advertisement().connected_devices, Some(0));
        sessions.0.store(3, Ordering::SeqCst);

        let ad = advertiser.advertisement();
        assert_eq!(ad.connected_devices, Some(3));
        assert_eq!(ad.server_ip.as_deref(), Some("192.168.1.7"));
        assert_eq!(ad.server_port, Some(8080));
        assert_eq!(ad.device_id.as_str(), "server-abcd1234");
        assert_eq!(ad.timestamp, 42);
    }

    #[test]
    fn oversized_advertisement_is_not_encoded() {
        let settings = DiscoverySettings {
            max_message_bytes: 16,
            ..DiscoverySettings::default()
        };
        let advertiser = advertiser(settings, Arc::new(Sessions(AtomicUsize::new(0))));
        assert!(advertiser.core.encoded_advertisement().is_none());
    }

    #[test]
    fn only_discovery_requests_trigger_answers() {
        let advertiser = advertiser(
            DiscoverySettings::default(),
            Arc::new(Sessions(AtomicUsize::new(0))),
        );
        let request = DiscoveryMessage::discovery_request(DeviceId::new("device-1"), 0)
            .to_bytes()
            .expect("encode");
        let own_ad = advertiser.advertisement().to_bytes().expect("encode");

        assert!(advertiser.core.is_request(&request));
        assert!(!advertiser.core.is_request(&own_ad));
        assert!(!advertiser.core.is_request(b"garbage"));
    }

    #[tokio::test]
    async fn stop_without_start_is_safe() {
        let advertiser = advertiser(
            DiscoverySettings::default(),
            Arc::new(Sessions(AtomicUsize::new(0))),
        );
        advertiser.stop().await;
        assert!(!advertiser.is_running().await);
    }
}
