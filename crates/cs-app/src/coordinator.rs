//! Sync coordinator: the relay-backed clipboard manager.
//!
//! Local items come in through [`ClipboardManagerPort::notify`], get stored
//! and published; a background task forwards `Local` events to the relay.
//! Frames from the relay go through the inbound use case, which publishes
//! new items as `Remote` so they are never sent back out.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use cs_core::ports::{ClipboardManagerPort, DiscoveryPort, RelayTransportPort};
use cs_core::{ClipboardEvent, ClipboardItem, ConnectionStatus, Settings};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::deps::SyncDeps;
use crate::event_bus::ClipboardEventBus;
use crate::usecases::clipboard::shared_key_from_settings;
use crate::usecases::{
    CaptureClipboardUseCase, ClipboardHistoryUseCase, ResolveRelayUseCase,
    SyncInboundClipboardUseCase, SyncOutboundClipboardUseCase,
};

pub struct SyncCoordinator {
    sync_enabled: bool,
    retry_delay: Duration,
    bus: ClipboardEventBus,
    capture: CaptureClipboardUseCase,
    history: ClipboardHistoryUseCase,
    outbound: Arc<SyncOutboundClipboardUseCase>,
    inbound: Arc<SyncInboundClipboardUseCase>,
    resolve: Arc<ResolveRelayUseCase>,
    transport: Arc<dyn RelayTransportPort>,
    discovery: Arc<dyn DiscoveryPort>,
    frames: Mutex<Option<mpsc::Receiver<String>>>,
    runtime: Mutex<Option<CoordinatorRuntime>>,
}

struct CoordinatorRuntime {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    inbound: Option<JoinHandle<mpsc::Receiver<String>>>,
}

impl SyncCoordinator {
    /// Fails only when the configured encryption key cannot be parsed.
    pub fn new(deps: SyncDeps, settings: &Settings) -> Result<Self> {
        let key = shared_key_from_settings(&settings.sync)?;
        let bus = ClipboardEventBus::new();
        let max_history_items = settings.history.max_history_items;

        let capture = CaptureClipboardUseCase::new(deps.history.clone(), bus.clone(), max_history_items);
        let history = ClipboardHistoryUseCase::new(deps.history.clone());
        let outbound = SyncOutboundClipboardUseCase::new(
            deps.transport.clone(),
            deps.encryption.clone(),
            deps.device_identity.clone(),
            key.clone(),
            settings.sync.max_payload_bytes,
        );
        let inbound = SyncInboundClipboardUseCase::new(
            deps.history.clone(),
            deps.encryption.clone(),
            deps.device_identity.clone(),
            bus.clone(),
            key,
            max_history_items,
        );
        let resolve = ResolveRelayUseCase::new(
            deps.discovery.clone(),
            settings.sync.relay_address.clone(),
            settings.discovery.client_discovery_timeout(),
        );

        Ok(Self {
            sync_enabled: settings.sync.enabled,
            retry_delay: settings.sync.reconnect_delay(),
            bus,
            capture,
            history,
            outbound: Arc::new(outbound),
            inbound: Arc::new(inbound),
            resolve: Arc::new(resolve),
            transport: deps.transport,
            discovery: deps.discovery,
            frames: Mutex::new(None),
            runtime: Mutex::new(None),
        })
    }

    pub fn history(&self) -> &ClipboardHistoryUseCase {
        &self.history
    }

    pub fn status(&self) -> ConnectionStatus {
        self.transport.status()
    }

    pub async fn is_running(&self) -> bool {
        self.runtime.lock().await.is_some()
    }

    async fn take_frames(&self) -> Result<mpsc::Receiver<String>> {
        if let Some(frames) = self.frames.lock().await.take() {
            return Ok(frames);
        }
        self.transport
            .subscribe_frames()
            .await
            .context("failed to subscribe to relay frames")
    }
}

#[async_trait]
impl ClipboardManagerPort for SyncCoordinator {
    async fn start(&self) -> Result<()> {
        let mut runtime = self.runtime.lock().await;
        if runtime.is_some() {
            return Ok(());
        }

        let cancel = CancellationToken::new();
        let mut tasks = Vec::new();
        let mut inbound = None;

        if self.sync_enabled {
            let frames = self.take_frames().await?;

            tasks.push(tokio::spawn(
                outbound_loop(self.bus.subscribe(), self.outbound.clone(), cancel.clone())
                    .instrument(info_span!("sync.outbound")),
            ));
            inbound = Some(tokio::spawn(
                inbound_loop(frames, self.inbound.clone(), cancel.clone())
                    .instrument(info_span!("sync.inbound")),
            ));
            tasks.push(tokio::spawn(
                status_loop(self.transport.subscribe_status(), self.bus.clone(), cancel.clone())
                    .instrument(info_span!("sync.status")),
            ));
            tasks.push(tokio::spawn(
                connect_loop(
                    self.resolve.clone(),
                    self.transport.clone(),
                    self.retry_delay,
                    cancel.clone(),
                )
                .instrument(info_span!("sync.connect")),
            ));
            info!("sync coordinator started");
        } else {
            info!("sync disabled, recording local history only");
        }

        *runtime = Some(CoordinatorRuntime {
            cancel,
            tasks,
            inbound,
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
                warn!(error = %e, "sync task ended abnormally");
            }
        }
        if let Some(inbound) = runtime.inbound {
            match inbound.await {
                Ok(frames) => *self.frames.lock().await = Some(frames),
                Err(e) => warn!(error = %e, "inbound sync task ended abnormally"),
            }
        }

        self.transport.disconnect().await;
        self.discovery.stop().await;
        info!("sync coordinator stopped");
    }

    fn subscribe(&self) -> broadcast::Receiver<ClipboardEvent> {
        self.bus.subscribe()
    }

    async fn notify(&self, item: ClipboardItem) -> Result<bool> {
        self.capture.execute(item).await
    }
}

async fn outbound_loop(
    mut events: broadcast::Receiver<ClipboardEvent>,
    outbound: Arc<SyncOutboundClipboardUseCase>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => match event {
                Ok(ClipboardEvent::Changed { item, origin }) => {
                    if let Err(e) = outbound.execute(&item, origin).await {
                        warn!(error = format!("{:#}", e), "outbound sync failed");
                    }
                }
                Ok(ClipboardEvent::SyncStatusChanged(_)) => {}
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "outbound sync fell behind"),
                Err(RecvError::Closed) => break,
            }
        }
    }
    debug!("outbound loop exited");
}

async fn inbound_loop(
    mut frames: mpsc::Receiver<String>,
    inbound: Arc<SyncInboundClipboardUseCase>,
    cancel: CancellationToken,
) -> mpsc::Receiver<String> {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            frame = frames.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = inbound.execute(&frame).await {
                        warn!(error = format!("{:#}", e), "inbound frame dropped");
                    }
                }
                None => break,
            }
        }
    }
    debug!("inbound loop exited");
    frames
}

async fn status_loop(
    mut status: watch::Receiver<ConnectionStatus>,
    bus: ClipboardEventBus,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *status.borrow_and_update();
                info!(status = ?current, "relay connectivity changed");
                bus.publish(ClipboardEvent::SyncStatusChanged(current));
            }
        }
    }
}

async fn connect_loop(
    resolve: Arc<ResolveRelayUseCase>,
    transport: Arc<dyn RelayTransportPort>,
    retry_delay: Duration,
    cancel: CancellationToken,
) {
    loop {
        let resolved = tokio::select! {
            _ = cancel.cancelled() => return,
            resolved = resolve.execute() => resolved,
        };

        match resolved {
            Ok(Some(url)) => {
                if let Err(e) = transport.connect(&url).await {
                    error!(url = %url, error = format!("{:#}", e), "cannot connect to relay");
                } else {
                    info!(url = %url, "relay connection started");
                }
                return;
            }
            Ok(None) => debug!("no relay yet, retrying discovery"),
            Err(e) => warn!(error = format!("{:#}", e), "relay resolution failed"),
        }

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(retry_delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sqlite_history, FixedIdentity, MockDiscovery, RecordingTransport};
    use cs_core::{ClipboardOrigin, DeviceId, SyncEnvelope};
    use cs_infra::XChaChaEncryption;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    fn settings(enabled: bool) -> Settings {
        let mut settings = Settings::default();
        settings.sync.enabled = enabled;
        settings.sync.relay_address = "ws://127.0.0.1:9/sync".to_string();
        settings
    }

    fn quiet_discovery() -> MockDiscovery {
        let mut discovery = MockDiscovery::new();
        discovery.expect_stop().returning(|| ());
        discovery
    }

    fn coordinator(
        transport: Arc<RecordingTransport>,
        settings: &Settings,
    ) -> (tempfile::TempDir, SyncCoordinator) {
        let (dir, history) = sqlite_history();
        let deps = SyncDeps {
            history,
            transport,
            discovery: Arc::new(quiet_discovery()),
            encryption: Arc::new(XChaChaEncryption),
            device_identity: Arc::new(FixedIdentity::new("dev-A")),
        };
        let coordinator = SyncCoordinator::new(deps, settings).expect("coordinator");
        (dir, coordinator)
    }

    async fn wait_until<F: Fn() -> bool>(check: F) {
        timeout(WAIT, async {
            while !check() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition reached");
    }

    #[tokio::test]
    async fn disabled_sync_records_locally_without_connecting() {
        let transport = Arc::new(RecordingTransport::connected());
        let (_dir, coordinator) = coordinator(transport.clone(), &settings(false));
        let mut events = coordinator.subscribe();

        coordinator.start().await.expect("start");
        assert!(coordinator.notify(ClipboardItem::text("local only")).await.expect("notify"));

        match events.recv().await.expect("event") {
            ClipboardEvent::Changed { origin, .. } => assert_eq!(origin, ClipboardOrigin::Local),
            other => panic!("unexpected event {:?}", other),
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(transport.connects().is_empty());
        assert!(transport.sent().is_empty());

        coordinator.stop().await;
        coordinator.stop().await;
    }

    #[tokio::test]
    async fn local_item_is_forwarded_to_relay() {
        let transport = Arc::new(RecordingTransport::connected());
        let (_dir, coordinator) = coordinator(transport.clone(), &settings(true));

        coordinator.start().await.expect("start");
        wait_until(|| transport.connects() == vec!["ws://127.0.0.1:9/sync".to_string()]).await;

        coordinator.notify(ClipboardItem::text("hello")).await.expect("notify");
        wait_until(|| transport.sent().len() == 1).await;

        let envelope = SyncEnvelope::from_json(&transport.sent()[0]).expect("decode");
        assert_eq!(envelope.device_id.as_str(), "dev-A");
        coordinator.stop().await;
    }

    #[tokio::test]
    async fn remote_item_is_stored_but_not_echoed() {
        let transport = Arc::new(RecordingTransport::connected());
        let (_dir, coordinator) = coordinator(transport.clone(), &settings(true));
        let mut events = coordinator.subscribe();
        coordinator.start().await.expect("start");

        let item = ClipboardItem::text("from dev-B");
        let frame = SyncEnvelope::from_item(&item, DeviceId::new("dev-B"))
            .to_json()
            .expect("encode");
        transport.deliver(frame.clone()).await;
        transport.deliver(frame).await;

        let received = timeout(WAIT, async {
            loop {
                if let Ok(ClipboardEvent::Changed { item, origin }) = events.recv().await {
                    return (item, origin);
                }
            }
        })
        .await
        .expect("remote event");
        assert_eq!(received.0.content_hash, item.content_hash);
        assert_eq!(received.1, ClipboardOrigin::Remote);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(transport.sent().is_empty());
        assert_eq!(coordinator.history().list().await.expect("list").len(), 1);
        coordinator.stop().await;
    }

    #[tokio::test]
    async fn restart_reuses_inbound_frames() {
        let transport = Arc::new(RecordingTransport::connected());
        let (_dir, coordinator) = coordinator(transport.clone(), &settings(true));

        coordinator.start().await.expect("first start");
        coordinator.stop().await;
        assert!(!coordinator.is_running().await);
        coordinator.start().await.expect("second start");
        assert!(coordinator.is_running().await);
        coordinator.stop().await;
    }

    #[test]
    fn malformed_key_fails_construction() {
        let mut bad = settings(true);
        bad.sync.encryption_key = "short".to_string();
        let (_dir, history) = sqlite_history();
        let deps = SyncDeps {
            history,
            transport: Arc::new(RecordingTransport::connected()),
            discovery: Arc::new(MockDiscovery::new()),
            encryption: Arc::new(XChaChaEncryption),
            device_identity: Arc::new(FixedIdentity::new("dev-A")),
        };
        assert!(SyncCoordinator::new(deps, &bad).is_err());
    }
}
