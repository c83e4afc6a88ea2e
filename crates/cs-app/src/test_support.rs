//! Shared fakes for use case tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cs_core::ports::{
    ClipboardHistoryPort, DeviceIdentityPort, DiscoveryError, DiscoveryPort, RelayTransportPort,
    TransportError,
};
use cs_core::{ConnectionStatus, DeviceId, DiscoveredPeer, DiscoveryEvent};
use cs_infra::db::mappers::ClipboardItemRowMapper;
use cs_infra::db::pool::init_db_pool;
use cs_infra::db::repositories::DieselClipboardHistoryRepository;
use cs_infra::db::DieselSqliteExecutor;
use tempfile::TempDir;
use mockall::mock;
use tokio::sync::{broadcast, mpsc, watch};

mock! {
    pub Discovery {}

    #[async_trait]
    impl DiscoveryPort for Discovery {
        async fn start(&self) -> Result<(), DiscoveryError>;
        async fn stop(&self);
        async fn refresh(&self) -> Result<(), DiscoveryError>;
        async fn peers(&self) -> Vec<DiscoveredPeer>;
        fn subscribe(&self) -> broadcast::Receiver<DiscoveryEvent>;
        fn is_active(&self) -> bool;
    }
}

pub(crate) fn sqlite_history() -> (TempDir, Arc<dyn ClipboardHistoryPort>) {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("history.db");
    let pool = init_db_pool(path.to_str().expect("utf-8 path")).expect("init pool");
    let repo = DieselClipboardHistoryRepository::new(
        DieselSqliteExecutor::new(pool),
        ClipboardItemRowMapper,
    );
    (dir, Arc::new(repo))
}

pub(crate) struct FixedIdentity(DeviceId);

impl FixedIdentity {
    pub(crate) fn new(id: &str) -> Self {
        Self(DeviceId::new(id))
    }
}

impl DeviceIdentityPort for FixedIdentity {
    fn current_device_id(&self) -> DeviceId {
        self.0.clone()
    }
}

/// Transport with a fixed status that records every frame it is given.
/// Inbound frames are injected with [`RecordingTransport::deliver`].
pub(crate) struct RecordingTransport {
    status: watch::Sender<ConnectionStatus>,
    sent: Arc<Mutex<Vec<String>>>,
    connects: Arc<Mutex<Vec<String>>>,
    inbound_tx: mpsc::Sender<String>,
    inbound_rx: Mutex<Option<mpsc::Receiver<String>>>,
}

impl RecordingTransport {
    pub(crate) fn connected() -> Self {
        Self::with_status(ConnectionStatus::Connected)
    }

    pub(crate) fn disconnected() -> Self {
        Self::with_status(ConnectionStatus::Disconnected)
    }

    fn with_status(status: ConnectionStatus) -> Self {
        let (status, _) = watch::channel(status);
        let (inbound_tx, inbound_rx) = mpsc::channel(16);
        Self {
            status,
            sent: Arc::new(Mutex::new(Vec::new())),
            connects: Arc::new(Mutex::new(Vec::new())),
            inbound_tx,
            inbound_rx: Mutex::new(Some(inbound_rx)),
        }
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().expect("sent lock").clone()
    }

    pub(crate) fn connects(&self) -> Vec<String> {
        self.connects.lock().expect("connects lock").clone()
    }

    pub(crate) async fn deliver(&self, frame: String) {
        self.inbound_tx.send(frame).await.expect("inbound receiver alive");
    }
}

#[async_trait]
impl RelayTransportPort for RecordingTransport {
    async fn connect(&self, url: &str) -> anyhow::Result<()> {
        self.connects.lock().expect("connects lock").push(url.to_string());
        Ok(())
    }

    async fn disconnect(&self) {}

    fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    async fn send_frame(&self, frame: String) -> Result<(), TransportError> {
        if !self.status().is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.sent.lock().expect("sent lock").push(frame);
        Ok(())
    }

    async fn subscribe_frames(&self) -> anyhow::Result<mpsc::Receiver<String>> {
        self.inbound_rx
            .lock()
            .expect("inbound lock")
            .take()
            .ok_or_else(|| anyhow::anyhow!("frames already taken"))
    }
}
