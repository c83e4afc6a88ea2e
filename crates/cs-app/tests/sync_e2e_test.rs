//! Three coordinators syncing through a real relay on loopback.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cs_app::{SyncCoordinator, SyncDeps};
use cs_core::ports::{ClipboardManagerPort, DeviceIdentityPort, EncryptionPort};
use cs_core::security::SharedKey;
use cs_core::settings::RelaySettings;
use cs_core::{ClipboardEvent, ClipboardItem, ClipboardOrigin, ConnectionStatus, DeviceId, Settings};
use cs_infra::db::mappers::ClipboardItemRowMapper;
use cs_infra::db::pool::init_db_pool;
use cs_infra::db::repositories::DieselClipboardHistoryRepository;
use cs_infra::db::DieselSqliteExecutor;
use cs_infra::{SystemClock, XChaChaEncryption};
use cs_network::relay::SessionCount;
use cs_network::{NetworkDiscoverer, RelayClient, RelayServer};
use tempfile::TempDir;
use tokio::sync::broadcast;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(10);

struct StaticIdentity(DeviceId);

impl DeviceIdentityPort for StaticIdentity {
    fn current_device_id(&self) -> DeviceId {
        self.0.clone()
    }
}

struct Node {
    _dir: TempDir,
    coordinator: SyncCoordinator,
    events: broadcast::Receiver<ClipboardEvent>,
}

fn build_node(device: &str, relay: SocketAddr, key: &SharedKey) -> Node {
    let dir = tempfile::tempdir().expect("temp dir");
    let db_path = dir.path().join("history.db");
    let pool = init_db_pool(db_path.to_str().expect("utf-8 path")).expect("init pool");
    let history = DieselClipboardHistoryRepository::new(
        DieselSqliteExecutor::new(pool),
        ClipboardItemRowMapper,
    );

    let mut settings = Settings::default();
    settings.sync.enabled = true;
    settings.sync.relay_address = format!("ws://{}/sync", relay);
    settings.sync.encryption_key = key.to_base64();
    settings.sync.reconnect_delay_ms = 100;

    let identity: Arc<dyn DeviceIdentityPort> = Arc::new(StaticIdentity(DeviceId::new(device)));
    let deps = SyncDeps {
        history: Arc::new(history),
        transport: Arc::new(RelayClient::new(
            settings.sync.reconnect_delay(),
            settings.relay.max_frame_bytes,
        )),
        discovery: Arc::new(NetworkDiscoverer::new(
            settings.discovery.clone(),
            identity.clone(),
            Arc::new(SystemClock),
        )),
        encryption: Arc::new(XChaChaEncryption),
        device_identity: identity,
    };

    let coordinator = SyncCoordinator::new(deps, &settings).expect("coordinator");
    let events = coordinator.subscribe();
    Node {
        _dir: dir,
        coordinator,
        events,
    }
}

async fn wait_connected(node: &Node) {
    timeout(WAIT, async {
        while node.coordinator.status() != ConnectionStatus::Connected {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("node connected");
}

async fn next_change(events: &mut broadcast::Receiver<ClipboardEvent>) -> (ClipboardItem, ClipboardOrigin) {
    timeout(WAIT, async {
        loop {
            match events.recv().await {
                Ok(ClipboardEvent::Changed { item, origin }) => return (item, origin),
                Ok(ClipboardEvent::SyncStatusChanged(_)) => continue,
                Err(e) => panic!("event stream failed: {e}"),
            }
        }
    })
    .await
    .expect("change event")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn copy_on_one_device_reaches_the_others_once() {
    let relay = RelayServer::new(RelaySettings {
        bind_address: "127.0.0.1".to_string(),
        port: 0,
        ..RelaySettings::default()
    });
    let addr = relay.start().await.expect("start relay");
    let key = XChaChaEncryption.generate_key().expect("key");

    let mut x = build_node("dev-A", addr, &key);
    let mut y = build_node("dev-B", addr, &key);
    let mut z = build_node("dev-C", addr, &key);

    for node in [&x, &y, &z] {
        node.coordinator.start().await.expect("start node");
    }
    for node in [&x, &y, &z] {
        wait_connected(node).await;
    }
    timeout(WAIT, async {
        while relay.connected_count() != 3 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("three sessions");

    let copied = ClipboardItem::text("hello");
    assert!(x.coordinator.notify(copied.clone()).await.expect("notify"));

    let (_, origin) = next_change(&mut x.events).await;
    assert_eq!(origin, ClipboardOrigin::Local);

    for node in [&mut y, &mut z] {
        let (item, origin) = next_change(&mut node.events).await;
        assert_eq!(origin, ClipboardOrigin::Remote);
        assert_eq!(item.content, b"hello".to_vec());
        assert_eq!(item.content_hash, copied.content_hash);
    }

    tokio::time::sleep(Duration::from_millis(300)).await;
    for node in [&y, &z] {
        let stored = node.coordinator.history().list().await.expect("list");
        assert_eq!(stored.len(), 1);
    }
    // Nothing bounced back to the sender.
    assert!(x.events.try_recv().is_err());
    assert_eq!(x.coordinator.history().list().await.expect("list").len(), 1);

    for node in [&x, &y, &z] {
        node.coordinator.stop().await;
    }
    relay.stop().await;
}
