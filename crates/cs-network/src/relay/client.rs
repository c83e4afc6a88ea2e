use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use cs_core::ports::{RelayTransportPort, TransportError};
use cs_core::ConnectionStatus;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async_with_config, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use super::ws_config;

const INBOUND_CHANNEL_CAPACITY: usize = 256;

/// Reconnecting connection to one relay.
///
/// Frames queued for a connection that drops are discarded; the next
/// connection starts with an empty queue.
pub struct RelayClient {
    reconnect_delay: Duration,
    max_frame_bytes: usize,
    shared: Arc<ClientShared>,
    inbound_rx: Mutex<Option<mpsc::Receiver<String>>>,
    runtime: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

struct ClientShared {
    status: watch::Sender<ConnectionStatus>,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    inbound: mpsc::Sender<String>,
}

impl RelayClient {
    pub fn new(reconnect_delay: Duration, max_frame_bytes: usize) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Disconnected);
        let (inbound, inbound_rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
        Self {
            reconnect_delay,
            max_frame_bytes,
            shared: Arc::new(ClientShared {
                status,
                outbound: Mutex::new(None),
                inbound,
            }),
            inbound_rx: Mutex::new(Some(inbound_rx)),
            runtime: Mutex::new(None),
        }
    }
}

#[async_trait]
impl RelayTransportPort for RelayClient {
    async fn connect(&self, url: &str) -> Result<()> {
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            bail!("relay url must use ws:// or wss://, got {}", url);
        }

        let mut runtime = self.runtime.lock().await;
        if let Some((cancel, task)) = runtime.take() {
            cancel.cancel();
            let _ = task.await;
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(
            connection_loop(
                url.to_string(),
                self.reconnect_delay,
                self.max_frame_bytes,
                self.shared.clone(),
                cancel.clone(),
            )
            .instrument(info_span!("network.relay.client", url = %url)),
        );
        *runtime = Some((cancel, task));
        Ok(())
    }

    async fn disconnect(&self) {
        let Some((cancel, task)) = self.runtime.lock().await.take() else {
            return;
        };
        cancel.cancel();
        if let Err(e) = task.await {
            warn!(error = %e, "relay client task ended abnormally");
        }
        *self.shared.outbound.lock().await = None;
        self.shared.set_status(ConnectionStatus::Disconnected);
        info!("relay client disconnected");
    }

    fn status(&self) -> ConnectionStatus {
        *self.shared.status.borrow()
    }

    fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.shared.status.subscribe()
    }

    async fn send_frame(&self, frame: String) -> Result<(), TransportError> {
        if frame.len() > self.max_frame_bytes {
            return Err(TransportError::PayloadTooLarge {
                size: frame.len(),
                limit: self.max_frame_bytes,
            });
        }
        if !self.status().is_connected() {
            return Err(TransportError::NotConnected);
        }
        let outbound = self.shared.outbound.lock().await;
        match outbound.as_ref() {
            Some(tx) => tx.send(frame).map_err(|_| TransportError::Closed),
            None => Err(TransportError::NotConnected),
        }
    }

    async fn subscribe_frames(&self) -> Result<mpsc::Receiver<String>> {
        match self.inbound_rx.lock().await.take() {
            Some(rx) => Ok(rx),
            None => bail!("relay inbound frames already taken"),
        }
    }
}

impl ClientShared {
    fn set_status(&self, status: ConnectionStatus) {
        let changed = self.status.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
        if changed {
            debug!(?status, "relay status changed");
        }
    }
}

async fn connection_loop(
    url: String,
    reconnect_delay: Duration,
    max_frame_bytes: usize,
    shared: Arc<ClientShared>,
    cancel: CancellationToken,
) {
    loop {
        shared.set_status(ConnectionStatus::Connecting);

        let connected = tokio::select! {
            _ = cancel.cancelled() => break,
            result = connect_async_with_config(url.as_str(), Some(ws_config(max_frame_bytes)), false) => result,
        };

        match connected {
            Ok((ws, _)) => {
                info!("connected to relay");
                run_connection(ws, &shared, &cancel).await;
                if cancel.is_cancelled() {
                    break;
                }
                warn!(delay_ms = reconnect_delay.as_millis() as u64, "relay connection lost, reconnecting");
            }
            Err(e) => {
                shared.set_status(ConnectionStatus::Disconnected);
                warn!(error = %e, delay_ms = reconnect_delay.as_millis() as u64, "relay connection failed");
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(reconnect_delay) => {}
        }
    }

    *shared.outbound.lock().await = None;
    shared.set_status(ConnectionStatus::Disconnected);
    debug!("relay client loop exited");
}

async fn run_connection(
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    shared: &ClientShared,
    cancel: &CancellationToken,
) {
    let (mut sink, mut stream) = ws.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();

    *shared.outbound.lock().await = Some(outbound_tx);
    shared.set_status(ConnectionStatus::Connected);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
            outgoing = outbound_rx.recv() => {
                let Some(frame) = outgoing else { break };
                if let Err(e) = sink.send(Message::text(frame)).await {
                    warn!(error = %e, "failed to send frame to relay");
                    break;
                }
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    deliver_inbound(&shared.inbound, text.as_str().to_owned());
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "relay transport error");
                    break;
                }
            }
        }
    }

    *shared.outbound.lock().await = None;
    shared.set_status(ConnectionStatus::Disconnected);
}

/// Hand an inbound frame to the sync layer without waiting, so a slow
/// consumer never holds up outbound sends. Returns whether it was queued.
fn deliver_inbound(inbound: &mpsc::Sender<String>, frame: String) -> bool {
    match inbound.try_send(frame) {
        Ok(()) => true,
        Err(TrySendError::Full(frame)) => {
            warn!(len = frame.len(), "inbound queue full, dropping frame");
            false
        }
        Err(TrySendError::Closed(_)) => {
            debug!("inbound frame dropped, no receiver");
            false
        }
    }
}
