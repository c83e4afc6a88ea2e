use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use cs_core::settings::RelaySettings;
use cs_core::SessionId;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_hdr_async_with_config;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use super::sessions::{SessionCount, SessionHandle, SessionRegistry, SESSION_QUEUE_CAPACITY};
use super::{preview, ws_config, SYNC_PATH};

const LOG_PREVIEW_CHARS: usize = 100;
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Fans every inbound frame out to all other connected sessions.
pub struct RelayServer {
    settings: RelaySettings,
    sessions: Arc<SessionRegistry>,
    runtime: Mutex<Option<ServerRuntime>>,
}

struct ServerRuntime {
    local_addr: SocketAddr,
    cancel: CancellationToken,
    accept: JoinHandle<()>,
}

impl RelayServer {
    pub fn new(settings: RelaySettings) -> Self {
        Self {
            settings,
            sessions: Arc::new(SessionRegistry::default()),
            runtime: Mutex::new(None),
        }
    }

    /// Bind and start accepting sessions. Returns the bound address.
    pub async fn start(&self) -> Result<SocketAddr> {
        let mut runtime = self.runtime.lock().await;
        if let Some(running) = runtime.as_ref() {
            return Ok(running.local_addr);
        }

        let listener = TcpListener::bind((self.settings.bind_address.as_str(), self.settings.port))
            .await
            .with_context(|| {
                format!(
                    "failed to bind relay on {}:{}",
                    self.settings.bind_address, self.settings.port
                )
            })?;
        let local_addr = listener
            .local_addr()
            .context("failed to read relay listen address")?;

        let cancel = CancellationToken::new();
        let accept = tokio::spawn(
            accept_loop(
                listener,
                self.sessions.clone(),
                self.settings.max_frame_bytes,
                cancel.clone(),
            )
            .instrument(info_span!("network.relay.accept", %local_addr)),
        );

        info!(%local_addr, name = %self.settings.server_name, "relay server started");
        *runtime = Some(ServerRuntime {
            local_addr,
            cancel,
            accept,
        });
        Ok(local_addr)
    }

    /// Stop accepting, close every session. Idempotent.
    pub async fn stop(&self) {
        let Some(runtime) = self.runtime.lock().await.take() else {
            return;
        };
        runtime.cancel.cancel();
        if let Err(e) = runtime.accept.await {
            warn!(error = %e, "relay accept task ended abnormally");
        }
        self.sessions.clear().await;
        info!(local_addr = %runtime.local_addr, "relay server stopped");
    }

    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.runtime.lock().await.as_ref().map(|r| r.local_addr)
    }

    pub fn server_name(&self) -> &str {
        &self.settings.server_name
    }
}

impl SessionCount for RelayServer {
    fn connected_count(&self) -> usize {
        self.sessions.connected_count()
    }
}

async fn accept_loop(
    listener: TcpListener,
    sessions: Arc<SessionRegistry>,
    max_frame_bytes: usize,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let sessions = sessions.clone();
                    let cancel = cancel.child_token();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, addr, sessions, max_frame_bytes, cancel).await {
                            warn!(%addr, error = %e, "relay connection failed");
                        }
                    });
                }
                Err(e) => warn!(error = %e, "failed to accept relay connection"),
            }
        }
    }
    debug!("relay accept loop exited");
}

fn check_path(request: &Request, response: Response) -> Result<Response, ErrorResponse> {
    if request.uri().path() == SYNC_PATH {
        return Ok(response);
    }
    let mut rejection = ErrorResponse::new(Some(format!(
        "unknown path {}, expected {}",
        request.uri().path(),
        SYNC_PATH
    )));
    *rejection.status_mut() = StatusCode::NOT_FOUND;
    Err(rejection)
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    sessions: Arc<SessionRegistry>,
    max_frame_bytes: usize,
    cancel: CancellationToken,
) -> Result<()> {
    let ws = accept_hdr_async_with_config(stream, check_path, Some(ws_config(max_frame_bytes)))
        .await
        .context("websocket handshake failed")?;

    let session_id = SessionId::random();
    let span = info_span!("network.relay.session", session_id = %session_id, %addr);
    run_session(ws, session_id, sessions, cancel).instrument(span).await;
    Ok(())
}

async fn run_session(
    ws: tokio_tungstenite::WebSocketStream<TcpStream>,
    session_id: SessionId,
    sessions: Arc<SessionRegistry>,
    cancel: CancellationToken,
) {
    let (mut sink, mut stream) = ws.split();
    let (writer_tx, mut writer_rx) = mpsc::channel::<Message>(SESSION_QUEUE_CAPACITY);

    sessions
        .register(session_id.clone(), SessionHandle::new(writer_tx, cancel.clone()))
        .await;
    info!(connected = sessions.connected_count(), "session connected");

    let writer_cancel = cancel.clone();
    let writer = tokio::spawn(async move {
        let pump = async {
            while let Some(message) = writer_rx.recv().await {
                if let Err(e) = sink.send(message).await {
                    debug!(error = %e, "session writer stopped");
                    break;
                }
            }
        };
        tokio::select! {
            _ = writer_cancel.cancelled() => {}
            _ = pump => {}
        }
        let _ = tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await;
    });

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            next = stream.next() => match next {
                Some(Ok(Message::Text(text))) => {
                    let len = text.len();
                    debug!(len, preview = %preview(text.as_str(), LOG_PREVIEW_CHARS), "frame received");
                    let delivered = sessions.broadcast(&session_id, Message::Text(text)).await;
                    debug!(len, delivered, "frame forwarded");
                }
                Some(Ok(Message::Binary(bytes))) => {
                    let delivered = sessions.broadcast(&session_id, Message::Binary(bytes)).await;
                    debug!(delivered, "binary frame forwarded");
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "session transport error");
                    break;
                }
            }
        }
    }

    sessions.deregister(&session_id).await;
    cancel.cancel();
    if let Err(e) = writer.await {
        warn!(error = %e, "session writer ended abnormally");
    }
    info!(connected = sessions.connected_count(), "session closed");
}
