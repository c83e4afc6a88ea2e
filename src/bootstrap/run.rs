use anyhow::{Context, Result};
use cs_core::ports::ClipboardManagerPort;
use cs_core::{AppConfig, ClipboardEvent};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use super::wiring::{self, Role};

/// Run the configured role until Ctrl-C, then stop every component.
///
/// Tracing must already be installed.
pub async fn run_app(config: AppConfig) -> Result<()> {
    let role: Role = config.role.parse()?;
    let dirs = wiring::resolve_app_dirs(&config)?;
    wiring::ensure_dirs(&dirs)?;
    let settings = wiring::load_settings(&dirs).await?;
    info!(%role, data_dir = %dirs.data_dir.display(), "starting clipsync");

    let relay = if role.runs_relay() {
        let relay = wiring::build_relay(&settings, &dirs);
        let addr = relay.server.start().await.context("failed to start relay server")?;
        info!(%addr, name = relay.server.server_name(), "relay listening");
        if let Err(e) = relay.advertiser.start().await {
            warn!(error = %e, "relay advertisement unavailable, clients need a configured address");
        }
        Some(relay)
    } else {
        None
    };

    let coordinator = if role.runs_client() {
        let coordinator = wiring::build_coordinator(&settings, &dirs)?;
        coordinator.start().await.context("failed to start sync")?;
        Some(coordinator)
    } else {
        None
    };

    let reporter = coordinator.as_ref().map(|c| tokio::spawn(report_events(c.subscribe())));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("shutdown requested");

    if let Some(reporter) = reporter {
        reporter.abort();
    }
    if let Some(coordinator) = coordinator {
        coordinator.stop().await;
    }
    if let Some(relay) = relay {
        relay.advertiser.stop().await;
        relay.server.stop().await;
    }
    info!("clipsync stopped");
    Ok(())
}

async fn report_events(mut events: tokio::sync::broadcast::Receiver<ClipboardEvent>) {
    loop {
        match events.recv().await {
            Ok(ClipboardEvent::Changed { item, origin }) => info!(
                origin = origin.as_str(),
                kind = item.kind.as_str(),
                hash = %item.content_hash,
                preview = %item.preview(40),
                "clipboard history updated"
            ),
            Ok(ClipboardEvent::SyncStatusChanged(status)) => info!(?status, "sync status"),
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "event reporter fell behind"),
            Err(RecvError::Closed) => break,
        }
    }
}
