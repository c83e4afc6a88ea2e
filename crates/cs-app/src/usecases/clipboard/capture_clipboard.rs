use std::sync::Arc;

use anyhow::{Context, Result};
use cs_core::ports::ClipboardHistoryPort;
use cs_core::{ClipboardEvent, ClipboardItem};
use tracing::{debug, info, info_span, Instrument};

use crate::event_bus::ClipboardEventBus;

/// Record an item handed over by the capture layer and announce it.
///
/// The item is persisted with history enforcement. Only items that were not
/// already known are published, as `origin = Local`.
pub struct CaptureClipboardUseCase {
    history: Arc<dyn ClipboardHistoryPort>,
    bus: ClipboardEventBus,
    max_history_items: usize,
}

impl CaptureClipboardUseCase {
    pub fn new(
        history: Arc<dyn ClipboardHistoryPort>,
        bus: ClipboardEventBus,
        max_history_items: usize,
    ) -> Self {
        Self {
            history,
            bus,
            max_history_items,
        }
    }

    /// Returns `true` when the item was new.
    pub async fn execute(&self, item: ClipboardItem) -> Result<bool> {
        let span = info_span!(
            "usecase.clipboard.capture.execute",
            kind = item.kind.as_str(),
            hash = %item.content_hash,
            size = item.size(),
        );

        async move {
            let inserted = self
                .history
                .upsert_and_enforce_history(&item, self.max_history_items)
                .await
                .context("failed to persist captured clipboard item")?;

            if !inserted {
                debug!("captured item already in history");
                return Ok(false);
            }

            info!(preview = %item.preview(40), "clipboard item captured");
            self.bus.publish(ClipboardEvent::local(item));
            Ok(true)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sqlite_history;
    use cs_core::ClipboardOrigin;

    #[tokio::test]
    async fn new_item_is_stored_and_published_as_local() {
        let (_dir, history) = sqlite_history();
        let bus = ClipboardEventBus::new();
        let mut events = bus.subscribe();
        let uc = CaptureClipboardUseCase::new(history.clone(), bus, 10);

        let item = ClipboardItem::text("copied");
        assert!(uc.execute(item.clone()).await.expect("capture"));

        assert!(history.exists(&item.content_hash).await.expect("exists"));
        match events.try_recv().expect("event") {
            ClipboardEvent::Changed { item: got, origin } => {
                assert_eq!(got.content_hash, item.content_hash);
                assert_eq!(origin, ClipboardOrigin::Local);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn known_item_is_not_republished() {
        let (_dir, history) = sqlite_history();
        let bus = ClipboardEventBus::new();
        let uc = CaptureClipboardUseCase::new(history.clone(), bus.clone(), 10);
        let item = ClipboardItem::text("again");
        uc.execute(item.clone()).await.expect("first capture");

        let mut events = bus.subscribe();
        assert!(!uc.execute(item).await.expect("second capture"));
        assert!(events.try_recv().is_err());
        assert_eq!(history.count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn history_limit_is_applied() {
        let (_dir, history) = sqlite_history();
        let uc = CaptureClipboardUseCase::new(history.clone(), ClipboardEventBus::new(), 2);
        for text in ["a", "b", "c"] {
            uc.execute(ClipboardItem::text(text)).await.expect("capture");
        }
        assert_eq!(history.count().await.expect("count"), 2);
    }
}
