use std::collections::BTreeSet;
use std::sync::Arc;

use cs_core::ports::{ClipboardHistoryPort, StoreError};
use cs_core::{ClipboardItem, ContentHash};
use tracing::{info, info_span, Instrument};

/// Queries and edits on the stored history, for presentation layers.
pub struct ClipboardHistoryUseCase {
    history: Arc<dyn ClipboardHistoryPort>,
}

impl ClipboardHistoryUseCase {
    pub fn new(history: Arc<dyn ClipboardHistoryPort>) -> Self {
        Self { history }
    }

    /// Newest first.
    pub async fn list(&self) -> Result<Vec<ClipboardItem>, StoreError> {
        self.history
            .list()
            .instrument(info_span!("usecase.history.list.execute"))
            .await
    }

    pub async fn list_by_tag(&self, tag: &str) -> Result<Vec<ClipboardItem>, StoreError> {
        self.history
            .list_by_tag(tag)
            .instrument(info_span!("usecase.history.list_by_tag.execute", tag))
            .await
    }

    pub async fn list_by_category(&self, category: &str) -> Result<Vec<ClipboardItem>, StoreError> {
        self.history
            .list_by_category(category)
            .instrument(info_span!("usecase.history.list_by_category.execute", category))
            .await
    }

    pub async fn list_pinned(&self) -> Result<Vec<ClipboardItem>, StoreError> {
        self.history
            .list_pinned()
            .instrument(info_span!("usecase.history.list_pinned.execute"))
            .await
    }

    pub async fn all_tags(&self) -> Result<Vec<String>, StoreError> {
        self.history.all_tags().await
    }

    pub async fn all_categories(&self) -> Result<Vec<String>, StoreError> {
        self.history.all_categories().await
    }

    /// Returns the new pin state.
    pub async fn toggle_pin(&self, hash: &ContentHash) -> Result<bool, StoreError> {
        let span = info_span!("usecase.history.toggle_pin.execute", hash = %hash);
        async move {
            let pinned = self.history.toggle_pin(hash).await?;
            info!(pinned, "pin toggled");
            Ok(pinned)
        }
        .instrument(span)
        .await
    }

    pub async fn delete(&self, hash: &ContentHash) -> Result<bool, StoreError> {
        let span = info_span!("usecase.history.delete.execute", hash = %hash);
        async move {
            let deleted = self.history.delete(hash).await?;
            info!(deleted, "history item delete requested");
            Ok(deleted)
        }
        .instrument(span)
        .await
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        let span = info_span!("usecase.history.clear.execute");
        async move {
            self.history.delete_all().await?;
            info!("history cleared");
            Ok(())
        }
        .instrument(span)
        .await
    }

    pub async fn update_tags(
        &self,
        hash: &ContentHash,
        tags: &BTreeSet<String>,
    ) -> Result<(), StoreError> {
        self.history
            .update_tags(hash, tags)
            .instrument(info_span!("usecase.history.update_tags.execute", hash = %hash, count = tags.len()))
            .await
    }

    pub async fn set_category(&self, hash: &ContentHash, category: &str) -> Result<(), StoreError> {
        self.history
            .set_category(hash, category)
            .instrument(info_span!("usecase.history.set_category.execute", hash = %hash, category))
            .await
    }
}
