use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::clipboard::{ClipboardItem, ContentHash};
use crate::ports::StoreError;

/// Durable, content-addressed clipboard history.
///
/// Inserts are keyed by `content_hash`: inserting a known hash is a no-op.
#[async_trait]
pub trait ClipboardHistoryPort: Send + Sync {
    /// Returns `true` when the item was inserted, `false` when the hash
    /// already existed.
    async fn upsert(&self, item: &ClipboardItem) -> Result<bool, StoreError>;

    /// Like [`Self::upsert`], then evicts the oldest non-pinned items so that at
    /// most `max_items` non-pinned items remain. Both steps share one
    /// transaction.
    async fn upsert_and_enforce_history(
        &self,
        item: &ClipboardItem,
        max_items: usize,
    ) -> Result<bool, StoreError>;

    async fn exists(&self, hash: &ContentHash) -> Result<bool, StoreError>;

    async fn find_by_hash(&self, hash: &ContentHash) -> Result<Option<ClipboardItem>, StoreError>;

    /// Returns `true` when an item was removed.
    async fn delete(&self, hash: &ContentHash) -> Result<bool, StoreError>;

    async fn delete_all(&self) -> Result<(), StoreError>;

    /// Flips the pin flag and returns the new value.
    async fn toggle_pin(&self, hash: &ContentHash) -> Result<bool, StoreError>;

    /// Newest first.
    async fn list(&self) -> Result<Vec<ClipboardItem>, StoreError>;

    async fn list_by_tag(&self, tag: &str) -> Result<Vec<ClipboardItem>, StoreError>;

    async fn list_by_category(&self, category: &str) -> Result<Vec<ClipboardItem>, StoreError>;

    async fn list_pinned(&self) -> Result<Vec<ClipboardItem>, StoreError>;

    async fn all_tags(&self) -> Result<Vec<String>, StoreError>;

    async fn all_categories(&self) -> Result<Vec<String>, StoreError>;

    /// Replaces the item's tag set atomically.
    async fn update_tags(
        &self,
        hash: &ContentHash,
        tags: &BTreeSet<String>,
    ) -> Result<(), StoreError>;

    async fn set_category(&self, hash: &ContentHash, category: &str) -> Result<(), StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;
}
