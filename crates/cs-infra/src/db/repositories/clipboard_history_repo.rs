use std::collections::{BTreeSet, HashMap};

use anyhow::Result;
use async_trait::async_trait;
use diesel::prelude::*;
use tracing::{debug, debug_span, Instrument};

use cs_core::clipboard::{normalize_category, normalize_tags};
use cs_core::ports::{ClipboardHistoryPort, StoreError};
use cs_core::{ClipboardItem, ContentHash};

use crate::db::models::{ClipboardItemRow, ItemTagRow, NewClipboardItemRow};
use crate::db::ports::{DbExecutor, InsertMapper, RowMapper};
use crate::db::retry::{retry_on_contention, RetryPolicy};
use crate::db::schema::{clipboard_items, item_tags};

pub struct DieselClipboardHistoryRepository<E, M> {
    executor: E,
    mapper: M,
    retry: RetryPolicy,
}

impl<E, M> DieselClipboardHistoryRepository<E, M> {
    pub fn new(executor: E, mapper: M) -> Self {
        Self {
            executor,
            mapper,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

fn storage_err(err: anyhow::Error) -> StoreError {
    StoreError::Storage(format!("{:#}", err))
}

fn insert_if_absent(
    conn: &mut SqliteConnection,
    row: &NewClipboardItemRow,
    tags: &BTreeSet<String>,
) -> Result<bool> {
    let inserted = diesel::insert_into(clipboard_items::table)
        .values(row)
        .on_conflict(clipboard_items::hash)
        .do_nothing()
        .execute(conn)?;
    if inserted == 0 {
        return Ok(false);
    }
    replace_tags(conn, &row.hash, tags)?;
    Ok(true)
}

fn replace_tags(conn: &mut SqliteConnection, hash: &str, tags: &BTreeSet<String>) -> Result<()> {
    diesel::delete(item_tags::table.filter(item_tags::item_hash.eq(hash))).execute(conn)?;
    for tag in tags {
        diesel::insert_into(item_tags::table)
            .values(ItemTagRow {
                item_hash: hash.to_string(),
                tag: tag.clone(),
            })
            .execute(conn)?;
    }
    Ok(())
}

/// Delete the oldest non-pinned items beyond `max_items`. Returns how many went.
fn evict_unpinned_overflow(conn: &mut SqliteConnection, max_items: usize) -> Result<usize> {
    let unpinned: i64 = clipboard_items::table
        .filter(clipboard_items::pinned.eq(false))
        .count()
        .get_result(conn)?;
    let excess = unpinned - max_items as i64;
    if excess <= 0 {
        return Ok(0);
    }

    let victims: Vec<String> = clipboard_items::table
        .filter(clipboard_items::pinned.eq(false))
        .order(clipboard_items::id.asc())
        .limit(excess)
        .select(clipboard_items::hash)
        .load(conn)?;

    diesel::delete(item_tags::table.filter(item_tags::item_hash.eq_any(&victims)))
        .execute(conn)?;
    let removed = diesel::delete(clipboard_items::table.filter(clipboard_items::hash.eq_any(&victims)))
        .execute(conn)?;
    Ok(removed)
}

fn load_tags(
    conn: &mut SqliteConnection,
    hashes: &[String],
) -> Result<HashMap<String, Vec<String>>> {
    let rows: Vec<ItemTagRow> = item_tags::table
        .filter(item_tags::item_hash.eq_any(hashes))
        .load(conn)?;

    let mut by_hash: HashMap<String, Vec<String>> = HashMap::new();
    for row in rows {
        by_hash.entry(row.item_hash).or_default().push(row.tag);
    }
    Ok(by_hash)
}

fn attach_tags(
    conn: &mut SqliteConnection,
    rows: Vec<ClipboardItemRow>,
) -> Result<Vec<(ClipboardItemRow, Vec<String>)>> {
    let hashes: Vec<String> = rows.iter().map(|r| r.hash.clone()).collect();
    let mut tags = load_tags(conn, &hashes)?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let row_tags = tags.remove(&row.hash).unwrap_or_default();
            (row, row_tags)
        })
        .collect())
}

impl<E, M> DieselClipboardHistoryRepository<E, M>
where
    E: DbExecutor,
    M: RowMapper<(ClipboardItemRow, Vec<String>), ClipboardItem>,
{
    fn load_items<F>(&self, query: F) -> Result<Vec<ClipboardItem>, StoreError>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<Vec<ClipboardItemRow>>,
    {
        let rows = self
            .executor
            .run(|conn| {
                let rows = query(conn)?;
                attach_tags(conn, rows)
            })
            .map_err(storage_err)?;

        rows.iter()
            .map(|row| self.mapper.to_domain(row))
            .collect::<Result<Vec<_>>>()
            .map_err(storage_err)
    }
}

#[async_trait]
impl<E, M> ClipboardHistoryPort for DieselClipboardHistoryRepository<E, M>
where
    E: DbExecutor,
    M: InsertMapper<ClipboardItem, NewClipboardItemRow>
        + RowMapper<(ClipboardItemRow, Vec<String>), ClipboardItem>,
{
    async fn upsert(&self, item: &ClipboardItem) -> Result<bool, StoreError> {
        let span = debug_span!(
            "infra.sqlite.upsert_clipboard_item",
            table = "clipboard_items",
            hash = %item.content_hash,
        );
        let _enter = span.enter();

        let row = self.mapper.to_row(item).map_err(storage_err)?;
        self.executor
            .run(|conn| {
                conn.transaction::<_, anyhow::Error, _>(|conn| {
                    insert_if_absent(conn, &row, &item.tags)
                })
            })
            .map_err(storage_err)
    }

    async fn upsert_and_enforce_history(
        &self,
        item: &ClipboardItem,
        max_items: usize,
    ) -> Result<bool, StoreError> {
        let span = debug_span!(
            "infra.sqlite.upsert_and_enforce_history",
            table = "clipboard_items",
            hash = %item.content_hash,
            max_items,
        );
        let _enter = span.enter();

        let row = self.mapper.to_row(item).map_err(storage_err)?;
        let (inserted, evicted) = self
            .executor
            .run(|conn| {
                conn.transaction::<_, anyhow::Error, _>(|conn| {
                    if !insert_if_absent(conn, &row, &item.tags)? {
                        return Ok((false, 0));
                    }
                    let evicted = evict_unpinned_overflow(conn, max_items)?;
                    Ok((true, evicted))
                })
            })
            .map_err(storage_err)?;

        if evicted > 0 {
            debug!(evicted, "evicted oldest unpinned items");
        }
        Ok(inserted)
    }

    async fn exists(&self, hash: &ContentHash) -> Result<bool, StoreError> {
        let hash = hash.as_str();
        self.executor
            .run(|conn| {
                Ok(diesel::select(diesel::dsl::exists(
                    clipboard_items::table.filter(clipboard_items::hash.eq(hash)),
                ))
                .get_result::<bool>(conn)?)
            })
            .map_err(storage_err)
    }

    async fn find_by_hash(&self, hash: &ContentHash) -> Result<Option<ClipboardItem>, StoreError> {
        let hash = hash.as_str();
        let mut items = self.load_items(|conn| {
            Ok(clipboard_items::table
                .filter(clipboard_items::hash.eq(hash))
                .select(ClipboardItemRow::as_select())
                .load(conn)?)
        })?;
        Ok(items.pop())
    }

    async fn delete(&self, hash: &ContentHash) -> Result<bool, StoreError> {
        let span = debug_span!("infra.sqlite.delete_clipboard_item", hash = %hash);
        let _enter = span.enter();

        let hash = hash.as_str();
        self.executor
            .run(|conn| {
                conn.transaction::<_, anyhow::Error, _>(|conn| {
                    diesel::delete(item_tags::table.filter(item_tags::item_hash.eq(hash)))
                        .execute(conn)?;
                    let removed =
                        diesel::delete(clipboard_items::table.filter(clipboard_items::hash.eq(hash)))
                            .execute(conn)?;
                    Ok(removed > 0)
                })
            })
            .map_err(storage_err)
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        let span = debug_span!("infra.sqlite.delete_all_clipboard_items");
        let _enter = span.enter();

        self.executor
            .run(|conn| {
                conn.transaction::<_, anyhow::Error, _>(|conn| {
                    diesel::delete(item_tags::table).execute(conn)?;
                    diesel::delete(clipboard_items::table).execute(conn)?;
                    Ok(())
                })
            })
            .map_err(storage_err)
    }

    async fn toggle_pin(&self, hash: &ContentHash) -> Result<bool, StoreError> {
        let hash = hash.as_str();
        let toggled = self
            .executor
            .run(|conn| {
                conn.transaction::<_, anyhow::Error, _>(|conn| {
                    let current = clipboard_items::table
                        .filter(clipboard_items::hash.eq(hash))
                        .select(clipboard_items::pinned)
                        .first::<bool>(conn)
                        .optional()?;
                    let Some(current) = current else {
                        return Ok(None);
                    };
                    diesel::update(clipboard_items::table.filter(clipboard_items::hash.eq(hash)))
                        .set(clipboard_items::pinned.eq(!current))
                        .execute(conn)?;
                    Ok(Some(!current))
                })
            })
            .map_err(storage_err)?;

        toggled.ok_or(StoreError::NotFound)
    }

    async fn list(&self) -> Result<Vec<ClipboardItem>, StoreError> {
        self.load_items(|conn| {
            Ok(clipboard_items::table
                .order(clipboard_items::id.desc())
                .select(ClipboardItemRow::as_select())
                .load(conn)?)
        })
    }

    async fn list_by_tag(&self, tag: &str) -> Result<Vec<ClipboardItem>, StoreError> {
        let tag = tag.trim().to_lowercase();
        self.load_items(|conn| {
            Ok(clipboard_items::table
                .filter(
                    clipboard_items::hash.eq_any(
                        item_tags::table
                            .filter(item_tags::tag.eq(tag.as_str()))
                            .select(item_tags::item_hash),
                    ),
                )
                .order(clipboard_items::id.desc())
                .select(ClipboardItemRow::as_select())
                .load(conn)?)
        })
    }

    async fn list_by_category(&self, category: &str) -> Result<Vec<ClipboardItem>, StoreError> {
        let category = normalize_category(category);
        self.load_items(|conn| {
            Ok(clipboard_items::table
                .filter(clipboard_items::category.eq(category.as_str()))
                .order(clipboard_items::id.desc())
                .select(ClipboardItemRow::as_select())
                .load(conn)?)
        })
    }

    async fn list_pinned(&self) -> Result<Vec<ClipboardItem>, StoreError> {
        self.load_items(|conn| {
            Ok(clipboard_items::table
                .filter(clipboard_items::pinned.eq(true))
                .order(clipboard_items::id.desc())
                .select(ClipboardItemRow::as_select())
                .load(conn)?)
        })
    }

    async fn all_tags(&self) -> Result<Vec<String>, StoreError> {
        self.executor
            .run(|conn| {
                Ok(item_tags::table
                    .select(item_tags::tag)
                    .distinct()
                    .order(item_tags::tag.asc())
                    .load::<String>(conn)?)
            })
            .map_err(storage_err)
    }

    async fn all_categories(&self) -> Result<Vec<String>, StoreError> {
        self.executor
            .run(|conn| {
                Ok(clipboard_items::table
                    .select(clipboard_items::category)
                    .distinct()
                    .order(clipboard_items::category.asc())
                    .load::<String>(conn)?)
            })
            .map_err(storage_err)
    }

    async fn update_tags(
        &self,
        hash: &ContentHash,
        tags: &BTreeSet<String>,
    ) -> Result<(), StoreError> {
        let span = debug_span!("infra.sqlite.update_tags", table = "item_tags", hash = %hash);

        let hash = hash.as_str();
        let tags = normalize_tags(tags);
        let found = retry_on_contention(self.retry, || {
            self.executor.run(|conn| {
                conn.transaction::<_, anyhow::Error, _>(|conn| {
                    let exists = diesel::select(diesel::dsl::exists(
                        clipboard_items::table.filter(clipboard_items::hash.eq(hash)),
                    ))
                    .get_result::<bool>(conn)?;
                    if !exists {
                        return Ok(false);
                    }
                    replace_tags(conn, hash, &tags)?;
                    Ok(true)
                })
            })
        })
        .instrument(span)
        .await
        .map_err(storage_err)?;

        if found {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }

    async fn set_category(&self, hash: &ContentHash, category: &str) -> Result<(), StoreError> {
        let hash = hash.as_str();
        let category = normalize_category(category);
        let updated = self
            .executor
            .run(|conn| {
                Ok(
                    diesel::update(clipboard_items::table.filter(clipboard_items::hash.eq(hash)))
                        .set(clipboard_items::category.eq(category.as_str()))
                        .execute(conn)?,
                )
            })
            .map_err(storage_err)?;

        if updated == 0 {
            Err(StoreError::NotFound)
        } else {
            Ok(())
        }
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let count = self
            .executor
            .run(|conn| Ok(clipboard_items::table.count().get_result::<i64>(conn)?))
            .map_err(storage_err)?;
        Ok(count as usize)
    }
}
