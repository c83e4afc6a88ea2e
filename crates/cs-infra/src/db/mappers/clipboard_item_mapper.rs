use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use cs_core::clipboard::{normalize_category, normalize_tags};
use cs_core::{ClipboardItem, ClipboardKind, ContentHash};

use crate::db::models::{ClipboardItemRow, NewClipboardItemRow};
use crate::db::ports::{InsertMapper, RowMapper};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

pub struct ClipboardItemRowMapper;

impl InsertMapper<ClipboardItem, NewClipboardItemRow> for ClipboardItemRowMapper {
    fn to_row(&self, domain: &ClipboardItem) -> Result<NewClipboardItemRow> {
        Ok(NewClipboardItemRow {
            kind: domain.kind.as_str().to_string(),
            content: domain.content.clone(),
            timestamp: domain.created_at.format(TIMESTAMP_FORMAT).to_string(),
            hash: domain.content_hash.as_str().to_string(),
            category: normalize_category(&domain.category),
            pinned: domain.pinned,
        })
    }
}

/// A row plus the tags stored for its hash.
impl RowMapper<(ClipboardItemRow, Vec<String>), ClipboardItem> for ClipboardItemRowMapper {
    fn to_domain(&self, (row, tags): &(ClipboardItemRow, Vec<String>)) -> Result<ClipboardItem> {
        let kind: ClipboardKind = row
            .kind
            .parse()
            .with_context(|| format!("invalid item type in row {}", row.id))?;
        let created_at = NaiveDateTime::parse_from_str(&row.timestamp, TIMESTAMP_FORMAT)
            .with_context(|| format!("invalid timestamp in row {}: {}", row.id, row.timestamp))?;

        Ok(ClipboardItem {
            kind,
            content: row.content.clone(),
            created_at,
            content_hash: ContentHash::from(row.hash.as_str()),
            tags: normalize_tags(tags),
            category: normalize_category(&row.category),
            pinned: row.pinned,
        })
    }
}
