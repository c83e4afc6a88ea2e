use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::ContentHash;

pub const DEFAULT_CATEGORY: &str = "General";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClipboardKind {
    Text,
    Image,
    /// Newline-joined absolute paths.
    FilePathList,
}

impl ClipboardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClipboardKind::Text => "TEXT",
            ClipboardKind::Image => "IMAGE",
            ClipboardKind::FilePathList => "FILE_PATH_LIST",
        }
    }

    /// Kinds whose content is arbitrary binary rather than UTF-8 text.
    pub fn is_binary(&self) -> bool {
        matches!(self, ClipboardKind::Image)
    }
}

impl fmt::Display for ClipboardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown clipboard kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for ClipboardKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TEXT" => Ok(ClipboardKind::Text),
            "IMAGE" => Ok(ClipboardKind::Image),
            "FILE_PATH_LIST" => Ok(ClipboardKind::FilePathList),
            _ => Err(UnknownKind(s.to_string())),
        }
    }
}

/// One captured clipboard payload.
///
/// `content_hash` is the identity key: the store keeps at most one item per hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardItem {
    pub kind: ClipboardKind,
    pub content: Vec<u8>,
    pub created_at: NaiveDateTime,
    pub content_hash: ContentHash,
    pub tags: BTreeSet<String>,
    pub category: String,
    pub pinned: bool,
}

impl ClipboardItem {
    /// Capture `content` now, hashing it and applying the default category.
    pub fn new(kind: ClipboardKind, content: Vec<u8>) -> Self {
        let content_hash = ContentHash::of(&content);
        Self {
            kind,
            content,
            created_at: Local::now().naive_local(),
            content_hash,
            tags: BTreeSet::new(),
            category: DEFAULT_CATEGORY.to_string(),
            pinned: false,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(ClipboardKind::Text, text.into().into_bytes())
    }

    pub fn with_created_at(mut self, created_at: NaiveDateTime) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = normalize_tags(tags);
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = normalize_category(category);
        self
    }

    pub fn pinned(mut self, pinned: bool) -> Self {
        self.pinned = pinned;
        self
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }

    /// Short human-readable preview, used in logs.
    pub fn preview(&self, max_chars: usize) -> String {
        match self.kind {
            ClipboardKind::Image => format!("[image, {} bytes]", self.content.len()),
            _ => {
                let text = String::from_utf8_lossy(&self.content);
                let mut preview: String = text.chars().take(max_chars).collect();
                if text.chars().count() > max_chars {
                    preview.push_str("...");
                }
                preview
            }
        }
    }
}

/// Trim, lowercase, drop blanks and deduplicate.
pub fn normalize_tags<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Blank categories fall back to [`DEFAULT_CATEGORY`].
pub fn normalize_category(category: &str) -> String {
    let trimmed = category.trim();
    if trimmed.is_empty() {
        DEFAULT_CATEGORY.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_item_has_hash_and_default_category() {
        let item = ClipboardItem::text("hello");
        assert_eq!(item.kind, ClipboardKind::Text);
        assert_eq!(item.content_hash, ContentHash::of(b"hello"));
        assert_eq!(item.category, DEFAULT_CATEGORY);
        assert!(item.tags.is_empty());
        assert!(!item.pinned);
    }

    #[test]
    fn tags_are_normalized() {
        let item = ClipboardItem::text("x").with_tags(["Work", " work ", "", "URL"]);
        let tags: Vec<_> = item.tags.iter().cloned().collect();
        assert_eq!(tags, vec!["url".to_string(), "work".to_string()]);
    }

    #[test]
    fn blank_category_falls_back_to_general() {
        let item = ClipboardItem::text("x").with_category("   ");
        assert_eq!(item.category, "General");
        let item = ClipboardItem::text("x").with_category(" Code ");
        assert_eq!(item.category, "Code");
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("text".parse::<ClipboardKind>(), Ok(ClipboardKind::Text));
        assert_eq!(
            "FILE_PATH_LIST".parse::<ClipboardKind>(),
            Ok(ClipboardKind::FilePathList)
        );
        assert!("VIDEO".parse::<ClipboardKind>().is_err());
    }

    #[test]
    fn kind_serializes_with_wire_names() {
        let json = serde_json::to_string(&ClipboardKind::FilePathList).expect("serialize");
        assert_eq!(json, "\"FILE_PATH_LIST\"");
    }

    #[test]
    fn preview_truncates_text_and_summarizes_images() {
        let item = ClipboardItem::text("abcdefgh");
        assert_eq!(item.preview(3), "abc...");
        let image = ClipboardItem::new(ClipboardKind::Image, vec![0u8; 10]);
        assert_eq!(image.preview(3), "[image, 10 bytes]");
    }
}
