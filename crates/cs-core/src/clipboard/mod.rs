mod event;
mod hash;
mod item;
mod origin;

pub use event::ClipboardEvent;
pub use hash::ContentHash;
pub use item::{
    normalize_category, normalize_tags, ClipboardItem, ClipboardKind, UnknownKind, DEFAULT_CATEGORY,
};
pub use origin::ClipboardOrigin;
