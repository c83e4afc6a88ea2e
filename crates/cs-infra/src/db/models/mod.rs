pub mod clipboard_item_row;
pub mod item_tag_row;

pub use clipboard_item_row::{ClipboardItemRow, NewClipboardItemRow};
pub use item_tag_row::ItemTagRow;
