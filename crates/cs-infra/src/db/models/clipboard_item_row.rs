use crate::db::schema::clipboard_items;
use diesel::prelude::*;

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = clipboard_items)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ClipboardItemRow {
    pub id: i32,
    pub kind: String,
    pub content: Vec<u8>,
    /// ISO-8601 local time.
    pub timestamp: String,
    pub hash: String,
    pub category: String,
    pub pinned: bool,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = clipboard_items)]
pub struct NewClipboardItemRow {
    pub kind: String,
    pub content: Vec<u8>,
    pub timestamp: String,
    pub hash: String,
    pub category: String,
    pub pinned: bool,
}
