use crate::db::schema::item_tags;
use diesel::prelude::*;

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = item_tags)]
pub struct ItemTagRow {
    pub item_hash: String,
    pub tag: String,
}
