// Mirrors the tables created by the SQL under `migrations/`.

diesel::table! {
    clipboard_items (id) {
        id -> Integer,
        #[sql_name = "type"]
        kind -> Text,
        content -> Binary,
        timestamp -> Text,
        hash -> Text,
        category -> Text,
        pinned -> Bool,
    }
}

diesel::table! {
    item_tags (item_hash, tag) {
        item_hash -> Text,
        tag -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(clipboard_items, item_tags);
