mod clipboard_history_repo;

pub use clipboard_history_repo::DieselClipboardHistoryRepository;
