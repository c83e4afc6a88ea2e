pub mod model;

pub use model::{EncryptionError, SharedKey, KEY_LEN};
