mod encryption;

pub use encryption::{XChaChaEncryption, NONCE_LEN};
