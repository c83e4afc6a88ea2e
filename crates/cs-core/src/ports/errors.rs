use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("clipboard item not found")]
    NotFound,

    #[error("storage error: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("relay connection is not established")]
    NotConnected,

    #[error("payload of {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("relay transport closed")]
    Closed,
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("discovery socket error: {0}")]
    Socket(String),

    #[error("discovery message error: {0}")]
    Codec(String),
}
