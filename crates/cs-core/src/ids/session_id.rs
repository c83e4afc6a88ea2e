use serde::{Deserialize, Serialize};

use super::id_macro::impl_id;

/// Relay session identifier, unique for the lifetime of a relay process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl_id!(SessionId);

impl SessionId {
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}
