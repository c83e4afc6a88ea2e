use serde::{Deserialize, Serialize};

/// Where a clipboard change came from.
///
/// Carried on every [`super::ClipboardEvent`] so the outbound sync path can
/// skip items that arrived from the relay instead of sharing a mutable flag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ClipboardOrigin {
    Local,
    Remote,
}

impl ClipboardOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClipboardOrigin::Local => "local",
            ClipboardOrigin::Remote => "remote",
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, ClipboardOrigin::Remote)
    }
}

impl From<&str> for ClipboardOrigin {
    /// Maps `"remote"` to `Remote`; every other value is `Local`.
    fn from(s: &str) -> Self {
        match s {
            "remote" => ClipboardOrigin::Remote,
            _ => ClipboardOrigin::Local,
        }
    }
}
