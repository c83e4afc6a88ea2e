use crate::DeviceId;

/// Process-wide identity of this installation.
///
/// Implementations never fail: the first call loads or creates the id, later
/// calls return the cached value without I/O.
pub trait DeviceIdentityPort: Send + Sync {
    fn current_device_id(&self) -> DeviceId;
}
