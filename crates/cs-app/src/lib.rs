//! ClipSync application layer.
//!
//! Use cases take their collaborators as `Arc<dyn Port>` values. The
//! [`SyncCoordinator`] wires them to the relay transport and discovery and
//! implements the clipboard-manager capability set.

pub mod coordinator;
pub mod deps;
pub mod event_bus;
pub mod usecases;

#[cfg(test)]
pub(crate) mod test_support;

pub use coordinator::SyncCoordinator;
pub use deps::SyncDeps;
pub use event_bus::ClipboardEventBus;
