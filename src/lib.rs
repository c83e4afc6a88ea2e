//! ClipSync binary support: config loading, tracing setup and wiring of the
//! workspace crates into a runnable relay, client or both.

pub mod bootstrap;
