//! I/O helpers: durable storage, persisted flags and configuration.

pub mod config;
pub mod session;
pub mod step_slot;
pub mod store;
