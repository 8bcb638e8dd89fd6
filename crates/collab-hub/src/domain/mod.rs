//! Domain types for the collaboration hub.
//!
//! Room bookkeeping lives in `collab-core`; the only hub-specific domain type
//! is the runtime configuration.

pub mod config;

pub use config::HubConfig;
