//! Storage infrastructure: configuration file loading.
//!
//! The hub keeps no state on disk.  The only file it reads is an optional
//! TOML config whose values sit between the built-in defaults and the
//! command line.

pub mod config;
