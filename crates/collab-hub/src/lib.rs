//! collab-hub library crate.
//!
//! The coordination hub for the multiplayer level editor: clients connect over
//! WebSocket, host or join named rooms, and exchange edit events with the
//! other occupants of their room.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Editor clients (JSON over WebSocket)
//!         ↕
//! [collab-hub]
//!   ├── domain/           HubConfig
//!   ├── application/      Registry, Dispatcher, Broadcast Engine, coordination loop
//!   └── infrastructure/
//!         ├── ws_server/  axum router, /health, per-client read/write paths
//!         └── storage/    Optional TOML config file
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O.
//! - `application` depends on `domain` and `collab-core`; its only runtime
//!   dependency is `tokio::sync::mpsc` for the loop's event sources and the
//!   per-client outboxes.
//! - `infrastructure` owns sockets, files, and HTTP/WebSocket handling (axum).

/// Domain layer: runtime configuration.
pub mod domain;

/// Application layer: routing and coordination.
pub mod application;

/// Infrastructure layer: WebSocket server and config file.
pub mod infrastructure;
