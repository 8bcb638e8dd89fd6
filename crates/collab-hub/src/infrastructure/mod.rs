//! Infrastructure layer: sockets and files.
//!
//! - **`ws_server`** – axum router serving `/health`, the WebSocket upgrade, and the per-client
//!   read and write paths.
//! - **`session`**   – Sticky `id`/`room` handling and edit-id stamping done on
//!   each client's read path.
//! - **`storage`**   – Optional TOML configuration file.

pub mod session;
pub mod storage;
pub mod ws_server;

pub use ws_server::{run_server, serve};
