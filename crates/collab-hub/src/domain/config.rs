//! Hub configuration types.
//!
//! [`HubConfig`] is the single source of truth for all runtime settings.  The
//! infrastructure layer fills it from defaults, an optional TOML file, and CLI
//! flags (in that order of increasing precedence); nothing in here reads the
//! environment.

use std::net::{Ipv4Addr, SocketAddr};

/// Port editor clients connect to unless told otherwise.
pub const DEFAULT_PORT: u16 = 8081;

/// Per-client outbox capacity.  One slot means a client that has not drained
/// its previous frame is dropped on the next broadcast.
pub const DEFAULT_OUTBOUND_BUFFER: usize = 1;

/// Capacity of each of the coordination loop's event sources.
pub const DEFAULT_EVENT_QUEUE: usize = 256;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// All runtime configuration for the hub.
///
/// # Example
///
/// ```rust
/// use collab_hub::domain::HubConfig;
///
/// let cfg = HubConfig::default();
/// assert_eq!(cfg.bind_addr.port(), 8081);
/// assert_eq!(cfg.outbound_buffer, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Address the WebSocket and `/health` listener binds to.
    pub bind_addr: SocketAddr,

    /// Capacity of each client's outbound buffer.  Must be at least 1.
    pub outbound_buffer: usize,

    /// Capacity of the register source and of the shared inbound/unregister queue.
    pub event_queue: usize,

    /// Default `tracing` filter when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for HubConfig {
    /// | Field           | Default        |
    /// |-----------------|----------------|
    /// | bind_addr       | `0.0.0.0:8081` |
    /// | outbound_buffer | `1`            |
    /// | event_queue     | `256`          |
    /// | log_level       | `info`         |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
            event_queue: DEFAULT_EVENT_QUEUE,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl HubConfig {
    /// Clamps buffer sizes to the minimum tokio channels accept.
    ///
    /// `tokio::sync::mpsc::channel(0)` panics, so a zero from a config file or
    /// flag is raised to 1.
    pub fn normalized(mut self) -> Self {
        self.outbound_buffer = self.outbound_buffer.max(1);
        self.event_queue = self.event_queue.max(1);
        self
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
