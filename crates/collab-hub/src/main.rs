//! Level-editor collaboration hub: entry point.
//!
//! Accepts WebSocket connections from editor clients, lets them host and join
//! named rooms, and relays edits between the occupants of each room.
//!
//! # Usage
//!
//! ```text
//! collab-hub [OPTIONS]
//!
//! Options:
//!   --config <PATH>            TOML config file
//!   --bind <ADDR>              Listener address [default: 0.0.0.0:8081]
//!   --outbound-buffer <N>      Per-client outbox capacity [default: 1]
//!   --event-queue <N>          Coordination loop queue capacity [default: 256]
//!   --log-level <FILTER>       Default log filter [default: info]
//! ```
//!
//! # Precedence
//!
//! Built-in defaults, then the config file, then flags (or their environment
//! variables).  `RUST_LOG`, when set, overrides the log level from all three.
//!
//! | Variable                 | Flag                |
//! |--------------------------|---------------------|
//! | `COLLAB_CONFIG`          | `--config`          |
//! | `COLLAB_BIND`            | `--bind`            |
//! | `COLLAB_OUTBOUND_BUFFER` | `--outbound-buffer` |
//! | `COLLAB_EVENT_QUEUE`     | `--event-queue`     |
//! | `COLLAB_LOG_LEVEL`       | `--log-level`       |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use collab_hub::domain::HubConfig;
use collab_hub::infrastructure::run_server;
use collab_hub::infrastructure::storage::config::load_config;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Real-time collaboration hub for the multiplayer level editor.
///
/// Every flag is optional so that an unset flag never masks a value from the
/// config file.
#[derive(Debug, Parser)]
#[command(
    name = "collab-hub",
    about = "Room coordination hub for the multiplayer level editor",
    version
)]
struct Cli {
    /// Path to a TOML config file with `[server]` and `[hub]` sections.
    #[arg(long, env = "COLLAB_CONFIG")]
    config: Option<PathBuf>,

    /// Address for the WebSocket and /health listener.
    #[arg(long, env = "COLLAB_BIND")]
    bind: Option<SocketAddr>,

    /// Capacity of each client's outbound buffer.  A client that falls this
    /// many frames behind is disconnected.
    #[arg(long, env = "COLLAB_OUTBOUND_BUFFER")]
    outbound_buffer: Option<usize>,

    /// Capacity of each coordination loop event queue.
    #[arg(long, env = "COLLAB_EVENT_QUEUE")]
    event_queue: Option<usize>,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, env = "COLLAB_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    /// Resolves defaults, the config file, and flags into a [`HubConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--config` names a file that cannot be read or
    /// parsed.
    fn into_hub_config(self) -> anyhow::Result<HubConfig> {
        let mut config = HubConfig::default();

        if let Some(path) = &self.config {
            config = load_config(path)
                .with_context(|| format!("failed to load config file {}", path.display()))?
                .apply(config);
        }

        if let Some(addr) = self.bind {
            config.bind_addr = addr;
        }
        if let Some(n) = self.outbound_buffer {
            config.outbound_buffer = n;
        }
        if let Some(n) = self.event_queue {
            config.event_queue = n;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }

        Ok(config.normalized())
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_hub_config()?;

    // RUST_LOG wins; otherwise the configured level; otherwise `info`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&config.log_level))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        "collaboration hub starting: bind={}, outbound_buffer={}, event_queue={}",
        config.bind_addr, config.outbound_buffer, config.event_queue
    );

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_server(config, running).await?;

    info!("collaboration hub stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
