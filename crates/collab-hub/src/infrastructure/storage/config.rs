//! TOML configuration file for the hub.
//!
//! Every key is optional; a missing key keeps whatever the layer below set
//! (the built-in default).  Example:
//!
//! ```toml
//! [server]
//! bind_addr = "127.0.0.1:8081"
//!
//! [hub]
//! outbound_buffer = 4
//! event_queue = 512
//! log_level = "debug"
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::domain::HubConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Contents of a config file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub hub: HubSection,
}

/// Listener settings.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ServerSection {
    /// Address for the WebSocket and `/health` listener.
    pub bind_addr: Option<SocketAddr>,
}

/// Coordination loop and logging settings.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct HubSection {
    /// Per-client outbox capacity.
    pub outbound_buffer: Option<usize>,
    /// Capacity of each loop event source.
    pub event_queue: Option<usize>,
    /// `tracing` filter: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    pub log_level: Option<String>,
}

impl FileConfig {
    /// Overlays the keys present in the file onto `base`.
    pub fn apply(self, mut base: HubConfig) -> HubConfig {
        if let Some(addr) = self.server.bind_addr {
            base.bind_addr = addr;
        }
        if let Some(n) = self.hub.outbound_buffer {
            base.outbound_buffer = n;
        }
        if let Some(n) = self.hub.event_queue {
            base.event_queue = n;
        }
        if let Some(level) = self.hub.log_level {
            base.log_level = level;
        }
        base
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Parses config TOML from a string.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if the TOML is malformed or a value has the
/// wrong type.
pub fn parse_config(content: &str) -> Result<FileConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Loads the config file at `path`.
///
/// The file was named explicitly on the command line, so a missing file is an
/// error rather than an empty config.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read and
/// [`ConfigError::Parse`] if its content is invalid.
pub fn load_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
