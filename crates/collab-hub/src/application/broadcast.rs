//! Broadcast engine: recipient selection and drop-slow-consumer delivery.
//!
//! # Recipient rules
//!
//! A registered client `c` receives an outbound update `u` when all hold:
//!
//! 1. `c.room == u.room`.
//! 2. If `u.target_id` is set (non-empty), `c.identity == u.target_id`.
//! 3. If `c.identity == u.id` (the sender), `u.ret` is true or the update is
//!    explicitly targeted at the sender.
//!
//! Rule 3's second clause is what lets directed replies (errors,
//! `HostSuccess`, `JoinSuccess`) reach the requester.
//!
//! # Backpressure
//!
//! Each client has a bounded [`Outbox`].  Delivery never waits: a full or
//! closed outbox is a failed client, which is removed from the registry on
//! the spot.  Dropping the registry entry drops the outbox sender, the
//! client's write path sees the channel close, and the socket is shut.  The
//! other recipients of the same update are unaffected.

use std::sync::Arc;

use collab_core::{encode_update, ProtocolError, Update};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::application::dispatch::Outbound;
use crate::application::registry::{ClientRegistry, ConnectionId};

/// Why a frame could not be handed to a client.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The client has not drained its previous frames.
    #[error("outbound buffer full")]
    Full,

    /// The client's write path has already gone away.
    #[error("outbound buffer closed")]
    Closed,
}

/// A client's outbound buffer, as seen by the coordination loop.
///
/// Implementations must not block.  The production implementation is the
/// bounded tokio channel feeding the client's write path; tests use a mock.
#[cfg_attr(test, mockall::automock)]
pub trait Outbox: Send {
    /// Queues one encoded frame for the client.
    fn try_deliver(&self, frame: Arc<str>) -> Result<(), DeliveryError>;
}

impl Outbox for mpsc::Sender<Arc<str>> {
    fn try_deliver(&self, frame: Arc<str>) -> Result<(), DeliveryError> {
        self.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

/// Outcome of one broadcast.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Clients whose outbox accepted the frame.
    pub delivered: Vec<ConnectionId>,
    /// Clients that failed delivery and were unregistered.
    pub dropped: Vec<ConnectionId>,
}

impl DeliveryReport {
    pub fn is_empty(&self) -> bool {
        self.delivered.is_empty() && self.dropped.is_empty()
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Returns every registered client that should receive `update`.
pub fn recipients(registry: &ClientRegistry, update: &Update) -> Vec<ConnectionId> {
    let room = update.room_name();
    if room.is_empty() {
        return Vec::new();
    }
    let sender = update.sender();
    let target = update.target_id.as_deref().filter(|t| !t.is_empty());
    let echo = update.ret || target == Some(sender);

    registry
        .iter()
        .filter(|(_, c)| c.room == room)
        .filter(|(_, c)| target.map_or(true, |t| c.identity == t))
        .filter(|(_, c)| echo || c.identity != sender)
        .map(|(id, _)| id)
        .collect()
}

/// Encodes `outbound` once and offers it to every recipient.
///
/// Recipients whose outbox is full or closed are unregistered before this
/// function returns.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if the update cannot be serialized; no
/// client is contacted in that case.
pub fn deliver(
    registry: &mut ClientRegistry,
    outbound: &Outbound,
) -> Result<DeliveryReport, ProtocolError> {
    let update = outbound.update();
    let targets = recipients(registry, update);
    let mut report = DeliveryReport::default();
    if targets.is_empty() {
        return Ok(report);
    }

    let frame: Arc<str> = Arc::from(encode_update(update)?);

    for id in targets {
        let Some(client) = registry.get(id) else {
            continue;
        };
        match client.outbox().try_deliver(Arc::clone(&frame)) {
            Ok(()) => {
                debug!(module = %update.module, to = %client.identity, "sent");
                report.delivered.push(id);
            }
            Err(e) => {
                warn!(client = %id, identity = %client.identity, "dropping client: {e}");
                registry.unregister(id);
                report.dropped.push(id);
            }
        }
    }

    Ok(report)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
