//! Client registry: the hub's view of every open connection.
//!
//! Each entry tracks:
//!
//! - The identity the client last sent (`id` on the wire).
//! - The room the client last sent.
//! - The outbox feeding the client's write path.
//!
//! Identity and room start empty and are filled by [`ClientRegistry::bind`]
//! as the client's frames pass through the coordination loop.  A client with
//! an empty room never matches a broadcast.
//!
//! # Connection id vs identity (for beginners)
//!
//! Two different names identify a client, and it is easy to mix them up:
//!
//! - **Connection id** – a random [`Uuid`] the server picks when the socket
//!   is accepted.  It never changes for the life of the connection and the
//!   client never sees it.  The registry is keyed by it.
//! - **Identity** – the `id` string the client puts in its frames (a player
//!   or editor name).  Rooms, hosts, and `target_id` all refer to identities.
//!   A client may change it at any time, and nothing stops two connections
//!   from claiming the same one.
//!
//! Routing therefore works in two steps: the broadcast engine compares
//! identities and rooms to decide *who* should receive a frame, then uses the
//! matching connection ids to find *where* to put it.
//!
//! ```text
//!  ConnectionId (Uuid)   identity   room    outbox
//!  ────────────────────  ─────────  ──────  ─────────────
//!  5f0c…                 "alice"    "lvl1"  Sender<Arc<str>>
//!  9a21…                 "bob"      "lvl1"  Sender<Arc<str>>
//!  c7e4…                 ""         ""      Sender<Arc<str>>   (not bound yet)
//! ```
//!
//! # Ownership
//!
//! The registry is owned by the coordination loop and never shared, so it is
//! a plain `HashMap` with no lock around it.  Dropping an entry drops its
//! outbox, which ends the client's write path and closes the socket.

use std::collections::HashMap;
use std::fmt;

use uuid::Uuid;

use crate::application::broadcast::Outbox;

/// Identifier the transport assigns to each accepted connection.
pub type ConnectionId = Uuid;

/// Session state for one connected client.
pub struct ClientEntry {
    /// Identity from the client's most recent frame; empty until it sends one.
    pub identity: String,
    /// Room from the client's most recent frame; empty until it sends one.
    pub room: String,
    outbox: Box<dyn Outbox>,
}

impl ClientEntry {
    fn new(outbox: Box<dyn Outbox>) -> Self {
        Self {
            identity: String::new(),
            room: String::new(),
            outbox,
        }
    }

    /// The client's outbound buffer.
    pub fn outbox(&self) -> &dyn Outbox {
        self.outbox.as_ref()
    }
}

impl fmt::Debug for ClientEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientEntry")
            .field("identity", &self.identity)
            .field("room", &self.room)
            .finish_non_exhaustive()
    }
}

/// In-memory registry of all connected clients.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: HashMap<ConnectionId, ClientEntry>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a client with empty identity and room.
    ///
    /// Registering an id that is already present replaces the entry; the old
    /// outbox is dropped.
    pub fn register(&mut self, id: ConnectionId, outbox: Box<dyn Outbox>) {
        self.clients.insert(id, ClientEntry::new(outbox));
    }

    /// Removes a client and drops its outbox.
    ///
    /// Returns `false` if the client was not registered.
    pub fn unregister(&mut self, id: ConnectionId) -> bool {
        self.clients.remove(&id).is_some()
    }

    /// Records the identity and room a client used in its latest frame.
    ///
    /// Unknown ids are ignored: a frame can still be in flight after its
    /// client was dropped for backpressure.
    pub fn bind(&mut self, id: ConnectionId, identity: &str, room: &str) {
        if let Some(client) = self.clients.get_mut(&id) {
            if client.identity != identity {
                client.identity = identity.to_string();
            }
            if client.room != room {
                client.room = room.to_string();
            }
        }
    }

    pub fn get(&self, id: ConnectionId) -> Option<&ClientEntry> {
        self.clients.get(&id)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.clients.contains_key(&id)
    }

    /// Iterates over all registered clients in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (ConnectionId, &ClientEntry)> {
        self.clients.iter().map(|(id, entry)| (*id, entry))
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
