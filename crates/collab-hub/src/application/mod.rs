//! Application layer: the routing engine.
//!
//! # Sub-modules
//!
//! - **`registry`**  – Connected clients and the identity/room each one last
//!   used.
//!
//! - **`dispatch`**  – The protocol state machine.  Turns one validated
//!   inbound update into one outbound update, mutating the room directory on
//!   host and join requests.
//!
//! - **`broadcast`** – Picks the recipients of an outbound update and pushes
//!   it into their outboxes without ever waiting on a slow client.
//!
//! - **`hub`**       – The coordination loop that owns all of the above and
//!   serializes every register, unregister, and inbound event.
//!
//! Nothing here touches a socket.  The WebSocket server talks to the loop only
//! through [`hub::HubHandle`].

pub mod broadcast;
pub mod dispatch;
pub mod hub;
pub mod registry;

pub use broadcast::{deliver, recipients, DeliveryError, DeliveryReport, Outbox};
pub use dispatch::{Dispatcher, Inbound, InboundError, Outbound};
pub use hub::{spawn_hub, Hub, HubClosed, HubEvent, HubHandle, HubState};
pub use registry::{ClientEntry, ClientRegistry, ConnectionId};
