//! Domain entities for the collaboration hub.
//!
//! Pure room bookkeeping with no sockets, no async runtime, and no knowledge
//! of who is currently connected.  The coordination loop in `collab-hub` owns
//! the only [`room::RoomDirectory`] and mutates it from a single task, so none
//! of the types here need interior mutability.

/// Named editor rooms, their hosts, and their members.
///
/// See [`room::RoomDirectory`] for the main type.
pub mod room;
