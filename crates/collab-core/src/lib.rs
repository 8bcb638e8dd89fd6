//! # collab-core
//!
//! Shared library for the level-editor collaboration hub containing the JSON
//! wire protocol, the edit sequence counter, and the room directory.
//!
//! This crate has zero dependencies on sockets, async runtimes, or OS APIs.
//!
//! # Architecture overview
//!
//! Editor clients connect to the hub, host or join a named room, and then
//! exchange edit events with everybody else in that room.  This crate holds
//! the pieces of that system that are pure data and pure logic:
//!
//! - **`protocol`** – The `Update` envelope every client speaks, its closed set
//!   of module tags, the JSON codec, and the process-wide edit counter.
//!
//! - **`domain`** – The `RoomDirectory`: which rooms exist, who hosts them, and
//!   who has joined.
//!
//! The routing engine that decides who receives what lives in `collab-hub`.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `collab_core::Update` instead of `collab_core::protocol::messages::Update`.
pub use domain::room::{Room, RoomDirectory, RoomError};
pub use protocol::codec::{decode_update, encode_update, ProtocolError};
pub use protocol::messages::{EditorUpdate, Module, Update};
pub use protocol::sequence::SequenceCounter;
