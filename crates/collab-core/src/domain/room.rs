//! Room directory domain entity.
//!
//! A room is created by the client that hosts it and lives until the process
//! exits.  Rooms are keyed by their exact, case-sensitive name.  Membership is
//! a list of identities with no duplicates, kept in first-join order.

use std::collections::HashMap;

use thiserror::Error;

/// Errors a room operation can report back to the requesting client.
///
/// The `Display` text is exactly the value written into the wire `error`
/// field, so the dispatcher can use `to_string()` directly.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum RoomError {
    /// No room with the requested name exists, or the name was empty.
    #[error("RoomNotFound")]
    RoomNotFound,

    /// A room with the requested name already exists.
    #[error("RoomExists")]
    RoomExists,
}

/// A named collaboration session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    /// Unique room name.
    pub name: String,
    /// Identity of the client that created the room.
    pub host_id: String,
    /// Member identities, host included, no duplicates.
    pub member_ids: Vec<String>,
}

impl Room {
    fn new(name: &str, host_id: &str) -> Self {
        Self {
            name: name.to_string(),
            host_id: host_id.to_string(),
            member_ids: vec![host_id.to_string()],
        }
    }

    /// Returns `true` if `identity` has joined (or hosts) this room.
    pub fn has_member(&self, identity: &str) -> bool {
        self.member_ids.iter().any(|m| m == identity)
    }

    fn add_member(&mut self, identity: &str) {
        if !self.has_member(identity) {
            self.member_ids.push(identity.to_string());
        }
    }
}

/// All rooms known to the hub.
#[derive(Debug, Default)]
pub struct RoomDirectory {
    rooms: HashMap<String, Room>,
}

impl RoomDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a room by exact name.
    pub fn find_room(&self, name: &str) -> Option<&Room> {
        self.rooms.get(name)
    }

    /// Creates a room with `host_id` as its host and only member.
    ///
    /// # Errors
    ///
    /// - [`RoomError::RoomNotFound`] if `name` is empty.
    /// - [`RoomError::RoomExists`] if the name is taken; the existing room is
    ///   left untouched.
    pub fn host_room(&mut self, name: &str, host_id: &str) -> Result<&Room, RoomError> {
        if name.is_empty() {
            return Err(RoomError::RoomNotFound);
        }
        if self.rooms.contains_key(name) {
            return Err(RoomError::RoomExists);
        }
        let room = self
            .rooms
            .entry(name.to_string())
            .or_insert_with(|| Room::new(name, host_id));
        Ok(room)
    }

    /// Adds `identity` to an existing room.  Joining twice is a no-op on the
    /// member list.
    ///
    /// # Errors
    ///
    /// [`RoomError::RoomNotFound`] if no room has this name.
    pub fn join_room(&mut self, name: &str, identity: &str) -> Result<&Room, RoomError> {
        let room = self.rooms.get_mut(name).ok_or(RoomError::RoomNotFound)?;
        room.add_member(identity);
        Ok(room)
    }

    /// Number of rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
