//! Message dispatcher: the protocol state machine.
//!
//! The dispatcher takes one [`Inbound`] update, resolves its intent against
//! the room directory, and produces one [`Outbound`] update.  Every intent
//! ends in exactly one of two shapes:
//!
//! - **Success**: the module tag may change (`JoinEditor` → `JoinSuccess`,
//!   `HostEditor` → `HostSuccess`, `RequestRoom` → `ResponseRoom`), and room
//!   data or a delivery target may be attached.
//! - **Failure**: the tag stays as received, `error` carries the
//!   [`RoomError`] text, and `target_id` is forced to the sender so nobody
//!   else in the room sees it.
//!
//! | Inbound             | On success                                        |
//! |---------------------|---------------------------------------------------|
//! | `JoinEditor`        | `JoinSuccess` + members + host, to the joiner     |
//! | `HostEditor`        | `HostSuccess`, to the host                        |
//! | `RequestEditor`     | unchanged, to the room's host                     |
//! | `ResponseEditor`    | unchanged, room-wide                              |
//! | `RequestRoom`       | `ResponseRoom` + members + host, room-wide        |
//! | `Editor`            | unchanged, `edit_id` and `timestamp` stamped      |
//! | everything else     | unchanged                                         |

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use collab_core::{Module, RoomDirectory, RoomError, SequenceCounter, Update};
use thiserror::Error;
use tracing::debug;

// ── Inbound / Outbound ────────────────────────────────────────────────────────

/// Why an update was refused before dispatch.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum InboundError {
    #[error("update has no sender id")]
    MissingSender,
    #[error("update has no room")]
    MissingRoom,
}

/// An update proven to carry a non-empty sender id and room.
///
/// This is the only type [`Dispatcher::dispatch`] accepts, so an anonymous or
/// roomless frame cannot reach the directory or the broadcast engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    update: Update,
}

impl Inbound {
    pub fn sender(&self) -> &str {
        self.update.sender()
    }

    pub fn room(&self) -> &str {
        self.update.room_name()
    }

    pub fn module(&self) -> Module {
        self.update.module
    }

    pub fn update(&self) -> &Update {
        &self.update
    }
}

impl TryFrom<Update> for Inbound {
    type Error = InboundError;

    fn try_from(update: Update) -> Result<Self, Self::Error> {
        if update.sender().is_empty() {
            return Err(InboundError::MissingSender);
        }
        if update.room_name().is_empty() {
            return Err(InboundError::MissingRoom);
        }
        Ok(Self { update })
    }
}

/// The dispatcher's product, ready for the broadcast engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    update: Update,
}

impl Outbound {
    pub fn update(&self) -> &Update {
        &self.update
    }

    pub fn into_update(self) -> Update {
        self.update
    }
}

/// Forwards an inbound update without dispatching it.
impl From<Inbound> for Outbound {
    fn from(inbound: Inbound) -> Self {
        Self {
            update: inbound.update,
        }
    }
}

// ── Dispatcher ────────────────────────────────────────────────────────────────

/// Owns the room directory and applies the protocol's transitions to it.
#[derive(Debug)]
pub struct Dispatcher {
    rooms: RoomDirectory,
    edits: Arc<SequenceCounter>,
}

impl Dispatcher {
    /// Creates a dispatcher with an empty directory.
    ///
    /// `edits` is the same counter the transport stamps frames with, so ids
    /// assigned here never collide with ids assigned at the boundary.
    pub fn new(edits: Arc<SequenceCounter>) -> Self {
        Self {
            rooms: RoomDirectory::new(),
            edits,
        }
    }

    pub fn rooms(&self) -> &RoomDirectory {
        &self.rooms
    }

    pub fn into_rooms(self) -> RoomDirectory {
        self.rooms
    }

    /// Resolves one inbound update into its outbound form.
    pub fn dispatch(&mut self, inbound: Inbound) -> Outbound {
        let mut update = inbound.update;
        debug!(module = %update.module, from = update.sender(), room = update.room_name(), "dispatch");

        let result = match update.module {
            Module::JoinEditor => self.join_editor(&mut update),
            Module::HostEditor => self.host_editor(&mut update),
            Module::RequestEditor => self.request_editor(&mut update),
            Module::ResponseEditor => self.response_editor(&update),
            Module::RequestRoom => self.request_room(&mut update),
            Module::Editor => {
                self.stamp_edit(&mut update);
                Ok(())
            }
            Module::Online | Module::JoinSuccess | Module::HostSuccess | Module::ResponseRoom => {
                Ok(())
            }
        };

        if let Err(err) = result {
            debug!(module = %update.module, from = update.sender(), "rejected: {err}");
            update.error = Some(err.to_string());
            update.target_id = update.id.clone();
        }

        Outbound { update }
    }

    // ── Handlers ──────────────────────────────────────────────────────────────

    fn join_editor(&mut self, update: &mut Update) -> Result<(), RoomError> {
        let room = self.rooms.join_room(update.room_name(), update.sender())?;
        update.module = Module::JoinSuccess;
        update.member_ids = Some(room.member_ids.clone());
        update.host_id = Some(room.host_id.clone());
        update.target_id = update.id.clone();
        Ok(())
    }

    fn host_editor(&mut self, update: &mut Update) -> Result<(), RoomError> {
        self.rooms.host_room(update.room_name(), update.sender())?;
        update.module = Module::HostSuccess;
        update.target_id = update.id.clone();
        Ok(())
    }

    fn request_editor(&self, update: &mut Update) -> Result<(), RoomError> {
        let room = self
            .rooms
            .find_room(update.room_name())
            .ok_or(RoomError::RoomNotFound)?;
        update.target_id = Some(room.host_id.clone());
        Ok(())
    }

    fn response_editor(&self, update: &Update) -> Result<(), RoomError> {
        self.rooms
            .find_room(update.room_name())
            .map(|_| ())
            .ok_or(RoomError::RoomNotFound)
    }

    fn request_room(&self, update: &mut Update) -> Result<(), RoomError> {
        let room = self
            .rooms
            .find_room(update.room_name())
            .ok_or(RoomError::RoomNotFound)?;
        update.module = Module::ResponseRoom;
        update.member_ids = Some(room.member_ids.clone());
        update.host_id = Some(room.host_id.clone());
        Ok(())
    }

    fn stamp_edit(&self, update: &mut Update) {
        let editor = update.editor.get_or_insert_with(Default::default);
        if editor.edit_id.is_none() {
            editor.edit_id = Some(self.edits.next());
        }
        editor.timestamp = Some(now_millis());
    }
}

/// Server receive time in milliseconds since the Unix epoch.
fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
