//! Per-connection sticky state applied on the read path.
//!
//! Clients send `id` and `room` once and then omit them.  Before a frame goes
//! to the coordination loop the read path fills the gaps from what the same
//! connection sent earlier, and stamps editor frames with the next edit id.
//!
//! # What does "sticky" mean here? (for beginners)
//!
//! Editor clients stream many small frames per second: cursor moves, tile
//! brushes, line segments.  Repeating the same `"id":"alice","room":"lvl1"`
//! pair on every one of them is wasted bandwidth, so the protocol lets a
//! client announce them once.  The session remembers the last non-empty value
//! of each field and writes it back into any later frame that leaves the
//! field out:
//!
//! ```text
//!  frame sent by client                      frame submitted to the hub
//!  {"module":"OnlineModule",                 {"module":"OnlineModule",
//!   "id":"alice","room":"lvl1"}       ──►     "id":"alice","room":"lvl1"}
//!  {"module":"EditorModule",                 {"module":"EditorModule",
//!   "editor":{"type":"line"}}         ──►     "id":"alice","room":"lvl1",
//!                                             "editor":{"type":"line","edit_id":0}}
//!  {"module":"JoinEditorModule",             {"module":"JoinEditorModule",
//!   "room":"lvl2"}                    ──►     "id":"alice","room":"lvl2"}
//! ```
//!
//! The last row shows that a field which *is* present replaces the remembered
//! value, which is how a client moves between rooms.
//!
//! # Edit ids
//!
//! The edit counter is an atomic shared by every read path.  Ids are taken
//! here, in the order the connection submits its frames, and any id the
//! client sent is overwritten.  The dispatcher only fills an id that is still
//! missing.

use collab_core::{Module, SequenceCounter, Update};

/// The identity and room a connection last announced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StickySession {
    identity: String,
    room: String,
}

impl StickySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    /// Fills `id`/`room` from earlier frames and stamps editor frames.
    ///
    /// A non-empty `id` or `room` on the frame replaces the remembered value.
    /// An absent or empty one is replaced by the remembered value, if any.
    /// `EditorModule` frames always get a fresh `edit_id` from `edits`; a
    /// client-supplied id is overwritten.
    pub fn prepare(&mut self, mut update: Update, edits: &SequenceCounter) -> Update {
        remember_or_fill(&mut self.identity, &mut update.id);
        remember_or_fill(&mut self.room, &mut update.room);

        if update.module == Module::Editor {
            let editor = update.editor.get_or_insert_with(Default::default);
            editor.edit_id = Some(edits.next());
        }
        update
    }
}

fn remember_or_fill(remembered: &mut String, field: &mut Option<String>) {
    let incoming = field.as_deref().unwrap_or_default();
    if !incoming.is_empty() {
        if remembered.as_str() != incoming {
            *remembered = incoming.to_string();
        }
    } else if !remembered.is_empty() {
        *field = Some(remembered.clone());
    }
}
