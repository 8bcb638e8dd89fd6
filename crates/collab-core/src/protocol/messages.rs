//! The `Update` envelope and its payload types.
//!
//! Every frame exchanged with an editor client is a single JSON object whose
//! `"module"` field names the intent.  The hub reads only the routing fields
//! (`id`, `room`, `target_id`, `ret`) and the editor sequence fields; the rest
//! of the payload travels through untouched.
//!
//! # Example
//!
//! ```json
//! {"module":"EditorModule","id":"alice","room":"lvl1","ms":1200,
//!  "editor":{"type":"block","coords":{"x":4,"y":9},"block_id":12}}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Module tags ───────────────────────────────────────────────────────────────

/// The closed set of intents a frame can carry.
///
/// Unknown tags fail to deserialize, so a client cannot smuggle an intent the
/// dispatcher has no arm for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Module {
    /// Player presence: position, character, and property sync.
    #[serde(rename = "OnlineModule")]
    Online,
    /// Generic level-editor edit.  The hub stamps the sequence number.
    #[serde(rename = "EditorModule")]
    Editor,
    /// Ask to join an existing editor room.
    #[serde(rename = "JoinEditorModule")]
    JoinEditor,
    /// Ask to create an editor room with the sender as host.
    #[serde(rename = "HostEditorModule")]
    HostEditor,
    /// Ask the room's host for the current level state.
    #[serde(rename = "RequestEditorModule")]
    RequestEditor,
    /// The host's answer to a `RequestEditor`.
    #[serde(rename = "ResponseEditorModule")]
    ResponseEditor,
    /// Ask for the room's member list and host.
    #[serde(rename = "RequestRoomModule")]
    RequestRoom,
    /// Answer to `RequestRoom`.
    #[serde(rename = "ResponseRoomModule")]
    ResponseRoom,
    /// Answer to a successful `JoinEditor`.
    #[serde(rename = "JoinSuccessModule")]
    JoinSuccess,
    /// Answer to a successful `HostEditor`.
    #[serde(rename = "HostSuccessModule")]
    HostSuccess,
}

impl Module {
    /// Returns the tag exactly as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Online => "OnlineModule",
            Module::Editor => "EditorModule",
            Module::JoinEditor => "JoinEditorModule",
            Module::HostEditor => "HostEditorModule",
            Module::RequestEditor => "RequestEditorModule",
            Module::ResponseEditor => "ResponseEditorModule",
            Module::RequestRoom => "RequestRoomModule",
            Module::ResponseRoom => "ResponseRoomModule",
            Module::JoinSuccess => "JoinSuccessModule",
            Module::HostSuccess => "HostSuccessModule",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Envelope ──────────────────────────────────────────────────────────────────

/// One protocol frame, in either direction.
///
/// `id` and `room` are `Option` because clients may omit them; the transport
/// fills them from the connection's previous frames before the hub sees them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    /// Intent tag driving dispatch.
    pub module: Module,

    /// Sender identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Room the frame belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,

    /// When set, only the client with this identity receives the frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,

    /// Echo the frame back to its sender.
    #[serde(default, skip_serializing_if = "is_false")]
    pub ret: bool,

    /// Failure reason; set by the hub only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Deduplicated room members, on join and room-info answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_ids: Option<Vec<String>>,

    /// Room host, on join and room-info answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_id: Option<String>,

    /// Client time in milliseconds since the level started.
    #[serde(default)]
    pub ms: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<PositionUpdate>,

    /// Free-form property values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub val: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile: Option<Vec<TileUpdate>>,

    #[serde(rename = "char", default, skip_serializing_if = "Option::is_none")]
    pub character: Option<CharacterUpdate>,

    /// Multiplayer level-editor payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor: Option<EditorUpdate>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Update {
    /// Creates an envelope carrying only a module tag.
    pub fn new(module: Module) -> Self {
        Self {
            module,
            id: None,
            room: None,
            target_id: None,
            ret: false,
            error: None,
            member_ids: None,
            host_id: None,
            ms: 0,
            pos: None,
            val: None,
            tile: None,
            character: None,
            editor: None,
        }
    }

    /// Builder-style setter for the sender identity.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Builder-style setter for the room.
    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    /// Builder-style setter for the echo flag.
    pub fn with_ret(mut self, ret: bool) -> Self {
        self.ret = ret;
        self
    }

    /// Sender identity, or `""` when absent.
    pub fn sender(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }

    /// Room name, or `""` when absent.
    pub fn room_name(&self) -> &str {
        self.room.as_deref().unwrap_or_default()
    }
}

// ── Payload types ─────────────────────────────────────────────────────────────

/// Player position and velocity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub x: i32,
    pub y: i32,
    pub vx: i32,
    pub vy: i32,
}

/// A single tile change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileUpdate {
    pub x: i32,
    pub y: i32,
    /// Layer id.
    pub layer: i32,
    /// Block id.
    pub block: String,
}

/// Character appearance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterUpdate {
    pub head: i32,
    pub body: i32,
    pub feet: i32,
    pub name: i32,
}

/// Floating-point 2-D vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

/// Integer 2-D vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vector2i {
    pub x: i32,
    pub y: i32,
}

/// One level-editor operation.
///
/// `edit_id` and `timestamp` belong to the server: `edit_id` is a process-wide
/// monotonically increasing sequence number and `timestamp` is the server's
/// receive time in milliseconds since the Unix epoch.  Every other field is
/// opaque to the hub.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(rename = "type")]
    pub kind: String,
    pub layer_name: String,
    pub position: Vector2,
    pub usertext: String,
    pub font: String,
    pub font_size: i32,
    pub coords: Vector2i,
    pub block_id: i32,
    pub points: Vec<Vector2i>,
    pub name: String,
    pub rotation: i32,
    pub depth: i32,
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_tags_match_wire_names() {
        let cases = [
            (Module::Online, "OnlineModule"),
            (Module::Editor, "EditorModule"),
            (Module::JoinEditor, "JoinEditorModule"),
            (Module::HostEditor, "HostEditorModule"),
            (Module::RequestEditor, "RequestEditorModule"),
            (Module::ResponseEditor, "ResponseEditorModule"),
            (Module::RequestRoom, "RequestRoomModule"),
            (Module::ResponseRoom, "ResponseRoomModule"),
            (Module::JoinSuccess, "JoinSuccessModule"),
            (Module::HostSuccess, "HostSuccessModule"),
        ];

        for (module, tag) in cases {
            // as_str and serde must agree, otherwise logs would lie about the wire.
            let json = serde_json::to_string(&module).unwrap();
            assert_eq!(json, format!("\"{tag}\""));
            assert_eq!(module.as_str(), tag);
            assert_eq!(module.to_string(), tag);
        }
    }

    #[test]
    fn test_minimal_frame_deserializes_with_defaults() {
        // Arrange: the smallest frame a client can send
        let json = r#"{"module":"OnlineModule"}"#;

        // Act
        let update: Update = serde_json::from_str(json).unwrap();

        // Assert
        assert_eq!(update, Update::new(Module::Online));
        assert!(!update.ret);
        assert_eq!(update.sender(), "");
        assert_eq!(update.room_name(), "");
    }

    #[test]
    fn test_unknown_module_is_rejected() {
        let json = r#"{"module":"TeleportModule","id":"a","room":"r"}"#;
        let result: Result<Update, _> = serde_json::from_str(json);
        assert!(result.is_err(), "unknown module tags must not deserialize");
    }

    #[test]
    fn test_missing_module_is_rejected() {
        let json = r#"{"id":"a","room":"r"}"#;
        let result: Result<Update, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_absent_optional_fields_are_omitted_on_output() {
        // Arrange
        let update = Update::new(Module::Editor).with_id("alice").with_room("lvl1");

        // Act
        let json = serde_json::to_string(&update).unwrap();

        // Assert
        assert!(!json.contains("target_id"));
        assert!(!json.contains("error"));
        assert!(!json.contains("member_ids"));
        assert!(!json.contains("\"ret\""), "ret=false is omitted");
        assert!(json.contains(r#""ms":0"#), "ms is always present");
    }

    #[test]
    fn test_character_payload_uses_char_key() {
        let json = r#"{"module":"OnlineModule","char":{"head":1,"body":2,"feet":3,"name":4}}"#;
        let update: Update = serde_json::from_str(json).unwrap();
        assert_eq!(
            update.character,
            Some(CharacterUpdate { head: 1, body: 2, feet: 3, name: 4 })
        );
        let out = serde_json::to_string(&update).unwrap();
        assert!(out.contains(r#""char":{"#));
    }

    #[test]
    fn test_editor_payload_accepts_partial_object() {
        // Clients only send the fields relevant to the edit type.
        let json = r#"{"module":"EditorModule","editor":{"type":"text","usertext":"hi"}}"#;
        let update: Update = serde_json::from_str(json).unwrap();
        let editor = update.editor.unwrap();
        assert_eq!(editor.kind, "text");
        assert_eq!(editor.usertext, "hi");
        assert_eq!(editor.edit_id, None);
        assert!(editor.points.is_empty());
    }

    #[test]
    fn test_val_keeps_arbitrary_json() {
        let json = r#"{"module":"OnlineModule","val":{"speed":3,"tags":["a","b"]}}"#;
        let update: Update = serde_json::from_str(json).unwrap();
        let val = update.val.unwrap();
        assert_eq!(val["speed"], 3);
        assert_eq!(val["tags"][1], "b");
    }
}
