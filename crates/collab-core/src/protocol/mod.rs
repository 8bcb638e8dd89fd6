//! Protocol module containing the wire envelope, the JSON codec, and the edit counter.

pub mod codec;
pub mod messages;
pub mod sequence;

pub use codec::{decode_update, encode_update, ProtocolError};
pub use messages::*;
pub use sequence::SequenceCounter;
