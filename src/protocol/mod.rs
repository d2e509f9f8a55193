//! Wire protocol.
//!
//! Tagged JSON messages between players and a running session, and the
//! codec that turns them into bytes and back.

pub mod codec;
pub mod messages;

pub use codec::{decode_client, decode_server, encode_server, ProtocolError};
pub use messages::{ClientMessage, LeaveReason, ServerMessage};
