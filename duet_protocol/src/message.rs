// Protocol messages for client-room communication.
//
// Two enums define the full protocol vocabulary:
// - `ClientMessage`: sent by clients to the room server.
// - `ServerMessage`: sent by the room server to clients.
//
// `MoveRequest` is shared by both directions: clients submit it, the server
// echoes it back in `move` (accepted) or `invalidMove` (rejected). Squares and
// the promotion letter travel as plain strings. The server does not trust
// them; parsing happens in the rules adapter so that garbage input can be
// told apart from a cleanly illegal move.
//
// Enums use serde's default external tagging with camelCase variant names, so
// unit variants are a bare JSON string (`"requestRole"`) and the rest are a
// single-key object (`{"boardState":{"fen":"..."}}`).
//
// The server reads client frames through `ClientFrame::decode`. A frame that
// is JSON and carries the `move` key but whose payload does not fit
// `MoveRequest` (a missing `to`, a numeric `from`) decodes to
// `ClientFrame::MalformedMove` instead of an error, so the room can answer it
// without dropping the connection.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::types::{Color, GameOver, PlayerRole};

/// Messages sent by a client to the room.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    /// Ask the server to resend this connection's role.
    RequestRole,
    /// Submit a move for the side to move.
    Move(MoveRequest),
    /// Reset the board to the starting position.
    NewGame,
    /// Client is leaving gracefully.
    Goodbye,
}

/// One decoded client frame.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientFrame {
    Message(ClientMessage),
    /// A `move` frame whose payload could not be decoded.
    MalformedMove { reason: String },
}

impl ClientFrame {
    /// Decode a frame payload. Fails for bytes that are not JSON and for JSON
    /// that is neither a known message nor a `move` attempt.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        let is_move = value.get("move").is_some();
        match serde_json::from_value::<ClientMessage>(value) {
            Ok(message) => Ok(ClientFrame::Message(message)),
            Err(e) if is_move => Ok(ClientFrame::MalformedMove {
                reason: e.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

/// Messages sent by the room to a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServerMessage {
    /// This connection holds a seat (or both seats).
    PlayerRole { role: PlayerRole },
    /// This connection holds no seat.
    SpectatorRole,
    /// Authoritative position as FEN.
    BoardState { fen: String },
    /// A move was accepted. Informational: clients wait for the following
    /// `boardState` instead of applying it themselves.
    Move(MoveRequest),
    /// The sender's move was rejected by the rules engine.
    InvalidMove(MoveRequest),
    /// A seated player disconnected.
    PlayerLeft { side: Color },
    /// The game ended.
    GameOver(GameOver),
    /// The board was reset; a fresh `boardState` follows.
    NewGame,
    /// The sender's input could not be processed.
    Error { message: String },
    /// Connection refused; the server closes the socket after this.
    Rejected { reason: String },
}

/// A candidate move in algebraic squares, e.g. `e2` → `e4`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub from: String,
    pub to: String,
    /// Promotion piece letter (`q`, `r`, `b`, `n`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<String>,
}

impl MoveRequest {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            promotion: None,
        }
    }

    pub fn with_promotion(mut self, piece: impl Into<String>) -> Self {
        self.promotion = Some(piece.into());
        self
    }
}
