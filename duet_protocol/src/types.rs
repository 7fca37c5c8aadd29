// Core value types for the room protocol.
//
// These are shared by `message.rs` (protocol messages) and the room server's
// seat and turn logic (`duet_room::seats`, `duet_room::authority`). The wire
// spellings are fixed here with serde attributes so that clients can rely on
// them: colours are `"white"` / `"black"`, player roles are `"w"` / `"b"` /
// `"both"`, and game-over reasons are snake_case.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-assigned connection ID. Monotonic within one server process, so an
/// ID is never handed to a second connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// One side of the board, and equally one of the two seats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    /// Both colours in seat-claim priority order.
    pub const ALL: [Color; 2] = [Color::White, Color::Black];

    pub fn other(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Color::White => "white",
            Color::Black => "black",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role carried by a `playerRole` notice. Spectators get the separate
/// `spectatorRole` notice instead, so there is no spectator variant here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerRole {
    #[serde(rename = "w")]
    White,
    #[serde(rename = "b")]
    Black,
    /// Solo control: the holder may move for either colour.
    #[serde(rename = "both")]
    Both,
}

/// Why a game ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    Checkmate,
    Stalemate,
    Threefold,
    InsufficientMaterial,
    /// Any other draw (fifty-move rule).
    Draw,
}

/// Final result of a game. `winner` is only set for checkmate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOver {
    pub reason: GameOverReason,
    pub winner: Option<Color>,
}
