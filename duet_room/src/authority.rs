// Turn authority: who may act, derived from seats and side to move.
//
// Both functions are pure. Nothing here is stored; the coordinator recomputes
// a role whenever it needs to notify someone, which is what makes
// `requestRole` a safe resync at any time.
//
// Move rights key off the seat of the colour to move:
// - its occupant may move;
// - if that seat is vacant, any connection may move for it. This is the solo
//   rule (a lone white occupant also moves for black), and it applies to
//   spectators too while the seat stays empty.

use duet_protocol::types::{Color, ConnectionId, PlayerRole};

use crate::seats::SeatRegistry;

/// A connection's current role.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    White,
    Black,
    Both,
    Spectator,
}

impl Role {
    /// The wire role for `playerRole`, or `None` for spectators.
    pub fn player_role(self) -> Option<PlayerRole> {
        match self {
            Role::White => Some(PlayerRole::White),
            Role::Black => Some(PlayerRole::Black),
            Role::Both => Some(PlayerRole::Both),
            Role::Spectator => None,
        }
    }
}

pub fn role_for(id: ConnectionId, seats: &SeatRegistry) -> Role {
    match seats.seat_of(id) {
        Some(seat) if seats.is_vacant(seat.other()) => Role::Both,
        Some(Color::White) => Role::White,
        Some(Color::Black) => Role::Black,
        None => Role::Spectator,
    }
}

pub fn is_move_authorized(
    id: ConnectionId,
    seats: &SeatRegistry,
    to_move: Color,
    terminal: bool,
) -> bool {
    if terminal {
        return false;
    }
    match seats.occupant(to_move) {
        Some(occupant) => occupant == id,
        None => true,
    }
}
