// Session coordinator for the chess room.
//
// `GameSession` is the room's single authoritative state: the rules engine
// (which owns the position and its repetition history), the seat registry, and
// the terminal result once the game has ended. `Coordinator` owns one
// `GameSession` plus a `Delivery` sink and turns each `RoomEvent` into state
// changes and notices. The server's main thread calls `Coordinator::handle`
// for one event at a time, so handlers run to completion without locking.
//
// Notices per event:
// - Connected: role to the newcomer, narrowed role to the other occupant if
//   the newcomer completed the pair, `boardState` to the newcomer, and the
//   stored `gameOver` if the game has already ended.
// - Disconnected: detach; if a seat was freed, `playerLeft` to everyone and
//   `both` to the remaining occupant. Spectators leave silently.
// - RequestRole: recomputed role to the requester.
// - Move: ignored unless authorized and not terminal. Illegal moves get
//   `invalidMove`, malformed ones `error`, both to the sender only. Accepted
//   moves go out as `move` then `boardState` to everyone, followed by
//   `gameOver` when the move ended the game.
// - MalformedMove: a move frame the transport could not decode. Same
//   authorization as Move, then `error` to the sender only.
// - NewGame: reset the position, clear the terminal result, `newGame` then
//   `boardState` to everyone. Seats are kept.
//
// Rules errors never escape a handler and never change the position.

use duet_protocol::message::{MoveRequest, ServerMessage};
use duet_protocol::types::{Color, ConnectionId, GameOver};

use crate::authority::{is_move_authorized, role_for};
use crate::gateway::{Audience, Delivery, role_notice};
use crate::rules::{RulesEngine, RulesError};
use crate::seats::SeatRegistry;

/// Authoritative state of the one game a room hosts.
pub struct GameSession<R> {
    rules: R,
    seats: SeatRegistry,
    terminal: Option<GameOver>,
}

impl<R: RulesEngine> GameSession<R> {
    pub fn new(rules: R) -> Self {
        Self {
            rules,
            seats: SeatRegistry::new(),
            terminal: None,
        }
    }

    /// Current position as FEN.
    pub fn fen(&self) -> String {
        self.rules.fen()
    }

    pub fn side_to_move(&self) -> Color {
        self.rules.side_to_move()
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal.is_some()
    }

    /// The result broadcast when the game ended, if it has.
    pub fn terminal(&self) -> Option<GameOver> {
        self.terminal
    }

    pub fn seats(&self) -> &SeatRegistry {
        &self.seats
    }

    fn board_state(&self) -> ServerMessage {
        ServerMessage::BoardState { fen: self.fen() }
    }
}

/// Inputs to the coordinator, one per transport event or client request.
#[derive(Clone, Debug, PartialEq)]
pub enum RoomEvent {
    Connected(ConnectionId),
    Disconnected(ConnectionId),
    RequestRole(ConnectionId),
    Move {
        from: ConnectionId,
        request: MoveRequest,
    },
    NewGame(ConnectionId),
    MalformedMove {
        from: ConnectionId,
        reason: String,
    },
}

pub struct Coordinator<R, D> {
    session: GameSession<R>,
    delivery: D,
}

impl<R: RulesEngine, D: Delivery> Coordinator<R, D> {
    pub fn new(rules: R, delivery: D) -> Self {
        Self {
            session: GameSession::new(rules),
            delivery,
        }
    }

    pub fn session(&self) -> &GameSession<R> {
        &self.session
    }

    /// The delivery sink, e.g. to attach a new connection's write half
    /// before its `Connected` event is handled.
    pub fn delivery_mut(&mut self) -> &mut D {
        &mut self.delivery
    }

    pub fn handle(&mut self, event: RoomEvent) {
        match event {
            RoomEvent::Connected(id) => self.on_connect(id),
            RoomEvent::Disconnected(id) => self.on_disconnect(id),
            RoomEvent::RequestRole(id) => {
                tracing::debug!(connection = %id, "role resync");
                self.send_role(id);
            }
            RoomEvent::Move { from, request } => self.on_move(from, request),
            RoomEvent::NewGame(id) => self.on_new_game(id),
            RoomEvent::MalformedMove { from, reason } => self.on_malformed_move(from, reason),
        }
    }

    fn on_connect(&mut self, id: ConnectionId) {
        let seat = self.session.seats.claim(id);
        let seated = self.session.seats.occupied_count();
        match seat {
            Some(side) => tracing::info!(connection = %id, %side, seated, "seated"),
            None => tracing::info!(connection = %id, seated, "spectating"),
        }

        self.send_role(id);
        if let Some(other) = seat.and_then(|side| self.session.seats.occupant(side.other())) {
            self.send_role(other);
        }

        let board = self.session.board_state();
        self.unicast(id, &board);
        if let Some(over) = self.session.terminal {
            self.unicast(id, &ServerMessage::GameOver(over));
        }
    }

    fn on_disconnect(&mut self, id: ConnectionId) {
        self.delivery.detach(id);
        let Some(side) = self.session.seats.release(id) else {
            tracing::debug!(connection = %id, "spectator left");
            return;
        };
        tracing::info!(
            connection = %id,
            %side,
            seated = self.session.seats.occupied_count(),
            "player left"
        );

        self.multicast(&ServerMessage::PlayerLeft { side });
        if let Some(remaining) = self.session.seats.occupant(side.other()) {
            self.send_role(remaining);
        }
    }

    /// Whether `from` may move now; logs the refusal when not.
    fn may_move(&self, from: ConnectionId) -> bool {
        let to_move = self.session.side_to_move();
        let terminal = self.session.is_terminal();
        let allowed = is_move_authorized(from, &self.session.seats, to_move, terminal);
        if !allowed {
            tracing::debug!(connection = %from, %to_move, terminal, "ignoring unauthorized move");
        }
        allowed
    }

    fn on_move(&mut self, from: ConnectionId, request: MoveRequest) {
        if !self.may_move(from) {
            return;
        }

        match self.session.rules.apply(&request) {
            Ok(()) => {
                tracing::debug!(connection = %from, from = %request.from, to = %request.to, "move accepted");
                self.multicast(&ServerMessage::Move(request));
                let board = self.session.board_state();
                self.multicast(&board);

                if let Some(over) = self.session.rules.outcome() {
                    tracing::info!(reason = ?over.reason, winner = ?over.winner, "game over");
                    self.session.terminal = Some(over);
                    self.multicast(&ServerMessage::GameOver(over));
                }
            }
            Err(RulesError::Illegal) => {
                tracing::debug!(connection = %from, from = %request.from, to = %request.to, "illegal move");
                self.unicast(from, &ServerMessage::InvalidMove(request));
            }
            Err(e) => {
                tracing::debug!(connection = %from, error = %e, "malformed move");
                self.unicast(
                    from,
                    &ServerMessage::Error {
                        message: e.to_string(),
                    },
                );
            }
        }
    }

    fn on_malformed_move(&mut self, from: ConnectionId, reason: String) {
        if !self.may_move(from) {
            return;
        }
        tracing::debug!(connection = %from, %reason, "undecodable move");
        self.unicast(
            from,
            &ServerMessage::Error {
                message: format!("malformed move: {reason}"),
            },
        );
    }

    fn on_new_game(&mut self, id: ConnectionId) {
        tracing::info!(connection = %id, "new game");
        self.session.rules.reset();
        self.session.terminal = None;
        self.multicast(&ServerMessage::NewGame);
        let board = self.session.board_state();
        self.multicast(&board);
    }

    fn send_role(&mut self, id: ConnectionId) {
        let notice = role_notice(role_for(id, &self.session.seats));
        self.unicast(id, &notice);
    }

    fn unicast(&mut self, id: ConnectionId, msg: &ServerMessage) {
        self.delivery.deliver(Audience::One(id), msg);
    }

    fn multicast(&mut self, msg: &ServerMessage) {
        self.delivery.deliver(Audience::All, msg);
    }
}
