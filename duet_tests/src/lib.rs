// Test-only player for room integration tests.
//
// Wraps the real `NetClient` (from `duet_room::client`) and keeps a local view
// of what the room has told this connection: its role, the latest board, the
// last game result. Everything goes through the same client code path a real
// front end would use; the only test-specific code is the blocking polling
// around `NetClient::poll()`.
//
// See also: `tests/full_pipeline.rs` for the scenarios.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use duet_protocol::message::{MoveRequest, ServerMessage};
use duet_protocol::types::{Color, GameOver, PlayerRole};
use duet_room::client::NetClient;

/// Default timeout for blocking poll operations.
const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Sleep duration between poll attempts.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// What the room last said about this connection's role.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeenRole {
    Player(PlayerRole),
    Spectator,
}

pub struct TestPlayer {
    client: NetClient,
    pending: VecDeque<ServerMessage>,
    pub role: Option<SeenRole>,
    pub fen: Option<String>,
    pub game_over: Option<GameOver>,
}

impl TestPlayer {
    pub fn connect(addr: SocketAddr) -> Self {
        let client = NetClient::connect(addr).expect("TestPlayer::connect failed");
        Self {
            client,
            pending: VecDeque::new(),
            role: None,
            fen: None,
            game_over: None,
        }
    }

    /// Connect and consume the greeting up to and including the board. A
    /// stored result for a finished game stays queued behind it.
    pub fn join(addr: SocketAddr) -> Self {
        let mut player = Self::connect(addr);
        player.wait_for_board();
        player
    }

    pub fn play(&mut self, from: &str, to: &str) {
        self.client
            .send_move(MoveRequest::new(from, to))
            .expect("send_move failed");
    }

    pub fn play_promotion(&mut self, from: &str, to: &str, piece: &str) {
        self.client
            .send_move(MoveRequest::new(from, to).with_promotion(piece))
            .expect("send_move failed");
    }

    pub fn request_role(&mut self) {
        self.client.request_role().expect("request_role failed");
    }

    pub fn new_game(&mut self) {
        self.client.new_game().expect("new_game failed");
    }

    /// Send Goodbye and close the connection.
    pub fn disconnect(&mut self) {
        self.client.disconnect();
    }

    /// Blocking: the next message from the room, in arrival order.
    pub fn next_message(&mut self) -> ServerMessage {
        let start = Instant::now();
        loop {
            if let Some(msg) = self.pending.pop_front() {
                self.observe(&msg);
                return msg;
            }
            assert!(
                start.elapsed() < POLL_TIMEOUT,
                "timed out waiting for a message"
            );
            self.pending.extend(self.client.poll());
            if self.pending.is_empty() {
                thread::sleep(POLL_INTERVAL);
            }
        }
    }

    /// Blocking: skip messages until one matches `pred`, and return it.
    /// Skipped messages still update the local view.
    pub fn wait_for(
        &mut self,
        what: &str,
        mut pred: impl FnMut(&ServerMessage) -> bool,
    ) -> ServerMessage {
        let start = Instant::now();
        loop {
            assert!(
                start.elapsed() < POLL_TIMEOUT,
                "timed out waiting for {what}"
            );
            let msg = self.next_message();
            if pred(&msg) {
                return msg;
            }
        }
    }

    pub fn wait_for_role(&mut self) -> SeenRole {
        self.wait_for("role", |m| {
            matches!(
                m,
                ServerMessage::PlayerRole { .. } | ServerMessage::SpectatorRole
            )
        });
        self.role.expect("role recorded")
    }

    pub fn wait_for_board(&mut self) -> String {
        self.wait_for("boardState", |m| {
            matches!(m, ServerMessage::BoardState { .. })
        });
        self.fen.clone().expect("fen recorded")
    }

    pub fn wait_for_game_over(&mut self) -> GameOver {
        match self.wait_for("gameOver", |m| matches!(m, ServerMessage::GameOver(_))) {
            ServerMessage::GameOver(over) => over,
            other => panic!("expected GameOver, got {other:?}"),
        }
    }

    pub fn wait_for_player_left(&mut self) -> Color {
        match self.wait_for("playerLeft", |m| {
            matches!(m, ServerMessage::PlayerLeft { .. })
        }) {
            ServerMessage::PlayerLeft { side } => side,
            other => panic!("expected PlayerLeft, got {other:?}"),
        }
    }

    /// Assert that nothing arrives for `window`.
    pub fn expect_quiet(&mut self, window: Duration) {
        thread::sleep(window);
        self.pending.extend(self.client.poll());
        assert!(
            self.pending.is_empty(),
            "expected no messages, got {:?}",
            self.pending
        );
    }

    /// Drain whatever has arrived so far without blocking.
    pub fn drain(&mut self) -> Vec<ServerMessage> {
        self.pending.extend(self.client.poll());
        let messages: Vec<ServerMessage> = self.pending.drain(..).collect();
        for msg in &messages {
            self.observe(msg);
        }
        messages
    }

    fn observe(&mut self, msg: &ServerMessage) {
        match msg {
            ServerMessage::PlayerRole { role } => self.role = Some(SeenRole::Player(*role)),
            ServerMessage::SpectatorRole => self.role = Some(SeenRole::Spectator),
            ServerMessage::BoardState { fen } => self.fen = Some(fen.clone()),
            ServerMessage::GameOver(over) => self.game_over = Some(*over),
            ServerMessage::NewGame => self.game_over = None,
            _ => {}
        }
    }
}
