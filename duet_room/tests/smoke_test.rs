// Integration smoke test for the room server.
//
// Starts a room on localhost and drives it with plain TCP sockets using the
// protocol crate's framing and message types: seating, a move, an ignored
// out-of-turn move, a role resync, spectators, departure, undecodable move
// payloads and the connection cap.

use std::io::{BufReader, BufWriter};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use duet_protocol::framing::{read_json, write_frame, write_json};
use duet_protocol::message::{ClientMessage, MoveRequest, ServerMessage};
use duet_protocol::types::{Color, PlayerRole};
use duet_room::{RoomConfig, start_room};

const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";

struct RawClient {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl RawClient {
    fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let reader_stream = stream.try_clone().unwrap();
        Self {
            reader: BufReader::new(reader_stream),
            writer: BufWriter::new(stream),
        }
    }

    fn send(&mut self, msg: &ClientMessage) {
        write_json(&mut self.writer, msg).unwrap();
    }

    fn send_raw(&mut self, payload: &str) {
        write_frame(&mut self.writer, payload.as_bytes()).unwrap();
    }

    fn recv(&mut self) -> ServerMessage {
        read_json(&mut self.reader).unwrap()
    }

    /// Expect no frame within a short window.
    fn expect_silence(&mut self) {
        self.reader
            .get_ref()
            .set_read_timeout(Some(Duration::from_millis(200)))
            .unwrap();
        let result = read_json::<_, ServerMessage>(&mut self.reader);
        assert!(result.is_err(), "expected silence, got {result:?}");
        self.reader
            .get_ref()
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
    }
}

fn start(max_connections: usize) -> (duet_room::RoomHandle, SocketAddr) {
    let config = RoomConfig {
        bind: "127.0.0.1".into(),
        port: 0, // OS picks a free port
        max_connections,
    };
    let (handle, addr) = start_room(config).unwrap();
    // Give the listener thread a moment to start.
    std::thread::sleep(Duration::from_millis(50));
    (handle, addr)
}

fn board(fen: &str) -> ServerMessage {
    ServerMessage::BoardState { fen: fen.into() }
}

#[test]
fn full_room_lifecycle() {
    let (handle, addr) = start(64);

    // 1. First client plays both colours.
    let mut a = RawClient::connect(addr);
    assert_eq!(
        a.recv(),
        ServerMessage::PlayerRole {
            role: PlayerRole::Both
        }
    );
    assert_eq!(a.recv(), board(START_FEN));

    // 2. Second client takes black; the first narrows to white.
    let mut b = RawClient::connect(addr);
    assert_eq!(
        b.recv(),
        ServerMessage::PlayerRole {
            role: PlayerRole::Black
        }
    );
    assert_eq!(b.recv(), board(START_FEN));
    assert_eq!(
        a.recv(),
        ServerMessage::PlayerRole {
            role: PlayerRole::White
        }
    );

    // 3. Third client spectates.
    let mut s = RawClient::connect(addr);
    assert_eq!(s.recv(), ServerMessage::SpectatorRole);
    assert_eq!(s.recv(), board(START_FEN));

    // 4. White moves; everyone sees the move and the new board.
    a.send(&ClientMessage::Move(MoveRequest::new("e2", "e4")));
    for client in [&mut a, &mut b, &mut s] {
        assert_eq!(
            client.recv(),
            ServerMessage::Move(MoveRequest::new("e2", "e4"))
        );
        assert_eq!(client.recv(), board(AFTER_E4));
    }

    // 5. White moving again out of turn is ignored.
    a.send(&ClientMessage::Move(MoveRequest::new("d2", "d4")));
    a.expect_silence();

    // 6. Role resync goes to the requester only.
    b.send(&ClientMessage::RequestRole);
    assert_eq!(
        b.recv(),
        ServerMessage::PlayerRole {
            role: PlayerRole::Black
        }
    );

    // 7. White leaves; black is told and plays both colours.
    a.send(&ClientMessage::Goodbye);
    assert_eq!(
        b.recv(),
        ServerMessage::PlayerLeft { side: Color::White }
    );
    assert_eq!(
        b.recv(),
        ServerMessage::PlayerRole {
            role: PlayerRole::Both
        }
    );
    assert_eq!(
        s.recv(),
        ServerMessage::PlayerLeft { side: Color::White }
    );

    handle.stop();
}

#[test]
fn dropped_socket_counts_as_leaving() {
    let (handle, addr) = start(64);

    let mut a = RawClient::connect(addr);
    a.recv();
    a.recv();
    let b = RawClient::connect(addr);
    a.recv(); // narrowed to white

    drop(b);
    assert_eq!(
        a.recv(),
        ServerMessage::PlayerLeft { side: Color::Black }
    );
    assert_eq!(
        a.recv(),
        ServerMessage::PlayerRole {
            role: PlayerRole::Both
        }
    );

    handle.stop();
}

#[test]
fn garbage_frame_disconnects_the_sender() {
    let (handle, addr) = start(64);

    let mut a = RawClient::connect(addr);
    a.recv();
    a.recv();
    let mut b = RawClient::connect(addr);
    b.recv();
    b.recv();
    a.recv();

    b.send_raw("{not json");
    assert_eq!(
        a.recv(),
        ServerMessage::PlayerLeft { side: Color::Black }
    );

    handle.stop();
}

fn expect_error(client: &mut RawClient) -> String {
    match client.recv() {
        ServerMessage::Error { message } => message,
        other => panic!("expected Error, got {other:?}"),
    }
}

#[test]
fn undecodable_move_payload_keeps_the_connection() {
    let (handle, addr) = start(64);

    let mut a = RawClient::connect(addr);
    a.recv();
    a.recv();
    let mut b = RawClient::connect(addr);
    b.recv();
    b.recv();
    a.recv(); // narrowed to white

    // White, on move, sends a move without a destination.
    a.send_raw(r#"{"move":{"from":"e2"}}"#);
    assert!(expect_error(&mut a).contains("to"));
    b.expect_silence();

    // Black's broken move out of turn is ignored like any other, and black
    // keeps its seat.
    b.send_raw(r#"{"move":{"from":"e7"}}"#);
    b.expect_silence();
    a.expect_silence();

    // Nothing changed: white's next real move goes through for both.
    a.send(&ClientMessage::Move(MoveRequest::new("e2", "e4")));
    for client in [&mut a, &mut b] {
        assert_eq!(
            client.recv(),
            ServerMessage::Move(MoveRequest::new("e2", "e4"))
        );
        assert_eq!(client.recv(), board(AFTER_E4));
    }

    // Black, now on move, sends a numeric square.
    b.send_raw(r#"{"move":{"from":52,"to":"e5"}}"#);
    expect_error(&mut b);
    a.expect_silence();

    b.send(&ClientMessage::RequestRole);
    assert_eq!(
        b.recv(),
        ServerMessage::PlayerRole {
            role: PlayerRole::Black
        }
    );

    handle.stop();
}

#[test]
fn connections_beyond_the_cap_are_rejected() {
    let (handle, addr) = start(1);

    let mut a = RawClient::connect(addr);
    assert_eq!(
        a.recv(),
        ServerMessage::PlayerRole {
            role: PlayerRole::Both
        }
    );

    let mut b = RawClient::connect(addr);
    match b.recv() {
        ServerMessage::Rejected { reason } => assert!(!reason.is_empty()),
        other => panic!("expected Rejected, got {other:?}"),
    }

    // The refused connection never touched the seats.
    a.recv(); // boardState
    a.expect_silence();

    handle.stop();
}
