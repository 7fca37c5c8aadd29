// TCP client for a chess room.
//
// Provides a non-blocking interface for a caller's own loop:
// - `connect()` performs the TCP connect on the calling thread, then spawns a
//   background reader thread. There is no handshake: the room greets every
//   connection with its role and the current board on its own.
// - The reader thread calls `read_json()` in a loop and pushes each
//   `ServerMessage` into an `mpsc` channel.
// - The caller holds a `BufWriter<TcpStream>` for sending.
// - `poll()` drains the inbox without blocking.
//
// Integration tests drive the room through this client, so it sees the same
// frames a real front end would.

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use duet_protocol::error::ProtocolError;
use duet_protocol::framing::{read_json, write_json};
use duet_protocol::message::{ClientMessage, MoveRequest, ServerMessage};

/// TCP client for room communication.
pub struct NetClient {
    writer: BufWriter<TcpStream>,
    inbox: Receiver<ServerMessage>,
    _reader_thread: Option<JoinHandle<()>>,
}

impl NetClient {
    /// Connect to a room and spawn the reader thread.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, ProtocolError> {
        let stream = TcpStream::connect(addr)?;
        let reader = BufReader::new(stream.try_clone()?);
        let writer = BufWriter::new(stream);

        let (tx, rx) = mpsc::channel();
        let reader_thread = thread::spawn(move || {
            reader_loop(reader, tx);
        });

        Ok(Self {
            writer,
            inbox: rx,
            _reader_thread: Some(reader_thread),
        })
    }

    pub fn send(&mut self, msg: &ClientMessage) -> Result<(), ProtocolError> {
        write_json(&mut self.writer, msg)
    }

    pub fn send_move(&mut self, request: MoveRequest) -> Result<(), ProtocolError> {
        self.send(&ClientMessage::Move(request))
    }

    /// Ask the room to resend this connection's role.
    pub fn request_role(&mut self) -> Result<(), ProtocolError> {
        self.send(&ClientMessage::RequestRole)
    }

    pub fn new_game(&mut self) -> Result<(), ProtocolError> {
        self.send(&ClientMessage::NewGame)
    }

    /// Send Goodbye and close the connection.
    pub fn disconnect(&mut self) {
        let _ = self.send(&ClientMessage::Goodbye);
        let _ = self.writer.get_ref().shutdown(Shutdown::Both);
    }

    /// Drain all queued server messages (non-blocking).
    pub fn poll(&self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.inbox.try_recv() {
            messages.push(msg);
        }
        messages
    }
}

/// Reader thread: read framed messages in a loop, push to channel.
fn reader_loop(mut reader: BufReader<TcpStream>, tx: mpsc::Sender<ServerMessage>) {
    while let Ok(msg) = read_json::<_, ServerMessage>(&mut reader) {
        if tx.send(msg).is_err() {
            break; // Caller dropped the client.
        }
    }
}
