// Broadcast gateway: routes room notices to connections.
//
// The coordinator only ever says "send this to that connection" or "send this
// to everyone"; `Delivery` is that seam. `Gateway` is the TCP implementation:
// one `BufWriter<TcpStream>` write half per connection, keyed by
// `ConnectionId` in a `BTreeMap` so multicast order is stable.
//
// Every frame is flushed as it is written (see `write_json`), so the order a
// single connection observes is exactly the order notices were emitted.
//
// A failed write (including a write timeout against a peer that stopped
// reading) detaches the connection and shuts its socket down. Its reader
// thread then sees EOF and reports the disconnect, which is when the session
// frees the seat.

use std::collections::BTreeMap;
use std::io::BufWriter;
use std::net::{Shutdown, TcpStream};

use duet_protocol::framing::write_json;
use duet_protocol::message::ServerMessage;
use duet_protocol::types::ConnectionId;

use crate::authority::Role;

/// Who a notice is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Audience {
    One(ConnectionId),
    All,
}

pub trait Delivery {
    fn deliver(&mut self, audience: Audience, msg: &ServerMessage);

    /// Stop delivering to `id`. No-op for unknown connections.
    fn detach(&mut self, id: ConnectionId);
}

/// Write halves of every live connection.
#[derive(Default)]
pub struct Gateway {
    connections: BTreeMap<ConnectionId, BufWriter<TcpStream>>,
}

impl Gateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, id: ConnectionId, stream: TcpStream) {
        self.connections.insert(id, BufWriter::new(stream));
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Close every connection in both directions, which also wakes their
    /// blocked reader threads. Used on room shutdown.
    pub fn shutdown_all(&mut self) {
        for (id, writer) in std::mem::take(&mut self.connections) {
            if let Err(e) = writer.get_ref().shutdown(Shutdown::Both) {
                tracing::debug!(connection = %id, error = %e, "shutdown failed");
            }
        }
    }

    fn send_to(&mut self, id: ConnectionId, msg: &ServerMessage) {
        let Some(writer) = self.connections.get_mut(&id) else {
            return;
        };
        if let Err(e) = write_json(writer, msg) {
            tracing::warn!(connection = %id, error = %e, "write failed, dropping connection");
            if let Some(writer) = self.connections.remove(&id) {
                let _ = writer.get_ref().shutdown(Shutdown::Both);
            }
        }
    }
}

impl Delivery for Gateway {
    fn deliver(&mut self, audience: Audience, msg: &ServerMessage) {
        match audience {
            Audience::One(id) => self.send_to(id, msg),
            Audience::All => {
                let ids: Vec<ConnectionId> = self.connections.keys().copied().collect();
                for id in ids {
                    self.send_to(id, msg);
                }
            }
        }
    }

    fn detach(&mut self, id: ConnectionId) {
        self.connections.remove(&id);
    }
}

/// The notice that tells a connection its role.
pub fn role_notice(role: Role) -> ServerMessage {
    match role.player_role() {
        Some(role) => ServerMessage::PlayerRole { role },
        None => ServerMessage::SpectatorRole,
    }
}
