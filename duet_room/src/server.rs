// TCP server and main event loop for the chess room.
//
// Architecture: thread-per-reader with a central `mpsc` channel.
//
// - **Listener thread** (`TcpListener::accept()` loop): accepts new TCP
//   connections and sends `InternalEvent::NewConnection` to the main thread.
// - **Reader threads** (one per client): call `read_client_frame()` in a loop
//   and send `InternalEvent::MessageFrom` to the main thread. A `move` frame
//   with an undecodable payload becomes `InternalEvent::MalformedMove` and the
//   connection stays open. `goodbye`, EOF, a read error or a frame that is not
//   a client message at all end the loop with `InternalEvent::Disconnected`.
// - **Main thread**: owns the `Coordinator` (and through it the game session
//   and the `Gateway`), receives events from the channel and handles each one
//   to completion before taking the next.
//
// The main thread is the only writer to client TCP streams (via the
// `Gateway`). Reader threads only read.
//
// Connection IDs come from a counter on the main thread and are never reused.
// Connections beyond `max_connections` get one `rejected` frame and are
// closed without touching the session. Accepted sockets get a write timeout
// so a peer that stops reading cannot stall the main thread; the gateway
// drops a connection whose write fails.
//
// Shutdown: `RoomHandle::stop` clears `keep_running`; the main loop notices
// within one poll interval, shuts down every client socket (which unblocks
// their readers) and exits.

use std::io::{BufReader, BufWriter};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use duet_protocol::framing::{read_client_frame, write_json};
use duet_protocol::message::{ClientFrame, ClientMessage, ServerMessage};
use duet_protocol::types::ConnectionId;

use crate::config::RoomConfig;
use crate::error::RoomError;
use crate::gateway::Gateway;
use crate::rules::ShakmatyRules;
use crate::session::{Coordinator, RoomEvent};

/// How long the main loop waits for an event before re-checking
/// `keep_running`.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Pause between non-blocking `accept()` attempts when nobody is connecting.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Longest a single frame write to a client may block the main thread.
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

type Room = Coordinator<ShakmatyRules, Gateway>;

/// Events sent from listener/reader threads to the main thread.
enum InternalEvent {
    NewConnection {
        stream: TcpStream,
    },
    MessageFrom {
        id: ConnectionId,
        message: ClientMessage,
    },
    MalformedMove {
        id: ConnectionId,
        reason: String,
    },
    Disconnected {
        id: ConnectionId,
    },
}

/// Handle returned by `start_room` to control the running server.
pub struct RoomHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl RoomHandle {
    /// Signal the room to stop and wait for it to shut down.
    pub fn stop(self) {
        self.keep_running.store(false, Ordering::SeqCst);
        self.wait();
    }

    /// Block until the room's main loop exits.
    pub fn wait(mut self) {
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// Start the room on a background thread. Returns a handle for stopping it
/// and the actual bound address (useful when port 0 is used to let the OS
/// pick a free port).
pub fn start_room(config: RoomConfig) -> Result<(RoomHandle, SocketAddr), RoomError> {
    let listener = TcpListener::bind(config.listen_addr())?;
    let addr = listener.local_addr()?;
    // Non-blocking so the accept thread can check keep_running periodically.
    listener.set_nonblocking(true)?;

    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_clone = keep_running.clone();

    tracing::info!(%addr, max_connections = config.max_connections, "room listening");
    let thread = thread::Builder::new()
        .name("duet-room".into())
        .spawn(move || run_room(listener, config, keep_running_clone))?;

    Ok((
        RoomHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

/// Main room loop. Runs until `keep_running` is set to false.
fn run_room(listener: TcpListener, config: RoomConfig, keep_running: Arc<AtomicBool>) {
    let mut room: Room = Coordinator::new(ShakmatyRules::new(), Gateway::new());

    let (tx, rx): (Sender<InternalEvent>, Receiver<InternalEvent>) = mpsc::channel();

    let keep_running_listener = keep_running.clone();
    let tx_listener = tx.clone();
    thread::spawn(move || {
        while keep_running_listener.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, peer)) => {
                    tracing::debug!(%peer, "accepted");
                    stream.set_nonblocking(false).ok();
                    if tx_listener
                        .send(InternalEvent::NewConnection { stream })
                        .is_err()
                    {
                        break;
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_BACKOFF);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed, listener stopping");
                    break;
                }
            }
        }
    });

    let mut ctx = LoopContext {
        next_id: 0,
        max_connections: config.max_connections,
        tx: &tx,
        keep_running: &keep_running,
    };

    while keep_running.load(Ordering::SeqCst) {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(event) => {
                handle_event(&mut room, event, &mut ctx);
                // Drain any additional events that arrived during handling.
                while let Ok(event) = rx.try_recv() {
                    handle_event(&mut room, event, &mut ctx);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    room.delivery_mut().shutdown_all();
    tracing::info!("room stopped");
}

/// Main-thread state the event handlers need besides the room itself.
struct LoopContext<'a> {
    next_id: u64,
    max_connections: usize,
    tx: &'a Sender<InternalEvent>,
    keep_running: &'a Arc<AtomicBool>,
}

fn handle_event(room: &mut Room, event: InternalEvent, ctx: &mut LoopContext<'_>) {
    match event {
        InternalEvent::NewConnection { stream } => {
            handle_new_connection(room, stream, ctx);
        }
        InternalEvent::MessageFrom { id, message } => {
            handle_message(room, id, message);
        }
        InternalEvent::MalformedMove { id, reason } => {
            room.handle(RoomEvent::MalformedMove { from: id, reason });
        }
        InternalEvent::Disconnected { id } => {
            tracing::info!(connection = %id, "disconnected");
            room.handle(RoomEvent::Disconnected(id));
        }
    }
}

/// Assign an ID, attach the write half, seat the connection and spawn its
/// reader thread. Over-capacity connections are refused instead.
fn handle_new_connection(room: &mut Room, stream: TcpStream, ctx: &mut LoopContext<'_>) {
    if let Err(e) = stream.set_write_timeout(Some(WRITE_TIMEOUT)) {
        tracing::warn!(error = %e, "cannot set write timeout, dropping connection");
        return;
    }

    if room.delivery_mut().connection_count() >= ctx.max_connections {
        tracing::warn!(
            max_connections = ctx.max_connections,
            "room full, refusing connection"
        );
        let rejected = ServerMessage::Rejected {
            reason: "room is full".into(),
        };
        let mut writer = BufWriter::new(stream);
        let _ = write_json(&mut writer, &rejected);
        return;
    }

    let reader_stream = match stream.try_clone() {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "cannot clone stream, dropping connection");
            return;
        }
    };

    let id = ConnectionId(ctx.next_id);
    ctx.next_id += 1;
    tracing::info!(connection = %id, "connected");

    room.delivery_mut().attach(id, stream);
    room.handle(RoomEvent::Connected(id));
    if !room.delivery_mut().contains(id) {
        // The greeting could not be written; the reader reports the close.
        tracing::debug!(connection = %id, "dropped during greeting");
    }

    let tx_reader = ctx.tx.clone();
    let keep_running_reader = ctx.keep_running.clone();
    thread::spawn(move || {
        reader_loop(BufReader::new(reader_stream), id, tx_reader, keep_running_reader);
    });
}

/// Reader loop for a single client. Runs in its own thread.
fn reader_loop(
    mut reader: BufReader<TcpStream>,
    id: ConnectionId,
    tx: Sender<InternalEvent>,
    keep_running: Arc<AtomicBool>,
) {
    while keep_running.load(Ordering::SeqCst) {
        let event = match read_client_frame(&mut reader) {
            Ok(ClientFrame::Message(ClientMessage::Goodbye)) => {
                tracing::debug!(connection = %id, "goodbye");
                break;
            }
            Ok(ClientFrame::Message(message)) => InternalEvent::MessageFrom { id, message },
            Ok(ClientFrame::MalformedMove { reason }) => InternalEvent::MalformedMove { id, reason },
            Err(e) => {
                if !e.is_disconnect() {
                    tracing::warn!(connection = %id, error = %e, "undecodable frame, dropping connection");
                }
                break;
            }
        };
        if tx.send(event).is_err() {
            return;
        }
    }
    let _ = tx.send(InternalEvent::Disconnected { id });
}

fn handle_message(room: &mut Room, id: ConnectionId, message: ClientMessage) {
    let event = match message {
        ClientMessage::RequestRole => RoomEvent::RequestRole(id),
        ClientMessage::Move(request) => RoomEvent::Move { from: id, request },
        ClientMessage::NewGame => RoomEvent::NewGame(id),
        // Handled in the reader loop.
        ClientMessage::Goodbye => return,
    };
    room.handle(event);
}
