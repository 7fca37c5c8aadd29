// duet_room — two-seat chess room server.
//
// One process hosts one room with one authoritative game. The first two
// connections take the white and black seats; everyone after them watches.
// A lone seated player plays both colours until an opponent arrives. Clients
// send move requests; the room validates them against the rules engine and
// broadcasts accepted moves, positions, departures and results to everyone.
//
// Module overview:
// - `seats.rs`:     `SeatRegistry`, the white/black seat map.
// - `authority.rs`: Role derivation and per-move authorization. Pure.
// - `rules.rs`:     `RulesEngine` trait and the `shakmaty`-backed
//                   `ShakmatyRules` (legality, FEN, outcomes, repetition).
// - `gateway.rs`:   `Delivery` trait and the TCP `Gateway` that writes
//                   framed notices to one connection or all of them.
// - `session.rs`:   `GameSession` state and the `Coordinator` that turns
//                   `RoomEvent`s into state changes and notices.
// - `server.rs`:    TCP listener, reader threads (one per client), and the
//                   main event loop. Uses `std::net` with a thread-per-reader
//                   architecture and an `mpsc` channel into the
//                   single-threaded `Coordinator`.
// - `client.rs`:    `NetClient`, a small blocking-connect / polling client.
// - `config.rs`:    `RoomConfig` and TOML loading.
// - `error.rs`:     `RoomError`.
//
// The room can run as a standalone binary (`main.rs`) or be embedded via the
// library API (`start_room`).

pub mod authority;
pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod rules;
pub mod seats;
pub mod server;
pub mod session;

pub use config::RoomConfig;
pub use error::RoomError;
pub use server::{RoomHandle, start_room};
