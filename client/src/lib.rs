//! # TankWars Client Library
//!
//! This library keeps a local copy of a TankWars arena in sync with the game
//! server and feeds the player's intent back to it. Rendering and input are
//! thin layers on top; everything that talks to the network lives here and can
//! be driven without a window.
//!
//! ## Architecture Overview
//!
//! Two threads cooperate through shared, lock-protected state:
//!
//! ### Network Thread
//! A dedicated thread runs a single-threaded tokio runtime that owns the TCP
//! stream. It performs the handshake, then loops: read whatever bytes are
//! available, apply every complete record to the world, reply with the
//! current control commands, and announce the frame. Only one step runs at a
//! time, so the server sees exactly one command line per batch it sent.
//!
//! ### Render Thread
//! The shell reads owned snapshots of the world once per paint and pushes key
//! and mouse events into the command state. It never blocks on the network;
//! session progress arrives as [`SessionEvent`]s on a channel it polls.
//!
//! ## Wire Protocol
//!
//! Newline-delimited text over one TCP connection:
//! - client → server: the player name, then one command object per batch,
//!   `{"moving":"up","fire":"none","tdir":{"x":0.0,"y":-1.0}}`
//! - server → client: the player ID, the world size, then JSON records whose
//!   key names their kind (`wall`, `tank`, `power`, `proj`, `beam`)
//!
//! ## Module Organization
//!
//! ### Framing (`framing`)
//! Receive buffer that hands out complete lines and keeps the trailing
//! fragment for the next read.
//!
//! ### Connection (`connection`)
//! Connection states and the two-token handshake.
//!
//! ### World (`world`)
//! Entity maps with one lock per kind, removal rules and final player stats.
//!
//! ### Commands (`commands`)
//! Outbound movement, firing and turret direction, including key arbitration
//! and the one-shot beam latch.
//!
//! ### Network (`network`)
//! The session loop and its event channel.
//!
//! ### Controller (`controller`)
//! [`GameClient`], the facade the shell uses: start, poll, read, steer, exit.
//!
//! ### Input and Rendering (`input`, `rendering`)
//! macroquad glue for the binary.
//!
//! ## Usage Example
//!
//! ```no_run
//! use client::{ClientConfig, GameClient, SessionEvent};
//! use shared::Moving;
//!
//! let mut client = GameClient::new(ClientConfig::default());
//! client.connect("localhost", "Alice")?;
//!
//! loop {
//!     for event in client.drain_events() {
//!         if let SessionEvent::Failed(err) = event {
//!             eprintln!("{}", err);
//!             return Ok(());
//!         }
//!     }
//!
//!     client.key_down(Moving::Up);
//!     let tanks = client.world().tanks();
//!     // draw `tanks` ...
//! #   break;
//! }
//! client.exit();
//! # Ok::<(), client::SessionError>(())
//! ```
//!
//! ## Failure Handling
//!
//! A failed connect, a broken handshake or a lost connection ends the session
//! and is reported once as [`SessionEvent::Failed`]. A record that does not
//! decode is logged and skipped; the stream carries on. There are no retries;
//! reconnecting means starting a new [`GameClient`].

pub mod commands;
pub mod config;
pub mod connection;
pub mod controller;
pub mod error;
pub mod framing;
pub mod input;
pub mod network;
pub mod rendering;
pub mod world;

pub use commands::CommandState;
pub use config::ClientConfig;
pub use connection::{ConnectionState, Handshake, SessionInfo};
pub use controller::GameClient;
pub use error::{HandshakeError, SessionError};
pub use framing::LineBuffer;
pub use network::{Session, SessionContext, SessionEvent, SessionHandle};
pub use world::{Applied, PlayerStats, Stored, World};
