//! # fleet_bridge
//!
//! WebSocket bridge between browser clients and the machine server.
//!
//! Every accepted WebSocket becomes a [`Session`]: the bridge opens one
//! `Stream` call for it, forwards each machine state as a JSON text frame,
//! and turns `{"type": "pause" | "unpause", "id": n}` messages into
//! `Pause` / `Unpause` calls whose results are echoed back as confirmations.
//!
//! - [`server`] — Accept loop and WebSocket upgrade.
//! - [`session`] — Per-connection state machine and the two pumps.
//! - [`outbound`] — Serialised, close-once socket writer.
//! - [`protocol`] — JSON message shapes and command decoding.
//! - [`config`] — Addresses and path.
//! - [`error`] — Bridge error types.

pub mod config;
pub mod error;
pub mod outbound;
pub mod protocol;
pub mod server;
pub mod session;

pub use config::BridgeConfig;
pub use error::BridgeError;
pub use protocol::{CommandError, ControlCommand, MachineView};
pub use server::BridgeServer;
pub use session::{Session, SessionState};
