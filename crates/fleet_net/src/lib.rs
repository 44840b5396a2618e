//! # fleet_net
//!
//! Binary RPC transport for the machine fleet simulator.
//!
//! This crate provides:
//!
//! - [`messages`] — Request, response and state types carried on the wire.
//! - [`codec`] — MessagePack serialisation/deserialisation helpers.
//! - [`transport`] — Length-delimited framing over TCP.
//! - [`client`] — The `MachineMap` client used by the bridge.
//! - [`error`] — Network-layer error types.
//!
//! ## Call model
//!
//! Every call runs on its own TCP connection. The client writes one
//! [`Request`](messages::Request) frame and the server answers with one
//! [`Response`](messages::Response) frame for unary calls, or a sequence of
//! them for `Stream`. Closing the connection from the client side cancels
//! the call.

pub mod client;
pub mod codec;
pub mod error;
pub mod messages;
pub mod transport;

pub use client::{MachineMapClient, MachineStream};
pub use codec::{decode, encode};
pub use error::NetError;
pub use messages::{Gps, MachineRef, MachineState, Request, Response, RpcStatus, StatusCode};
