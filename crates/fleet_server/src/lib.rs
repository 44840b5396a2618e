//! # fleet_server — Machine server
//!
//! Runs the machine simulation and serves it over the `MachineMap` RPC:
//!
//! - `Stream` creates a machine, starts its motion task and streams its
//!   state every tick until the caller goes away.
//! - `Pause` / `Unpause` flip a live machine's paused flag and return its
//!   updated state, or `NotFound`.
//!
//! The [`MachineStore`](fleet_sim::MachineStore) is built by the binary and
//! handed to the [`MachineMapService`].

pub mod rpc;
pub mod service;

pub use rpc::serve;
pub use service::MachineMapService;
