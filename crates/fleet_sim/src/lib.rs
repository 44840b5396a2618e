//! # fleet_sim
//!
//! Machine registry and motion simulation.
//!
//! - [`machine`] — The [`Machine`] entity, its identifier and status.
//! - [`store`] — [`MachineStore`], the concurrent registry of live machines.
//! - [`motion`] — The per-machine background task that walks position and
//!   drains fuel.
//! - [`config`] — Motion, seeding and tick configuration.

pub mod config;
pub mod machine;
pub mod motion;
pub mod store;

pub use config::{MotionParams, SeedParams, SimConfig};
pub use machine::{Location, Machine, MachineId, MachineStatus};
pub use store::{MachineStore, StoreError};
