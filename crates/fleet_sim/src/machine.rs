//! The simulated machine.
//!
//! A [`Machine`] pairs an immutable [`MachineId`] with a lock-protected
//! [`MachineStatus`]. Only the store and the machine's motion task mutate
//! the status, and only while holding the write lock.

use std::fmt;

use parking_lot::RwLock;

use crate::config::SeedParams;

/// Fuel level of a freshly created machine, in percent.
pub const FULL_TANK: f32 = 100.0;

/// A unique machine identifier.
///
/// Identifiers are allocated sequentially by the
/// [`MachineStore`](crate::MachineStore), starting at 0, and are never
/// reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MachineId(pub u32);

impl MachineId {
    /// Returns the raw `u32` identifier.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for MachineId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Machine({})", self.0)
    }
}

/// A geodetic position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Altitude in meters.
    pub alt: f32,
}

/// The mutable part of a machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MachineStatus {
    /// Current position.
    pub location: Location,
    /// Whether position and fuel are frozen.
    pub is_paused: bool,
    /// Remaining fuel in percent, never negative.
    pub fuel_level: f32,
}

impl MachineStatus {
    /// Initial status for machine `id`: a deterministic position near the
    /// seed base, paused, with a full tank.
    #[must_use]
    pub fn seeded(id: MachineId, seed: &SeedParams) -> Self {
        let nudge = seed.spread * (f64::from(id.0 % 5) - 2.0);
        Self {
            location: Location {
                lat: seed.base_lat + nudge,
                lon: seed.base_lon + nudge,
                alt: (id.0 % 50) as f32,
            },
            is_paused: true,
            fuel_level: FULL_TANK,
        }
    }
}

/// One simulated machine.
#[derive(Debug)]
pub struct Machine {
    id: MachineId,
    status: RwLock<MachineStatus>,
}

impl Machine {
    /// Create a machine with the given identifier and initial status.
    #[must_use]
    pub fn new(id: MachineId, status: MachineStatus) -> Self {
        Self {
            id,
            status: RwLock::new(status),
        }
    }

    /// Returns the machine identifier.
    #[must_use]
    pub fn id(&self) -> MachineId {
        self.id
    }

    /// Copy the current status under the read lock.
    #[must_use]
    pub fn status(&self) -> MachineStatus {
        *self.status.read()
    }

    /// Set the paused flag under the write lock.
    ///
    /// A machine with an empty tank stays paused.
    pub fn set_paused(&self, paused: bool) {
        let mut status = self.status.write();
        status.is_paused = paused || status.fuel_level <= 0.0;
    }

    /// Run `f` against the status while holding the write lock.
    ///
    /// The lock is held for the duration of `f`; keep it short.
    pub fn update<R>(&self, f: impl FnOnce(&mut MachineStatus) -> R) -> R {
        f(&mut self.status.write())
    }
}
