//! Machine registry.
//!
//! The [`MachineStore`] owns every live [`Machine`] together with the stop
//! signal of its motion task. It is constructed once by the process and
//! shared behind an `Arc`.
//!
//! Registry entries are guarded by `DashMap` shard locks; a machine's own
//! fields are guarded by the machine's lock. A shard guard is always
//! released before a machine lock is taken.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashMap;
use fleet_net::messages::{Gps, MachineState};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::SeedParams;
use crate::machine::{Machine, MachineId, MachineStatus};

/// Errors returned by store lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No live machine has this identifier.
    #[error("{0} not found")]
    NotFound(MachineId),
}

/// A registered machine and the signal that stops its motion task.
#[derive(Debug)]
struct Registered {
    machine: Arc<Machine>,
    stop: CancellationToken,
}

/// Concurrent registry of live machines.
#[derive(Debug)]
pub struct MachineStore {
    machines: DashMap<MachineId, Registered>,
    next_id: AtomicU32,
    seed: SeedParams,
}

impl MachineStore {
    /// Create an empty store placing new machines according to `seed`.
    #[must_use]
    pub fn new(seed: SeedParams) -> Self {
        Self {
            machines: DashMap::new(),
            next_id: AtomicU32::new(0),
            seed,
        }
    }

    /// Allocate the next identifier and register a new machine.
    ///
    /// The machine starts paused with a full tank at its seeded position,
    /// with a fresh stop signal registered alongside it.
    pub fn create(&self) -> Arc<Machine> {
        let raw = self.next_id.fetch_add(1, Ordering::Relaxed);
        // The counter wraps to 0 after this; later ids would collide.
        debug_assert!(raw != u32::MAX, "machine identifier space exhausted");
        let id = MachineId(raw);
        let machine = Arc::new(Machine::new(id, MachineStatus::seeded(id, &self.seed)));
        self.machines.insert(
            id,
            Registered {
                machine: Arc::clone(&machine),
                stop: CancellationToken::new(),
            },
        );
        debug!(machine_id = id.0, "machine created");
        machine
    }

    /// Returns the stop signal of a live machine.
    #[must_use]
    pub fn stop_signal(&self, id: MachineId) -> Option<CancellationToken> {
        self.machines.get(&id).map(|entry| entry.stop.clone())
    }

    /// Returns a live machine.
    #[must_use]
    pub fn get(&self, id: MachineId) -> Option<Arc<Machine>> {
        self.machines.get(&id).map(|entry| Arc::clone(&entry.machine))
    }

    /// Returns `true` if the machine is registered.
    #[must_use]
    pub fn contains(&self, id: MachineId) -> bool {
        self.machines.contains_key(&id)
    }

    /// Number of live machines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.machines.len()
    }

    /// Returns `true` if no machine is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    /// Copy a machine's fields into the wire shape.
    #[must_use]
    pub fn to_protocol_state(machine: &Machine) -> MachineState {
        let status = machine.status();
        MachineState {
            id: machine.id().0,
            location: Gps {
                lat: status.location.lat,
                lon: status.location.lon,
                alt: status.location.alt,
            },
            fuel_level: status.fuel_level,
            is_paused: status.is_paused,
        }
    }

    /// Set the paused flag of machine `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the machine is not registered.
    pub fn set_paused(&self, id: MachineId, paused: bool) -> Result<Arc<Machine>, StoreError> {
        let machine = self.get(id).ok_or(StoreError::NotFound(id))?;
        machine.set_paused(paused);
        debug!(machine_id = id.0, paused, "pause state changed");
        Ok(machine)
    }

    /// Stop a machine's motion task and forget the machine.
    ///
    /// Returns `false` if the machine was already gone.
    pub fn remove(&self, id: MachineId) -> bool {
        match self.machines.remove(&id) {
            Some((_, registered)) => {
                registered.stop.cancel();
                debug!(machine_id = id.0, "machine removed");
                true
            }
            None => false,
        }
    }
}

impl Default for MachineStore {
    fn default() -> Self {
        Self::new(SeedParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_sequential_from_zero() {
        let store = MachineStore::default();
        let ids: Vec<u32> = (0..4).map(|_| store.create().id().0).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_ids_are_not_reused_after_removal() {
        let store = MachineStore::default();
        let first = store.create().id();
        assert!(store.remove(first));
        let second = store.create().id();
        assert!(second > first);
    }

    #[test]
    fn test_concurrent_creation_issues_unique_ids() {
        let store = Arc::new(MachineStore::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    (0..50).map(|_| store.create().id().0).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<u32> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..400).collect::<Vec<_>>());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "identifier space exhausted")]
    fn test_id_space_exhaustion_is_caught() {
        let store = MachineStore {
            machines: DashMap::new(),
            next_id: AtomicU32::new(u32::MAX - 1),
            seed: SeedParams::default(),
        };
        assert_eq!(store.create().id(), MachineId(u32::MAX - 1));
        store.create();
    }

    #[test]
    fn test_created_machine_is_registered_with_stop_signal() {
        let store = MachineStore::default();
        let machine = store.create();
        assert!(store.contains(machine.id()));
        let stop = store.stop_signal(machine.id()).unwrap();
        assert!(!stop.is_cancelled());
    }

    #[test]
    fn test_set_paused_unknown_id() {
        let store = MachineStore::default();
        assert_eq!(
            store.set_paused(MachineId(9), true).unwrap_err(),
            StoreError::NotFound(MachineId(9))
        );
    }

    #[test]
    fn test_set_paused_updates_machine() {
        let store = MachineStore::default();
        let id = store.create().id();
        let machine = store.set_paused(id, false).unwrap();
        assert!(!machine.status().is_paused);
        store.set_paused(id, true).unwrap();
        assert!(machine.status().is_paused);
    }

    #[test]
    fn test_remove_cancels_stop_signal_and_is_idempotent() {
        let store = MachineStore::default();
        let id = store.create().id();
        let stop = store.stop_signal(id).unwrap();

        assert!(store.remove(id));
        assert!(stop.is_cancelled());
        assert!(!store.contains(id));
        assert!(store.stop_signal(id).is_none());

        assert!(!store.remove(id));
        assert!(store.is_empty());
    }

    #[test]
    fn test_protocol_state_copies_fields() {
        let store = MachineStore::default();
        let machine = store.create();
        let state = MachineStore::to_protocol_state(&machine);
        let status = machine.status();
        assert_eq!(state.id, machine.id().0);
        assert_eq!(state.location.lat, status.location.lat);
        assert_eq!(state.location.lon, status.location.lon);
        assert_eq!(state.location.alt, status.location.alt);
        assert_eq!(state.fuel_level, 100.0);
        assert!(state.is_paused);
    }
}
