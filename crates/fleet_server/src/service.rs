//! The `MachineMap` service.
//!
//! `stream` is the only place machines are created: a machine lives exactly
//! as long as the stream call that created it.

use std::sync::Arc;

use fleet_net::messages::{MachineState, RpcStatus};
use fleet_sim::{MachineId, MachineStore, SimConfig, StoreError, motion};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Implements `Stream`, `Pause` and `Unpause` on top of a [`MachineStore`].
#[derive(Debug, Clone)]
pub struct MachineMapService {
    store: Arc<MachineStore>,
    config: SimConfig,
}

impl MachineMapService {
    /// Create a service backed by `store`.
    #[must_use]
    pub fn new(store: Arc<MachineStore>, config: SimConfig) -> Self {
        Self { store, config }
    }

    /// Returns the backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<MachineStore> {
        &self.store
    }

    /// Create a machine, start its motion task and send its state into
    /// `states` once per tick, the first immediately.
    ///
    /// Runs until `cancel` fires or the receiving side of `states` is
    /// dropped, then removes the machine. Returns the machine's identifier.
    pub async fn stream(
        &self,
        states: mpsc::Sender<MachineState>,
        cancel: CancellationToken,
    ) -> MachineId {
        let machine = self.store.create();
        let id = machine.id();
        if let Some(stop) = self.store.stop_signal(id) {
            motion::spawn(
                Arc::clone(&machine),
                stop,
                self.config.motion,
                self.config.tick_interval,
            );
        }
        info!(machine_id = id.0, "stream opened");

        let mut ticker = tokio::time::interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let state = MachineStore::to_protocol_state(&machine);
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                sent = states.send(state) => {
                    if sent.is_err() {
                        debug!(machine_id = id.0, "stream receiver gone");
                        break;
                    }
                }
            }
        }

        self.store.remove(id);
        info!(machine_id = id.0, "stream closed, machine removed");
        id
    }

    /// Freeze machine `id`.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` status if no such machine is live.
    pub fn pause(&self, id: u32) -> Result<MachineState, RpcStatus> {
        self.set_paused(id, true)
    }

    /// Let machine `id` move again.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` status if no such machine is live.
    pub fn unpause(&self, id: u32) -> Result<MachineState, RpcStatus> {
        self.set_paused(id, false)
    }

    fn set_paused(&self, id: u32, paused: bool) -> Result<MachineState, RpcStatus> {
        match self.store.set_paused(MachineId(id), paused) {
            Ok(machine) => Ok(MachineStore::to_protocol_state(&machine)),
            Err(err @ StoreError::NotFound(_)) => Err(RpcStatus::not_found(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use fleet_net::messages::StatusCode;

    use super::*;

    fn service() -> MachineMapService {
        let config = SimConfig::default().with_tick_interval(Duration::from_millis(50));
        MachineMapService::new(Arc::new(MachineStore::default()), config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_yields_seeded_state_first() {
        let service = service();
        let (tx, mut rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let task = tokio::spawn({
            let service = service.clone();
            let cancel = cancel.clone();
            async move { service.stream(tx, cancel).await }
        });

        let first = rx.recv().await.unwrap();
        assert_eq!(first.id, 0);
        assert_eq!(first.fuel_level, 100.0);
        assert!(first.is_paused);
        assert!(service.store().contains(MachineId(0)));

        cancel.cancel();
        assert_eq!(task.await.unwrap(), MachineId(0));
        assert!(service.store().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_ends_when_receiver_dropped() {
        let service = service();
        let (tx, mut rx) = mpsc::channel(1);
        let task = tokio::spawn({
            let service = service.clone();
            async move { service.stream(tx, CancellationToken::new()).await }
        });

        rx.recv().await.unwrap();
        drop(rx);
        task.await.unwrap();
        assert!(service.store().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_and_unpause_live_machine() {
        let service = service();
        let (tx, mut rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let task = tokio::spawn({
            let service = service.clone();
            let cancel = cancel.clone();
            async move { service.stream(tx, cancel).await }
        });
        let id = rx.recv().await.unwrap().id;

        let running = service.unpause(id).unwrap();
        assert!(!running.is_paused);

        // Let it move for a while.
        for _ in 0..5 {
            rx.recv().await.unwrap();
        }

        let paused = service.pause(id).unwrap();
        assert!(paused.is_paused);
        // Up to two snapshots taken before the pause may still be queued.
        rx.recv().await.unwrap();
        rx.recv().await.unwrap();
        for _ in 0..5 {
            let state = rx.recv().await.unwrap();
            assert_eq!(state.location, paused.location);
            assert_eq!(state.fuel_level, paused.fuel_level);
            assert!(state.is_paused);
        }

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_control_unknown_machine_is_not_found() {
        let service = service();
        assert_eq!(service.pause(17).unwrap_err().code, StatusCode::NotFound);
        assert_eq!(service.unpause(17).unwrap_err().code, StatusCode::NotFound);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_stream_gets_its_own_machine() {
        let service = service();
        let cancel = CancellationToken::new();
        let mut receivers = Vec::new();
        for _ in 0..3 {
            let (tx, rx) = mpsc::channel(1);
            let service = service.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { service.stream(tx, cancel).await });
            receivers.push(rx);
        }

        let mut ids = Vec::new();
        for rx in &mut receivers {
            ids.push(rx.recv().await.unwrap().id);
        }
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(service.store().len(), 3);

        cancel.cancel();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(service.store().is_empty());
    }
}
