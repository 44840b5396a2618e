//! Per-machine motion task.
//!
//! Every tick a running machine takes a uniform random step in latitude,
//! longitude and altitude and burns a fixed amount of fuel. A machine that
//! runs dry is clamped to zero fuel and paused for good.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::MotionParams;
use crate::machine::{Machine, MachineStatus};

/// What a single tick did to a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The machine was paused or out of fuel; nothing changed.
    Frozen,
    /// The machine moved and burned fuel.
    Moved,
    /// The machine moved, ran out of fuel and was paused.
    Exhausted,
}

/// Advance `status` by one tick.
pub fn step<R: Rng>(
    status: &mut MachineStatus,
    params: &MotionParams,
    rng: &mut R,
) -> StepOutcome {
    if status.is_paused || status.fuel_level <= 0.0 {
        return StepOutcome::Frozen;
    }

    status.location.lat += rng.random_range(-params.step_lat_lon..=params.step_lat_lon);
    status.location.lon += rng.random_range(-params.step_lat_lon..=params.step_lat_lon);
    status.location.alt += rng.random_range(-params.step_alt..=params.step_alt) as f32;

    status.fuel_level -= params.fuel_drain;
    if status.fuel_level <= 0.0 {
        status.fuel_level = 0.0;
        status.is_paused = true;
        return StepOutcome::Exhausted;
    }
    StepOutcome::Moved
}

/// Spawn the motion task for `machine`.
///
/// The task ticks every `interval` until `stop` is cancelled.
pub fn spawn(
    machine: Arc<Machine>,
    stop: CancellationToken,
    params: MotionParams,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let id = machine.id();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; motion starts one interval in.
        ticker.tick().await;

        debug!(machine_id = id.0, "motion started");
        loop {
            tokio::select! {
                biased;
                () = stop.cancelled() => break,
                _ = ticker.tick() => {
                    let outcome = machine.update(|status| step(status, &params, &mut rand::rng()));
                    if outcome == StepOutcome::Exhausted {
                        info!(machine_id = id.0, "fuel exhausted, machine paused");
                    }
                }
            }
        }
        debug!(machine_id = id.0, "motion stopped");
    })
}
