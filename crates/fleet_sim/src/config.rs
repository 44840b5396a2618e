//! Simulation configuration.

use std::time::Duration;

/// Parameters of the stochastic walk applied on every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionParams {
    /// Maximum latitude/longitude displacement per tick, in degrees.
    pub step_lat_lon: f64,
    /// Maximum altitude displacement per tick, in meters.
    pub step_alt: f64,
    /// Fuel consumed per moving tick, in percent.
    pub fuel_drain: f32,
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            step_lat_lon: 0.0001,
            step_alt: 1.0,
            fuel_drain: 0.1,
        }
    }
}

/// Where new machines are placed.
///
/// Machine `n` starts at `base + spread * ((n % 5) - 2)` on both axes and
/// at `n % 50` meters altitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeedParams {
    /// Base latitude in degrees.
    pub base_lat: f64,
    /// Base longitude in degrees.
    pub base_lon: f64,
    /// Offset unit between neighbouring identifiers, in degrees.
    pub spread: f64,
}

impl SeedParams {
    /// The largest distance, per axis, between a seeded machine and the base
    /// coordinate.
    #[must_use]
    pub fn max_offset(&self) -> f64 {
        self.spread * 2.0
    }
}

impl Default for SeedParams {
    fn default() -> Self {
        // Sammamish Valley.
        Self {
            base_lat: 47.695185,
            base_lon: -122.145161,
            spread: 0.0001,
        }
    }
}

/// Configuration for the machine simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConfig {
    /// Interval between motion steps and between streamed snapshots.
    pub tick_interval: Duration,
    /// Walk parameters.
    pub motion: MotionParams,
    /// Initial placement.
    pub seed: SeedParams,
}

impl SimConfig {
    /// Override the tick interval.
    #[must_use]
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(1000),
            motion: MotionParams::default(),
            seed: SeedParams::default(),
        }
    }
}
