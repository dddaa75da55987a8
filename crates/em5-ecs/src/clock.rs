//! Simulation clock.
//!
//! The [`Clock`] is the authoritative time source of a simulation: a 32-bit
//! signal counter that advances once per tick, the length of the last tick,
//! and the accumulated simulation time. It is advanced only by the tick
//! driver; everything else reads it.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tick-indexed simulation clock.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Clock {
    /// Index of the current tick.
    signal_counter: i32,
    /// Length of the last tick in seconds.
    seconds_passed: f32,
    /// Simulation time accumulated since the clock started.
    elapsed: Duration,
}

impl Clock {
    /// A clock at tick 0 with no time passed.
    pub fn new() -> Self {
        Self::default()
    }

    /// A clock positioned at `signal_counter`, e.g. a client joining a
    /// running session.
    pub fn starting_at(signal_counter: i32) -> Self {
        Self {
            signal_counter,
            ..Self::default()
        }
    }

    /// Advance by one tick of length `dt`.
    ///
    /// The counter wraps on overflow like the host's 32-bit counter does.
    pub fn advance(&mut self, dt: Duration) {
        self.signal_counter = self.signal_counter.wrapping_add(1);
        self.seconds_passed = dt.as_secs_f32();
        self.elapsed = self.elapsed.saturating_add(dt);
    }

    /// The authoritative tick index.
    pub fn signal_counter(&self) -> i32 {
        self.signal_counter
    }

    /// Length of the last tick in seconds.
    pub fn seconds_passed(&self) -> f32 {
        self.seconds_passed
    }

    /// Simulation time since start.
    pub fn now(&self) -> Duration {
        self.elapsed
    }
}
