//! Fixed-timestep simulation driver.
//!
//! The [`Simulation`] owns the world, the clock and the built-in jobs. Each
//! tick:
//!
//! 1. The [`Clock`] advances by `fixed_dt`.
//! 2. Registered systems run in registration order.
//! 3. The stuck resolving system inspects every unit with a
//!    [`StuckResolverComponent`](em5_ai::component::StuckResolverComponent).
//! 4. The activity system runs one step of every playing
//!    [`ActivityPlayer`](em5_activity::player::ActivityPlayer).
//!
//! Replication is driven from outside, after [`Simulation::tick`] returns,
//! by the [`multiplayer`](crate::multiplayer) sessions.
//!
//! # Example
//!
//! ```
//! use em5_engine::prelude::*;
//!
//! let mut sim = Simulation::new(World::new(), StaticNavigation::new(), &EngineConfig::default());
//! sim.add_system("census", |_world, _clock| {});
//! sim.run_ticks(10);
//! assert_eq!(sim.tick_count(), 10);
//! assert_eq!(sim.clock().signal_counter(), 10);
//! ```

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use em5_activity::library::ActivityLibrary;
use em5_activity::system::{ActivityReport, ActivitySystem};
use em5_ai::navigation::Navigation;
use em5_ai::system::{StuckResolvingReport, StuckResolvingSystem};
use em5_ecs::prelude::*;

use crate::config::EngineConfig;

/// Name under which the stuck resolving job shows up in diagnostics.
pub const STUCK_RESOLVING_JOB: &str = "stuck_resolving";

/// Name under which the activity job shows up in diagnostics.
pub const ACTIVITY_JOB: &str = "activity";

// ---------------------------------------------------------------------------
// TickConfig
// ---------------------------------------------------------------------------

/// Configuration for the fixed-timestep driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Fixed time step in seconds per tick. Must be positive and finite.
    pub fixed_dt: f64,
}

impl Default for TickConfig {
    /// 10 Hz, the rate the host replicates at.
    fn default() -> Self {
        Self { fixed_dt: 0.1 }
    }
}

impl TickConfig {
    /// The step as a [`Duration`], saturating where `fixed_dt` does not fit.
    pub fn dt(&self) -> Duration {
        Duration::try_from_secs_f64(self.fixed_dt.max(0.0)).unwrap_or(Duration::MAX)
    }

    /// Positive, finite and representable as a [`Duration`].
    pub fn is_valid(&self) -> bool {
        self.fixed_dt > 0.0 && Duration::try_from_secs_f64(self.fixed_dt).is_ok()
    }
}

// ---------------------------------------------------------------------------
// TickDiagnostics / TickReport
// ---------------------------------------------------------------------------

/// Timing diagnostics for the last tick.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    /// Wall-clock time per job, in order of execution.
    pub system_times: Vec<(String, Duration)>,
    /// Total time for the tick.
    pub total_time: Duration,
}

impl TickDiagnostics {
    /// Time spent in the job called `name`, if it ran.
    pub fn time_of(&self, name: &str) -> Option<Duration> {
        self.system_times
            .iter()
            .find(|(job, _)| job == name)
            .map(|(_, time)| *time)
    }
}

/// What the built-in jobs did during one tick.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Signal counter the tick ran at.
    pub tick: i32,
    pub stuck: StuckResolvingReport,
    pub activity: ActivityReport,
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// A user system run each tick before the built-in jobs.
pub type SystemFn = fn(&mut World, &Clock);

#[derive(Debug)]
struct RegisteredSystem {
    name: String,
    func: SystemFn,
}

/// The per-tick job runner.
pub struct Simulation<N: Navigation> {
    world: World,
    clock: Clock,
    navigation: N,
    library: ActivityLibrary,
    stuck_resolving: StuckResolvingSystem,
    activity: ActivitySystem,
    systems: Vec<RegisteredSystem>,
    config: TickConfig,
    tick_counter: u64,
    last_diagnostics: TickDiagnostics,
}

impl<N: Navigation> Simulation<N> {
    /// Create a simulation at tick 0.
    ///
    /// # Panics
    ///
    /// Panics if `config.tick.fixed_dt` is not positive and finite. Configs
    /// loaded through [`EngineConfig::from_json_str`] are already validated.
    pub fn new(world: World, navigation: N, config: &EngineConfig) -> Self {
        Self::with_clock(world, navigation, config, Clock::new())
    }

    /// Create a simulation whose clock starts at `clock`, e.g. a client
    /// joining a running session.
    pub fn with_clock(world: World, navigation: N, config: &EngineConfig, clock: Clock) -> Self {
        assert!(
            config.tick.is_valid(),
            "fixed_dt must be a positive duration, got {}",
            config.tick.fixed_dt
        );
        Self {
            world,
            clock,
            navigation,
            library: ActivityLibrary::new(),
            stuck_resolving: StuckResolvingSystem::new(config.stuck.clone()),
            activity: ActivitySystem::new(),
            systems: Vec::new(),
            config: config.tick.clone(),
            tick_counter: 0,
            last_diagnostics: TickDiagnostics::default(),
        }
    }

    /// Register a system to run each tick, after the systems registered
    /// before it and before the built-in jobs.
    ///
    /// # Panics
    ///
    /// Panics if the name is already taken, including by a built-in job.
    pub fn add_system(&mut self, name: &str, func: SystemFn) {
        assert!(
            name != STUCK_RESOLVING_JOB
                && name != ACTIVITY_JOB
                && !self.systems.iter().any(|s| s.name == name),
            "duplicate system name: {name:?}"
        );
        self.systems.push(RegisteredSystem {
            name: name.to_owned(),
            func,
        });
    }

    /// Execute one tick.
    pub fn tick(&mut self) -> TickReport {
        let tick_start = Instant::now();
        let mut system_times = Vec::with_capacity(self.systems.len() + 2);

        self.clock.advance(self.config.dt());
        let tick = self.clock.signal_counter();

        for system in &self.systems {
            let start = Instant::now();
            (system.func)(&mut self.world, &self.clock);
            system_times.push((system.name.clone(), start.elapsed()));
        }

        let start = Instant::now();
        let stuck = self
            .stuck_resolving
            .update(&mut self.world, &mut self.navigation, &self.clock);
        system_times.push((STUCK_RESOLVING_JOB.to_owned(), start.elapsed()));

        let start = Instant::now();
        let activity = self
            .activity
            .update(&mut self.world, &self.library, &self.clock);
        system_times.push((ACTIVITY_JOB.to_owned(), start.elapsed()));

        self.tick_counter += 1;
        self.last_diagnostics = TickDiagnostics {
            system_times,
            total_time: tick_start.elapsed(),
        };

        if stuck.faults > 0 || activity.faults > 0 {
            tracing::debug!(
                tick,
                stuck_faults = stuck.faults,
                activity_faults = activity.faults,
                "entities faulted this tick"
            );
        }
        tracing::trace!(tick, total = ?self.last_diagnostics.total_time, "tick finished");

        TickReport {
            tick,
            stuck,
            activity,
        }
    }

    /// Run `count` ticks and return the report of the last one.
    pub fn run_ticks(&mut self, count: u64) -> Option<TickReport> {
        let mut last = None;
        for _ in 0..count {
            last = Some(self.tick());
        }
        last
    }

    // -- accessors ----------------------------------------------------------

    /// Number of ticks executed by this simulation.
    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access to the world, for setup and for replication between
    /// ticks.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn navigation(&self) -> &N {
        &self.navigation
    }

    pub fn navigation_mut(&mut self) -> &mut N {
        &mut self.navigation
    }

    pub fn library(&self) -> &ActivityLibrary {
        &self.library
    }

    /// Loading or reloading activities is only allowed between ticks, which
    /// the borrow enforces.
    pub fn library_mut(&mut self) -> &mut ActivityLibrary {
        &mut self.library
    }

    /// Cycle participants remembered by the stuck resolving job.
    pub fn stuck_resolving(&self) -> &StuckResolvingSystem {
        &self.stuck_resolving
    }

    pub fn config(&self) -> &TickConfig {
        &self.config
    }

    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
