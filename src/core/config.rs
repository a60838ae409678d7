//! # Global runtime configuration.
//!
//! Provides [`Config`], the centralized settings for the dispatch runtime.
//!
//! Config is used in two ways:
//! 1. **Runtime creation**: `RuntimeBuilder::new(config)`
//! 2. **Task defaults**: `Runtime::task(spec)` fills in `default_frequency`
//!    for specs that did not choose a frequency.
//!
//! ## Sentinel values
//! - `default_frequency = 0` → periodic execution disabled for defaulted tasks
//! - `sample_frequency = 0` → external sources are sampled once and cached
//! - `grace = 0s` → shutdown does not wait for tasks to stop

use std::time::Duration;

use crate::tasks::DEFAULT_FREQUENCY;

/// Global configuration for the dispatch runtime.
///
/// ## Field semantics
/// - `default_frequency`: `execute` rate in Hz for tasks built through the runtime
/// - `sample_frequency`: polling rate in Hz for external sources
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by the builder)
/// - `grace`: maximum wait for allocated tasks to stop on shutdown
/// - `debug`: allow starting tasks before activation and silence late-construction warnings
///
/// ## Notes
/// All fields are public. Prefer the helper accessors to sprinkling sentinel
/// checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Frequency applied to tasks that did not set one.
    pub default_frequency: u32,

    /// Frequency used by [`Runtime::sample`](crate::Runtime::sample).
    pub sample_frequency: u32,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Subscribers that lag behind more than `bus_capacity` messages skip
    /// older items.
    pub bus_capacity: usize,

    /// Maximum time to wait for the dispatcher to stop every task.
    ///
    /// If exceeded, shutdown returns `RuntimeError::GraceExceeded` with the
    /// names of the tasks still allocated.
    pub grace: Duration,

    /// Relaxes usage checks for tests and bench setups.
    pub debug: bool,
}

impl Config {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `default_frequency = 50` (20 ms control loop)
    /// - `sample_frequency = 50`
    /// - `bus_capacity = 1024`
    /// - `grace = 5s`
    /// - `debug = false`
    fn default() -> Self {
        Self {
            default_frequency: DEFAULT_FREQUENCY,
            sample_frequency: DEFAULT_FREQUENCY,
            bus_capacity: 1024,
            grace: Duration::from_secs(5),
            debug: false,
        }
    }
}
