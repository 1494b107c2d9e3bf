//! Clock strategies for the event loop
//!
//! The scheduler advances simulated time to each popped event's timestamp.
//! How the wall clock relates to that advance is a pluggable strategy:
//!
//! - [`InstantClock`]: fast-forward. `suspend_until` never blocks; a whole
//!   run completes as fast as the CPU allows.
//! - [`WallClock`]: real-time synchronized. One simulated minute takes
//!   `60 / speed_factor` real seconds; `suspend_until` sleeps the gap.
//!
//! `suspend_until` is the single suspension point of the whole kernel
//! (there is no other blocking call in the event loop). Each invocation
//! sleeps at most one real second so the loop can observe a stop request
//! between sleeps.

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::core::time::SimTime;

/// Lower bound for the wall-clock speed factor.
pub const MIN_SPEED_FACTOR: f64 = 0.1;
/// Upper bound for the wall-clock speed factor.
pub const MAX_SPEED_FACTOR: f64 = 1000.0;

/// Maximum real seconds a single `suspend_until` call may block.
const MAX_SUSPEND_SECS: f64 = 1.0;

/// Errors raised while constructing a clock
#[derive(Debug, Error, PartialEq)]
pub enum ClockError {
    #[error("speed factor {value} outside [{MIN_SPEED_FACTOR}, {MAX_SPEED_FACTOR}]")]
    InvalidSpeedFactor { value: f64 },
}

/// Source of "current simulated time" plus the suspension primitive.
pub trait Clock: Send {
    /// Current simulated time in minutes.
    fn now(&self) -> SimTime;

    /// Inform the clock that the scheduler advanced simulated time to `t`.
    fn advance_to(&mut self, t: SimTime);

    /// Suspend the calling thread until simulated time `target` is reached.
    ///
    /// Blocks at most one real second per invocation; callers that need the
    /// full gap call this in a loop and re-check `now()`.
    fn suspend_until(&mut self, target: SimTime);

    /// Whether `suspend_until` actually blocks (real-time pacing).
    fn is_realtime(&self) -> bool;
}

/// Fast-forward clock: simulated time is whatever the scheduler last set.
#[derive(Debug, Clone, Default)]
pub struct InstantClock {
    current: SimTime,
}

impl InstantClock {
    pub fn new(start: SimTime) -> Self {
        Self { current: start }
    }
}

impl Clock for InstantClock {
    fn now(&self) -> SimTime {
        self.current
    }

    fn advance_to(&mut self, t: SimTime) {
        if t > self.current {
            self.current = t;
        }
    }

    fn suspend_until(&mut self, target: SimTime) {
        self.advance_to(target);
        // Yield once so cooperative callers (e.g. a watcher thread flipping
        // the stop flag) get a chance to run even in fast-forward mode.
        std::thread::yield_now();
    }

    fn is_realtime(&self) -> bool {
        false
    }
}

/// Wall-clock synchronized clock.
///
/// `now() = start_sim_time + real_elapsed_seconds * speed_factor / 60`.
///
/// # Example
/// ```
/// use social_simulator_core_rs::core::clock::WallClock;
///
/// // 60x: one simulated hour per real minute.
/// let clock = WallClock::new(0.0, 60.0).unwrap();
/// assert!(WallClock::new(0.0, 0.01).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct WallClock {
    start_sim_time: SimTime,
    speed_factor: f64,
    started: Instant,
}

impl WallClock {
    /// Create a wall-clock synchronized clock.
    ///
    /// Fails when `speed_factor` falls outside [0.1, 1000.0].
    pub fn new(start_sim_time: SimTime, speed_factor: f64) -> Result<Self, ClockError> {
        if !(MIN_SPEED_FACTOR..=MAX_SPEED_FACTOR).contains(&speed_factor) {
            return Err(ClockError::InvalidSpeedFactor {
                value: speed_factor,
            });
        }
        Ok(Self {
            start_sim_time,
            speed_factor,
            started: Instant::now(),
        })
    }

    pub fn speed_factor(&self) -> f64 {
        self.speed_factor
    }
}

impl Clock for WallClock {
    fn now(&self) -> SimTime {
        let elapsed = self.started.elapsed().as_secs_f64();
        self.start_sim_time + elapsed * self.speed_factor / 60.0
    }

    fn advance_to(&mut self, _t: SimTime) {
        // Real time governs; the scheduler's notion of current time is
        // tracked separately.
    }

    fn suspend_until(&mut self, target: SimTime) {
        let gap_minutes = target - self.now();
        if gap_minutes <= 0.0 {
            return;
        }
        let real_secs = gap_minutes * 60.0 / self.speed_factor;
        let capped = real_secs.min(MAX_SUSPEND_SECS);
        std::thread::sleep(Duration::from_secs_f64(capped));
    }

    fn is_realtime(&self) -> bool {
        true
    }
}
