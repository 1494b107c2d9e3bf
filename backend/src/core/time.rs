//! Simulated time for the simulation
//!
//! Simulated time is a float counted in minutes from run start, independent
//! of wall-clock time. Multiple minutes form a day. This module provides
//! the day arithmetic the recurring system events and the daily action cap
//! are built on.

/// Simulated time in minutes from run start.
pub type SimTime = f64;

/// Number of simulated minutes in one simulated day.
pub const MINUTES_PER_DAY: f64 = 1440.0;

/// Get the simulated day (0-indexed) a timestamp falls in.
///
/// # Example
/// ```
/// use social_simulator_core_rs::core::time::day_of;
///
/// assert_eq!(day_of(0.0), 0);
/// assert_eq!(day_of(1439.9), 0);
/// assert_eq!(day_of(1440.0), 1);
/// ```
pub fn day_of(t: SimTime) -> u64 {
    if t <= 0.0 {
        return 0;
    }
    (t / MINUTES_PER_DAY) as u64
}

/// Get the minute within the day (in [0, 1440)).
pub fn minute_of_day(t: SimTime) -> f64 {
    let m = t % MINUTES_PER_DAY;
    if m < 0.0 {
        0.0
    } else {
        m
    }
}

/// Get the start timestamp of the day following `t`.
pub fn next_day_start(t: SimTime) -> SimTime {
    (day_of(t) + 1) as f64 * MINUTES_PER_DAY
}
