//! Tests for the clock strategies

use std::time::Instant;

use social_simulator_core_rs::{Clock, ClockError, InstantClock, WallClock};

#[test]
fn test_instant_clock_starts_at_origin() {
    let clock = InstantClock::new(0.0);
    assert_eq!(clock.now(), 0.0);
    assert!(!clock.is_realtime());
}

#[test]
fn test_instant_clock_fast_forwards() {
    let mut clock = InstantClock::new(0.0);
    let t0 = Instant::now();

    // A full simulated week must cost essentially no wall time.
    for minute in 1..=7 * 1440 {
        clock.suspend_until(minute as f64);
    }
    assert_eq!(clock.now(), 7.0 * 1440.0);
    assert!(t0.elapsed().as_secs_f64() < 1.0);
}

#[test]
fn test_wall_clock_speed_factor_bounds() {
    assert!(matches!(
        WallClock::new(0.0, 0.099),
        Err(ClockError::InvalidSpeedFactor { .. })
    ));
    assert!(matches!(
        WallClock::new(0.0, 1000.001),
        Err(ClockError::InvalidSpeedFactor { .. })
    ));
    assert!(WallClock::new(0.0, 0.1).is_ok());
    assert!(WallClock::new(0.0, 60.0).is_ok());
    assert!(WallClock::new(0.0, 1000.0).is_ok());
}

#[test]
fn test_wall_clock_now_advances_with_real_time() {
    let clock = WallClock::new(100.0, 600.0).unwrap();
    let first = clock.now();
    std::thread::sleep(std::time::Duration::from_millis(50));
    let second = clock.now();

    // 50ms at 600x is 0.5 simulated minutes.
    assert!(second > first);
    assert!(second - first > 0.2 && second - first < 2.0);
    assert!(first >= 100.0);
}

#[test]
fn test_wall_clock_suspend_cap_keeps_loop_responsive() {
    // 0.1x: one simulated minute takes 600 real seconds, so a suspension
    // toward a far target must still return within ~1s.
    let mut clock = WallClock::new(0.0, 0.1).unwrap();
    let t0 = Instant::now();
    clock.suspend_until(500.0);
    assert!(t0.elapsed().as_secs_f64() < 1.5);
}

#[test]
fn test_wall_clock_suspend_past_target_returns_immediately() {
    let mut clock = WallClock::new(50.0, 1000.0).unwrap();
    let t0 = Instant::now();
    clock.suspend_until(10.0); // already past
    assert!(t0.elapsed().as_millis() < 50);
}
