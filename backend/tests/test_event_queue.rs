//! Tests for the event queue ordering contract and end-time guard

use social_simulator_core_rs::{EventQueue, SimEvent, Topic};

fn action(person_id: u64) -> SimEvent {
    SimEvent::SelfDevelopment { person_id }
}

#[test]
fn test_pure_time_order_within_one_priority_class() {
    let mut queue = EventQueue::new(1_000.0);
    for (i, at) in [40.0, 10.0, 25.0, 99.0, 0.5].into_iter().enumerate() {
        queue.add(at, action(i as u64));
    }

    let mut last = f64::MIN;
    while let Some(entry) = queue.pop() {
        assert!(entry.timestamp >= last);
        last = entry.timestamp;
    }
}

#[test]
fn test_priority_outranks_timestamp_across_classes() {
    let mut queue = EventQueue::new(1_000.0);
    queue.add(5.0, SimEvent::TrendInfluence {
        trend_id: uuid::Uuid::new_v4(),
    }); // Background at t=5
    queue.add(500.0, SimEvent::NightCycle); // System at t=500

    // The System event pops first despite its far later timestamp.
    assert_eq!(queue.pop().unwrap().event, SimEvent::NightCycle);
}

/// The documented ordering contract (priority ascending, timestamp as
/// tie-break) means simulated time can move backward when priority classes
/// interleave: a System event at t=500 pops before a Background event at
/// t=5, and a scheduler that takes current time from popped timestamps
/// jumps from 500 back to 5. This test pins the behavior down so a future
/// switch to pure time ordering is a deliberate decision, not an accident.
#[test]
fn test_time_monotonicity_gap_across_priority_classes() {
    let mut queue = EventQueue::new(1_000.0);
    queue.add(5.0, SimEvent::Law {
        label: "tax-reform".to_string(),
    }); // Background
    queue.add(500.0, SimEvent::DailyReset); // System
    queue.add(300.0, SimEvent::PublishPost {
        person_id: 1,
        topic: Topic::Culture,
        trigger_trend_id: None,
    }); // Action

    let order: Vec<f64> = std::iter::from_fn(|| queue.pop().map(|e| e.timestamp)).collect();
    assert_eq!(order, vec![500.0, 300.0, 5.0]);
    assert!(
        order.windows(2).any(|w| w[1] < w[0]),
        "expected the non-monotonic pop order the contract implies"
    );
}

#[test]
fn test_end_time_guard_is_a_noop() {
    let mut queue = EventQueue::new(720.0);

    assert!(queue.add(719.99, action(1)));
    assert!(!queue.add(720.0, action(2)));
    assert!(!queue.add(5_000.0, action(3)));

    // The queue never contains an entry at or past end time.
    while let Some(entry) = queue.pop() {
        assert!(entry.timestamp < 720.0);
    }
    assert_eq!(queue.rejected_past_end(), 2);
}

#[test]
fn test_fifo_among_identical_entries() {
    let mut queue = EventQueue::new(1_000.0);
    for person_id in 0..20 {
        queue.add(77.0, action(person_id));
    }
    for expected in 0..20 {
        let entry = queue.pop().unwrap();
        assert_eq!(entry.event, action(expected));
    }
}
