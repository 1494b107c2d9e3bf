//! Tests for the batch persistence coordinator

use std::collections::HashMap;

use social_simulator_core_rs::{
    AttributeChange, InMemoryGateway, PendingBatch, Person, PersistenceGateway, Profession,
    SimEvent, Sex, Topic, Trend,
};
use social_simulator_core_rs::{CoverageLevel, Sentiment};

fn make_person(id: u64) -> Person {
    Person::new(
        id,
        Profession::Engineer,
        33,
        Sex::Male,
        3.0,
        3.0,
        3.0,
        3.0,
        3.0,
        HashMap::new(),
    )
}

fn make_trend() -> Trend {
    Trend::new(
        Topic::Science,
        1,
        None,
        2.0,
        CoverageLevel::Middle,
        Sentiment::Positive,
        5.0,
    )
    .unwrap()
}

fn change(attribute: &str, old: f64, new: f64) -> AttributeChange {
    AttributeChange {
        attribute: attribute.to_string(),
        old,
        new,
    }
}

#[test]
fn test_size_trigger_at_exact_batch_size() {
    let mut batch = PendingBatch::new(5, 10_000.0);
    for i in 0..4 {
        batch.record_event(
            uuid::Uuid::new_v4(),
            &SimEvent::SelfDevelopment { person_id: i },
            1.0,
        );
    }
    assert!(!batch.should_flush(2.0));

    batch.record_event(
        uuid::Uuid::new_v4(),
        &SimEvent::SelfDevelopment { person_id: 99 },
        1.0,
    );
    assert!(batch.should_flush(2.0));
}

#[test]
fn test_interval_trigger_with_small_batch() {
    let mut batch = PendingBatch::new(1_000, 10.0);
    batch.record_interaction(uuid::Uuid::new_v4());

    assert!(!batch.should_flush(5.0));
    assert!(batch.should_flush(10.0));
    assert!(batch.should_flush(123.0));
}

#[test]
fn test_flush_write_order_and_clearing() {
    let mut gateway = InMemoryGateway::new();
    let run_id = gateway.create_run(2, 1_440.0).unwrap();

    let mut batch = PendingBatch::new(1_000, 10.0);
    let trend = make_trend();
    let person = make_person(1);

    batch.record_trend_creation(&trend);
    batch.record_attribute_changes(
        1,
        &[change("social_status", 3.0, 3.4), change("energy_level", 3.0, 3.01)],
        "purchase_l2",
        6.0,
    );
    batch.record_tracking(&person);
    batch.record_event(uuid::Uuid::new_v4(), &SimEvent::DailyReset, 6.0);
    batch.record_interaction(trend.id());
    batch.record_interaction(trend.id());

    let report = batch.flush(&mut gateway, run_id, 6.0).unwrap();
    assert_eq!(report.trend_creations, 1);
    // The 0.01 energy delta is below the recording threshold.
    assert_eq!(report.attribute_changes, 1);
    assert_eq!(report.tracking_updates, 1);
    assert_eq!(report.event_records, 1);
    assert_eq!(report.interaction_increments, 1);

    assert!(batch.is_empty());

    let stored = gateway.run(run_id).unwrap();
    assert_eq!(stored.trend_creations.len(), 1);
    assert_eq!(stored.attribute_history.len(), 1);
    assert_eq!(stored.attribute_history[0].reason, "purchase_l2");
    assert_eq!(stored.tracking_updates.len(), 1);
    assert_eq!(stored.event_records.len(), 1);
    assert_eq!(stored.interaction_totals[&trend.id()], 2);
}

#[test]
fn test_failed_flush_retains_batch() {
    let mut gateway = InMemoryGateway::new();
    let run_id = gateway.create_run(1, 1_440.0).unwrap();

    let mut batch = PendingBatch::new(1_000, 10.0);
    batch.record_trend_creation(&make_trend());
    batch.record_event(uuid::Uuid::new_v4(), &SimEvent::NightCycle, 1.0);
    let size_before = batch.size();

    gateway.fail_next_writes(1);
    assert!(batch.flush(&mut gateway, run_id, 12.0).is_err());

    // Nothing cleared, nothing half-written beyond the failed call's point.
    assert_eq!(batch.size(), size_before);

    // A later attempt succeeds and drains the batch.
    let report = batch.flush(&mut gateway, run_id, 25.0).unwrap();
    assert_eq!(report.trend_creations, 1);
    assert_eq!(report.event_records, 1);
    assert!(batch.is_empty());
}

#[test]
fn test_failed_flush_not_retried_within_same_instant() {
    let mut gateway = InMemoryGateway::new();
    let run_id = gateway.create_run(1, 1_440.0).unwrap();

    let mut batch = PendingBatch::new(2, 10.0);
    batch.record_event(uuid::Uuid::new_v4(), &SimEvent::NightCycle, 1.0);
    batch.record_event(uuid::Uuid::new_v4(), &SimEvent::NightCycle, 1.0);

    gateway.fail_next_writes(5);
    assert!(batch.flush(&mut gateway, run_id, 12.0).is_err());

    // Size trigger stays suppressed at the failed attempt's timestamp and
    // re-arms once simulated time moves on.
    assert!(!batch.should_flush(12.0));
    assert!(batch.should_flush(12.5));
}

#[test]
fn test_tracking_updates_coalesce_per_person() {
    let mut gateway = InMemoryGateway::new();
    let run_id = gateway.create_run(1, 1_440.0).unwrap();

    let mut person = make_person(7);
    let mut batch = PendingBatch::new(1_000, 10.0);

    person.note_post(10.0);
    batch.record_tracking(&person);
    person.note_post(20.0);
    batch.record_tracking(&person);

    batch.flush(&mut gateway, run_id, 30.0).unwrap();
    let stored = gateway.run(run_id).unwrap();
    assert_eq!(stored.tracking_updates.len(), 1);
    assert_eq!(stored.tracking_updates[0].last_post_ts, Some(20.0));
}
