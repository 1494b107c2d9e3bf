//! Tests for the trend virality model

use social_simulator_core_rs::{CoverageLevel, Sentiment, Topic, Trend};

fn trend(base: f64, coverage: CoverageLevel) -> Trend {
    Trend::new(Topic::Economy, 1, None, base, coverage, Sentiment::Positive, 0.0).unwrap()
}

#[test]
fn test_virality_monotone_in_interactions() {
    let mut t = trend(2.0, CoverageLevel::Middle);
    let mut previous = t.current_virality();

    for _ in 0..500 {
        t.register_interaction();
        let current = t.current_virality();
        assert!(current >= previous, "virality decreased: {previous} -> {current}");
        assert!(current <= 5.0);
        previous = current;
    }
}

#[test]
fn test_virality_reference_values() {
    // base=3.0, interactions=0 → 3.0
    let t = trend(3.0, CoverageLevel::Middle);
    assert!((t.current_virality() - 3.0).abs() < 1e-9);

    // base=3.0, interactions=200 → min(5, 3 + 0.05*ln(201)) ≈ 3.265
    let mut t = trend(3.0, CoverageLevel::Middle);
    for _ in 0..200 {
        t.register_interaction();
    }
    assert!((t.current_virality() - 3.265).abs() < 0.001);
}

#[test]
fn test_coverage_mapping_end_to_end() {
    // social_status=4.5 at creation → High → factor 1.0
    let level = CoverageLevel::from_social_status(4.5);
    assert_eq!(level, CoverageLevel::High);
    assert_eq!(level.factor(), 1.0);

    // social_status=1.0 → Low → factor 0.3
    let level = CoverageLevel::from_social_status(1.0);
    assert_eq!(level, CoverageLevel::Low);
    assert_eq!(level.factor(), 0.3);
}

#[test]
fn test_sentiment_binary_invariant() {
    assert!(Sentiment::parse("Positive").is_ok());
    assert!(Sentiment::parse("Negative").is_ok());
    for bad in ["positive", "NEUTRAL", "Mixed", ""] {
        assert!(Sentiment::parse(bad).is_err(), "accepted {bad:?}");
    }

    // Serde deserialization enforces the same closed set.
    assert!(serde_json::from_str::<Sentiment>("\"Positive\"").is_ok());
    assert!(serde_json::from_str::<Sentiment>("\"Neutral\"").is_err());
}

#[test]
fn test_interaction_counter_monotone() {
    let mut t = trend(1.0, CoverageLevel::Low);
    assert_eq!(t.total_interactions(), 0);
    t.register_interaction();
    t.register_interaction();
    assert_eq!(t.total_interactions(), 2);
}

#[test]
fn test_sign_drives_author_effect_direction() {
    assert_eq!(Sentiment::Positive.sign(), 1.0);
    assert_eq!(Sentiment::Negative.sign(), -1.0);
}
