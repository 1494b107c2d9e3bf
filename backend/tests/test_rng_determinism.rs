//! Determinism tests for the RNG manager

use social_simulator_core_rs::RngManager;

#[test]
fn test_same_seed_same_sequence() {
    let mut a = RngManager::new(987654321);
    let mut b = RngManager::new(987654321);

    for _ in 0..1000 {
        assert_eq!(a.next(), b.next());
    }
}

#[test]
fn test_different_seeds_diverge() {
    let mut a = RngManager::new(1);
    let mut b = RngManager::new(2);

    let seq_a: Vec<u64> = (0..10).map(|_| a.next()).collect();
    let seq_b: Vec<u64> = (0..10).map(|_| b.next()).collect();
    assert_ne!(seq_a, seq_b);
}

#[test]
fn test_helpers_are_deterministic() {
    let mut a = RngManager::new(555);
    let mut b = RngManager::new(555);

    for _ in 0..100 {
        assert_eq!(a.range_f64(0.0, 10.0), b.range_f64(0.0, 10.0));
        assert_eq!(a.chance(0.3), b.chance(0.3));
        assert_eq!(
            a.pick_weighted(&[1.0, 2.0, 3.0]),
            b.pick_weighted(&[1.0, 2.0, 3.0])
        );
        assert_eq!(a.sample_indices(20, 5), b.sample_indices(20, 5));
    }
}

#[test]
fn test_state_restores_sequence() {
    let mut rng = RngManager::new(42);
    for _ in 0..17 {
        rng.next();
    }
    let state = rng.state();

    let continuation: Vec<u64> = (0..10).map(|_| rng.next()).collect();
    let mut restored = RngManager::new(state);
    let replayed: Vec<u64> = (0..10).map(|_| restored.next()).collect();

    assert_eq!(continuation, replayed);
}
