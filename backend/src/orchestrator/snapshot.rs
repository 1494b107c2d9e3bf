//! Run snapshots - save/resume simulation state
//!
//! A [`RunSnapshot`] captures everything needed to resume a run: simulated
//! time, the RNG state, the population, and the active trends. The snapshot
//! carries a SHA-256 hash of the configuration it was taken under; resuming
//! with a different configuration is refused.
//!
//! # Critical Invariants
//!
//! - **Determinism**: restoring the RNG state replays the same trajectory
//! - **Attribute bounds**: every person attribute within [0, 5],
//!   time budget on the 0.5 grid
//! - **Trend ordering**: a trend's parent predates it

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::core::time::SimTime;
use crate::models::person::Person;
use crate::models::trend::Trend;
use crate::persistence::gateway::RunId;

/// Errors raised while capturing or restoring snapshots
#[derive(Debug, Error, PartialEq)]
pub enum SnapshotError {
    #[error("snapshot serialization failed: {0}")]
    Serialization(String),

    #[error("snapshot validation failed: {0}")]
    Validation(String),

    #[error("snapshot was taken under a different configuration")]
    ConfigMismatch,
}

/// Complete kernel state at one simulated instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub run_id: RunId,
    /// Seed the run started from.
    pub seed: u64,
    /// Simulated time the snapshot was taken at.
    pub sim_time: SimTime,
    /// The run's configured end time.
    pub end_time: SimTime,
    /// RNG state at snapshot time (CRITICAL for determinism).
    pub rng_state: u64,
    pub persons: Vec<Person>,
    pub trends: Vec<Trend>,
    /// SHA-256 of the canonical configuration JSON.
    pub config_hash: String,
}

/// Compute a deterministic SHA-256 hash of a configuration value.
///
/// Serializes through canonical JSON with recursively sorted object keys so
/// the hash does not depend on map iteration order.
pub fn compute_config_hash<T: Serialize>(config: &T) -> Result<String, SnapshotError> {
    use serde_json::Value;
    use std::collections::BTreeMap;

    let value = serde_json::to_value(config)
        .map_err(|e| SnapshotError::Serialization(e.to_string()))?;

    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let json = serde_json::to_string(&canonicalize(value))
        .map_err(|e| SnapshotError::Serialization(e.to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Validate snapshot integrity: attribute bounds, time-budget granularity,
/// trend-parent ordering, and timestamp sanity.
pub fn validate_snapshot(snapshot: &RunSnapshot) -> Result<(), SnapshotError> {
    if snapshot.sim_time < 0.0 || snapshot.sim_time > snapshot.end_time {
        return Err(SnapshotError::Validation(format!(
            "sim_time {} outside [0, {}]",
            snapshot.sim_time, snapshot.end_time
        )));
    }

    for person in &snapshot.persons {
        for (name, value) in [
            ("financial_capability", person.financial_capability()),
            ("trend_receptivity", person.trend_receptivity()),
            ("social_status", person.social_status()),
            ("energy_level", person.energy_level()),
            ("time_budget", person.time_budget()),
        ] {
            if !(0.0..=5.0).contains(&value) {
                return Err(SnapshotError::Validation(format!(
                    "person {} attribute {name} = {value} outside [0, 5]",
                    person.id()
                )));
            }
        }
        let doubled = person.time_budget() * 2.0;
        if (doubled - doubled.round()).abs() > 1e-9 {
            return Err(SnapshotError::Validation(format!(
                "person {} time_budget {} not a multiple of 0.5",
                person.id(),
                person.time_budget()
            )));
        }
    }

    let created_at: std::collections::HashMap<_, _> = snapshot
        .trends
        .iter()
        .map(|t| (t.id(), t.created_at()))
        .collect();
    for trend in &snapshot.trends {
        if !(0.0..=5.0).contains(&trend.base_virality_score()) {
            return Err(SnapshotError::Validation(format!(
                "trend {} base virality {} outside [0, 5]",
                trend.id(),
                trend.base_virality_score()
            )));
        }
        if let Some(parent_id) = trend.parent_id() {
            if let Some(parent_at) = created_at.get(&parent_id) {
                if *parent_at >= trend.created_at() {
                    return Err(SnapshotError::Validation(format!(
                        "trend {} does not postdate its parent {parent_id}",
                        trend.id()
                    )));
                }
            }
        }
    }

    Ok(())
}
