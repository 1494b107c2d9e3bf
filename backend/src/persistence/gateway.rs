//! Persistence gateway seam
//!
//! The kernel's single external interface. Everything durable goes through
//! [`PersistenceGateway`]: run records, the configuration tables consumed at
//! initialization, person records, and the five independent bulk writes of a
//! batch flush. Each flush operation is its own call the gateway may retry
//! individually; the kernel never retries inline.
//!
//! [`InMemoryGateway`] is the reference implementation used by tests. It can
//! inject scripted flush failures to exercise the batch-retention path.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::{builtin_attribute_ranges, AffinityTable, AttributeRanges};
use crate::core::time::SimTime;
use crate::models::person::{Person, Profession};
use crate::models::trend::{Trend, TrendId};
use crate::persistence::batch::{
    AttributeHistoryRecord, EventLogRecord, ParticipantTrackingRecord, TrendCreationRecord,
};

/// Unique run identifier.
pub type RunId = Uuid;

/// Lifecycle status of a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Stopping,
    Completed,
    Stopped,
    Failed,
}

/// Errors surfaced by gateway operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GatewayError {
    #[error("gateway unavailable: {0}")]
    Unavailable(String),

    #[error("gateway rejected write: {0}")]
    Rejected(String),

    #[error("unknown run: {0}")]
    UnknownRun(RunId),
}

/// The kernel's one seam to durable storage.
pub trait PersistenceGateway {
    /// Create a simulation run record; returns the run identifier.
    fn create_run(&mut self, population: usize, duration_min: f64) -> Result<RunId, GatewayError>;

    /// Load the profession→topic affinity table. Consumed once at init.
    fn load_affinity_table(&mut self) -> Result<AffinityTable, GatewayError>;

    /// Load the profession→attribute-range table. Consumed once at init.
    fn load_attribute_ranges(
        &mut self,
    ) -> Result<HashMap<Profession, AttributeRanges>, GatewayError>;

    /// Bulk-create person records. Persons are allocated by the external
    /// bootstrap and may be reused across runs.
    fn create_persons(&mut self, persons: &[Person]) -> Result<(), GatewayError>;

    /// Fetch all person records.
    fn fetch_persons(&mut self) -> Result<Vec<Person>, GatewayError>;

    /// Fetch the currently active trends of a run.
    fn fetch_active_trends(&mut self, run_id: RunId) -> Result<Vec<Trend>, GatewayError>;

    /// Bulk-insert trend creations.
    fn insert_trend_creations(
        &mut self,
        run_id: RunId,
        records: &[TrendCreationRecord],
    ) -> Result<(), GatewayError>;

    /// Bulk-insert attribute-history rows.
    fn insert_attribute_history(
        &mut self,
        run_id: RunId,
        records: &[AttributeHistoryRecord],
    ) -> Result<(), GatewayError>;

    /// Bulk-update tracking-only participant fields.
    fn update_participant_tracking(
        &mut self,
        run_id: RunId,
        records: &[ParticipantTrackingRecord],
    ) -> Result<(), GatewayError>;

    /// Bulk-insert event rows.
    fn insert_events(
        &mut self,
        run_id: RunId,
        records: &[EventLogRecord],
    ) -> Result<(), GatewayError>;

    /// Bulk-increment trend interaction counters.
    fn increment_trend_interactions(
        &mut self,
        run_id: RunId,
        increments: &[(TrendId, u64)],
    ) -> Result<(), GatewayError>;

    /// Update the run status, optionally with an end timestamp.
    fn update_run_status(
        &mut self,
        run_id: RunId,
        status: RunStatus,
        ended_at: Option<SimTime>,
    ) -> Result<(), GatewayError>;
}

// ============================================================================
// In-memory reference gateway
// ============================================================================

/// Stored state of one run inside [`InMemoryGateway`].
#[derive(Debug, Clone, Default)]
pub struct StoredRun {
    pub population: usize,
    pub duration_min: f64,
    pub trend_creations: Vec<TrendCreationRecord>,
    pub attribute_history: Vec<AttributeHistoryRecord>,
    pub tracking_updates: Vec<ParticipantTrackingRecord>,
    pub event_records: Vec<EventLogRecord>,
    pub interaction_totals: HashMap<TrendId, u64>,
    pub status_log: Vec<(RunStatus, Option<SimTime>)>,
}

/// Gateway backed by process memory.
///
/// `fail_next_writes(n)` makes the next `n` flush-write calls fail, to
/// exercise the batch-retention and final-flush failure paths in tests.
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    runs: HashMap<RunId, StoredRun>,
    affinity: Option<AffinityTable>,
    ranges: Option<HashMap<Profession, AttributeRanges>>,
    persons: Vec<Person>,
    fail_remaining: u32,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateway pre-loaded with bootstrapped person records.
    pub fn with_persons(persons: Vec<Person>) -> Self {
        Self {
            persons,
            ..Self::default()
        }
    }

    /// Override the affinity table (defaults to the built-in one).
    pub fn set_affinity_table(&mut self, table: AffinityTable) {
        self.affinity = Some(table);
    }

    /// Override the attribute-range table (defaults to the built-in one).
    pub fn set_attribute_ranges(&mut self, ranges: HashMap<Profession, AttributeRanges>) {
        self.ranges = Some(ranges);
    }

    /// Make the next `n` flush-write calls fail.
    pub fn fail_next_writes(&mut self, n: u32) {
        self.fail_remaining = n;
    }

    /// Register an already-created run id, for resuming a snapshot against
    /// a gateway instance that did not create the original run.
    pub fn adopt_run(&mut self, run_id: RunId, population: usize, duration_min: f64) {
        self.runs.entry(run_id).or_insert(StoredRun {
            population,
            duration_min,
            ..StoredRun::default()
        });
    }

    pub fn run(&self, run_id: RunId) -> Option<&StoredRun> {
        self.runs.get(&run_id)
    }

    fn run_mut(&mut self, run_id: RunId) -> Result<&mut StoredRun, GatewayError> {
        self.runs
            .get_mut(&run_id)
            .ok_or(GatewayError::UnknownRun(run_id))
    }

    fn check_injected_failure(&mut self) -> Result<(), GatewayError> {
        if self.fail_remaining > 0 {
            self.fail_remaining -= 1;
            return Err(GatewayError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }
}

impl PersistenceGateway for InMemoryGateway {
    fn create_run(&mut self, population: usize, duration_min: f64) -> Result<RunId, GatewayError> {
        let run_id = Uuid::new_v4();
        self.runs.insert(
            run_id,
            StoredRun {
                population,
                duration_min,
                ..StoredRun::default()
            },
        );
        Ok(run_id)
    }

    fn load_affinity_table(&mut self) -> Result<AffinityTable, GatewayError> {
        Ok(self.affinity.clone().unwrap_or_else(AffinityTable::builtin))
    }

    fn load_attribute_ranges(
        &mut self,
    ) -> Result<HashMap<Profession, AttributeRanges>, GatewayError> {
        Ok(self.ranges.clone().unwrap_or_else(builtin_attribute_ranges))
    }

    fn create_persons(&mut self, persons: &[Person]) -> Result<(), GatewayError> {
        self.persons.extend_from_slice(persons);
        Ok(())
    }

    fn fetch_persons(&mut self) -> Result<Vec<Person>, GatewayError> {
        Ok(self.persons.clone())
    }

    fn fetch_active_trends(&mut self, _run_id: RunId) -> Result<Vec<Trend>, GatewayError> {
        // Fresh runs start with no active trends.
        Ok(Vec::new())
    }

    fn insert_trend_creations(
        &mut self,
        run_id: RunId,
        records: &[TrendCreationRecord],
    ) -> Result<(), GatewayError> {
        self.check_injected_failure()?;
        let run = self.run_mut(run_id)?;
        run.trend_creations.extend_from_slice(records);
        Ok(())
    }

    fn insert_attribute_history(
        &mut self,
        run_id: RunId,
        records: &[AttributeHistoryRecord],
    ) -> Result<(), GatewayError> {
        self.check_injected_failure()?;
        let run = self.run_mut(run_id)?;
        run.attribute_history.extend_from_slice(records);
        Ok(())
    }

    fn update_participant_tracking(
        &mut self,
        run_id: RunId,
        records: &[ParticipantTrackingRecord],
    ) -> Result<(), GatewayError> {
        self.check_injected_failure()?;
        let run = self.run_mut(run_id)?;
        run.tracking_updates.extend_from_slice(records);
        Ok(())
    }

    fn insert_events(
        &mut self,
        run_id: RunId,
        records: &[EventLogRecord],
    ) -> Result<(), GatewayError> {
        self.check_injected_failure()?;
        let run = self.run_mut(run_id)?;
        run.event_records.extend_from_slice(records);
        Ok(())
    }

    fn increment_trend_interactions(
        &mut self,
        run_id: RunId,
        increments: &[(TrendId, u64)],
    ) -> Result<(), GatewayError> {
        self.check_injected_failure()?;
        let run = self.run_mut(run_id)?;
        for (trend_id, count) in increments {
            *run.interaction_totals.entry(*trend_id).or_insert(0) += count;
        }
        Ok(())
    }

    fn update_run_status(
        &mut self,
        run_id: RunId,
        status: RunStatus,
        ended_at: Option<SimTime>,
    ) -> Result<(), GatewayError> {
        let run = self.run_mut(run_id)?;
        run.status_log.push((status, ended_at));
        Ok(())
    }
}
