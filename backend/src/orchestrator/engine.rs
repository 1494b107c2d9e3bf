//! Simulation engine - main event loop
//!
//! The engine owns the whole kernel: the event queue, the clock strategy,
//! the population and trend state, the pending mutation batch, and the
//! gateway handle. One logical thread drives everything; the only
//! suspension point is `Clock::suspend_until`, used solely for wall-clock
//! pacing.
//!
//! # Loop shape
//!
//! ```text
//! while running, before end time, queue non-empty:
//! 1. Honor a pending stop request (graceful: flush then clear;
//!    force: clear immediately)
//! 2. Pop the next entry; push back and stop if it lies past end time
//! 3. Pace through the clock when real-time sync is on
//! 4. Advance simulated time to the entry's timestamp
//! 5. Dispatch the handler; enqueue its follow-ups
//! 6. Flush the pending batch when a trigger fires
//! 7. Periodically reconsider every person's next action
//! ```
//!
//! # Determinism
//!
//! All randomness flows through the seeded [`RngManager`]; the same seed and
//! configuration replay the same trajectory (wall-clock pacing aside).

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::config::{validate_attribute_ranges, AffinityTable, ConfigError, SimulationConfig};
use crate::core::clock::{Clock, ClockError};
use crate::core::time::{day_of, SimTime, MINUTES_PER_DAY};
use crate::events::handler::{Disposition, HandlerContext};
use crate::models::event::SimEvent;
use crate::models::person::{ActionKind, PurchaseTier};
use crate::models::state::SimulationState;
use crate::models::trend::{top_interest, Topic};
use crate::orchestrator::queue::{EventQueue, QueuedEvent};
use crate::orchestrator::snapshot::{
    compute_config_hash, validate_snapshot, RunSnapshot, SnapshotError,
};
use crate::persistence::batch::PendingBatch;
use crate::persistence::gateway::{GatewayError, PersistenceGateway, RunId, RunStatus};
use crate::rng::RngManager;

// Daily system events fire at fixed minutes of the simulated day.
const MORNING_RECOVERY_OFFSET: f64 = 480.0; // 08:00
const NIGHT_CYCLE_OFFSET: f64 = 1380.0; // 23:00
const SAVE_DAILY_TREND_OFFSET: f64 = 1435.0; // 23:55
const DAILY_RESET_OFFSET: f64 = 0.0; // midnight

/// Final-flush attempts before declaring the run failed. Backoff between
/// retries is the gateway's concern.
const FINAL_FLUSH_ATTEMPTS: u32 = 3;

// Seed-pass classification thresholds.
const SEED_POST_SOCIAL_STATUS: f64 = 3.5;
const SEED_PURCHASE_FINANCIAL: f64 = 2.5;
const SEED_SELFDEV_TIME_BUDGET: f64 = 3.0;

/// Top-level simulation error
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("clock error: {0}")]
    Clock(#[from] ClockError),

    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("persistence failure at simulated time {at}: {source}")]
    Persistence {
        at: SimTime,
        #[source]
        source: GatewayError,
    },

    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// How a run should terminate early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMode {
    /// Flush the pending batch, then clear the queue.
    Graceful,
    /// Clear the queue immediately, no final flush.
    Force,
}

/// Cloneable handle for requesting a stop from outside the loop.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicU8>,
}

const STOP_GRACEFUL: u8 = 1;
const STOP_FORCE: u8 = 2;

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self, mode: StopMode) {
        let value = match mode {
            StopMode::Graceful => STOP_GRACEFUL,
            StopMode::Force => STOP_FORCE,
        };
        self.flag.store(value, Ordering::SeqCst);
    }

    pub fn requested(&self) -> Option<StopMode> {
        match self.flag.load(Ordering::SeqCst) {
            STOP_GRACEFUL => Some(StopMode::Graceful),
            STOP_FORCE => Some(StopMode::Force),
            _ => None,
        }
    }
}

/// Per-run counters.
#[derive(Debug, Clone, Copy, Default)]
struct RunStats {
    events_processed: u64,
    events_rejected: u64,
    events_dropped: u64,
    events_dormant: u64,
    flush_failures: u64,
}

/// Coarse lifecycle facts reported at the end of a run, for an external
/// observer to format.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: RunId,
    pub seed: u64,
    pub population: usize,
    pub status: RunStatus,
    pub final_sim_time: SimTime,
    pub events_processed: u64,
    pub events_rejected: u64,
    pub events_dropped: u64,
    pub events_dormant: u64,
    pub events_past_end: u64,
    pub trends_created: usize,
    pub flush_failures: u64,
}

/// The simulation kernel.
pub struct SimulationEngine<G: PersistenceGateway> {
    config: SimulationConfig,
    affinities: AffinityTable,
    clock: Box<dyn Clock>,
    queue: EventQueue,
    state: SimulationState,
    batch: PendingBatch,
    gateway: G,
    rng: RngManager,

    run_id: RunId,
    seed: u64,
    current_time: SimTime,
    end_time: SimTime,
    status: RunStatus,
    stop: StopHandle,
    stats: RunStats,
    last_reconsider: SimTime,
}

impl<G: PersistenceGateway> SimulationEngine<G> {
    /// Initialize a fresh run.
    ///
    /// Validates the configuration and the gateway-loaded tables, creates
    /// the run record, loads the population and any active trends, then
    /// schedules the recurring system events and the bootstrap seed pass.
    /// Every failure here aborts before any event processing.
    pub fn new(
        config: SimulationConfig,
        mut gateway: G,
        clock: Box<dyn Clock>,
        seed: u64,
        duration_min: f64,
    ) -> Result<Self, SimulationError> {
        config.validate()?;

        let affinities = gateway.load_affinity_table()?;
        let ranges = gateway.load_attribute_ranges()?;
        validate_attribute_ranges(&ranges)?;

        let persons = gateway.fetch_persons()?;
        let run_id = gateway.create_run(persons.len(), duration_min)?;
        let trends = gateway.fetch_active_trends(run_id)?;

        let mut state = SimulationState::new(persons);
        for trend in trends {
            state.insert_trend(trend);
        }

        let mut engine = Self {
            batch: PendingBatch::new(config.batch_size, config.batch_interval_min),
            queue: EventQueue::new(duration_min),
            config,
            affinities,
            clock,
            state,
            gateway,
            rng: RngManager::new(seed),
            run_id,
            seed,
            current_time: 0.0,
            end_time: duration_min,
            status: RunStatus::Running,
            stop: StopHandle::new(),
            stats: RunStats::default(),
            last_reconsider: 0.0,
        };

        engine.schedule_system_events(0.0);
        engine.schedule_seed_actions();
        Ok(engine)
    }

    /// Resume a run from a snapshot.
    ///
    /// Refuses a snapshot taken under a different configuration (hash
    /// mismatch). The self-rescheduling system events are re-seeded at
    /// their next occurrences after the snapshot time.
    pub fn resume(
        config: SimulationConfig,
        mut gateway: G,
        clock: Box<dyn Clock>,
        snapshot: RunSnapshot,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        if compute_config_hash(&config)? != snapshot.config_hash {
            return Err(SnapshotError::ConfigMismatch.into());
        }
        validate_snapshot(&snapshot)?;

        let affinities = gateway.load_affinity_table()?;
        let ranges = gateway.load_attribute_ranges()?;
        validate_attribute_ranges(&ranges)?;

        let mut state = SimulationState::new(snapshot.persons);
        for trend in snapshot.trends {
            state.insert_trend(trend);
        }

        let mut engine = Self {
            batch: PendingBatch::new(config.batch_size, config.batch_interval_min),
            queue: EventQueue::new(snapshot.end_time),
            config,
            affinities,
            clock,
            state,
            gateway,
            rng: RngManager::new(snapshot.rng_state),
            run_id: snapshot.run_id,
            seed: snapshot.seed,
            current_time: snapshot.sim_time,
            end_time: snapshot.end_time,
            status: RunStatus::Running,
            stop: StopHandle::new(),
            stats: RunStats::default(),
            last_reconsider: snapshot.sim_time,
        };

        engine.schedule_system_events(snapshot.sim_time);
        Ok(engine)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn current_time(&self) -> SimTime {
        self.current_time
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Handle for requesting a stop from another context.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Capture the current world as a validated snapshot.
    pub fn snapshot(&self) -> Result<RunSnapshot, SnapshotError> {
        let snapshot = RunSnapshot {
            run_id: self.run_id,
            seed: self.seed,
            sim_time: self.current_time,
            end_time: self.end_time,
            rng_state: self.rng.state(),
            persons: self.state.persons().cloned().collect(),
            trends: self.state.trends().cloned().collect(),
            config_hash: compute_config_hash(&self.config)?,
        };
        validate_snapshot(&snapshot)?;
        Ok(snapshot)
    }

    // ========================================================================
    // Main loop
    // ========================================================================

    /// Drive the run to completion (or until stopped).
    pub fn run(&mut self) -> Result<RunSummary, SimulationError> {
        self.gateway
            .update_run_status(self.run_id, RunStatus::Running, None)?;

        let mut stopped = false;
        while self.current_time < self.end_time {
            if let Some(mode) = self.stop.requested() {
                self.shutdown_on_stop(mode)?;
                stopped = true;
                break;
            }

            let Some(entry) = self.queue.pop() else {
                break;
            };
            if entry.timestamp > self.end_time {
                self.queue.push_back(entry);
                break;
            }

            if self.clock.is_realtime() && !self.pace_until(entry.timestamp) {
                // Stop requested mid-suspension; hand the entry back and let
                // the loop top run the shutdown path.
                self.queue.push_back(entry);
                continue;
            }

            self.clock.advance_to(entry.timestamp);
            self.current_time = entry.timestamp;

            self.dispatch(entry);
            self.maybe_flush();
            self.maybe_schedule_agent_actions();
        }

        if !stopped {
            self.finalize_completed()?;
        }
        Ok(self.summary())
    }

    /// Suspend until `target`, in capped slices, staying responsive to stop
    /// requests. Returns false when a stop interrupted the pacing.
    fn pace_until(&mut self, target: SimTime) -> bool {
        while self.clock.now() < target {
            if self.stop.requested().is_some() {
                return false;
            }
            self.clock.suspend_until(target);
        }
        true
    }

    fn dispatch(&mut self, entry: QueuedEvent) {
        let mut ctx = HandlerContext {
            state: &mut self.state,
            batch: &mut self.batch,
            rng: &mut self.rng,
            config: &self.config,
            affinities: &self.affinities,
            event_id: entry.id,
            now: self.current_time,
            end_time: self.end_time,
        };
        let outcome = entry.event.execute(&mut ctx);

        match outcome.disposition {
            Disposition::Applied => self.stats.events_processed += 1,
            Disposition::Rejected => self.stats.events_rejected += 1,
            Disposition::MissingReference => self.stats.events_dropped += 1,
            Disposition::Dormant => self.stats.events_dormant += 1,
        }
        for follow_up in outcome.follow_ups {
            self.queue.add(follow_up.at, follow_up.event);
        }
    }

    fn maybe_flush(&mut self) {
        if !self.batch.should_flush(self.current_time) {
            return;
        }
        // A failed flush keeps the batch intact for a later trigger; the
        // loop keeps processing, data-loss risk bounded by batch retention.
        if self
            .batch
            .flush(&mut self.gateway, self.run_id, self.current_time)
            .is_err()
        {
            self.stats.flush_failures += 1;
        }
    }

    // ========================================================================
    // Shutdown paths
    // ========================================================================

    fn shutdown_on_stop(&mut self, mode: StopMode) -> Result<(), SimulationError> {
        self.status = RunStatus::Stopping;
        let _ = self
            .gateway
            .update_run_status(self.run_id, RunStatus::Stopping, None);

        if mode == StopMode::Graceful && !self.batch.is_empty() {
            if let Err(source) =
                self.batch
                    .flush(&mut self.gateway, self.run_id, self.current_time)
            {
                self.stats.flush_failures += 1;
                self.status = RunStatus::Failed;
                let _ = self.gateway.update_run_status(
                    self.run_id,
                    RunStatus::Failed,
                    Some(self.current_time),
                );
                return Err(SimulationError::Persistence {
                    at: self.current_time,
                    source,
                });
            }
        }

        self.queue.clear();
        self.status = RunStatus::Stopped;
        let _ = self.gateway.update_run_status(
            self.run_id,
            RunStatus::Stopped,
            Some(self.current_time),
        );
        Ok(())
    }

    /// Completion requires a successful final flush; persistent failure
    /// marks the run failed instead of completed.
    fn finalize_completed(&mut self) -> Result<(), SimulationError> {
        let mut last_error = None;
        for _ in 0..FINAL_FLUSH_ATTEMPTS {
            if self.batch.is_empty() {
                last_error = None;
                break;
            }
            match self
                .batch
                .flush(&mut self.gateway, self.run_id, self.current_time)
            {
                Ok(_) => {
                    last_error = None;
                    break;
                }
                Err(e) => {
                    self.stats.flush_failures += 1;
                    last_error = Some(e);
                }
            }
        }

        if let Some(source) = last_error {
            self.status = RunStatus::Failed;
            let _ = self.gateway.update_run_status(
                self.run_id,
                RunStatus::Failed,
                Some(self.current_time),
            );
            return Err(SimulationError::Persistence {
                at: self.current_time,
                source,
            });
        }

        self.status = RunStatus::Completed;
        self.gateway.update_run_status(
            self.run_id,
            RunStatus::Completed,
            Some(self.current_time),
        )?;
        Ok(())
    }

    fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run_id,
            seed: self.seed,
            population: self.state.population(),
            status: self.status,
            final_sim_time: self.current_time,
            events_processed: self.stats.events_processed,
            events_rejected: self.stats.events_rejected,
            events_dropped: self.stats.events_dropped,
            events_dormant: self.stats.events_dormant,
            events_past_end: self.queue.rejected_past_end(),
            trends_created: self.state.active_trend_count(),
            flush_failures: self.stats.flush_failures,
        }
    }

    // ========================================================================
    // Scheduling passes
    // ========================================================================

    /// First occurrence of a daily event with the given minute-of-day
    /// offset, strictly after `after`.
    fn next_daily_occurrence(after: SimTime, offset: f64) -> SimTime {
        let candidate = day_of(after) as f64 * MINUTES_PER_DAY + offset;
        if candidate > after {
            candidate
        } else {
            candidate + MINUTES_PER_DAY
        }
    }

    fn schedule_system_events(&mut self, after: SimTime) {
        self.queue.add(
            after + self.config.energy_recovery_interval_min,
            SimEvent::EnergyRecovery,
        );
        for (offset, event) in [
            (MORNING_RECOVERY_OFFSET, SimEvent::MorningRecovery),
            (NIGHT_CYCLE_OFFSET, SimEvent::NightCycle),
            (SAVE_DAILY_TREND_OFFSET, SimEvent::SaveDailyTrend),
            (DAILY_RESET_OFFSET, SimEvent::DailyReset),
        ] {
            self.queue
                .add(Self::next_daily_occurrence(after, offset), event);
        }
    }

    /// Bootstrap seed pass: classify persons into post/purchase/self-dev
    /// buckets by attribute thresholds, then schedule a small time-jittered
    /// subset of them to get the run moving.
    fn schedule_seed_actions(&mut self) {
        #[derive(Clone, Copy)]
        enum SeedBucket {
            Post,
            Purchase(PurchaseTier),
            SelfDev,
        }

        let mut candidates: Vec<(u64, SeedBucket, Option<Topic>)> = Vec::new();
        for id in self.state.person_ids() {
            let Some(person) = self.state.person(id) else {
                continue;
            };
            let bucket = if person.social_status() >= SEED_POST_SOCIAL_STATUS {
                SeedBucket::Post
            } else if person.financial_capability() >= SEED_PURCHASE_FINANCIAL {
                let tier = if person.financial_capability() >= 4.0 {
                    PurchaseTier::L3
                } else if person.financial_capability() >= 3.0 {
                    PurchaseTier::L2
                } else {
                    PurchaseTier::L1
                };
                SeedBucket::Purchase(tier)
            } else if person.time_budget() >= SEED_SELFDEV_TIME_BUDGET {
                SeedBucket::SelfDev
            } else {
                continue;
            };
            let topic = top_interest(person.interests()).map(|(t, _)| t);
            candidates.push((id, bucket, topic));
        }

        if candidates.is_empty() {
            return;
        }
        let seed_count = ((self.state.population() as f64 * self.config.seed_fraction).ceil()
            as usize)
            .max(1);
        let picks = self.rng.sample_indices(candidates.len(), seed_count);
        let (jitter_min, jitter_max) = self.config.seed_jitter_range_min;
        for i in picks {
            let (person_id, bucket, topic) = candidates[i];
            if !self
                .state
                .try_take_action_slot(person_id, 0, self.config.daily_action_cap)
            {
                continue;
            }
            let event = match bucket {
                SeedBucket::Post => SimEvent::PublishPost {
                    person_id,
                    topic: topic.unwrap_or_else(|| self.random_topic()),
                    trigger_trend_id: None,
                },
                SeedBucket::Purchase(tier) => SimEvent::Purchase { person_id, tier },
                SeedBucket::SelfDev => SimEvent::SelfDevelopment { person_id },
            };
            let at = self.rng.range_f64(jitter_min, jitter_max);
            self.queue.add(at, event);
        }
    }

    fn maybe_schedule_agent_actions(&mut self) {
        if self.current_time - self.last_reconsider < self.config.reconsider_interval_min {
            return;
        }
        self.last_reconsider = self.current_time;
        self.schedule_agent_actions();
    }

    /// Periodic reconsideration: ask every person's decision model for a
    /// next action and schedule the picks. Time-gated to stop a configured
    /// margin before end time.
    fn schedule_agent_actions(&mut self) {
        let now = self.current_time;
        if now + self.config.scheduling_margin_min >= self.end_time {
            return;
        }

        let day = day_of(now);
        for id in self.state.person_ids() {
            let decided = {
                let Some(person) = self.state.person(id) else {
                    continue;
                };
                let Some(kind) = person.decide_action_weighted(
                    None,
                    now,
                    &self.affinities,
                    &self.config,
                    &mut self.rng,
                ) else {
                    continue;
                };
                let topic = top_interest(person.interests()).map(|(t, _)| t);
                (kind, topic)
            };

            if !self
                .state
                .try_take_action_slot(id, day, self.config.daily_action_cap)
            {
                continue;
            }

            let (kind, topic) = decided;
            let event = match kind {
                ActionKind::Post => SimEvent::PublishPost {
                    person_id: id,
                    topic: topic.unwrap_or_else(|| self.random_topic()),
                    trigger_trend_id: None,
                },
                ActionKind::Purchase(tier) => SimEvent::Purchase {
                    person_id: id,
                    tier,
                },
                ActionKind::SelfDev => SimEvent::SelfDevelopment { person_id: id },
            };
            let jitter = self
                .rng
                .range_f64(1.0, self.config.reconsider_interval_min.max(1.5));
            self.queue.add(now + jitter, event);
        }
    }

    fn random_topic(&mut self) -> Topic {
        Topic::ALL[self.rng.range(0, Topic::ALL.len() as i64) as usize]
    }
}

impl<G: PersistenceGateway> std::fmt::Debug for SimulationEngine<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationEngine")
            .field("run_id", &self.run_id)
            .field("current_time", &self.current_time)
            .field("end_time", &self.end_time)
            .field("status", &self.status)
            .field("population", &self.state.population())
            .field("queue_len", &self.queue.len())
            .finish()
    }
}
