//! Pending mutation batch
//!
//! Event handlers stage their durable side effects here instead of calling
//! the gateway inline. The batch holds four independent record lists plus a
//! keyed tracking-update map, and is flushed through the gateway when either
//! enough simulated time has passed since the last attempt or the summed
//! list size reaches the configured batch size.
//!
//! The batch is cleared only after a fully successful flush. A failed flush
//! leaves every record in place for a later retry; retry pacing/backoff is
//! the gateway's concern, not re-attempted inline here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::time::SimTime;
use crate::models::event::{EventId, SimEvent};
use crate::models::person::{AttributeChange, Person};
use crate::models::trend::{CoverageLevel, Sentiment, Topic, Trend, TrendId};
use crate::persistence::gateway::{GatewayError, PersistenceGateway, RunId};

/// Attribute changes smaller than this are not worth a history row.
pub const MIN_RECORDED_DELTA: f64 = 0.1;

/// One attribute-history row: old/new/delta plus the action that caused it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeHistoryRecord {
    pub person_id: u64,
    pub attribute: String,
    pub old: f64,
    pub new: f64,
    pub delta: f64,
    pub reason: String,
    pub at: SimTime,
}

/// One trend-creation row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendCreationRecord {
    pub trend_id: TrendId,
    pub topic: Topic,
    pub originator_id: u64,
    pub parent_id: Option<TrendId>,
    pub base_virality_score: f64,
    pub coverage_level: CoverageLevel,
    pub sentiment: Sentiment,
    pub created_at: SimTime,
}

impl TrendCreationRecord {
    pub fn from_trend(trend: &Trend) -> Self {
        Self {
            trend_id: trend.id(),
            topic: trend.topic(),
            originator_id: trend.originator_id(),
            parent_id: trend.parent_id(),
            base_virality_score: trend.base_virality_score(),
            coverage_level: trend.coverage_level(),
            sentiment: trend.sentiment(),
            created_at: trend.created_at(),
        }
    }
}

/// One processed-event row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLogRecord {
    pub event_id: EventId,
    pub kind: String,
    pub person_id: Option<u64>,
    pub trend_id: Option<TrendId>,
    pub at: SimTime,
    /// Kind-specific payload for record-only events and summaries.
    pub details: Option<serde_json::Value>,
}

/// Tracking-only participant fields: cooldowns and counters, never raw
/// attribute values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantTrackingRecord {
    pub person_id: u64,
    pub purchases_today: u32,
    pub last_post_ts: Option<SimTime>,
    pub last_selfdev_ts: Option<SimTime>,
}

impl ParticipantTrackingRecord {
    pub fn from_person(person: &Person) -> Self {
        Self {
            person_id: person.id(),
            purchases_today: person.purchases_today(),
            last_post_ts: person.last_post_ts(),
            last_selfdev_ts: person.last_selfdev_ts(),
        }
    }
}

/// Counts written by one successful flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub trend_creations: usize,
    pub attribute_changes: usize,
    pub tracking_updates: usize,
    pub event_records: usize,
    pub interaction_increments: usize,
}

/// In-memory accumulator of durable mutations, flushed in bounded batches.
#[derive(Debug, Clone)]
pub struct PendingBatch {
    attribute_changes: Vec<AttributeHistoryRecord>,
    trend_creations: Vec<TrendCreationRecord>,
    event_records: Vec<EventLogRecord>,
    /// Interaction increments coalesced per trend within the batch.
    interaction_increments: BTreeMap<TrendId, u64>,
    /// Latest tracking state per touched participant. Keyed (latest wins),
    /// so it does not count toward the flush-size trigger.
    tracking: BTreeMap<u64, ParticipantTrackingRecord>,

    batch_size: usize,
    interval_min: f64,
    last_attempt: SimTime,
}

impl PendingBatch {
    pub fn new(batch_size: usize, interval_min: f64) -> Self {
        Self {
            attribute_changes: Vec::new(),
            trend_creations: Vec::new(),
            event_records: Vec::new(),
            interaction_increments: BTreeMap::new(),
            tracking: BTreeMap::new(),
            batch_size,
            interval_min,
            last_attempt: 0.0,
        }
    }

    // ------------------------------------------------------------------
    // Recording
    // ------------------------------------------------------------------

    /// Record bulk-path attribute changes, dropping those below the
    /// recording threshold.
    pub fn record_attribute_changes(
        &mut self,
        person_id: u64,
        changes: &[AttributeChange],
        reason: &str,
        at: SimTime,
    ) {
        for change in changes {
            let delta = change.delta();
            if delta.abs() < MIN_RECORDED_DELTA {
                continue;
            }
            self.attribute_changes.push(AttributeHistoryRecord {
                person_id,
                attribute: change.attribute.clone(),
                old: change.old,
                new: change.new,
                delta,
                reason: reason.to_string(),
                at,
            });
        }
    }

    pub fn record_trend_creation(&mut self, trend: &Trend) {
        self.trend_creations.push(TrendCreationRecord::from_trend(trend));
    }

    pub fn record_event(&mut self, event_id: EventId, event: &SimEvent, at: SimTime) {
        self.event_records.push(EventLogRecord {
            event_id,
            kind: event.kind().to_string(),
            person_id: event.person_id(),
            trend_id: event.trend_id(),
            at,
            details: None,
        });
    }

    pub fn record_event_with_details(
        &mut self,
        event_id: EventId,
        event: &SimEvent,
        at: SimTime,
        details: serde_json::Value,
    ) {
        self.event_records.push(EventLogRecord {
            event_id,
            kind: event.kind().to_string(),
            person_id: event.person_id(),
            trend_id: event.trend_id(),
            at,
            details: Some(details),
        });
    }

    pub fn record_interaction(&mut self, trend_id: TrendId) {
        *self.interaction_increments.entry(trend_id).or_insert(0) += 1;
    }

    pub fn record_tracking(&mut self, person: &Person) {
        self.tracking
            .insert(person.id(), ParticipantTrackingRecord::from_person(person));
    }

    // ------------------------------------------------------------------
    // Triggers
    // ------------------------------------------------------------------

    /// Summed size of the four record lists (tracking updates are keyed
    /// upserts and excluded).
    pub fn size(&self) -> usize {
        self.attribute_changes.len()
            + self.trend_creations.len()
            + self.event_records.len()
            + self.interaction_increments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0 && self.tracking.is_empty()
    }

    pub fn last_attempt(&self) -> SimTime {
        self.last_attempt
    }

    /// Whether a flush should run at simulated time `now`.
    ///
    /// Triggers: the configured interval elapsed since the last attempt, or
    /// the batch reached the configured size. The size trigger is gated on
    /// simulated time having moved past the last attempt so a failed flush
    /// is not re-attempted inline within the same instant.
    pub fn should_flush(&self, now: SimTime) -> bool {
        if self.is_empty() {
            return false;
        }
        if now - self.last_attempt >= self.interval_min {
            return true;
        }
        self.size() >= self.batch_size && now > self.last_attempt
    }

    // ------------------------------------------------------------------
    // Flush
    // ------------------------------------------------------------------

    /// Flush the accumulated records through the gateway.
    ///
    /// Write order: trend creations, attribute history, participant
    /// tracking, event records, interaction increments — each its own
    /// gateway call the gateway may retry individually. The batch is
    /// cleared only when every call succeeds; any failure leaves the
    /// whole batch in place and surfaces as a recoverable error.
    pub fn flush<G: PersistenceGateway + ?Sized>(
        &mut self,
        gateway: &mut G,
        run_id: RunId,
        now: SimTime,
    ) -> Result<FlushReport, GatewayError> {
        self.last_attempt = now;

        let increments: Vec<(TrendId, u64)> = self
            .interaction_increments
            .iter()
            .map(|(id, count)| (*id, *count))
            .collect();
        let tracking: Vec<ParticipantTrackingRecord> = self.tracking.values().cloned().collect();

        gateway.insert_trend_creations(run_id, &self.trend_creations)?;
        gateway.insert_attribute_history(run_id, &self.attribute_changes)?;
        gateway.update_participant_tracking(run_id, &tracking)?;
        gateway.insert_events(run_id, &self.event_records)?;
        gateway.increment_trend_interactions(run_id, &increments)?;

        let report = FlushReport {
            trend_creations: self.trend_creations.len(),
            attribute_changes: self.attribute_changes.len(),
            tracking_updates: tracking.len(),
            event_records: self.event_records.len(),
            interaction_increments: increments.len(),
        };

        self.trend_creations.clear();
        self.attribute_changes.clear();
        self.event_records.clear();
        self.interaction_increments.clear();
        self.tracking.clear();

        Ok(report)
    }
}
