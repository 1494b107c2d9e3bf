//! Event handlers
//!
//! Each [`SimEvent`] kind is one operation against the kernel's mutable
//! world: the population, the active-trend index and the pending mutation
//! batch. Handlers never touch the scheduler directly; follow-up events are
//! returned to the caller for enqueueing, which keeps the end-time guard in
//! one place.
//!
//! Rejections (failed eligibility) and missing references (a trend no longer
//! in the active index) are not errors: the event is dropped and the
//! disposition says why.

use std::collections::HashMap;

use serde_json::json;

use crate::config::{AffinityTable, SimulationConfig};
use crate::core::time::{day_of, SimTime};
use crate::models::event::{EventId, SimEvent};
use crate::models::person::PurchaseTier;
use crate::models::state::SimulationState;
use crate::models::trend::{CoverageLevel, Sentiment, Topic, Trend, TrendId};
use crate::persistence::batch::PendingBatch;
use crate::rng::RngManager;

/// Everything a handler may touch while executing one event.
pub struct HandlerContext<'a> {
    pub state: &'a mut SimulationState,
    pub batch: &'a mut PendingBatch,
    pub rng: &'a mut RngManager,
    pub config: &'a SimulationConfig,
    pub affinities: &'a AffinityTable,
    /// Id of the event being executed (for the event-log record).
    pub event_id: EventId,
    /// Current simulated time (the event's timestamp).
    pub now: SimTime,
    /// The run's configured end time.
    pub end_time: SimTime,
}

/// A new event the handler wants scheduled.
#[derive(Debug, Clone, PartialEq)]
pub struct FollowUp {
    pub at: SimTime,
    pub event: SimEvent,
}

/// What happened to the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The event mutated the world.
    Applied,
    /// An eligibility predicate failed; dropped silently.
    Rejected,
    /// The event referenced a person/trend that no longer exists; dropped.
    MissingReference,
    /// The avalanche guard suppressed propagation for this trend.
    Dormant,
}

/// Result of executing one event.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerOutcome {
    pub disposition: Disposition,
    pub follow_ups: Vec<FollowUp>,
}

impl HandlerOutcome {
    fn applied(follow_ups: Vec<FollowUp>) -> Self {
        Self {
            disposition: Disposition::Applied,
            follow_ups,
        }
    }

    fn terminal(disposition: Disposition) -> Self {
        Self {
            disposition,
            follow_ups: Vec::new(),
        }
    }
}

impl SimEvent {
    /// Execute this event against the live world.
    pub fn execute(&self, ctx: &mut HandlerContext<'_>) -> HandlerOutcome {
        match self {
            SimEvent::PublishPost {
                person_id,
                topic,
                trigger_trend_id,
            } => execute_publish_post(ctx, *person_id, *topic, *trigger_trend_id),
            SimEvent::Purchase { person_id, tier } => execute_purchase(ctx, *person_id, *tier),
            SimEvent::SelfDevelopment { person_id } => execute_self_development(ctx, *person_id),
            SimEvent::TrendInfluence { trend_id } => execute_trend_influence(ctx, *trend_id),
            SimEvent::EnergyRecovery => execute_energy_recovery(ctx),
            SimEvent::NightCycle => execute_system_cycle(ctx, self),
            SimEvent::MorningRecovery => execute_morning_recovery(ctx),
            SimEvent::DailyReset => execute_daily_reset(ctx),
            SimEvent::SaveDailyTrend => execute_save_daily_trend(ctx),
            SimEvent::Law { label } | SimEvent::Weather { label } => {
                execute_external_factor(ctx, self, label)
            }
        }
    }
}

// ============================================================================
// Agent actions
// ============================================================================

fn execute_publish_post(
    ctx: &mut HandlerContext<'_>,
    person_id: u64,
    topic: Topic,
    trigger_trend_id: Option<TrendId>,
) -> HandlerOutcome {
    let Some(person) = ctx.state.person(person_id) else {
        return HandlerOutcome::terminal(Disposition::MissingReference);
    };
    if !person.can_post(ctx.now, ctx.config) {
        return HandlerOutcome::terminal(Disposition::Rejected);
    }

    let social_status = person.social_status();
    let receptivity = person.trend_receptivity();
    let affinity = ctx.affinities.affinity(person.profession(), topic);
    let expertise_bonus = affinity / 5.0 * 0.5;
    let base_virality =
        (0.4 * social_status + 0.3 * receptivity + expertise_bonus + 0.5).min(3.0);
    let coverage = CoverageLevel::from_social_status(social_status);

    // Parent: the explicit trigger when it is still active and predates this
    // post, else the busiest same-topic trend by another author.
    let parent_id = trigger_trend_id
        .and_then(|id| ctx.state.trend(id))
        .filter(|parent| Trend::check_parent_ordering(parent, ctx.now).is_ok())
        .map(|parent| parent.id())
        .or_else(|| {
            ctx.state
                .most_interacted_trend(topic, person_id)
                .map(|t| t.id())
        });

    let sentiment = if ctx.rng.chance(0.5) {
        Sentiment::Positive
    } else {
        Sentiment::Negative
    };

    let Ok(trend) = Trend::new(
        topic,
        person_id,
        parent_id,
        base_virality,
        coverage,
        sentiment,
        ctx.now,
    ) else {
        return HandlerOutcome::terminal(Disposition::Rejected);
    };
    let trend_id = trend.id();

    ctx.batch.record_trend_creation(&trend);
    ctx.state.insert_trend(trend);

    if let Some(person) = ctx.state.person_mut(person_id) {
        person.note_post(ctx.now);
        ctx.batch.record_tracking(person);
    }
    ctx.batch.record_event(
        ctx.event_id,
        &SimEvent::PublishPost {
            person_id,
            topic,
            trigger_trend_id,
        },
        ctx.now,
    );

    HandlerOutcome::applied(vec![FollowUp {
        at: ctx.now + ctx.config.influence_delay_min,
        event: SimEvent::TrendInfluence { trend_id },
    }])
}

fn execute_purchase(
    ctx: &mut HandlerContext<'_>,
    person_id: u64,
    tier: PurchaseTier,
) -> HandlerOutcome {
    let Some(person) = ctx.state.person(person_id) else {
        return HandlerOutcome::terminal(Disposition::MissingReference);
    };
    if !person.can_purchase(ctx.now, tier, ctx.config) {
        return HandlerOutcome::terminal(Disposition::Rejected);
    }
    let Some(tier_cfg) = ctx.config.purchase_tiers.get(&tier) else {
        return HandlerOutcome::terminal(Disposition::Rejected);
    };

    let (cost_min, cost_max) = tier_cfg.cost_range;
    let cost = ctx.rng.range_f64(cost_min, cost_max);

    let mut deltas: HashMap<String, f64> = tier_cfg.effects.clone();
    *deltas
        .entry("financial_capability".to_string())
        .or_insert(0.0) -= cost;

    let reason = format!("purchase_{}", tier.as_str().to_lowercase());
    if let Some(person) = ctx.state.person_mut(person_id) {
        let changes = person.update_state(&deltas);
        ctx.batch
            .record_attribute_changes(person_id, &changes, &reason, ctx.now);
        person.note_purchase(tier, ctx.now);
        ctx.batch.record_tracking(person);
    }
    ctx.batch.record_event(
        ctx.event_id,
        &SimEvent::Purchase { person_id, tier },
        ctx.now,
    );

    HandlerOutcome::applied(Vec::new())
}

fn execute_self_development(ctx: &mut HandlerContext<'_>, person_id: u64) -> HandlerOutcome {
    let Some(person) = ctx.state.person(person_id) else {
        return HandlerOutcome::terminal(Disposition::MissingReference);
    };
    if !person.can_self_dev(ctx.now, ctx.config) {
        return HandlerOutcome::terminal(Disposition::Rejected);
    }

    if let Some(person) = ctx.state.person_mut(person_id) {
        let changes = person.update_state(&ctx.config.selfdev_effects);
        ctx.batch
            .record_attribute_changes(person_id, &changes, "self_development", ctx.now);
        person.note_selfdev(ctx.now);
        ctx.batch.record_tracking(person);
    }
    ctx.batch.record_event(
        ctx.event_id,
        &SimEvent::SelfDevelopment { person_id },
        ctx.now,
    );

    HandlerOutcome::applied(Vec::new())
}

// ============================================================================
// Influence propagation
// ============================================================================

fn execute_trend_influence(ctx: &mut HandlerContext<'_>, trend_id: TrendId) -> HandlerOutcome {
    let Some(trend) = ctx.state.trend(trend_id) else {
        return HandlerOutcome::terminal(Disposition::MissingReference);
    };
    if trend.total_interactions() > ctx.config.trend_interaction_ceiling {
        return HandlerOutcome::terminal(Disposition::Dormant);
    }

    let topic = trend.topic();
    let sentiment = trend.sentiment();
    let author_id = trend.originator_id();
    let coverage_factor = trend.coverage_level().factor();
    let virality = trend.current_virality();

    let population = ctx.state.population();
    let audience_size = ((population as f64) * coverage_factor).round() as usize;

    let candidates: Vec<u64> = ctx
        .state
        .person_ids()
        .into_iter()
        .filter(|id| *id != author_id)
        .collect();
    let sampled: Vec<u64> = ctx
        .rng
        .sample_indices(candidates.len(), audience_size)
        .into_iter()
        .map(|i| candidates[i])
        .collect();
    let sampled_count = sampled.len();

    let mut follow_ups = Vec::new();
    let mut energy_delta_sum = 0.0;
    let mut interactions = 0u64;
    let day = day_of(ctx.now);
    let (response_min, response_max) = ctx.config.response_delay_range_min;

    for id in sampled {
        let Some(person) = ctx.state.person(id) else {
            continue;
        };
        if person.trend_receptivity() <= 0.5 {
            continue;
        }
        if ctx.affinities.affinity(person.profession(), topic) < 2.5 {
            continue;
        }

        let aligned = person.interest(topic) > 3.0;
        let receptivity_delta = if aligned || sentiment == Sentiment::Negative {
            0.01
        } else {
            0.0
        };
        let energy_delta = match (sentiment, aligned) {
            (Sentiment::Positive, true) => 0.02,
            (Sentiment::Positive, false) => 0.015,
            (Sentiment::Negative, true) => -0.015,
            (Sentiment::Negative, false) => -0.01,
        };
        let social_status = person.social_status();

        let mut deltas = HashMap::new();
        if receptivity_delta != 0.0 {
            deltas.insert("trend_receptivity".to_string(), receptivity_delta);
        }
        deltas.insert("energy_level".to_string(), energy_delta);

        if let Some(person) = ctx.state.person_mut(id) {
            person.update_state(&deltas);
            person.record_exposure(trend_id, ctx.now);
        }
        energy_delta_sum += energy_delta;
        interactions += 1;
        ctx.batch.record_interaction(trend_id);

        // Exposure may provoke a response post referencing this trend.
        let response_p = (virality / 5.0) * (social_status / 5.0) * 0.05 / 2.0;
        let has_energy = ctx
            .state
            .person(id)
            .map(|p| p.energy_level() >= 0.3)
            .unwrap_or(false);
        if ctx.rng.chance(response_p)
            && has_energy
            && ctx
                .state
                .try_take_action_slot(id, day, ctx.config.daily_action_cap)
        {
            follow_ups.push(FollowUp {
                at: ctx.now + ctx.rng.range_f64(response_min, response_max),
                event: SimEvent::PublishPost {
                    person_id: id,
                    topic,
                    trigger_trend_id: Some(trend_id),
                },
            });
        }
    }

    if let Some(trend) = ctx.state.trend_mut(trend_id) {
        for _ in 0..interactions {
            trend.register_interaction();
        }
    }

    // Aggregate author effect: the audience's energy response feeds back
    // into the author's social status, scaled by audience size and signed
    // by sentiment.
    let author_delta = (energy_delta_sum * ((sampled_count + 1) as f64).log10()
        * sentiment.sign()
        / 50.0)
        .clamp(-1.0, 1.0);
    if author_delta != 0.0 {
        if let Some(author) = ctx.state.person_mut(author_id) {
            let changes = author.update_state(&HashMap::from([(
                "social_status".to_string(),
                author_delta,
            )]));
            ctx.batch
                .record_attribute_changes(author_id, &changes, "trend_author_effect", ctx.now);
        }
    }

    ctx.batch.record_event(
        ctx.event_id,
        &SimEvent::TrendInfluence { trend_id },
        ctx.now,
    );

    HandlerOutcome::applied(follow_ups)
}

// ============================================================================
// System cycles
// ============================================================================

fn reschedule(ctx: &HandlerContext<'_>, event: SimEvent, interval: f64) -> Vec<FollowUp> {
    let next = ctx.now + interval;
    if next < ctx.end_time {
        vec![FollowUp { at: next, event }]
    } else {
        Vec::new()
    }
}

fn execute_energy_recovery(ctx: &mut HandlerContext<'_>) -> HandlerOutcome {
    let amount = ctx.config.energy_recovery_amount;
    for person in ctx.state.persons_mut() {
        person.recover_energy(amount);
    }
    ctx.batch
        .record_event(ctx.event_id, &SimEvent::EnergyRecovery, ctx.now);
    HandlerOutcome::applied(reschedule(
        ctx,
        SimEvent::EnergyRecovery,
        ctx.config.energy_recovery_interval_min,
    ))
}

fn execute_system_cycle(ctx: &mut HandlerContext<'_>, event: &SimEvent) -> HandlerOutcome {
    ctx.batch.record_event(ctx.event_id, event, ctx.now);
    HandlerOutcome::applied(reschedule(ctx, event.clone(), crate::core::time::MINUTES_PER_DAY))
}

fn execute_morning_recovery(ctx: &mut HandlerContext<'_>) -> HandlerOutcome {
    let energy_bonus = ctx.config.morning_energy_bonus;
    let financial_bonus = ctx.config.morning_financial_bonus;
    for person in ctx.state.persons_mut() {
        person.morning_recovery(energy_bonus, financial_bonus);
    }
    ctx.batch
        .record_event(ctx.event_id, &SimEvent::MorningRecovery, ctx.now);
    HandlerOutcome::applied(reschedule(
        ctx,
        SimEvent::MorningRecovery,
        crate::core::time::MINUTES_PER_DAY,
    ))
}

fn execute_daily_reset(ctx: &mut HandlerContext<'_>) -> HandlerOutcome {
    let ids = ctx.state.person_ids();
    for id in ids {
        if let Some(person) = ctx.state.person_mut(id) {
            person.reset_daily();
            ctx.batch.record_tracking(person);
        }
    }
    ctx.state.prune_action_counters(day_of(ctx.now));
    ctx.batch
        .record_event(ctx.event_id, &SimEvent::DailyReset, ctx.now);
    HandlerOutcome::applied(reschedule(
        ctx,
        SimEvent::DailyReset,
        crate::core::time::MINUTES_PER_DAY,
    ))
}

fn execute_save_daily_trend(ctx: &mut HandlerContext<'_>) -> HandlerOutcome {
    let top = ctx
        .state
        .trends()
        .max_by_key(|t| t.total_interactions())
        .map(|t| (t.id(), t.total_interactions()));
    let details = json!({
        "day": day_of(ctx.now),
        "active_trends": ctx.state.active_trend_count(),
        "top_trend_id": top.map(|(id, _)| id.to_string()),
        "top_trend_interactions": top.map(|(_, n)| n),
    });
    ctx.batch
        .record_event_with_details(ctx.event_id, &SimEvent::SaveDailyTrend, ctx.now, details);
    HandlerOutcome::applied(reschedule(
        ctx,
        SimEvent::SaveDailyTrend,
        crate::core::time::MINUTES_PER_DAY,
    ))
}

// ============================================================================
// External factors (record-only placeholders)
// ============================================================================

fn execute_external_factor(
    ctx: &mut HandlerContext<'_>,
    event: &SimEvent,
    label: &str,
) -> HandlerOutcome {
    ctx.batch.record_event_with_details(
        ctx.event_id,
        event,
        ctx.now,
        json!({ "label": label }),
    );
    HandlerOutcome::applied(Vec::new())
}
