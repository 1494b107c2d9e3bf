//! Person (agent) model
//!
//! Represents one simulated individual. Each person carries:
//! - Immutable identity and demographics (id, profession, age, sex)
//! - Four dynamic attributes clamped to [0.0, 5.0]
//! - A time budget clamped to [0.0, 5.0] and quantized to 0.5 steps
//! - Cooldown/tracking state gating posts, purchases and self-development
//!
//! All attribute mutation flows through [`Person::update_state`] (bulk path,
//! returns the effective changes for history recording) or the dedicated
//! recovery paths. Direct field writes do not exist outside this module, so
//! the bounds invariants hold for every mutation sequence.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::{AffinityTable, SimulationConfig};
use crate::core::time::SimTime;
use crate::models::trend::{top_interest, Topic, Trend, TrendId};
use crate::rng::RngManager;

/// The closed set of profession categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Profession {
    Artist,
    Athlete,
    Blogger,
    Businessman,
    Developer,
    Doctor,
    Engineer,
    Musician,
    Politician,
    Scientist,
    Teacher,
    Worker,
}

impl Profession {
    /// All professions, in stable order.
    pub const ALL: [Profession; 12] = [
        Profession::Artist,
        Profession::Athlete,
        Profession::Blogger,
        Profession::Businessman,
        Profession::Developer,
        Profession::Doctor,
        Profession::Engineer,
        Profession::Musician,
        Profession::Politician,
        Profession::Scientist,
        Profession::Teacher,
        Profession::Worker,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Profession::Artist => "Artist",
            Profession::Athlete => "Athlete",
            Profession::Blogger => "Blogger",
            Profession::Businessman => "Businessman",
            Profession::Developer => "Developer",
            Profession::Doctor => "Doctor",
            Profession::Engineer => "Engineer",
            Profession::Musician => "Musician",
            Profession::Politician => "Politician",
            Profession::Scientist => "Scientist",
            Profession::Teacher => "Teacher",
            Profession::Worker => "Worker",
        }
    }
}

/// Demographic sex, immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    Female,
    Male,
}

/// Purchase price tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PurchaseTier {
    L1,
    L2,
    L3,
}

impl PurchaseTier {
    pub const ALL: [PurchaseTier; 3] = [PurchaseTier::L1, PurchaseTier::L2, PurchaseTier::L3];

    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseTier::L1 => "L1",
            PurchaseTier::L2 => "L2",
            PurchaseTier::L3 => "L3",
        }
    }
}

/// The actions a person can decide to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Post,
    Purchase(PurchaseTier),
    SelfDev,
}

/// One effective attribute mutation, for history recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeChange {
    pub attribute: String,
    pub old: f64,
    pub new: f64,
}

impl AttributeChange {
    /// Effective (post-clamp) delta.
    pub fn delta(&self) -> f64 {
        self.new - self.old
    }
}

const ATTR_MIN: f64 = 0.0;
const ATTR_MAX: f64 = 5.0;

fn clamp_attr(v: f64) -> f64 {
    v.clamp(ATTR_MIN, ATTR_MAX)
}

/// Clamp to [0, 5] and round to the nearest 0.5.
fn quantize_time_budget(v: f64) -> f64 {
    (clamp_attr(v) * 2.0).round() / 2.0
}

/// One simulated individual.
///
/// # Example
/// ```
/// use std::collections::HashMap;
/// use social_simulator_core_rs::models::person::{Person, Profession, Sex};
///
/// let person = Person::new(1, Profession::Blogger, 27, Sex::Female,
///                          2.5, 3.0, 2.0, 4.0, 3.25, HashMap::new());
/// assert_eq!(person.time_budget(), 3.5); // quantized to 0.5 steps
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    id: u64,
    profession: Profession,
    age: u32,
    sex: Sex,

    financial_capability: f64,
    trend_receptivity: f64,
    social_status: f64,
    energy_level: f64,
    time_budget: f64,

    purchases_today: u32,
    last_post_ts: Option<SimTime>,
    last_selfdev_ts: Option<SimTime>,
    last_purchase_ts: HashMap<PurchaseTier, SimTime>,

    interests: HashMap<Topic, f64>,
    exposure_history: HashMap<TrendId, SimTime>,
}

impl Person {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: u64,
        profession: Profession,
        age: u32,
        sex: Sex,
        financial_capability: f64,
        trend_receptivity: f64,
        social_status: f64,
        energy_level: f64,
        time_budget: f64,
        interests: HashMap<Topic, f64>,
    ) -> Self {
        let interests = interests
            .into_iter()
            .map(|(t, v)| (t, clamp_attr(v)))
            .collect();
        Self {
            id,
            profession,
            age,
            sex,
            financial_capability: clamp_attr(financial_capability),
            trend_receptivity: clamp_attr(trend_receptivity),
            social_status: clamp_attr(social_status),
            energy_level: clamp_attr(energy_level),
            time_budget: quantize_time_budget(time_budget),
            purchases_today: 0,
            last_post_ts: None,
            last_selfdev_ts: None,
            last_purchase_ts: HashMap::new(),
            interests,
            exposure_history: HashMap::new(),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn profession(&self) -> Profession {
        self.profession
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn sex(&self) -> Sex {
        self.sex
    }

    pub fn financial_capability(&self) -> f64 {
        self.financial_capability
    }

    pub fn trend_receptivity(&self) -> f64 {
        self.trend_receptivity
    }

    pub fn social_status(&self) -> f64 {
        self.social_status
    }

    pub fn energy_level(&self) -> f64 {
        self.energy_level
    }

    pub fn time_budget(&self) -> f64 {
        self.time_budget
    }

    pub fn purchases_today(&self) -> u32 {
        self.purchases_today
    }

    pub fn last_post_ts(&self) -> Option<SimTime> {
        self.last_post_ts
    }

    pub fn last_selfdev_ts(&self) -> Option<SimTime> {
        self.last_selfdev_ts
    }

    pub fn last_purchase_ts(&self, tier: PurchaseTier) -> Option<SimTime> {
        self.last_purchase_ts.get(&tier).copied()
    }

    pub fn interest(&self, topic: Topic) -> f64 {
        self.interests.get(&topic).copied().unwrap_or(0.0)
    }

    pub fn interests(&self) -> &HashMap<Topic, f64> {
        &self.interests
    }

    pub fn exposure_history(&self) -> &HashMap<TrendId, SimTime> {
        &self.exposure_history
    }

    // ------------------------------------------------------------------
    // Mutation (bulk path)
    // ------------------------------------------------------------------

    /// Apply named attribute deltas: add, then clamp to the attribute's
    /// valid range. Unknown attribute names are ignored, not an error.
    ///
    /// Returns the effective (post-clamp) changes, for the caller to filter
    /// and record as attribute history.
    pub fn update_state(&mut self, deltas: &HashMap<String, f64>) -> Vec<AttributeChange> {
        let mut changes = Vec::new();
        // Stable application order regardless of map iteration.
        for name in [
            "financial_capability",
            "trend_receptivity",
            "social_status",
            "energy_level",
            "time_budget",
        ] {
            if let Some(delta) = deltas.get(name) {
                if let Some(change) = self.apply_delta(name, *delta) {
                    changes.push(change);
                }
            }
        }
        changes
    }

    fn apply_delta(&mut self, name: &str, delta: f64) -> Option<AttributeChange> {
        let (old, new) = match name {
            "financial_capability" => {
                let old = self.financial_capability;
                self.financial_capability = clamp_attr(old + delta);
                (old, self.financial_capability)
            }
            "trend_receptivity" => {
                let old = self.trend_receptivity;
                self.trend_receptivity = clamp_attr(old + delta);
                (old, self.trend_receptivity)
            }
            "social_status" => {
                let old = self.social_status;
                self.social_status = clamp_attr(old + delta);
                (old, self.social_status)
            }
            "energy_level" => {
                let old = self.energy_level;
                self.energy_level = clamp_attr(old + delta);
                (old, self.energy_level)
            }
            "time_budget" => {
                let old = self.time_budget;
                self.time_budget = quantize_time_budget(old + delta);
                (old, self.time_budget)
            }
            _ => return None,
        };
        if old == new {
            return None;
        }
        Some(AttributeChange {
            attribute: name.to_string(),
            old,
            new,
        })
    }

    // ------------------------------------------------------------------
    // Mutation (direct recovery paths — no history records)
    // ------------------------------------------------------------------

    /// Periodic energy recovery. No-op for persons already at max.
    pub fn recover_energy(&mut self, amount: f64) {
        if self.energy_level < ATTR_MAX {
            self.energy_level = clamp_attr(self.energy_level + amount);
        }
    }

    /// Morning recovery: restore energy and financial capability toward max
    /// by the configured bonuses.
    pub fn morning_recovery(&mut self, energy_bonus: f64, financial_bonus: f64) {
        self.energy_level = clamp_attr(self.energy_level + energy_bonus);
        self.financial_capability = clamp_attr(self.financial_capability + financial_bonus);
    }

    /// Midnight reset: zero the purchase counter and the per-tier
    /// purchase timestamps.
    pub fn reset_daily(&mut self) {
        self.purchases_today = 0;
        self.last_purchase_ts.clear();
    }

    // ------------------------------------------------------------------
    // Tracking
    // ------------------------------------------------------------------

    pub fn note_post(&mut self, t: SimTime) {
        self.last_post_ts = Some(t);
    }

    pub fn note_selfdev(&mut self, t: SimTime) {
        self.last_selfdev_ts = Some(t);
    }

    pub fn note_purchase(&mut self, tier: PurchaseTier, t: SimTime) {
        self.purchases_today += 1;
        self.last_purchase_ts.insert(tier, t);
    }

    pub fn record_exposure(&mut self, trend_id: TrendId, t: SimTime) {
        self.exposure_history.insert(trend_id, t);
    }

    // ------------------------------------------------------------------
    // Eligibility
    // ------------------------------------------------------------------

    /// Whether the person may publish a post at simulated time `t`.
    ///
    /// Cooldown runs at half the configured post cooldown; beyond it the
    /// person needs energy ≥ 0.3 and time budget ≥ 0.15.
    pub fn can_post(&self, t: SimTime, config: &SimulationConfig) -> bool {
        if let Some(last) = self.last_post_ts {
            if t - last < config.post_cooldown_min / 2.0 {
                return false;
            }
        }
        self.energy_level >= 0.3 && self.time_budget >= 0.15
    }

    /// Whether the person may self-develop at simulated time `t`.
    pub fn can_self_dev(&self, t: SimTime, config: &SimulationConfig) -> bool {
        if let Some(last) = self.last_selfdev_ts {
            if t - last < config.selfdev_cooldown_min / 2.0 {
                return false;
            }
        }
        self.time_budget >= 0.8
    }

    /// Whether the person may purchase at the given tier.
    ///
    /// The daily counter hard-stops at twice the configured per-day limit;
    /// below that the person needs financial capability of at least half
    /// the tier's minimum cost.
    pub fn can_purchase(&self, _t: SimTime, tier: PurchaseTier, config: &SimulationConfig) -> bool {
        if self.purchases_today >= 2 * config.max_purchases_per_day {
            return false;
        }
        let Some(tier_cfg) = config.purchase_tiers.get(&tier) else {
            return false;
        };
        self.financial_capability >= 0.5 * tier_cfg.cost_range.0
    }

    // ------------------------------------------------------------------
    // Decisions
    // ------------------------------------------------------------------

    /// Threshold decision for a spontaneous post.
    ///
    /// The candidate topic is the person's highest-valued interest. The
    /// weighted score mixes interest, social status, trend receptivity and
    /// a random component, is scaled by the profession's topic affinity and
    /// raised by the configured flat bonus. Returns the candidate action
    /// when the score reaches the configured threshold.
    pub fn decide_action(
        &self,
        affinities: &AffinityTable,
        config: &SimulationConfig,
        rng: &mut RngManager,
    ) -> Option<(ActionKind, Topic)> {
        let (topic, interest) = top_interest(&self.interests)?;
        let mut score = 0.4 * (interest / 5.0)
            + 0.3 * (self.social_status / 5.0)
            + 0.2 * (self.trend_receptivity / 5.0)
            + 0.1 * rng.next_f64();
        score *= affinities.affinity(self.profession, topic) / 5.0;
        score += config.decision_bonus;
        if score >= config.decision_threshold {
            Some((ActionKind::Post, topic))
        } else {
            None
        }
    }

    /// Weighted random choice among all currently eligible actions.
    ///
    /// Candidates: Post, Purchase(L1..L3) and SelfDev, each gated by its
    /// eligibility check. Purchase weights carry the profession-specific
    /// purchase weighting; a trigger trend boosts the post weight in
    /// proportion to the profession's affinity with its topic. Returns
    /// `None` when no candidate has positive weight.
    pub fn decide_action_weighted(
        &self,
        trigger: Option<&Trend>,
        t: SimTime,
        affinities: &AffinityTable,
        config: &SimulationConfig,
        rng: &mut RngManager,
    ) -> Option<ActionKind> {
        let mut candidates = Vec::with_capacity(5);
        let mut weights = Vec::with_capacity(5);

        if self.can_post(t, config) {
            let mut w = 1.0 + self.social_status / 5.0;
            if let Some(trend) = trigger {
                w *= affinities.affinity(self.profession, trend.topic()) / 2.5;
            }
            candidates.push(ActionKind::Post);
            weights.push(w);
        }

        let purchase_weight = config.purchase_weight(self.profession);
        for tier in PurchaseTier::ALL {
            if self.can_purchase(t, tier, config) {
                candidates.push(ActionKind::Purchase(tier));
                weights.push(purchase_weight * (self.financial_capability / 5.0));
            }
        }

        if self.can_self_dev(t, config) {
            candidates.push(ActionKind::SelfDev);
            weights.push(self.time_budget / 5.0);
        }

        rng.pick_weighted(&weights).map(|i| candidates[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;

    fn test_person() -> Person {
        let mut interests = HashMap::new();
        interests.insert(Topic::Technology, 4.0);
        interests.insert(Topic::Sport, 1.0);
        Person::new(
            1,
            Profession::Developer,
            30,
            Sex::Male,
            3.0,
            3.0,
            3.0,
            3.0,
            3.0,
            interests,
        )
    }

    #[test]
    fn test_construction_clamps_and_quantizes() {
        let p = Person::new(
            2,
            Profession::Artist,
            41,
            Sex::Female,
            7.0,
            -1.0,
            2.5,
            5.5,
            3.3,
            HashMap::new(),
        );
        assert_eq!(p.financial_capability(), 5.0);
        assert_eq!(p.trend_receptivity(), 0.0);
        assert_eq!(p.energy_level(), 5.0);
        assert_eq!(p.time_budget(), 3.5);
    }

    #[test]
    fn test_update_state_clamps() {
        let mut p = test_person();
        let mut deltas = HashMap::new();
        deltas.insert("energy_level".to_string(), 10.0);
        deltas.insert("financial_capability".to_string(), -10.0);
        let changes = p.update_state(&deltas);

        assert_eq!(p.energy_level(), 5.0);
        assert_eq!(p.financial_capability(), 0.0);
        assert_eq!(changes.len(), 2);
    }

    #[test]
    fn test_update_state_ignores_unknown_attribute() {
        let mut p = test_person();
        let mut deltas = HashMap::new();
        deltas.insert("charisma".to_string(), 1.0);
        let changes = p.update_state(&deltas);
        assert!(changes.is_empty());
    }

    #[test]
    fn test_time_budget_stays_on_half_grid() {
        let mut p = test_person();
        let mut deltas = HashMap::new();
        deltas.insert("time_budget".to_string(), 0.2);
        p.update_state(&deltas);
        // 3.0 + 0.2 = 3.2 → rounds to 3.0
        assert_eq!(p.time_budget(), 3.0);

        deltas.insert("time_budget".to_string(), 0.3);
        p.update_state(&deltas);
        assert_eq!(p.time_budget(), 3.5);
    }

    #[test]
    fn test_noop_change_not_reported() {
        let mut p = test_person();
        let mut deltas = HashMap::new();
        deltas.insert("energy_level".to_string(), 10.0);
        p.update_state(&deltas);
        // Already at max; a further positive delta changes nothing.
        let changes = p.update_state(&deltas);
        assert!(changes.is_empty());
    }

    #[test]
    fn test_can_post_cooldown_at_half_window() {
        let config = SimulationConfig::default();
        let mut p = test_person();
        assert!(p.can_post(0.0, &config));

        p.note_post(100.0);
        let half = config.post_cooldown_min / 2.0;
        assert!(!p.can_post(100.0 + half - 0.1, &config));
        assert!(p.can_post(100.0 + half, &config));
    }

    #[test]
    fn test_can_post_is_idempotent() {
        let config = SimulationConfig::default();
        let mut p = test_person();
        p.note_post(100.0);
        let t = 110.0;
        let first = p.can_post(t, &config);
        for _ in 0..10 {
            assert_eq!(p.can_post(t, &config), first);
        }
    }

    #[test]
    fn test_can_post_resource_floors() {
        let config = SimulationConfig::default();
        let mut p = test_person();
        let mut deltas = HashMap::new();
        deltas.insert("energy_level".to_string(), -2.8);
        p.update_state(&deltas); // 0.2 < 0.3
        assert!(!p.can_post(0.0, &config));
    }

    #[test]
    fn test_can_self_dev_requires_time_budget() {
        let config = SimulationConfig::default();
        let mut p = test_person();
        assert!(p.can_self_dev(0.0, &config));

        let mut deltas = HashMap::new();
        deltas.insert("time_budget".to_string(), -2.5);
        p.update_state(&deltas); // 0.5 < 0.8
        assert!(!p.can_self_dev(0.0, &config));
    }

    #[test]
    fn test_can_purchase_daily_hard_stop() {
        let config = SimulationConfig::default();
        let mut p = test_person();
        assert!(p.can_purchase(0.0, PurchaseTier::L1, &config));

        for _ in 0..(2 * config.max_purchases_per_day) {
            p.note_purchase(PurchaseTier::L1, 0.0);
        }
        assert!(!p.can_purchase(0.0, PurchaseTier::L1, &config));

        p.reset_daily();
        assert!(p.can_purchase(0.0, PurchaseTier::L1, &config));
        assert_eq!(p.last_purchase_ts(PurchaseTier::L1), None);
    }

    #[test]
    fn test_can_purchase_financial_floor() {
        let config = SimulationConfig::default();
        let mut p = test_person();
        let mut deltas = HashMap::new();
        deltas.insert("financial_capability".to_string(), -3.0);
        p.update_state(&deltas); // 0.0 left
        assert!(!p.can_purchase(0.0, PurchaseTier::L3, &config));
    }

    #[test]
    fn test_decide_action_weighted_none_when_nothing_eligible() {
        let config = SimulationConfig::default();
        let affinities = AffinityTable::builtin();
        let mut rng = RngManager::new(7);
        let mut p = test_person();

        let mut deltas = HashMap::new();
        deltas.insert("energy_level".to_string(), -5.0);
        deltas.insert("time_budget".to_string(), -5.0);
        deltas.insert("financial_capability".to_string(), -5.0);
        p.update_state(&deltas);

        assert_eq!(
            p.decide_action_weighted(None, 0.0, &affinities, &config, &mut rng),
            None
        );
    }

    #[test]
    fn test_decide_action_returns_top_interest_topic() {
        let config = SimulationConfig::default();
        let affinities = AffinityTable::builtin();
        let mut rng = RngManager::new(7);
        let p = test_person();

        // Developer with Technology=4.0 top interest scores well above the
        // default threshold.
        let decided = p.decide_action(&affinities, &config, &mut rng);
        assert_eq!(decided, Some((ActionKind::Post, Topic::Technology)));
    }
}
