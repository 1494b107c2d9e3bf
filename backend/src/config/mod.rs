//! Simulation configuration
//!
//! One immutable [`SimulationConfig`] value is constructed at startup,
//! validated once, and passed by reference into every component that needs
//! it. There is no global mutable configuration state.
//!
//! The profession→topic affinity table and the per-profession attribute
//! ranges are loaded through the persistence gateway at initialization;
//! built-in tables are provided for gateways without stored ones and for
//! tests.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::person::{Profession, PurchaseTier};
use crate::models::trend::Topic;

/// Errors raised validating configuration at initialization.
///
/// All of these are fatal: they abort the run before any event processing.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("batch size must be greater than zero")]
    ZeroBatchSize,

    #[error("{name} must be greater than zero")]
    ZeroCount { name: &'static str },

    #[error("purchase tier {tier} missing from configuration")]
    MissingPurchaseTier { tier: &'static str },

    #[error("purchase tier {tier} cost range [{min}, {max}] is invalid")]
    InvalidCostRange { tier: &'static str, min: f64, max: f64 },

    #[error("response delay range [{min}, {max}] is invalid")]
    InvalidResponseDelay { min: f64, max: f64 },

    #[error("seed fraction {value} outside (0.0, 1.0]")]
    InvalidSeedFraction { value: f64 },

    #[error("attribute ranges missing for profession {profession}")]
    MissingAttributeRanges { profession: &'static str },

    #[error("attribute range for {profession}.{attribute} is invalid")]
    InvalidAttributeRange {
        profession: &'static str,
        attribute: &'static str,
    },
}

/// Per-tier purchase configuration: the cost draw range and the attribute
/// effects applied on top of the financial cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseTierConfig {
    /// Uniform cost range (min, max) the purchase price is drawn from.
    pub cost_range: (f64, f64),
    /// Named attribute deltas applied alongside the financial cost.
    pub effects: HashMap<String, f64>,
}

/// Complete simulation configuration.
///
/// Read once at initialization, immutable for the run's duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Full post cooldown in simulated minutes (eligibility gates at half).
    pub post_cooldown_min: f64,

    /// Full self-development cooldown in simulated minutes.
    pub selfdev_cooldown_min: f64,

    /// Nominal purchases per day (the eligibility check hard-stops at twice this).
    pub max_purchases_per_day: u32,

    /// Hard ceiling on total actions per person per simulated day.
    pub daily_action_cap: u32,

    /// Threshold a weighted decision score must reach to act.
    pub decision_threshold: f64,

    /// Flat bonus added to every decision score.
    pub decision_bonus: f64,

    /// Per-tier purchase configuration. All three tiers must be present.
    pub purchase_tiers: BTreeMap<PurchaseTier, PurchaseTierConfig>,

    /// Attribute deltas applied by a self-development action.
    pub selfdev_effects: HashMap<String, f64>,

    /// Per-profession purchase weighting; professions not listed weigh 1.0.
    pub profession_purchase_weights: HashMap<Profession, f64>,

    /// Energy added per recovery pass to persons below max.
    pub energy_recovery_amount: f64,

    /// Interval between recovery passes, simulated minutes.
    pub energy_recovery_interval_min: f64,

    /// Morning recovery bonus toward max energy.
    pub morning_energy_bonus: f64,

    /// Morning recovery bonus toward max financial capability.
    pub morning_financial_bonus: f64,

    /// Interaction count above which influence propagation goes dormant.
    pub trend_interaction_ceiling: u64,

    /// Delay between a post and its first influence pass, simulated minutes.
    pub influence_delay_min: f64,

    /// Response-post delay range after an influence exposure (min, max).
    pub response_delay_range_min: (f64, f64),

    /// Flush when the batch reaches this many records.
    pub batch_size: usize,

    /// Flush when this many simulated minutes elapsed since the last flush.
    pub batch_interval_min: f64,

    /// Interval between full-population action reconsideration passes.
    pub reconsider_interval_min: f64,

    /// Stop scheduling fresh agent actions this close to end time.
    pub scheduling_margin_min: f64,

    /// Fraction of the population seeded with an initial action.
    pub seed_fraction: f64,

    /// Jitter range for seed-pass action timestamps (min, max minutes).
    pub seed_jitter_range_min: (f64, f64),
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let mut purchase_tiers = BTreeMap::new();
        purchase_tiers.insert(
            PurchaseTier::L1,
            PurchaseTierConfig {
                cost_range: (0.2, 1.0),
                effects: HashMap::from([
                    ("time_budget".to_string(), -0.5),
                    ("energy_level".to_string(), 0.1),
                    ("social_status".to_string(), 0.05),
                ]),
            },
        );
        purchase_tiers.insert(
            PurchaseTier::L2,
            PurchaseTierConfig {
                cost_range: (1.0, 2.5),
                effects: HashMap::from([
                    ("time_budget".to_string(), -0.5),
                    ("energy_level".to_string(), 0.05),
                    ("social_status".to_string(), 0.15),
                ]),
            },
        );
        purchase_tiers.insert(
            PurchaseTier::L3,
            PurchaseTierConfig {
                cost_range: (2.5, 4.5),
                effects: HashMap::from([
                    ("time_budget".to_string(), -1.0),
                    ("energy_level".to_string(), -0.1),
                    ("social_status".to_string(), 0.4),
                ]),
            },
        );

        let profession_purchase_weights = HashMap::from([
            (Profession::Businessman, 1.5),
            (Profession::Politician, 1.3),
            (Profession::Blogger, 1.2),
            (Profession::Athlete, 1.1),
            (Profession::Doctor, 1.1),
            (Profession::Artist, 0.9),
            (Profession::Musician, 0.9),
            (Profession::Teacher, 0.9),
            (Profession::Scientist, 0.8),
            (Profession::Worker, 0.8),
        ]);

        Self {
            post_cooldown_min: 60.0,
            selfdev_cooldown_min: 120.0,
            max_purchases_per_day: 3,
            daily_action_cap: 43,
            decision_threshold: 0.45,
            decision_bonus: 0.1,
            purchase_tiers,
            selfdev_effects: HashMap::from([
                ("time_budget".to_string(), -1.0),
                ("energy_level".to_string(), -0.3),
                ("social_status".to_string(), 0.2),
                ("financial_capability".to_string(), 0.1),
            ]),
            profession_purchase_weights,
            energy_recovery_amount: 0.12,
            energy_recovery_interval_min: 5.0,
            morning_energy_bonus: 1.5,
            morning_financial_bonus: 0.5,
            trend_interaction_ceiling: 100,
            influence_delay_min: 5.0,
            response_delay_range_min: (10.0, 60.0),
            batch_size: 1000,
            batch_interval_min: 10.0,
            reconsider_interval_min: 15.0,
            scheduling_margin_min: 30.0,
            seed_fraction: 0.1,
            seed_jitter_range_min: (1.0, 30.0),
        }
    }
}

impl SimulationConfig {
    /// Validate the configuration. Any failure is fatal at initialization.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("post_cooldown_min", self.post_cooldown_min),
            ("selfdev_cooldown_min", self.selfdev_cooldown_min),
            ("energy_recovery_interval_min", self.energy_recovery_interval_min),
            ("influence_delay_min", self.influence_delay_min),
            ("batch_interval_min", self.batch_interval_min),
            ("reconsider_interval_min", self.reconsider_interval_min),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        if self.scheduling_margin_min < 0.0 {
            return Err(ConfigError::NonPositive {
                name: "scheduling_margin_min",
                value: self.scheduling_margin_min,
            });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.max_purchases_per_day == 0 {
            return Err(ConfigError::ZeroCount {
                name: "max_purchases_per_day",
            });
        }
        if self.daily_action_cap == 0 {
            return Err(ConfigError::ZeroCount {
                name: "daily_action_cap",
            });
        }
        for tier in PurchaseTier::ALL {
            let Some(cfg) = self.purchase_tiers.get(&tier) else {
                return Err(ConfigError::MissingPurchaseTier {
                    tier: tier.as_str(),
                });
            };
            let (min, max) = cfg.cost_range;
            if min < 0.0 || min >= max {
                return Err(ConfigError::InvalidCostRange {
                    tier: tier.as_str(),
                    min,
                    max,
                });
            }
        }
        let (rmin, rmax) = self.response_delay_range_min;
        if rmin <= 0.0 || rmin >= rmax {
            return Err(ConfigError::InvalidResponseDelay { min: rmin, max: rmax });
        }
        if self.seed_fraction <= 0.0 || self.seed_fraction > 1.0 {
            return Err(ConfigError::InvalidSeedFraction {
                value: self.seed_fraction,
            });
        }
        Ok(())
    }

    /// Purchase weighting for a profession (1.0 when not listed).
    pub fn purchase_weight(&self, profession: Profession) -> f64 {
        self.profession_purchase_weights
            .get(&profession)
            .copied()
            .unwrap_or(1.0)
    }
}

// ============================================================================
// Affinity Table
// ============================================================================

/// Fixed profession × topic affinity table.
///
/// Values are [1, 5] scores; unmapped combinations fall back to 2.5.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffinityTable {
    table: HashMap<Profession, HashMap<Topic, f64>>,
}

impl AffinityTable {
    pub fn from_map(table: HashMap<Profession, HashMap<Topic, f64>>) -> Self {
        Self { table }
    }

    /// Affinity of a profession for a topic, clamped to [1, 5], with 2.5
    /// as the fallback for unmapped combinations.
    pub fn affinity(&self, profession: Profession, topic: Topic) -> f64 {
        self.table
            .get(&profession)
            .and_then(|row| row.get(&topic))
            .copied()
            .unwrap_or(2.5)
            .clamp(1.0, 5.0)
    }

    /// The built-in reference table covering all 12 professions × 7 topics.
    pub fn builtin() -> Self {
        // Topic order: Culture, Economy, Health, Politics, Science, Sport, Technology
        let rows: [(Profession, [f64; 7]); 12] = [
            (Profession::Artist, [5.0, 2.0, 2.5, 2.0, 2.5, 2.0, 2.5]),
            (Profession::Athlete, [2.0, 2.0, 4.5, 1.5, 1.5, 5.0, 2.0]),
            (Profession::Blogger, [4.0, 3.0, 3.0, 3.5, 2.5, 3.0, 4.0]),
            (Profession::Businessman, [2.5, 5.0, 2.5, 4.0, 2.5, 2.5, 3.5]),
            (Profession::Developer, [2.5, 3.0, 2.0, 2.0, 4.0, 2.0, 5.0]),
            (Profession::Doctor, [2.5, 2.5, 5.0, 2.5, 4.0, 3.0, 3.0]),
            (Profession::Engineer, [2.0, 3.0, 2.5, 2.0, 4.5, 2.5, 4.5]),
            (Profession::Musician, [5.0, 2.0, 2.5, 2.0, 2.0, 2.0, 3.0]),
            (Profession::Politician, [3.0, 4.5, 3.0, 5.0, 2.5, 2.5, 2.5]),
            (Profession::Scientist, [3.0, 3.0, 3.5, 2.5, 5.0, 2.0, 4.0]),
            (Profession::Teacher, [4.0, 2.5, 3.0, 3.0, 4.5, 2.5, 3.0]),
            (Profession::Worker, [2.0, 3.5, 3.0, 3.0, 2.0, 3.5, 2.5]),
        ];

        let mut table = HashMap::new();
        for (profession, values) in rows {
            let row: HashMap<Topic, f64> = Topic::ALL
                .iter()
                .copied()
                .zip(values.iter().copied())
                .collect();
            table.insert(profession, row);
        }
        Self { table }
    }
}

// ============================================================================
// Attribute Ranges
// ============================================================================

/// Bootstrap value ranges for one profession's dynamic attributes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttributeRanges {
    pub financial_capability: (f64, f64),
    pub trend_receptivity: (f64, f64),
    pub social_status: (f64, f64),
    pub energy_level: (f64, f64),
    pub time_budget: (f64, f64),
}

impl AttributeRanges {
    fn check_one(
        profession: &'static str,
        attribute: &'static str,
        (min, max): (f64, f64),
    ) -> Result<(), ConfigError> {
        if min < 0.0 || max > 5.0 || min > max {
            return Err(ConfigError::InvalidAttributeRange {
                profession,
                attribute,
            });
        }
        Ok(())
    }

    fn validate(&self, profession: &'static str) -> Result<(), ConfigError> {
        Self::check_one(profession, "financial_capability", self.financial_capability)?;
        Self::check_one(profession, "trend_receptivity", self.trend_receptivity)?;
        Self::check_one(profession, "social_status", self.social_status)?;
        Self::check_one(profession, "energy_level", self.energy_level)?;
        Self::check_one(profession, "time_budget", self.time_budget)?;
        Ok(())
    }
}

/// Verify every profession has a valid attribute-range entry.
///
/// A missing or invalid entry is fatal at initialization.
pub fn validate_attribute_ranges(
    ranges: &HashMap<Profession, AttributeRanges>,
) -> Result<(), ConfigError> {
    for profession in Profession::ALL {
        let Some(r) = ranges.get(&profession) else {
            return Err(ConfigError::MissingAttributeRanges {
                profession: profession.as_str(),
            });
        };
        r.validate(profession.as_str())?;
    }
    Ok(())
}

/// Built-in per-profession attribute ranges.
pub fn builtin_attribute_ranges() -> HashMap<Profession, AttributeRanges> {
    fn ranges(
        financial: (f64, f64),
        receptivity: (f64, f64),
        social: (f64, f64),
        energy: (f64, f64),
        time: (f64, f64),
    ) -> AttributeRanges {
        AttributeRanges {
            financial_capability: financial,
            trend_receptivity: receptivity,
            social_status: social,
            energy_level: energy,
            time_budget: time,
        }
    }

    HashMap::from([
        (Profession::Artist, ranges((0.5, 2.5), (2.5, 4.5), (1.5, 4.0), (2.0, 4.5), (2.0, 4.5))),
        (Profession::Athlete, ranges((1.5, 3.5), (1.5, 3.5), (2.0, 4.5), (3.5, 5.0), (1.5, 3.5))),
        (Profession::Blogger, ranges((1.0, 3.0), (3.0, 5.0), (2.0, 5.0), (2.5, 4.5), (2.5, 5.0))),
        (Profession::Businessman, ranges((3.0, 5.0), (1.5, 3.5), (2.5, 5.0), (2.5, 4.5), (1.0, 3.0))),
        (Profession::Developer, ranges((2.5, 4.5), (2.0, 4.0), (1.5, 3.5), (2.0, 4.0), (1.5, 3.5))),
        (Profession::Doctor, ranges((2.5, 4.5), (1.0, 3.0), (2.5, 4.5), (1.5, 3.5), (1.0, 2.5))),
        (Profession::Engineer, ranges((2.0, 4.0), (1.5, 3.5), (1.5, 3.5), (2.0, 4.0), (1.5, 3.5))),
        (Profession::Musician, ranges((0.5, 2.5), (2.5, 4.5), (1.5, 4.5), (2.0, 4.5), (2.0, 4.5))),
        (Profession::Politician, ranges((3.0, 5.0), (1.0, 3.0), (3.5, 5.0), (2.0, 4.0), (1.0, 2.5))),
        (Profession::Scientist, ranges((1.5, 3.5), (1.5, 3.5), (1.5, 3.5), (2.0, 4.0), (1.5, 3.0))),
        (Profession::Teacher, ranges((1.0, 3.0), (2.0, 4.0), (2.0, 4.0), (2.0, 4.0), (1.5, 3.0))),
        (Profession::Worker, ranges((1.0, 3.0), (1.5, 3.5), (1.0, 3.0), (2.5, 4.5), (2.0, 4.0))),
    ])
}
