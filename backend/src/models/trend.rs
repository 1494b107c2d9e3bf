//! Trend model
//!
//! A trend is one unit of spreading information: a post made by some person
//! on one of the closed set of topics. Trends live in the in-memory active
//! index for the duration of a run; the only mutation after creation is the
//! interaction counter. Virality is derived, never stored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::time::SimTime;

/// Unique trend identifier.
pub type TrendId = Uuid;

/// The closed set of topics a trend can carry.
///
/// Interests on persons are keyed by the same seven categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Topic {
    Culture,
    Economy,
    Health,
    Politics,
    Science,
    Sport,
    Technology,
}

impl Topic {
    /// All topics, in stable order.
    pub const ALL: [Topic; 7] = [
        Topic::Culture,
        Topic::Economy,
        Topic::Health,
        Topic::Politics,
        Topic::Science,
        Topic::Sport,
        Topic::Technology,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Culture => "Culture",
            Topic::Economy => "Economy",
            Topic::Health => "Health",
            Topic::Politics => "Politics",
            Topic::Science => "Science",
            Topic::Sport => "Sport",
            Topic::Technology => "Technology",
        }
    }
}

/// Binary emotional valence of a trend, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Negative,
}

impl Sentiment {
    /// Parse from a label. Exactly two values are admissible; anything
    /// else is rejected.
    pub fn parse(label: &str) -> Result<Sentiment, TrendError> {
        match label {
            "Positive" => Ok(Sentiment::Positive),
            "Negative" => Ok(Sentiment::Negative),
            other => Err(TrendError::InvalidSentiment {
                value: other.to_string(),
            }),
        }
    }

    /// +1.0 for positive, -1.0 for negative. Drives the author effect.
    pub fn sign(&self) -> f64 {
        match self {
            Sentiment::Positive => 1.0,
            Sentiment::Negative => -1.0,
        }
    }
}

/// Reach classification of a trend, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoverageLevel {
    Low,
    Middle,
    High,
}

impl CoverageLevel {
    /// Derive the coverage level from the author's social status.
    ///
    /// ≥ 4.0 → High, < 1.5 → Low, else Middle.
    pub fn from_social_status(social_status: f64) -> CoverageLevel {
        if social_status >= 4.0 {
            CoverageLevel::High
        } else if social_status < 1.5 {
            CoverageLevel::Low
        } else {
            CoverageLevel::Middle
        }
    }

    /// Fraction of the population a TrendInfluence pass samples.
    pub fn factor(&self) -> f64 {
        match self {
            CoverageLevel::Low => 0.3,
            CoverageLevel::Middle => 0.6,
            CoverageLevel::High => 1.0,
        }
    }
}

/// Errors raised constructing a trend
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TrendError {
    #[error("invalid sentiment value: {value} (expected Positive or Negative)")]
    InvalidSentiment { value: String },

    #[error("base virality {value} outside [0.0, 5.0]")]
    BaseViralityOutOfRange { value: f64 },

    #[error("parent trend created at {parent_at} does not predate child at {child_at}")]
    ParentNotOlder { parent_at: SimTime, child_at: SimTime },
}

/// One unit of spreading information.
///
/// # Example
/// ```
/// use social_simulator_core_rs::models::trend::{Trend, Topic, Sentiment, CoverageLevel};
///
/// let trend = Trend::new(Topic::Science, 7, None, 3.0, CoverageLevel::High,
///                        Sentiment::Positive, 0.0).unwrap();
/// assert_eq!(trend.current_virality(), 3.0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trend {
    id: TrendId,
    topic: Topic,
    originator_id: u64,
    parent_id: Option<TrendId>,
    base_virality_score: f64,
    coverage_level: CoverageLevel,
    sentiment: Sentiment,
    total_interactions: u64,
    created_at: SimTime,
}

impl Trend {
    /// Create a trend. The parent linkage (and its predates-the-child
    /// invariant) is validated by the caller holding the active index;
    /// see [`Trend::check_parent_ordering`].
    pub fn new(
        topic: Topic,
        originator_id: u64,
        parent_id: Option<TrendId>,
        base_virality_score: f64,
        coverage_level: CoverageLevel,
        sentiment: Sentiment,
        created_at: SimTime,
    ) -> Result<Self, TrendError> {
        if !(0.0..=5.0).contains(&base_virality_score) {
            return Err(TrendError::BaseViralityOutOfRange {
                value: base_virality_score,
            });
        }
        Ok(Self {
            id: Uuid::new_v4(),
            topic,
            originator_id,
            parent_id,
            base_virality_score,
            coverage_level,
            sentiment,
            total_interactions: 0,
            created_at,
        })
    }

    /// Rebuild a trend from persisted state (gateway fetch, snapshot).
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: TrendId,
        topic: Topic,
        originator_id: u64,
        parent_id: Option<TrendId>,
        base_virality_score: f64,
        coverage_level: CoverageLevel,
        sentiment: Sentiment,
        total_interactions: u64,
        created_at: SimTime,
    ) -> Self {
        Self {
            id,
            topic,
            originator_id,
            parent_id,
            base_virality_score,
            coverage_level,
            sentiment,
            total_interactions,
            created_at,
        }
    }

    /// Verify a parent trend predates its child.
    pub fn check_parent_ordering(parent: &Trend, child_at: SimTime) -> Result<(), TrendError> {
        if parent.created_at >= child_at {
            return Err(TrendError::ParentNotOlder {
                parent_at: parent.created_at,
                child_at,
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn id(&self) -> TrendId {
        self.id
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub fn originator_id(&self) -> u64 {
        self.originator_id
    }

    pub fn parent_id(&self) -> Option<TrendId> {
        self.parent_id
    }

    pub fn base_virality_score(&self) -> f64 {
        self.base_virality_score
    }

    pub fn coverage_level(&self) -> CoverageLevel {
        self.coverage_level
    }

    pub fn sentiment(&self) -> Sentiment {
        self.sentiment
    }

    pub fn total_interactions(&self) -> u64 {
        self.total_interactions
    }

    pub fn created_at(&self) -> SimTime {
        self.created_at
    }

    // ------------------------------------------------------------------
    // Derived state
    // ------------------------------------------------------------------

    /// `min(5.0, base + 0.05 * ln(total_interactions + 1))`.
    ///
    /// Non-decreasing in the interaction count, capped at 5.0.
    pub fn current_virality(&self) -> f64 {
        let bonus = 0.05 * ((self.total_interactions + 1) as f64).ln();
        (self.base_virality_score + bonus).min(5.0)
    }

    /// Record one audience interaction.
    pub fn register_interaction(&mut self) {
        self.total_interactions += 1;
    }
}

/// Interest map helper: the highest-affinity topic of an interest table.
///
/// Ties break toward the earlier topic in [`Topic::ALL`] order so the
/// outcome does not depend on hash iteration.
pub fn top_interest(interests: &HashMap<Topic, f64>) -> Option<(Topic, f64)> {
    let mut best: Option<(Topic, f64)> = None;
    for topic in Topic::ALL {
        if let Some(v) = interests.get(&topic) {
            match best {
                Some((_, bv)) if *v <= bv => {}
                _ => best = Some((topic, *v)),
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trend_with_base(base: f64) -> Trend {
        Trend::new(
            Topic::Science,
            1,
            None,
            base,
            CoverageLevel::Middle,
            Sentiment::Positive,
            0.0,
        )
        .unwrap()
    }

    #[test]
    fn test_sentiment_parse_rejects_other_values() {
        assert_eq!(Sentiment::parse("Positive"), Ok(Sentiment::Positive));
        assert_eq!(Sentiment::parse("Negative"), Ok(Sentiment::Negative));
        assert!(Sentiment::parse("Neutral").is_err());
        assert!(Sentiment::parse("").is_err());
    }

    #[test]
    fn test_coverage_from_social_status_thresholds() {
        assert_eq!(CoverageLevel::from_social_status(4.5), CoverageLevel::High);
        assert_eq!(CoverageLevel::from_social_status(4.0), CoverageLevel::High);
        assert_eq!(CoverageLevel::from_social_status(1.0), CoverageLevel::Low);
        assert_eq!(CoverageLevel::from_social_status(1.5), CoverageLevel::Middle);
        assert_eq!(CoverageLevel::from_social_status(3.0), CoverageLevel::Middle);
    }

    #[test]
    fn test_coverage_factor_mapping() {
        assert_eq!(CoverageLevel::Low.factor(), 0.3);
        assert_eq!(CoverageLevel::Middle.factor(), 0.6);
        assert_eq!(CoverageLevel::High.factor(), 1.0);
    }

    #[test]
    fn test_virality_at_zero_interactions_is_base() {
        let trend = trend_with_base(3.0);
        assert!((trend.current_virality() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_virality_reference_value() {
        // base=3.0, interactions=200 → min(5, 3 + 0.05*ln(201)) ≈ 3.265
        let mut trend = trend_with_base(3.0);
        for _ in 0..200 {
            trend.register_interaction();
        }
        let v = trend.current_virality();
        assert!((v - (3.0 + 0.05 * 201f64.ln())).abs() < 1e-12);
        assert!((v - 3.265).abs() < 0.001);
    }

    #[test]
    fn test_virality_never_exceeds_cap() {
        let mut trend = trend_with_base(5.0);
        for _ in 0..10_000 {
            trend.register_interaction();
        }
        assert_eq!(trend.current_virality(), 5.0);
    }

    #[test]
    fn test_base_virality_out_of_range_rejected() {
        assert!(Trend::new(
            Topic::Sport,
            1,
            None,
            5.1,
            CoverageLevel::Low,
            Sentiment::Negative,
            0.0
        )
        .is_err());
    }

    #[test]
    fn test_parent_ordering_check() {
        let parent = trend_with_base(1.0);
        assert!(Trend::check_parent_ordering(&parent, 5.0).is_ok());
        assert!(Trend::check_parent_ordering(&parent, 0.0).is_err());
    }

    #[test]
    fn test_top_interest_prefers_highest() {
        let mut interests = HashMap::new();
        interests.insert(Topic::Sport, 2.0);
        interests.insert(Topic::Economy, 4.5);
        interests.insert(Topic::Culture, 4.5);
        // Tie between Economy and Culture breaks toward Culture (earlier in ALL).
        let (topic, value) = top_interest(&interests).unwrap();
        assert_eq!(topic, Topic::Culture);
        assert_eq!(value, 4.5);
    }
}
