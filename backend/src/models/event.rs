//! Event taxonomy
//!
//! Every unit of scheduled work is one case of the closed [`SimEvent`] enum,
//! so the event set is exhaustively checkable at compile time. References to
//! persons and trends are explicit payload fields on the variant that needs
//! them. The execution semantics live in `events::handler`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::person::PurchaseTier;
use crate::models::trend::{Topic, TrendId};

/// Unique event identifier.
pub type EventId = Uuid;

/// Priority class of a scheduled event.
///
/// The queue orders primarily by this value ascending, timestamp as the
/// tie-break. Recurring system upkeep outranks agent actions, which outrank
/// background propagation and external factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventPriority {
    System = 0,
    Action = 1,
    Background = 2,
}

/// A scheduled unit of work, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    /// A person publishes a post, creating a trend. The optional trigger is
    /// the trend this post responds to (becomes the parent).
    PublishPost {
        person_id: u64,
        topic: Topic,
        trigger_trend_id: Option<TrendId>,
    },

    /// A person purchases at the given price tier.
    Purchase { person_id: u64, tier: PurchaseTier },

    /// A person invests time in self-development.
    SelfDevelopment { person_id: u64 },

    /// One influence propagation pass for an active trend.
    TrendInfluence { trend_id: TrendId },

    /// Periodic energy recovery for the whole population.
    EnergyRecovery,

    /// Nightly cycle marker.
    NightCycle,

    /// Morning restoration of energy and financial capability.
    MorningRecovery,

    /// Midnight reset of daily counters and purchase timestamps.
    DailyReset,

    /// Daily trend summary snapshot.
    SaveDailyTrend,

    /// External policy factor. Record-only.
    Law { label: String },

    /// External weather factor. Record-only.
    Weather { label: String },
}

impl SimEvent {
    /// Priority class this event kind schedules at.
    pub fn priority(&self) -> EventPriority {
        match self {
            SimEvent::EnergyRecovery
            | SimEvent::NightCycle
            | SimEvent::MorningRecovery
            | SimEvent::DailyReset
            | SimEvent::SaveDailyTrend => EventPriority::System,
            SimEvent::PublishPost { .. }
            | SimEvent::Purchase { .. }
            | SimEvent::SelfDevelopment { .. } => EventPriority::Action,
            SimEvent::TrendInfluence { .. }
            | SimEvent::Law { .. }
            | SimEvent::Weather { .. } => EventPriority::Background,
        }
    }

    /// Short kind label for event records.
    pub fn kind(&self) -> &'static str {
        match self {
            SimEvent::PublishPost { .. } => "PublishPost",
            SimEvent::Purchase { .. } => "Purchase",
            SimEvent::SelfDevelopment { .. } => "SelfDevelopment",
            SimEvent::TrendInfluence { .. } => "TrendInfluence",
            SimEvent::EnergyRecovery => "EnergyRecovery",
            SimEvent::NightCycle => "NightCycle",
            SimEvent::MorningRecovery => "MorningRecovery",
            SimEvent::DailyReset => "DailyReset",
            SimEvent::SaveDailyTrend => "SaveDailyTrend",
            SimEvent::Law { .. } => "Law",
            SimEvent::Weather { .. } => "Weather",
        }
    }

    /// Person this event acts on, if any.
    pub fn person_id(&self) -> Option<u64> {
        match self {
            SimEvent::PublishPost { person_id, .. }
            | SimEvent::Purchase { person_id, .. }
            | SimEvent::SelfDevelopment { person_id } => Some(*person_id),
            _ => None,
        }
    }

    /// Trend this event references, if any.
    pub fn trend_id(&self) -> Option<TrendId> {
        match self {
            SimEvent::PublishPost {
                trigger_trend_id, ..
            } => *trigger_trend_id,
            SimEvent::TrendInfluence { trend_id } => Some(*trend_id),
            _ => None,
        }
    }

    /// Whether this is one of the three direct agent actions (the kinds the
    /// daily action cap counts).
    pub fn is_agent_action(&self) -> bool {
        matches!(
            self,
            SimEvent::PublishPost { .. }
                | SimEvent::Purchase { .. }
                | SimEvent::SelfDevelopment { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_classes() {
        assert_eq!(SimEvent::NightCycle.priority(), EventPriority::System);
        assert_eq!(
            SimEvent::SelfDevelopment { person_id: 1 }.priority(),
            EventPriority::Action
        );
        assert_eq!(
            SimEvent::Weather {
                label: "storm".to_string()
            }
            .priority(),
            EventPriority::Background
        );
    }

    #[test]
    fn test_priority_ordering() {
        assert!(EventPriority::System < EventPriority::Action);
        assert!(EventPriority::Action < EventPriority::Background);
    }

    #[test]
    fn test_person_and_trend_accessors() {
        let trend_id = Uuid::new_v4();
        let event = SimEvent::PublishPost {
            person_id: 9,
            topic: Topic::Health,
            trigger_trend_id: Some(trend_id),
        };
        assert_eq!(event.person_id(), Some(9));
        assert_eq!(event.trend_id(), Some(trend_id));
        assert!(event.is_agent_action());

        assert_eq!(SimEvent::EnergyRecovery.person_id(), None);
        assert!(!SimEvent::EnergyRecovery.is_agent_action());
    }
}
