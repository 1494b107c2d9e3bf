//! Mutable simulation world
//!
//! [`SimulationState`] owns the population, the active-trend index and the
//! per-(person, day) action counters. Ordered maps keep iteration (and thus
//! audience sampling) deterministic under a fixed RNG seed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::time::SimTime;
use crate::models::person::Person;
use crate::models::trend::{Topic, Trend, TrendId};

/// The live world the event handlers mutate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationState {
    persons: BTreeMap<u64, Person>,
    trends: BTreeMap<TrendId, Trend>,
    /// Actions taken per (person, simulated day). Enforces the daily cap.
    daily_actions: BTreeMap<(u64, u64), u32>,
}

impl SimulationState {
    pub fn new(persons: Vec<Person>) -> Self {
        Self {
            persons: persons.into_iter().map(|p| (p.id(), p)).collect(),
            trends: BTreeMap::new(),
            daily_actions: BTreeMap::new(),
        }
    }

    // ------------------------------------------------------------------
    // Persons
    // ------------------------------------------------------------------

    pub fn population(&self) -> usize {
        self.persons.len()
    }

    pub fn person(&self, id: u64) -> Option<&Person> {
        self.persons.get(&id)
    }

    pub fn person_mut(&mut self, id: u64) -> Option<&mut Person> {
        self.persons.get_mut(&id)
    }

    pub fn persons(&self) -> impl Iterator<Item = &Person> {
        self.persons.values()
    }

    pub fn persons_mut(&mut self) -> impl Iterator<Item = &mut Person> {
        self.persons.values_mut()
    }

    /// Person ids in stable ascending order.
    pub fn person_ids(&self) -> Vec<u64> {
        self.persons.keys().copied().collect()
    }

    // ------------------------------------------------------------------
    // Trends
    // ------------------------------------------------------------------

    pub fn active_trend_count(&self) -> usize {
        self.trends.len()
    }

    pub fn trend(&self, id: TrendId) -> Option<&Trend> {
        self.trends.get(&id)
    }

    pub fn trend_mut(&mut self, id: TrendId) -> Option<&mut Trend> {
        self.trends.get_mut(&id)
    }

    pub fn trends(&self) -> impl Iterator<Item = &Trend> {
        self.trends.values()
    }

    pub fn insert_trend(&mut self, trend: Trend) {
        self.trends.insert(trend.id(), trend);
    }

    /// The most-interacted active trend on `topic` authored by someone other
    /// than `exclude_author`. Used for implicit parent resolution.
    pub fn most_interacted_trend(&self, topic: Topic, exclude_author: u64) -> Option<&Trend> {
        self.trends
            .values()
            .filter(|t| t.topic() == topic && t.originator_id() != exclude_author)
            .max_by_key(|t| t.total_interactions())
    }

    // ------------------------------------------------------------------
    // Daily action accounting
    // ------------------------------------------------------------------

    /// Actions already taken by `person_id` on simulated day `day`.
    pub fn actions_taken(&self, person_id: u64, day: u64) -> u32 {
        self.daily_actions
            .get(&(person_id, day))
            .copied()
            .unwrap_or(0)
    }

    /// Try to reserve one action slot for `person_id` on `day` under `cap`.
    ///
    /// Returns false (and records nothing) once the cap is reached.
    pub fn try_take_action_slot(&mut self, person_id: u64, day: u64, cap: u32) -> bool {
        let count = self.daily_actions.entry((person_id, day)).or_insert(0);
        if *count >= cap {
            return false;
        }
        *count += 1;
        true
    }

    /// Drop daily counters for days before `current_day`.
    pub fn prune_action_counters(&mut self, current_day: u64) {
        self.daily_actions.retain(|(_, day), _| *day >= current_day);
    }

    /// Restore a snapshot of persons and trends (resume path).
    pub fn replace_world(&mut self, persons: Vec<Person>, trends: Vec<Trend>) {
        self.persons = persons.into_iter().map(|p| (p.id(), p)).collect();
        self.trends = trends.into_iter().map(|t| (t.id(), t)).collect();
        self.daily_actions.clear();
    }

    /// Apply exposure timestamps when rebuilding from persisted state.
    pub fn record_exposure(&mut self, person_id: u64, trend_id: TrendId, t: SimTime) {
        if let Some(person) = self.persons.get_mut(&person_id) {
            person.record_exposure(trend_id, t);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::person::{Profession, Sex};
    use crate::models::trend::{CoverageLevel, Sentiment};
    use std::collections::HashMap;

    fn person(id: u64) -> Person {
        Person::new(
            id,
            Profession::Worker,
            35,
            Sex::Male,
            2.0,
            2.0,
            2.0,
            3.0,
            3.0,
            HashMap::new(),
        )
    }

    fn trend(author: u64, topic: Topic, interactions: u64) -> Trend {
        let mut t = Trend::new(
            topic,
            author,
            None,
            2.0,
            CoverageLevel::Middle,
            Sentiment::Positive,
            0.0,
        )
        .unwrap();
        for _ in 0..interactions {
            t.register_interaction();
        }
        t
    }

    #[test]
    fn test_daily_cap_enforced() {
        let mut state = SimulationState::new(vec![person(1)]);
        for _ in 0..43 {
            assert!(state.try_take_action_slot(1, 0, 43));
        }
        assert!(!state.try_take_action_slot(1, 0, 43));
        // Next day starts fresh.
        assert!(state.try_take_action_slot(1, 1, 43));
    }

    #[test]
    fn test_prune_action_counters() {
        let mut state = SimulationState::new(vec![person(1)]);
        state.try_take_action_slot(1, 0, 43);
        state.try_take_action_slot(1, 1, 43);
        state.prune_action_counters(1);
        assert_eq!(state.actions_taken(1, 0), 0);
        assert_eq!(state.actions_taken(1, 1), 1);
    }

    #[test]
    fn test_most_interacted_trend_excludes_author() {
        let mut state = SimulationState::new(vec![person(1), person(2)]);
        let own = trend(1, Topic::Science, 50);
        let other = trend(2, Topic::Science, 10);
        let off_topic = trend(2, Topic::Sport, 90);
        state.insert_trend(own.clone());
        state.insert_trend(other.clone());
        state.insert_trend(off_topic);

        let found = state.most_interacted_trend(Topic::Science, 1).unwrap();
        assert_eq!(found.id(), other.id());

        // Nobody else posted on Economy.
        assert!(state.most_interacted_trend(Topic::Economy, 1).is_none());
    }
}
