//! Status conditions with replace-by-type semantics.
//!
//! Conditions are held in a map keyed by type so that an update can only ever
//! replace the condition of the same type. The serialized form is a sequence
//! ordered by type.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    pub reason: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
}

impl Condition {
    pub fn new(type_: impl Into<String>, status: ConditionStatus, reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_: type_.into(),
            status,
            reason: reason.into(),
            message: message.into(),
            observed_generation: None,
            last_transition_time: None,
        }
    }

    pub fn with_observed_generation(mut self, generation: Option<i64>) -> Self {
        self.observed_generation = generation;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "Vec<Condition>", into = "Vec<Condition>")]
pub struct ConditionSet {
    by_type: BTreeMap<String, Condition>,
}

impl ConditionSet {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.by_type.len() }
    pub fn is_empty(&self) -> bool { self.by_type.is_empty() }

    pub fn get(&self, type_: &str) -> Option<&Condition> { self.by_type.get(type_) }

    pub fn is_status(&self, type_: &str, status: ConditionStatus) -> bool {
        self.get(type_).map(|c| c.status == status).unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> { self.by_type.values() }

    /// Insert `cond`, or replace the condition with the same type.
    ///
    /// `lastTransitionTime` only moves when the status changes; a missing
    /// timestamp on a new condition is filled with the current time.
    /// Returns true when anything observable changed.
    pub fn set(&mut self, cond: Condition) -> bool {
        self.set_at(cond, Utc::now())
    }

    pub fn set_at(&mut self, mut cond: Condition, now: DateTime<Utc>) -> bool {
        match self.by_type.get_mut(&cond.type_) {
            None => {
                if cond.last_transition_time.is_none() {
                    cond.last_transition_time = Some(now);
                }
                self.by_type.insert(cond.type_.clone(), cond);
                true
            }
            Some(existing) => {
                let mut changed = false;
                if existing.status != cond.status {
                    existing.status = cond.status;
                    existing.last_transition_time = Some(cond.last_transition_time.unwrap_or(now));
                    changed = true;
                }
                if existing.reason != cond.reason {
                    existing.reason = cond.reason;
                    changed = true;
                }
                if existing.message != cond.message {
                    existing.message = cond.message;
                    changed = true;
                }
                if existing.observed_generation != cond.observed_generation {
                    existing.observed_generation = cond.observed_generation;
                    changed = true;
                }
                changed
            }
        }
    }

}

impl From<Vec<Condition>> for ConditionSet {
    fn from(v: Vec<Condition>) -> Self {
        // Duplicate types in persisted status collapse to the last entry.
        let by_type = v.into_iter().map(|c| (c.type_.clone(), c)).collect();
        Self { by_type }
    }
}

impl From<ConditionSet> for Vec<Condition> {
    fn from(s: ConditionSet) -> Self { s.by_type.into_values().collect() }
}
