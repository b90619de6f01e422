//! Per-(student, concept) mastery state and the storage seam.
//!
//! Writes use optimistic concurrency keyed on `num_observations`: a caller
//! reads a state, computes a new one, and writes only if the stored count
//! still matches what it read.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::bkt::{BktConfig, BktParams};
use crate::error::{MasteryError, MasteryResult};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MasteryKey {
    pub student_id: String,
    pub concept_id: String,
}

impl MasteryKey {
    pub fn new(student_id: impl Into<String>, concept_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            concept_id: concept_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteryState {
    pub mastery_probability: f64,
    pub params: BktParams,
    pub num_observations: u32,
    pub last_updated: DateTime<Utc>,
}

impl MasteryState {
    /// State used for a pair that has never been observed.
    pub fn initial(config: &BktConfig) -> Self {
        Self {
            mastery_probability: config.initial_mastery(),
            params: config.params,
            num_observations: 0,
            last_updated: Utc::now(),
        }
    }

    /// Supersedes the running estimate after folding `observed` more events.
    pub fn advanced(&self, mastery_probability: f64, observed: usize) -> Self {
        let observed = u32::try_from(observed).unwrap_or(u32::MAX);
        Self {
            mastery_probability: mastery_probability.clamp(0.0, 1.0),
            params: self.params,
            num_observations: self.num_observations.saturating_add(observed),
            last_updated: Utc::now(),
        }
    }
}

pub trait MasteryStore: Send + Sync {
    fn get(&self, key: &MasteryKey) -> Option<MasteryState>;

    /// Writes `state` only if the stored observation count equals
    /// `expected_observations` (`None` means the key must be absent).
    fn compare_and_set(
        &self,
        key: &MasteryKey,
        expected_observations: Option<u32>,
        state: MasteryState,
    ) -> MasteryResult<()>;

    fn states_for_student(&self, student_id: &str) -> Vec<(String, MasteryState)>;
}

#[derive(Debug, Default)]
pub struct InMemoryMasteryStore {
    states: RwLock<HashMap<MasteryKey, MasteryState>>,
}

impl InMemoryMasteryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.states.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.read().is_empty()
    }
}

impl MasteryStore for InMemoryMasteryStore {
    fn get(&self, key: &MasteryKey) -> Option<MasteryState> {
        self.states.read().get(key).cloned()
    }

    fn compare_and_set(
        &self,
        key: &MasteryKey,
        expected_observations: Option<u32>,
        state: MasteryState,
    ) -> MasteryResult<()> {
        let mut states = self.states.write();
        let current = states.get(key).map(|s| s.num_observations);
        if current != expected_observations {
            return Err(MasteryError::WriteConflict {
                student_id: key.student_id.clone(),
                concept_id: key.concept_id.clone(),
            });
        }
        states.insert(key.clone(), state);
        Ok(())
    }

    fn states_for_student(&self, student_id: &str) -> Vec<(String, MasteryState)> {
        let mut out: Vec<_> = self
            .states
            .read()
            .iter()
            .filter(|(key, _)| key.student_id == student_id)
            .map(|(key, state)| (key.concept_id.clone(), state.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}
