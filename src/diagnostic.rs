//! Diagnostic service: reads stored mastery, folds graded observations,
//! routes students to tiers and logs predictions for later evaluation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::bkt::{BktConfig, BktEstimator, BktParams, Confidence};
use crate::config::Config;
use crate::error::{MasteryError, MasteryResult};
use crate::feedback::metrics::round4;
use crate::feedback::report::short_id;
use crate::prediction::{PredictionLog, PredictionRecord, DIAGNOSTIC_ENGINE};
use crate::store::{MasteryKey, MasteryState, MasteryStore};
use crate::tier::{Tier, TierDistribution};

pub const DEFAULT_WRITE_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteryEstimate {
    pub student_id: String,
    pub concept_id: String,
    pub mastery_probability: f64,
    pub params: BktParams,
    pub num_observations: u32,
    pub recommended_tier: Tier,
    pub confidence: Confidence,
}

impl MasteryEstimate {
    fn from_state(key: &MasteryKey, state: &MasteryState) -> Self {
        let mastery = state.mastery_probability;
        Self {
            student_id: key.student_id.clone(),
            concept_id: key.concept_id.clone(),
            mastery_probability: round4(mastery),
            params: state.params,
            num_observations: state.num_observations,
            recommended_tier: Tier::classify(mastery),
            confidence: BktEstimator::new(state.params).confidence(mastery, state.num_observations),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDiagnostic {
    pub diagnostic_id: String,
    pub class_id: String,
    pub concept_ids: Vec<String>,
    pub estimates: Vec<MasteryEstimate>,
    pub tier_distribution: TierDistribution,
    pub generated_at: DateTime<Utc>,
}

pub struct DiagnosticService {
    config: BktConfig,
    store: Arc<dyn MasteryStore>,
    log: Arc<dyn PredictionLog>,
    write_attempts: u32,
}

impl DiagnosticService {
    pub fn new(config: BktConfig, store: Arc<dyn MasteryStore>, log: Arc<dyn PredictionLog>) -> Self {
        Self {
            config,
            store,
            log,
            write_attempts: DEFAULT_WRITE_ATTEMPTS,
        }
    }

    /// Service using the configured BKT defaults and write attempts.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn MasteryStore>,
        log: Arc<dyn PredictionLog>,
    ) -> Self {
        Self::new(config.bkt, store, log).with_write_attempts(config.write_attempts)
    }

    pub fn with_write_attempts(mut self, attempts: u32) -> Self {
        self.write_attempts = attempts.max(1);
        self
    }

    pub fn config(&self) -> &BktConfig {
        &self.config
    }

    pub fn write_attempts(&self) -> u32 {
        self.write_attempts
    }

    /// Current estimate; an unseen pair reports the configured defaults.
    pub fn estimate(&self, student_id: &str, concept_id: &str) -> MasteryEstimate {
        let key = MasteryKey::new(student_id, concept_id);
        let state = self
            .store
            .get(&key)
            .unwrap_or_else(|| MasteryState::initial(&self.config));
        MasteryEstimate::from_state(&key, &state)
    }

    /// Every stored estimate for one student, ordered by concept.
    pub fn student_estimates(&self, student_id: &str) -> Vec<MasteryEstimate> {
        self.store
            .states_for_student(student_id)
            .into_iter()
            .map(|(concept_id, state)| {
                MasteryEstimate::from_state(&MasteryKey::new(student_id, concept_id), &state)
            })
            .collect()
    }

    /// Folds graded observations into the stored estimate, in order.
    ///
    /// The read-compute-write cycle is retried when another writer got there
    /// first; after `write_attempts` conflicts the last conflict is returned.
    pub fn update_from_assessment(
        &self,
        student_id: &str,
        concept_id: &str,
        observations: &[bool],
    ) -> MasteryResult<MasteryEstimate> {
        let key = MasteryKey::new(student_id, concept_id);
        if observations.is_empty() {
            return Ok(self.estimate(student_id, concept_id));
        }

        for attempt in 1..=self.write_attempts {
            let current = self.store.get(&key);
            let expected = current.as_ref().map(|s| s.num_observations);
            let base = current.unwrap_or_else(|| MasteryState::initial(&self.config));

            let estimator = BktEstimator::new(base.params);
            let updated = estimator.bulk_update(base.mastery_probability, observations);
            let next = base.advanced(updated, observations.len());

            match self.store.compare_and_set(&key, expected, next.clone()) {
                Ok(()) => {
                    let estimate = MasteryEstimate::from_state(&key, &next);
                    tracing::debug!(
                        student_id,
                        concept_id,
                        prior = base.mastery_probability,
                        updated,
                        tier = estimate.recommended_tier.as_str(),
                        confidence = estimate.confidence.as_str(),
                        "mastery updated"
                    );
                    return Ok(estimate);
                }
                Err(MasteryError::WriteConflict { .. }) => {
                    tracing::warn!(student_id, concept_id, attempt, "mastery write conflict, retrying");
                }
                Err(err) => return Err(err),
            }
        }

        Err(MasteryError::WriteConflict {
            student_id: student_id.to_string(),
            concept_id: concept_id.to_string(),
        })
    }

    /// Estimates every student x concept pair and logs one prediction per estimate.
    pub fn assess_class(
        &self,
        class_id: &str,
        student_ids: &[String],
        concept_ids: &[String],
    ) -> MasteryResult<ClassDiagnostic> {
        let diagnostic_id = format!("diagnostic_{}", short_id());

        let estimates: Vec<MasteryEstimate> = student_ids
            .par_iter()
            .flat_map_iter(|student_id| {
                concept_ids
                    .iter()
                    .map(move |concept_id| self.estimate(student_id, concept_id))
            })
            .collect();

        let tier_distribution: TierDistribution =
            estimates.iter().map(|e| e.recommended_tier).collect();
        let generated_at = Utc::now();
        self.log_predictions(&diagnostic_id, &estimates, generated_at)?;

        tracing::info!(
            %diagnostic_id,
            class_id,
            students = student_ids.len(),
            concepts = concept_ids.len(),
            tier_1 = tier_distribution.tier_1,
            tier_2 = tier_distribution.tier_2,
            tier_3 = tier_distribution.tier_3,
            "class diagnostic complete"
        );

        Ok(ClassDiagnostic {
            diagnostic_id,
            class_id: class_id.to_string(),
            concept_ids: concept_ids.to_vec(),
            estimates,
            tier_distribution,
            generated_at,
        })
    }

    pub fn log_predictions(
        &self,
        diagnostic_id: &str,
        estimates: &[MasteryEstimate],
        predicted_at: DateTime<Utc>,
    ) -> MasteryResult<usize> {
        for estimate in estimates {
            self.log.log_prediction(PredictionRecord::new(
                format!("{diagnostic_id}_{}_{}", estimate.student_id, estimate.concept_id),
                DIAGNOSTIC_ENGINE,
                estimate.student_id.clone(),
                estimate.concept_id.clone(),
                estimate.mastery_probability,
                estimate.recommended_tier,
                predicted_at,
            ))?;
        }
        tracing::debug!(diagnostic_id, count = estimates.len(), "predictions logged");
        Ok(estimates.len())
    }

    /// Closes a logged prediction once grading completes.
    pub fn record_outcome(
        &self,
        prediction_id: &str,
        actual_mastery: f64,
        actual_score: f64,
    ) -> MasteryResult<()> {
        self.log.record_outcome(prediction_id, actual_mastery, actual_score)
    }
}
