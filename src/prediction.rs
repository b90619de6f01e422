//! Prediction records and the logging seam used for accuracy evaluation.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{check_unit_interval, MasteryError, MasteryResult};
use crate::tier::Tier;

pub const DIAGNOSTIC_ENGINE: &str = "engine_5_diagnostic";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub prediction_id: String,
    pub engine_name: String,
    pub student_id: String,
    pub concept_id: String,
    pub predicted_mastery: f64,
    pub predicted_tier: Tier,
    pub predicted_at: DateTime<Utc>,
    #[serde(default)]
    pub actual_mastery: Option<f64>,
    #[serde(default)]
    pub actual_score: Option<f64>,
    #[serde(default)]
    pub error: Option<f64>,
    #[serde(default)]
    pub outcome_recorded_at: Option<DateTime<Utc>>,
}

impl PredictionRecord {
    pub fn new(
        prediction_id: impl Into<String>,
        engine_name: impl Into<String>,
        student_id: impl Into<String>,
        concept_id: impl Into<String>,
        predicted_mastery: f64,
        predicted_tier: Tier,
        predicted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            prediction_id: prediction_id.into(),
            engine_name: engine_name.into(),
            student_id: student_id.into(),
            concept_id: concept_id.into(),
            predicted_mastery,
            predicted_tier,
            predicted_at,
            actual_mastery: None,
            actual_score: None,
            error: None,
            outcome_recorded_at: None,
        }
    }

    pub fn has_outcome(&self) -> bool {
        self.actual_mastery.is_some()
    }

    /// Closes the record. A record is closed at most once, and only with an
    /// `actual_mastery` in `[0, 1]`; a rejected outcome leaves it open.
    pub fn close(
        &mut self,
        actual_mastery: f64,
        actual_score: f64,
        at: DateTime<Utc>,
    ) -> MasteryResult<()> {
        if self.has_outcome() {
            return Err(MasteryError::OutcomeAlreadyRecorded(self.prediction_id.clone()));
        }
        let actual_mastery = check_unit_interval("actual_mastery", actual_mastery)?;
        self.actual_mastery = Some(actual_mastery);
        self.actual_score = Some(actual_score);
        self.error = Some(self.predicted_mastery - actual_mastery);
        self.outcome_recorded_at = Some(at);
        Ok(())
    }
}

pub trait PredictionLog: Send + Sync {
    fn log_prediction(&self, record: PredictionRecord) -> MasteryResult<()>;

    fn record_outcome(
        &self,
        prediction_id: &str,
        actual_mastery: f64,
        actual_score: f64,
    ) -> MasteryResult<()>;

    /// Closed predictions for `engine_name` made at or after `since`.
    fn outcomes_in_window(&self, engine_name: &str, since: DateTime<Utc>) -> Vec<PredictionRecord>;

    /// All predictions for `engine_name` made at or after `since`, closed or not.
    fn count_in_window(&self, engine_name: &str, since: DateTime<Utc>) -> usize;
}

#[derive(Debug, Default)]
pub struct InMemoryPredictionLog {
    records: RwLock<HashMap<String, PredictionRecord>>,
}

impl InMemoryPredictionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<PredictionRecord>) -> MasteryResult<Self> {
        let log = Self::new();
        for record in records {
            log.log_prediction(record)?;
        }
        Ok(log)
    }

    pub fn get(&self, prediction_id: &str) -> Option<PredictionRecord> {
        self.records.read().get(prediction_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Records ordered by prediction time, then id.
    pub fn snapshot(&self) -> Vec<PredictionRecord> {
        let mut records: Vec<_> = self.records.read().values().cloned().collect();
        records.sort_by(|a, b| {
            a.predicted_at
                .cmp(&b.predicted_at)
                .then_with(|| a.prediction_id.cmp(&b.prediction_id))
        });
        records
    }

    pub fn load_json(path: impl AsRef<Path>) -> MasteryResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let records: Vec<PredictionRecord> = serde_json::from_str(&raw)?;
        tracing::debug!(
            path = %path.as_ref().display(),
            count = records.len(),
            "loaded prediction snapshot"
        );
        Self::from_records(records)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> MasteryResult<()> {
        let raw = serde_json::to_string_pretty(&self.snapshot())?;
        std::fs::write(path, raw)?;
        Ok(())
    }
}

impl PredictionLog for InMemoryPredictionLog {
    fn log_prediction(&self, record: PredictionRecord) -> MasteryResult<()> {
        check_unit_interval("predicted_mastery", record.predicted_mastery)?;
        if let Some(actual) = record.actual_mastery {
            check_unit_interval("actual_mastery", actual)?;
        }
        let mut records = self.records.write();
        if records.contains_key(&record.prediction_id) {
            return Err(MasteryError::DuplicatePrediction(record.prediction_id));
        }
        records.insert(record.prediction_id.clone(), record);
        Ok(())
    }

    fn record_outcome(
        &self,
        prediction_id: &str,
        actual_mastery: f64,
        actual_score: f64,
    ) -> MasteryResult<()> {
        let mut records = self.records.write();
        let record = records
            .get_mut(prediction_id)
            .ok_or_else(|| MasteryError::PredictionNotFound(prediction_id.to_string()))?;
        record.close(actual_mastery, actual_score, Utc::now())?;
        tracing::debug!(
            prediction_id,
            error = record.error.unwrap_or_default(),
            "prediction outcome recorded"
        );
        Ok(())
    }

    fn outcomes_in_window(&self, engine_name: &str, since: DateTime<Utc>) -> Vec<PredictionRecord> {
        let mut records: Vec<_> = self
            .records
            .read()
            .values()
            .filter(|r| r.engine_name == engine_name && r.predicted_at >= since && r.has_outcome())
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            a.predicted_at
                .cmp(&b.predicted_at)
                .then_with(|| a.prediction_id.cmp(&b.prediction_id))
        });
        records
    }

    fn count_in_window(&self, engine_name: &str, since: DateTime<Utc>) -> usize {
        self.records
            .read()
            .values()
            .filter(|r| r.engine_name == engine_name && r.predicted_at >= since)
            .count()
    }
}
