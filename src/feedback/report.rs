use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::bkt::BktParams;
use crate::feedback::metrics::{assess_quality, compute_metrics, AccuracyMetrics, QualityAssessment};
use crate::feedback::tuning::{recommend_updates, ParameterUpdate};
use crate::prediction::PredictionLog;
use crate::tier::{Tier, TIER_1_THRESHOLD, TIER_3_THRESHOLD};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackReport {
    pub feedback_id: String,
    pub engine_name: String,
    pub timeframe_days: u32,
    pub accuracy_metrics: AccuracyMetrics,
    pub parameter_updates: Vec<ParameterUpdate>,
    pub quality_assessment: QualityAssessment,
    pub insights: Vec<String>,
    pub warnings: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Evaluates logged predictions against the parameters currently in use.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedbackAnalyzer {
    current_params: BktParams,
}

impl FeedbackAnalyzer {
    pub fn new(current_params: BktParams) -> Self {
        Self { current_params }
    }

    pub fn current_params(&self) -> BktParams {
        self.current_params
    }

    /// One window query plus one linear scan over the closed predictions.
    pub fn generate_feedback(
        &self,
        log: &dyn PredictionLog,
        engine_name: &str,
        timeframe_days: u32,
        now: DateTime<Utc>,
    ) -> FeedbackReport {
        let since = Duration::try_days(i64::from(timeframe_days))
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let closed = log.outcomes_in_window(engine_name, since);
        let total_predictions = log.count_in_window(engine_name, since);

        let mut predicted = Vec::with_capacity(closed.len());
        let mut actual = Vec::with_capacity(closed.len());
        let mut predicted_tiers = Vec::with_capacity(closed.len());
        let mut actual_tiers = Vec::with_capacity(closed.len());
        for record in &closed {
            let Some(actual_mastery) = record.actual_mastery else {
                continue;
            };
            predicted.push(record.predicted_mastery);
            actual.push(actual_mastery);
            predicted_tiers.push(record.predicted_tier);
            actual_tiers.push(Tier::classify(actual_mastery));
        }

        let metrics = AccuracyMetrics {
            total_predictions,
            ..compute_metrics(&predicted, &actual, &predicted_tiers, &actual_tiers)
        };
        let report = self.build_report(engine_name, timeframe_days, metrics, now);

        tracing::info!(
            feedback_id = %report.feedback_id,
            engine_name,
            quality = report.quality_assessment.as_str(),
            rmse = metrics.rmse,
            outcomes = metrics.predictions_with_outcomes,
            "feedback generated"
        );
        report
    }

    pub fn build_report(
        &self,
        engine_name: &str,
        timeframe_days: u32,
        metrics: AccuracyMetrics,
        now: DateTime<Utc>,
    ) -> FeedbackReport {
        FeedbackReport {
            feedback_id: format!("feedback_{}", short_id()),
            engine_name: engine_name.to_string(),
            timeframe_days,
            accuracy_metrics: metrics,
            parameter_updates: recommend_updates(&metrics, &self.current_params),
            quality_assessment: assess_quality(&metrics),
            insights: insights(&metrics),
            warnings: warnings(&metrics),
            generated_at: now,
        }
    }
}

pub fn insights(metrics: &AccuracyMetrics) -> Vec<String> {
    let mut out = Vec::new();

    if metrics.rmse < 0.10 {
        out.push(format!(
            "Excellent prediction accuracy (RMSE: {:.3}). The diagnostic engine is performing well.",
            metrics.rmse
        ));
    } else if metrics.rmse < 0.15 {
        out.push(format!(
            "Good prediction accuracy (RMSE: {:.3}). Minor improvements possible.",
            metrics.rmse
        ));
    } else {
        out.push(format!(
            "Prediction accuracy could be improved (RMSE: {:.3}). Consider parameter tuning.",
            metrics.rmse
        ));
    }

    if metrics.tier_accuracy > 0.80 {
        out.push(format!(
            "Strong tier assignment accuracy ({:.1}%). Students are well-grouped for differentiation.",
            metrics.tier_accuracy * 100.0
        ));
    } else if metrics.tier_accuracy < 0.60 {
        out.push(format!(
            "Low tier assignment accuracy ({:.1}%). Review tier thresholds (currently {:.0}%/{:.0}%).",
            metrics.tier_accuracy * 100.0,
            TIER_1_THRESHOLD * 100.0,
            TIER_3_THRESHOLD * 100.0
        ));
    }

    let bias = metrics.overestimation_bias;
    if bias.abs() < 0.05 {
        out.push("Predictions are well-calibrated with minimal bias.".to_string());
    } else if bias > 0.0 {
        out.push(format!(
            "Tendency to overestimate mastery by {bias:.2}. Students may struggle more than predicted."
        ));
    } else {
        out.push(format!(
            "Tendency to underestimate mastery by {:.2}. Students may be more capable than predicted.",
            bias.abs()
        ));
    }

    if metrics.predictions_with_outcomes < 30 {
        out.push(format!(
            "Limited outcome data ({} predictions). Accuracy will improve with more assessments.",
            metrics.predictions_with_outcomes
        ));
    }

    out
}

pub fn warnings(metrics: &AccuracyMetrics) -> Vec<String> {
    let mut out = Vec::new();

    if metrics.rmse > 0.25 {
        out.push(format!(
            "Very high prediction error (RMSE: {:.3}). Immediate parameter tuning recommended.",
            metrics.rmse
        ));
    }
    if metrics.tier_accuracy < 0.50 {
        out.push(format!(
            "Poor tier assignment accuracy ({:.1}%). Students may be misplaced in difficulty tiers.",
            metrics.tier_accuracy * 100.0
        ));
    }
    if metrics.overestimation_bias.abs() > 0.20 {
        out.push(format!(
            "Severe prediction bias ({:+.2}). Review BKT parameters urgently.",
            metrics.overestimation_bias
        ));
    }
    if metrics.correlation < 0.30 && metrics.predictions_with_outcomes >= 20 {
        out.push(format!(
            "Low correlation between predicted and actual ({:.2}). Predictions may not be meaningful.",
            metrics.correlation
        ));
    }

    out
}

pub(crate) fn short_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..12].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::{InMemoryPredictionLog, PredictionRecord, DIAGNOSTIC_ENGINE};

    fn seeded_log(pairs: &[(f64, f64)], now: DateTime<Utc>) -> InMemoryPredictionLog {
        let log = InMemoryPredictionLog::new();
        for (i, (predicted, actual)) in pairs.iter().enumerate() {
            let id = format!("p{i}");
            log.log_prediction(PredictionRecord::new(
                id.clone(),
                DIAGNOSTIC_ENGINE,
                format!("s{i}"),
                "fractions",
                *predicted,
                Tier::classify(*predicted),
                now - Duration::days(1),
            ))
            .unwrap();
            log.record_outcome(&id, *actual, actual * 100.0).unwrap();
        }
        log
    }

    #[test]
    fn empty_window_reports_insufficient_data() {
        let log = InMemoryPredictionLog::new();
        let report = FeedbackAnalyzer::default().generate_feedback(&log, DIAGNOSTIC_ENGINE, 30, Utc::now());
        assert_eq!(report.quality_assessment, QualityAssessment::InsufficientData);
        assert_eq!(report.accuracy_metrics.rmse, 0.0);
        assert!(report.feedback_id.starts_with("feedback_"));
        assert_eq!(report.feedback_id.len(), "feedback_".len() + 12);
    }

    #[test]
    fn overconfident_estimator_gets_guess_reduction() {
        let now = Utc::now();
        let pairs: Vec<_> = (0..12).map(|i| (0.8 + (i % 3) as f64 * 0.05, 0.55)).collect();
        let log = seeded_log(&pairs, now);

        let report = FeedbackAnalyzer::default().generate_feedback(&log, DIAGNOSTIC_ENGINE, 30, now);

        assert_eq!(report.accuracy_metrics.predictions_with_outcomes, 12);
        assert_eq!(report.accuracy_metrics.total_predictions, 12);
        assert!(report.accuracy_metrics.overestimation_bias > 0.2);
        assert!(report
            .parameter_updates
            .iter()
            .any(|u| u.parameter_name == crate::bkt::BktParameter::PGuess));
        assert_eq!(report.quality_assessment, QualityAssessment::Poor);
        assert!(report.warnings.iter().any(|w| w.contains("Severe prediction bias")));
    }

    #[test]
    fn open_predictions_count_toward_total_only() {
        let now = Utc::now();
        let log = seeded_log(&[(0.6, 0.6), (0.3, 0.3)], now);
        log.log_prediction(PredictionRecord::new(
            "open",
            DIAGNOSTIC_ENGINE,
            "s9",
            "fractions",
            0.5,
            Tier::Tier2,
            now,
        ))
        .unwrap();

        let report = FeedbackAnalyzer::default().generate_feedback(&log, DIAGNOSTIC_ENGINE, 30, now);
        assert_eq!(report.accuracy_metrics.total_predictions, 3);
        assert_eq!(report.accuracy_metrics.predictions_with_outcomes, 2);
        assert_eq!(report.accuracy_metrics.tier_accuracy, 1.0);
    }

    #[test]
    fn insights_cover_calibration_and_data_volume() {
        let metrics = AccuracyMetrics {
            total_predictions: 12,
            predictions_with_outcomes: 12,
            rmse: 0.05,
            tier_accuracy: 0.9,
            overestimation_bias: 0.01,
            correlation: 0.9,
            ..Default::default()
        };
        let lines = insights(&metrics);
        assert!(lines[0].starts_with("Excellent prediction accuracy"));
        assert!(lines.iter().any(|l| l.contains("well-calibrated")));
        assert!(lines.iter().any(|l| l.contains("Limited outcome data (12")));
        assert!(warnings(&metrics).is_empty());
    }

    #[test]
    fn low_correlation_warning_needs_enough_data() {
        let mut metrics = AccuracyMetrics {
            total_predictions: 10,
            predictions_with_outcomes: 10,
            rmse: 0.05,
            tier_accuracy: 0.9,
            correlation: 0.1,
            ..Default::default()
        };
        assert!(warnings(&metrics).is_empty());
        metrics.predictions_with_outcomes = 25;
        assert_eq!(warnings(&metrics).len(), 1);
    }
}
