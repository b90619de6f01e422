use serde::{Deserialize, Serialize};

use crate::tier::Tier;

const MIN_OUTCOMES_FOR_QUALITY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    pub total_predictions: usize,
    pub predictions_with_outcomes: usize,
    pub rmse: f64,
    pub mae: f64,
    pub correlation: f64,
    pub mean_predicted: f64,
    pub mean_actual: f64,
    /// Positive means the estimator overestimates mastery.
    pub overestimation_bias: f64,
    pub tier_accuracy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityAssessment {
    InsufficientData,
    Excellent,
    Good,
    NeedsImprovement,
    Poor,
}

impl QualityAssessment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InsufficientData => "insufficient_data",
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::NeedsImprovement => "needs_improvement",
            Self::Poor => "poor",
        }
    }
}

/// Error statistics over paired predicted/actual mastery values.
///
/// Unequal lengths are truncated to the shorter sequence. An empty input
/// yields an all-zero report.
pub fn compute_metrics(
    predicted: &[f64],
    actual: &[f64],
    predicted_tiers: &[Tier],
    actual_tiers: &[Tier],
) -> AccuracyMetrics {
    let n = predicted.len().min(actual.len());
    if n == 0 {
        return AccuracyMetrics::default();
    }

    let predicted = &predicted[..n];
    let actual = &actual[..n];
    let count = n as f64;

    let (squared, absolute) = predicted
        .iter()
        .zip(actual)
        .fold((0.0, 0.0), |(sq, abs), (p, a)| {
            let diff = p - a;
            (sq + diff * diff, abs + diff.abs())
        });

    let rmse = (squared / count).sqrt();
    let mae = absolute / count;
    let mean_predicted = mean(predicted);
    let mean_actual = mean(actual);

    AccuracyMetrics {
        total_predictions: n,
        predictions_with_outcomes: n,
        rmse: round4(rmse),
        mae: round4(mae),
        correlation: round4(pearson_correlation(predicted, actual)),
        mean_predicted: round4(mean_predicted),
        mean_actual: round4(mean_actual),
        overestimation_bias: round4(mean_predicted - mean_actual),
        tier_accuracy: round4(tier_accuracy(predicted_tiers, actual_tiers)),
    }
}

/// Pearson coefficient; 0.0 for fewer than two points or zero variance.
pub fn pearson_correlation(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let mean_x = mean(xs);
    let mean_y = mean(ys);

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denominator = var_x.sqrt() * var_y.sqrt();
    if denominator == 0.0 {
        return 0.0;
    }
    covariance / denominator
}

fn tier_accuracy(predicted: &[Tier], actual: &[Tier]) -> f64 {
    let pairs = predicted.len().min(actual.len());
    if pairs == 0 {
        return 0.0;
    }
    let matches = predicted
        .iter()
        .zip(actual)
        .filter(|(p, a)| p == a)
        .count();
    matches as f64 / pairs as f64
}

/// First matching band wins.
pub fn assess_quality(metrics: &AccuracyMetrics) -> QualityAssessment {
    if metrics.predictions_with_outcomes < MIN_OUTCOMES_FOR_QUALITY {
        QualityAssessment::InsufficientData
    } else if metrics.rmse < 0.10 && metrics.tier_accuracy > 0.80 {
        QualityAssessment::Excellent
    } else if metrics.rmse < 0.15 && metrics.tier_accuracy > 0.70 {
        QualityAssessment::Good
    } else if metrics.rmse < 0.25 && metrics.tier_accuracy > 0.55 {
        QualityAssessment::NeedsImprovement
    } else {
        QualityAssessment::Poor
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
