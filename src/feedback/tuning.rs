//! Rule table mapping accuracy metrics to BKT parameter adjustments.

use serde::{Deserialize, Serialize};

use crate::bkt::{BktParameter, BktParams};
use crate::error::MasteryResult;
use crate::feedback::metrics::AccuracyMetrics;

const BIAS_LIMIT: f64 = 0.10;
const RMSE_LIMIT: f64 = 0.20;
const TIER_ACCURACY_FLOOR: f64 = 0.60;

const GUESS_STEP: f64 = 0.05;
const GUESS_FLOOR: f64 = 0.15;
const LEARN_STEP: f64 = 0.05;
const LEARN_CAP: f64 = 0.4;
const SLIP_STEP: f64 = 0.03;
const SLIP_CAP: f64 = 0.15;
const GUESS_RECALIBRATION: f64 = 0.20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterUpdate {
    pub parameter_name: BktParameter,
    pub current_value: f64,
    pub recommended_value: f64,
    pub reason: String,
}

/// Rules 1-3 fire independently; the tier-accuracy fallback only when
/// none of them did.
pub fn recommend_updates(metrics: &AccuracyMetrics, current: &BktParams) -> Vec<ParameterUpdate> {
    let mut updates = Vec::new();

    if metrics.overestimation_bias > BIAS_LIMIT {
        let current_value = current.p_guess();
        updates.push(ParameterUpdate {
            parameter_name: BktParameter::PGuess,
            current_value,
            recommended_value: round3((current_value - GUESS_STEP).max(GUESS_FLOOR)),
            reason: format!(
                "Overestimating mastery by {:.2}. Reducing p_guess to account for lucky guesses.",
                metrics.overestimation_bias
            ),
        });
    }

    if metrics.overestimation_bias < -BIAS_LIMIT {
        let current_value = current.p_learn();
        updates.push(ParameterUpdate {
            parameter_name: BktParameter::PLearn,
            current_value,
            recommended_value: round3((current_value + LEARN_STEP).min(LEARN_CAP)),
            reason: format!(
                "Underestimating mastery by {:.2}. Increasing p_learn to reflect faster learning rates.",
                metrics.overestimation_bias.abs()
            ),
        });
    }

    if metrics.rmse > RMSE_LIMIT {
        let current_value = current.p_slip();
        updates.push(ParameterUpdate {
            parameter_name: BktParameter::PSlip,
            current_value,
            recommended_value: round3((current_value + SLIP_STEP).min(SLIP_CAP)),
            reason: format!(
                "High RMSE ({:.3}) suggests students making errors despite knowing concepts. Increasing p_slip.",
                metrics.rmse
            ),
        });
    }

    if metrics.tier_accuracy < TIER_ACCURACY_FLOOR && updates.is_empty() {
        updates.push(ParameterUpdate {
            parameter_name: BktParameter::PGuess,
            current_value: current.p_guess(),
            recommended_value: GUESS_RECALIBRATION,
            reason: format!(
                "Low tier accuracy ({:.2}%). Recalibrating BKT parameters.",
                metrics.tier_accuracy * 100.0
            ),
        });
    }

    updates
}

/// Opt-in application of recommendations. With `auto_apply` off the input
/// parameters are returned untouched.
pub fn apply_parameter_updates(
    params: &BktParams,
    updates: &[ParameterUpdate],
    auto_apply: bool,
) -> MasteryResult<BktParams> {
    if !auto_apply {
        tracing::info!(pending = updates.len(), "auto-apply disabled, skipping parameter updates");
        return Ok(*params);
    }

    let mut next = *params;
    for update in updates {
        next = next.with(update.parameter_name, update.recommended_value)?;
        tracing::info!(
            parameter = update.parameter_name.as_str(),
            from = update.current_value,
            to = update.recommended_value,
            "applied parameter update"
        );
    }
    Ok(next)
}

fn round3(value: f64) -> f64 {
    (value * 1_000.0).round() / 1_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(bias: f64, rmse: f64, tier_accuracy: f64) -> AccuracyMetrics {
        AccuracyMetrics {
            total_predictions: 40,
            predictions_with_outcomes: 40,
            rmse,
            overestimation_bias: bias,
            tier_accuracy,
            ..Default::default()
        }
    }

    fn find(updates: &[ParameterUpdate], parameter: BktParameter) -> Option<&ParameterUpdate> {
        updates.iter().find(|u| u.parameter_name == parameter)
    }

    #[test]
    fn overestimation_lowers_guess() {
        let updates = recommend_updates(&metrics(0.15, 0.1, 0.9), &BktParams::default());
        assert_eq!(updates.len(), 1);
        let guess = find(&updates, BktParameter::PGuess).unwrap();
        assert_eq!(guess.current_value, 0.25);
        assert!((guess.recommended_value - 0.20).abs() < 1e-9);
        assert!(guess.reason.contains("0.15"));
    }

    #[test]
    fn guess_is_floored() {
        let params = BktParams::new(0.3, 0.17, 0.1).unwrap();
        let updates = recommend_updates(&metrics(0.3, 0.1, 0.9), &params);
        assert_eq!(find(&updates, BktParameter::PGuess).unwrap().recommended_value, 0.15);
    }

    #[test]
    fn underestimation_raises_learn_with_cap() {
        let updates = recommend_updates(&metrics(-0.2, 0.1, 0.9), &BktParams::default());
        let learn = find(&updates, BktParameter::PLearn).unwrap();
        assert!((learn.recommended_value - 0.35).abs() < 1e-9);

        let params = BktParams::new(0.38, 0.25, 0.1).unwrap();
        let updates = recommend_updates(&metrics(-0.2, 0.1, 0.9), &params);
        assert_eq!(find(&updates, BktParameter::PLearn).unwrap().recommended_value, 0.4);
    }

    #[test]
    fn high_rmse_raises_slip_alongside_bias_rule() {
        let updates = recommend_updates(&metrics(0.15, 0.3, 0.9), &BktParams::default());
        assert_eq!(updates.len(), 2);
        let slip = find(&updates, BktParameter::PSlip).unwrap();
        assert!((slip.recommended_value - 0.13).abs() < 1e-9);
        assert!(slip.reason.contains("0.300"));
    }

    #[test]
    fn tier_fallback_only_when_nothing_else_fired() {
        let updates = recommend_updates(&metrics(0.0, 0.1, 0.4), &BktParams::default());
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].parameter_name, BktParameter::PGuess);
        assert_eq!(updates[0].recommended_value, 0.20);

        let updates = recommend_updates(&metrics(0.0, 0.3, 0.4), &BktParams::default());
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].parameter_name, BktParameter::PSlip);
    }

    #[test]
    fn healthy_metrics_recommend_nothing() {
        assert!(recommend_updates(&metrics(0.02, 0.08, 0.9), &BktParams::default()).is_empty());
    }

    #[test]
    fn apply_is_opt_in() {
        let params = BktParams::default();
        let updates = recommend_updates(&metrics(0.15, 0.3, 0.9), &params);

        let untouched = apply_parameter_updates(&params, &updates, false).unwrap();
        assert_eq!(untouched, params);

        let applied = apply_parameter_updates(&params, &updates, true).unwrap();
        assert!((applied.p_guess() - 0.20).abs() < 1e-9);
        assert!((applied.p_slip() - 0.13).abs() < 1e-9);
        assert_eq!(applied.p_learn(), params.p_learn());
    }

    #[test]
    fn apply_rejects_invalid_values() {
        let update = ParameterUpdate {
            parameter_name: BktParameter::PLearn,
            current_value: 0.3,
            recommended_value: 1.4,
            reason: "bad".to_string(),
        };
        assert!(apply_parameter_updates(&BktParams::default(), &[update], true).is_err());
    }
}
