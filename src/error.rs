use thiserror::Error;

#[derive(Debug, Error)]
pub enum MasteryError {
    #[error("invalid parameter {name}: {value} (must be a finite value in [0, 1])")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("prediction not found: {0}")]
    PredictionNotFound(String),

    #[error("outcome already recorded for prediction {0}")]
    OutcomeAlreadyRecorded(String),

    #[error("duplicate prediction id: {0}")]
    DuplicatePrediction(String),

    #[error("write conflict on mastery state {student_id}/{concept_id}")]
    WriteConflict {
        student_id: String,
        concept_id: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type MasteryResult<T> = Result<T, MasteryError>;

/// Accepts finite probabilities in `[0, 1]`.
pub(crate) fn check_unit_interval(name: &'static str, value: f64) -> MasteryResult<f64> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(MasteryError::InvalidParameter { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_interval_accepts_bounds() {
        assert_eq!(check_unit_interval("p_learn", 0.0).unwrap(), 0.0);
        assert_eq!(check_unit_interval("p_learn", 1.0).unwrap(), 1.0);
    }

    #[test]
    fn unit_interval_rejects_out_of_range_and_nan() {
        for value in [-0.01, 1.01, f64::NAN, f64::INFINITY] {
            let err = check_unit_interval("p_slip", value).unwrap_err();
            assert!(matches!(err, MasteryError::InvalidParameter { name: "p_slip", .. }));
        }
    }

    #[test]
    fn error_messages_name_the_parameter() {
        let err = MasteryError::InvalidParameter {
            name: "p_guess",
            value: 1.5,
        };
        assert!(err.to_string().contains("p_guess"));
        assert!(err.to_string().contains("1.5"));
    }
}
