//! Bayesian Knowledge Tracing
//!
//! Recursive Bayesian filter over right/wrong observations:
//! - Evidence step: P(L | obs) from the slip/guess emission model
//! - Learning step: P(L') = P(L | obs) + (1 - P(L | obs)) * p_learn
//!
//! The estimator is a pure value type; persisting the result is the
//! caller's job (see [`crate::store`]).

use serde::{Deserialize, Serialize};

use crate::error::{check_unit_interval, MasteryError, MasteryResult};

pub const DEFAULT_P_LEARN: f64 = 0.3;
pub const DEFAULT_P_GUESS: f64 = 0.25;
pub const DEFAULT_P_SLIP: f64 = 0.1;
pub const DEFAULT_INITIAL_MASTERY: f64 = 0.5;

const LOW_SAMPLE_LIMIT: u32 = 3;
const HIGH_SAMPLE_LIMIT: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BktParameter {
    PLearn,
    PGuess,
    PSlip,
}

impl BktParameter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PLearn => "p_learn",
            Self::PGuess => "p_guess",
            Self::PSlip => "p_slip",
        }
    }
}

/// Transition and emission probabilities. Always within `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBktParams")]
pub struct BktParams {
    p_learn: f64,
    p_guess: f64,
    p_slip: f64,
}

#[derive(Deserialize)]
struct RawBktParams {
    p_learn: f64,
    p_guess: f64,
    p_slip: f64,
}

impl TryFrom<RawBktParams> for BktParams {
    type Error = MasteryError;

    fn try_from(raw: RawBktParams) -> Result<Self, Self::Error> {
        Self::new(raw.p_learn, raw.p_guess, raw.p_slip)
    }
}

impl Default for BktParams {
    fn default() -> Self {
        Self {
            p_learn: DEFAULT_P_LEARN,
            p_guess: DEFAULT_P_GUESS,
            p_slip: DEFAULT_P_SLIP,
        }
    }
}

impl BktParams {
    pub fn new(p_learn: f64, p_guess: f64, p_slip: f64) -> MasteryResult<Self> {
        Ok(Self {
            p_learn: check_unit_interval("p_learn", p_learn)?,
            p_guess: check_unit_interval("p_guess", p_guess)?,
            p_slip: check_unit_interval("p_slip", p_slip)?,
        })
    }

    pub fn p_learn(&self) -> f64 {
        self.p_learn
    }

    pub fn p_guess(&self) -> f64 {
        self.p_guess
    }

    pub fn p_slip(&self) -> f64 {
        self.p_slip
    }

    pub fn get(&self, parameter: BktParameter) -> f64 {
        match parameter {
            BktParameter::PLearn => self.p_learn,
            BktParameter::PGuess => self.p_guess,
            BktParameter::PSlip => self.p_slip,
        }
    }

    /// Returns a copy with one parameter replaced, revalidated.
    pub fn with(&self, parameter: BktParameter, value: f64) -> MasteryResult<Self> {
        let value = check_unit_interval(parameter.as_str(), value)?;
        let mut next = *self;
        match parameter {
            BktParameter::PLearn => next.p_learn = value,
            BktParameter::PGuess => next.p_guess = value,
            BktParameter::PSlip => next.p_slip = value,
        }
        Ok(next)
    }
}

/// Default parameters plus the prior assigned to an unseen student/concept pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BktConfig {
    pub params: BktParams,
    initial_mastery: f64,
}

impl Default for BktConfig {
    fn default() -> Self {
        Self {
            params: BktParams::default(),
            initial_mastery: DEFAULT_INITIAL_MASTERY,
        }
    }
}

impl BktConfig {
    pub fn new(params: BktParams, initial_mastery: f64) -> MasteryResult<Self> {
        Ok(Self {
            params,
            initial_mastery: check_unit_interval("initial_mastery", initial_mastery)?,
        })
    }

    pub fn initial_mastery(&self) -> f64 {
        self.initial_mastery
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Confidence grows with sample size and with distance from the uncertain middle.
pub fn confidence(mastery: f64, num_observations: u32) -> Confidence {
    if num_observations < LOW_SAMPLE_LIMIT {
        Confidence::Low
    } else if num_observations < HIGH_SAMPLE_LIMIT {
        if mastery < 0.3 || mastery > 0.7 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    } else if mastery < 0.2 || mastery > 0.8 {
        Confidence::High
    } else {
        Confidence::Medium
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BktEstimator {
    params: BktParams,
}

impl BktEstimator {
    pub fn new(params: BktParams) -> Self {
        Self { params }
    }

    /// One observation: evidence step, then learning step, clamped to `[0, 1]`.
    pub fn update(&self, prior_mastery: f64, observation_correct: bool) -> f64 {
        let posterior = if observation_correct {
            self.posterior_correct(prior_mastery)
        } else {
            self.posterior_incorrect(prior_mastery)
        };

        let updated = posterior + (1.0 - posterior) * self.params.p_learn;
        updated.clamp(0.0, 1.0)
    }

    /// Sequential fold in the given order. Order matters.
    pub fn bulk_update(&self, prior_mastery: f64, observations: &[bool]) -> f64 {
        observations
            .iter()
            .fold(prior_mastery, |mastery, &correct| self.update(mastery, correct))
    }

    pub fn confidence(&self, mastery: f64, num_observations: u32) -> Confidence {
        confidence(mastery, num_observations)
    }

    fn posterior_correct(&self, prior: f64) -> f64 {
        let numerator = prior * (1.0 - self.params.p_slip);
        let denominator = numerator + (1.0 - prior) * self.params.p_guess;
        if denominator == 0.0 {
            return prior;
        }
        numerator / denominator
    }

    fn posterior_incorrect(&self, prior: f64) -> f64 {
        let numerator = prior * self.params.p_slip;
        let denominator = numerator + (1.0 - prior) * (1.0 - self.params.p_guess);
        if denominator == 0.0 {
            return prior;
        }
        numerator / denominator
    }
}
