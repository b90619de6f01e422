//! # mastery-engine
//!
//! Bayesian Knowledge Tracing mastery estimation and its feedback loop:
//!
//! - [`bkt`] - recursive Bayesian update, bulk folding, confidence bands
//! - [`tier`] - fixed-threshold support tier routing
//! - [`store`] - per-(student, concept) mastery state with optimistic writes
//! - [`prediction`] - prediction records closed by graded outcomes
//! - [`diagnostic`] - estimation, assessment folding and prediction logging
//! - [`feedback`] - accuracy metrics, quality bands, parameter tuning
//!
//! ```rust
//! use mastery_engine::{BktEstimator, Tier};
//!
//! let estimator = BktEstimator::default();
//! let mastery = estimator.bulk_update(0.5, &[true, true, false, true]);
//! assert!((0.0..=1.0).contains(&mastery));
//! assert_eq!(Tier::classify(mastery), Tier::Tier1);
//! ```

pub mod bkt;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod feedback;
pub mod logging;
pub mod prediction;
pub mod store;
pub mod tier;

pub use bkt::{confidence, BktConfig, BktEstimator, BktParameter, BktParams, Confidence};
pub use config::Config;
pub use diagnostic::{ClassDiagnostic, DiagnosticService, MasteryEstimate};
pub use error::{MasteryError, MasteryResult};
pub use feedback::{
    apply_parameter_updates, assess_quality, compute_metrics, recommend_updates, AccuracyMetrics,
    FeedbackAnalyzer, FeedbackReport, ParameterUpdate, QualityAssessment,
};
pub use prediction::{InMemoryPredictionLog, PredictionLog, PredictionRecord};
pub use store::{InMemoryMasteryStore, MasteryKey, MasteryState, MasteryStore};
pub use tier::{Tier, TierDistribution, TIER_1_THRESHOLD, TIER_3_THRESHOLD};
