//! Prediction accuracy feedback loop
//!
//! Compares logged mastery predictions with graded outcomes and turns the
//! error statistics into BKT parameter recommendations:
//! - metrics: RMSE, MAE, Pearson correlation, bias, tier accuracy, quality band
//! - tuning: recommendation rule table and opt-in application
//! - report: windowed feedback reports with insights and warnings

pub mod metrics;
pub mod report;
pub mod tuning;

pub use metrics::{assess_quality, compute_metrics, pearson_correlation, AccuracyMetrics, QualityAssessment};
pub use report::{FeedbackAnalyzer, FeedbackReport};
pub use tuning::{apply_parameter_updates, recommend_updates, ParameterUpdate};
