use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use serde::Serialize;

use mastery_engine::config::Config;
use mastery_engine::bkt::BktParams;
use mastery_engine::feedback::{apply_parameter_updates, FeedbackAnalyzer, FeedbackReport};
use mastery_engine::logging::init_tracing;
use mastery_engine::prediction::InMemoryPredictionLog;
use mastery_engine::MasteryResult;

#[derive(Serialize)]
struct RunOutput {
    report: FeedbackReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    applied_params: Option<BktParams>,
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };
    let _log_guard = init_tracing(&config);

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "feedback run failed");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> MasteryResult<()> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| config.predictions_path.clone());

    let log = match path {
        Some(ref path) => InMemoryPredictionLog::load_json(path)?,
        None => {
            tracing::warn!("no prediction snapshot given, reporting on an empty log");
            InMemoryPredictionLog::new()
        }
    };

    let analyzer = FeedbackAnalyzer::new(config.bkt.params);
    let report = analyzer.generate_feedback(
        &log,
        &config.feedback_engine_name,
        config.feedback_timeframe_days,
        Utc::now(),
    );

    let applied_params = if config.feedback_auto_apply {
        Some(apply_parameter_updates(
            &config.bkt.params,
            &report.parameter_updates,
            true,
        )?)
    } else {
        None
    };

    let output = RunOutput {
        report,
        applied_params,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
