use std::path::PathBuf;
use std::str::FromStr;

use crate::bkt::{
    BktConfig, BktParams, DEFAULT_INITIAL_MASTERY, DEFAULT_P_GUESS, DEFAULT_P_LEARN, DEFAULT_P_SLIP,
};
use crate::diagnostic::DEFAULT_WRITE_ATTEMPTS;
use crate::error::{MasteryError, MasteryResult};
use crate::prediction::DIAGNOSTIC_ENGINE;

pub const DEFAULT_TIMEFRAME_DAYS: u32 = 30;
pub const DEFAULT_LOG_DIR: &str = "./logs";

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub file_logs: bool,
    pub log_dir: PathBuf,
    pub bkt: BktConfig,
    pub feedback_engine_name: String,
    pub feedback_timeframe_days: u32,
    pub feedback_auto_apply: bool,
    pub write_attempts: u32,
    pub predictions_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            file_logs: false,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            bkt: BktConfig::default(),
            feedback_engine_name: DIAGNOSTIC_ENGINE.to_string(),
            feedback_timeframe_days: DEFAULT_TIMEFRAME_DAYS,
            feedback_auto_apply: false,
            write_attempts: DEFAULT_WRITE_ATTEMPTS,
            predictions_path: None,
        }
    }
}

impl Config {
    pub fn from_env() -> MasteryResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; BKT values are validated.
    pub fn from_lookup<F>(lookup: F) -> MasteryResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let params = BktParams::new(
            parse_or(&lookup, "BKT_P_LEARN", DEFAULT_P_LEARN)?,
            parse_or(&lookup, "BKT_P_GUESS", DEFAULT_P_GUESS)?,
            parse_or(&lookup, "BKT_P_SLIP", DEFAULT_P_SLIP)?,
        )?;
        let bkt = BktConfig::new(
            params,
            parse_or(&lookup, "BKT_INITIAL_MASTERY", DEFAULT_INITIAL_MASTERY)?,
        )?;

        Ok(Self {
            log_level: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            file_logs: flag(&lookup, "ENABLE_FILE_LOGS"),
            log_dir: lookup("LOG_DIR")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
            bkt,
            feedback_engine_name: lookup("FEEDBACK_ENGINE_NAME")
                .unwrap_or_else(|| DIAGNOSTIC_ENGINE.to_string()),
            feedback_timeframe_days: parse_or(&lookup, "FEEDBACK_TIMEFRAME_DAYS", DEFAULT_TIMEFRAME_DAYS)?,
            feedback_auto_apply: flag(&lookup, "FEEDBACK_AUTO_APPLY"),
            write_attempts: parse_or(&lookup, "MASTERY_WRITE_ATTEMPTS", DEFAULT_WRITE_ATTEMPTS)?.max(1),
            predictions_path: lookup("PREDICTIONS_PATH")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        })
    }
}

fn flag<F>(lookup: &F, key: &str) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).is_some_and(|v| v == "true" || v == "1")
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> MasteryResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| MasteryError::InvalidConfig(format!("{key}={raw:?} does not parse"))),
    }
}
