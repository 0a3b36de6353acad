use chrono::NaiveTime;

use crate::error::{AppError, Result};

pub const RIKSBANK_SERIES_URL: &str = "https://api.riksbank.se/swea/v1/Series";
pub const RIKSBANK_OBS_URL: &str = "https://api.riksbank.se/swea/v1/Observations/Latest/";

/// Upstream request timeout (seconds).
pub const FETCH_TIMEOUT_SECS: u64 = 10;

/// History rows kept per series.
pub const HISTORY_LIMIT: u32 = 3;

/// Series refreshed per update run.
pub const UPDATE_BATCH_SIZE: usize = 4;

/// Successful updates between two rate-limit pauses.
pub const RATE_LIMIT_EVERY: usize = 5;

/// Rate-limit pause length (seconds).
pub const RATE_LIMIT_PAUSE_SECS: u64 = 60;

/// Local wall-clock time of the daily fetch + update job.
pub const DAILY_RUN_AT: &str = "10:00";

#[derive(Debug, Clone)]
pub struct Config {
    /// Catalog endpoint (RIKSBANK_SERIES_URL)
    pub series_url: String,
    /// Observation endpoint prefix; the series id is appended (RIKSBANK_OBS_URL)
    pub obs_url: String,
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    pub fetch_timeout_secs: u64,
    pub history_limit: u32,
    pub update: UpdateSettings,
    /// Local time of the daily job (DAILY_RUN_AT, "HH:MM")
    pub daily_run_at: NaiveTime,
    pub schedule_enabled: bool,
}

/// Knobs for one update-latest run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSettings {
    pub batch_size: usize,
    /// Start each batch at the persisted cursor instead of the catalog head.
    pub rotate: bool,
    pub rate_limit_every: usize,
    pub rate_limit_pause_secs: u64,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            batch_size: UPDATE_BATCH_SIZE,
            rotate: false,
            rate_limit_every: RATE_LIMIT_EVERY,
            rate_limit_pause_secs: RATE_LIMIT_PAUSE_SECS,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            series_url: std::env::var("RIKSBANK_SERIES_URL")
                .unwrap_or_else(|_| RIKSBANK_SERIES_URL.to_string()),
            obs_url: std::env::var("RIKSBANK_OBS_URL")
                .unwrap_or_else(|_| RIKSBANK_OBS_URL.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "series.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            fetch_timeout_secs: std::env::var("FETCH_TIMEOUT_SECS")
                .unwrap_or_else(|_| FETCH_TIMEOUT_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(FETCH_TIMEOUT_SECS),
            history_limit: positive(
                "HISTORY_LIMIT",
                std::env::var("HISTORY_LIMIT").unwrap_or_else(|_| HISTORY_LIMIT.to_string()),
            )?,
            update: UpdateSettings {
                batch_size: positive(
                    "UPDATE_BATCH_SIZE",
                    std::env::var("UPDATE_BATCH_SIZE")
                        .unwrap_or_else(|_| UPDATE_BATCH_SIZE.to_string()),
                )?,
                rotate: parse_flag(&std::env::var("UPDATE_ROTATE").unwrap_or_default(), false),
                rate_limit_every: positive(
                    "RATE_LIMIT_EVERY",
                    std::env::var("RATE_LIMIT_EVERY")
                        .unwrap_or_else(|_| RATE_LIMIT_EVERY.to_string()),
                )?,
                rate_limit_pause_secs: std::env::var("RATE_LIMIT_PAUSE_SECS")
                    .unwrap_or_else(|_| RATE_LIMIT_PAUSE_SECS.to_string())
                    .parse::<u64>()
                    .unwrap_or(RATE_LIMIT_PAUSE_SECS),
            },
            daily_run_at: parse_run_at(
                &std::env::var("DAILY_RUN_AT").unwrap_or_else(|_| DAILY_RUN_AT.to_string()),
            )?,
            schedule_enabled: parse_flag(
                &std::env::var("SCHEDULE_ENABLED").unwrap_or_default(),
                true,
            ),
        })
    }
}

/// Parse a `HH:MM` (or `HH:MM:SS`) local time.
pub fn parse_run_at(s: &str) -> Result<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| AppError::Config(format!("DAILY_RUN_AT must be HH:MM, got {s:?}")))
}

fn parse_flag(s: &str, default: bool) -> bool {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn positive<T>(name: &str, raw: String) -> Result<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match raw.trim().parse::<T>() {
        Ok(v) if v > T::default() => Ok(v),
        _ => Err(AppError::Config(format!("{name} must be a positive integer, got {raw:?}"))),
    }
}
