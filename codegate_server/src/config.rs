//! Server configuration loaded from environment variables

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::guard::policy::profiles;
use crate::guard::GuardPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,

    /// Port for the guarded endpoint
    pub port: u16,

    /// Which guard profile the policy started from
    pub profile: String,

    /// Guard tunables (profile preset plus env overrides)
    pub guard: GuardPolicy,

    /// How long an idle, unpenalized client record is retained
    pub record_retention: Duration,

    /// Fixed verification code; a random six-digit code is generated when unset
    pub valid_code: Option<String>,

    /// Balance payload returned for a valid code
    pub balance: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let profile = env::var("GUARD_PROFILE").unwrap_or_else(|_| "behavioral".to_string());
        let mut guard = guard_profile(&profile)?;

        if let Some(secs) = parse_env::<u64>("ATTEMPT_WINDOW_SECS")? {
            guard.attempt_window = Duration::from_secs(secs);
        }
        if let Some(max) = parse_env::<usize>("MAX_ATTEMPTS_WINDOW")? {
            guard.max_attempts_window = max;
        }
        if let Some(secs) = parse_env::<u64>("BLOCK_DURATION_SECS")? {
            guard.block_duration = Duration::from_secs(secs);
        }
        if let Some(threshold) = parse_env::<u32>("BLACKLIST_THRESHOLD")? {
            guard.blacklist_threshold = threshold;
        }
        if let Some(secs) = parse_env::<u64>("BLACKLIST_DURATION_SECS")? {
            guard.blacklist_duration = Duration::from_secs(secs);
        }
        if let Some(threshold) = parse_env::<f64>("ENTROPY_THRESHOLD")? {
            guard.entropy_threshold = threshold;
        }
        if let Some(cap) = parse_env::<usize>("IDENTITY_HISTORY_CAP")? {
            guard.identity_history_cap = cap;
        }
        if let Some(window) = parse_env::<usize>("ENTROPY_WINDOW")? {
            guard.entropy_window = window;
        }
        if let Some(p) = parse_env::<f64>("P_SUSPICIOUS_REJECT")? {
            guard.p_suspicious_reject = p;
        }
        if let Some(p) = parse_env::<f64>("P_SERVICE_NOISE")? {
            guard.p_service_noise = p;
        }

        if !(0.0..=1.0).contains(&guard.p_suspicious_reject) {
            return Err(ConfigError::InvalidValue("P_SUSPICIOUS_REJECT"));
        }
        if !(0.0..=1.0).contains(&guard.p_service_noise) {
            return Err(ConfigError::InvalidValue("P_SERVICE_NOISE"));
        }

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PORT"))?,
            profile,
            guard,
            record_retention: Duration::from_secs(
                parse_env::<u64>("RECORD_RETENTION_SECS")?.unwrap_or(7200),
            ),
            valid_code: env::var("VALID_CODE").ok(),
            balance: env::var("BALANCE")
                .unwrap_or_else(|_| codegate_common::constants::DEFAULT_BALANCE.to_string()),
        })
    }
}

/// Resolve a profile name to its guard preset.
fn guard_profile(name: &str) -> Result<GuardPolicy, ConfigError> {
    match name {
        "behavioral" => Ok(profiles::behavioral()),
        "basic" => Ok(profiles::basic()),
        other => Err(ConfigError::UnknownProfile(other.to_string())),
    }
}

/// Parse an optional environment variable; unset is `None`, unparseable is
/// an error.
fn parse_env<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(name)),
        Err(_) => Ok(None),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown guard profile: {0} (expected \"behavioral\" or \"basic\")")]
    UnknownProfile(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
