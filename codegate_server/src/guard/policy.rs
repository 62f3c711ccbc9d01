//! Guard tuning parameters

use std::time::Duration;

/// Tunables for the admission-control guard.
///
/// Start from one of the `profiles` presets and override individual fields
/// from the environment (see `crate::config`).
#[derive(Debug, Clone)]
pub struct GuardPolicy {
    /// Trailing interval bounding the attempt count
    pub attempt_window: Duration,

    /// Attempts tolerated inside the window before a block fires
    pub max_attempts_window: usize,

    /// How long a block lasts
    pub block_duration: Duration,

    /// Whether repeated blocks promote to a blacklist
    pub blacklist_enabled: bool,

    /// Block transitions before the client is blacklisted
    pub blacklist_threshold: u32,

    /// How long a blacklist lasts
    pub blacklist_duration: Duration,

    /// Whether the identity-entropy check runs at all
    pub entropy_enabled: bool,

    /// Entropy (bits) below which a client counts as suspicious
    pub entropy_threshold: f64,

    /// Identity strings retained per client, oldest evicted first
    pub identity_history_cap: usize,

    /// How many recent identity strings feed the entropy score
    pub entropy_window: usize,

    /// Probability of rejecting a suspicious client's request
    pub p_suspicious_reject: f64,

    /// Probability of synthesizing a transient service failure
    pub p_service_noise: f64,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        profiles::behavioral()
    }
}

/// Pre-configured guard profiles, matching the two provider variants.
pub mod profiles {
    use super::*;

    /// Full behavioral detection: entropy signal plus blacklisting.
    pub fn behavioral() -> GuardPolicy {
        GuardPolicy {
            attempt_window: Duration::from_secs(60),
            max_attempts_window: 12,
            block_duration: Duration::from_secs(300),
            blacklist_enabled: true,
            blacklist_threshold: 3,
            blacklist_duration: Duration::from_secs(3600),
            entropy_enabled: true,
            entropy_threshold: 1.0,
            identity_history_cap: 50,
            entropy_window: 10,
            p_suspicious_reject: 0.6,
            p_service_noise: 0.03,
        }
    }

    /// Plain rate limiting: no blacklist, no entropy check.
    pub fn basic() -> GuardPolicy {
        GuardPolicy {
            max_attempts_window: 10,
            blacklist_enabled: false,
            entropy_enabled: false,
            p_service_noise: 0.02,
            ..behavioral()
        }
    }
}
