//! Admission decision engine
//!
//! Combines the escalation status, the behavioral anomaly signal, and
//! randomized degradation noise into one verdict per request, before the
//! request is allowed to reach verification. The whole evaluation runs
//! under the client record's entry guard, so per-key updates apply
//! atomically and in arrival order.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;

use super::entropy;
use super::escalation::{self, Status};
use super::policy::GuardPolicy;
use super::store::ClientStore;
use crate::verify::{CodeVerifier, Verification};

/// Uniform [0, 1) draws behind the engine's probabilistic branches.
///
/// Production uses the process-wide thread RNG; tests substitute
/// deterministic sources. No cryptographic guarantee is claimed.
pub trait NoiseSource: Send + Sync {
    fn draw(&self) -> f64;
}

pub struct ThreadRngNoise;

impl NoiseSource for ThreadRngNoise {
    fn draw(&self) -> f64 {
        rand::thread_rng().gen()
    }
}

/// Final decision for one inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Code matched; carries the balance payload
    Valid { balance: String },

    /// Well-formed code that did not match
    Invalid,

    /// Window overflow, or an unexpired earlier block
    Blocked { retry_after: Duration },

    /// Active blacklist
    Blacklisted,

    /// Probabilistic rejection on the behavioral signal
    Throttled,

    /// Request body failed format validation
    Malformed,

    /// Synthetic transient failure
    ServiceUnavailable,
}

/// Orchestrates the guard components for every request.
pub struct AdmissionEngine {
    store: ClientStore,
    policy: GuardPolicy,
    verifier: Arc<dyn CodeVerifier>,
    noise: Box<dyn NoiseSource>,
}

impl AdmissionEngine {
    pub fn new(
        policy: GuardPolicy,
        retention: Duration,
        verifier: Arc<dyn CodeVerifier>,
        noise: Box<dyn NoiseSource>,
    ) -> Self {
        Self {
            store: ClientStore::new(retention),
            policy,
            verifier,
            noise,
        }
    }

    /// Number of client records currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.store.len()
    }

    /// Sweep idle records; returns how many were evicted.
    pub fn evict_idle(&self, now: Instant) -> usize {
        self.store.evict_idle(now)
    }

    /// Decide one request.
    ///
    /// `code` is `None` when the body was missing or unparseable; format
    /// validation happens only after the escalation gates, so malformed
    /// floods still count toward blocking.
    pub fn evaluate(
        &self,
        key: IpAddr,
        identity: &str,
        code: Option<&str>,
        now: Instant,
    ) -> Verdict {
        self.store.with_record(key, now, |record| {
            record.push_identity(identity, self.policy.identity_history_cap);

            match escalation::check_and_escalate(record, &self.policy, now) {
                Status::Blacklisted => {
                    tracing::warn!(client = %key, "rejected blacklisted client");
                    return Verdict::Blacklisted;
                }
                Status::Blocked => {
                    let retry_after = record
                        .blocked_until
                        .map(|until| until.saturating_duration_since(now))
                        .unwrap_or_default();
                    tracing::info!(
                        client = %key,
                        blocks = record.block_count,
                        "blocked client rejected"
                    );
                    return Verdict::Blocked { retry_after };
                }
                Status::Clear => {}
            }

            let code = match code {
                Some(c) if is_numeric(c) => c,
                _ => {
                    record.error_count += 1;
                    tracing::debug!(
                        client = %key,
                        errors = record.error_count,
                        "malformed submission"
                    );
                    return Verdict::Malformed;
                }
            };

            if self.policy.entropy_enabled
                && entropy::is_suspicious(
                    &record.identity_history,
                    self.policy.entropy_window,
                    self.policy.entropy_threshold,
                )
                && self.noise.draw() < self.policy.p_suspicious_reject
            {
                tracing::debug!(client = %key, "throttled low-entropy client");
                return Verdict::Throttled;
            }

            let outcome = self.verifier.verify(code);

            // Degradation noise is independent of the verification outcome.
            if self.noise.draw() < self.policy.p_service_noise {
                return Verdict::ServiceUnavailable;
            }

            match outcome {
                Verification::Valid { balance } => Verdict::Valid { balance },
                Verification::Invalid => Verdict::Invalid,
            }
        })
    }
}

/// Present, non-empty, ASCII digits only.
fn is_numeric(code: &str) -> bool {
    !code.is_empty() && code.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::policy::profiles;
    use crate::verify::StoredCodeVerifier;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::net::Ipv4Addr;
    use std::sync::Mutex;

    const RETENTION: Duration = Duration::from_secs(7200);
    const CODE: &str = "424242";
    const BALANCE: &str = "KZ 1,000.00";

    /// Noise pinned to one value; 1.0 disables every probabilistic branch.
    struct FixedNoise(f64);

    impl NoiseSource for FixedNoise {
        fn draw(&self) -> f64 {
            self.0
        }
    }

    /// Seeded rng-backed noise for the statistical test.
    struct SeededNoise(Mutex<StdRng>);

    impl NoiseSource for SeededNoise {
        fn draw(&self) -> f64 {
            self.0.lock().unwrap().gen()
        }
    }

    fn engine(policy: GuardPolicy, noise: f64) -> AdmissionEngine {
        AdmissionEngine::new(
            policy,
            RETENTION,
            Arc::new(StoredCodeVerifier::new(CODE, BALANCE)),
            Box::new(FixedNoise(noise)),
        )
    }

    fn key(octet: u8) -> IpAddr {
        IpAddr::from([192, 168, 1, octet])
    }

    #[test]
    fn test_valid_and_invalid_pass_through() {
        let engine = engine(profiles::basic(), 1.0);
        let base = Instant::now();

        assert_eq!(
            engine.evaluate(key(1), "curl/8", Some(CODE), base),
            Verdict::Valid {
                balance: BALANCE.to_string()
            }
        );
        assert_eq!(
            engine.evaluate(key(1), "curl/8", Some("000000"), base),
            Verdict::Invalid
        );
    }

    #[test]
    fn test_ten_invalid_then_blocked() {
        // End-to-end shape of the basic profile: 10 wrong codes inside the
        // window are all admitted and answered `Invalid`; the 11th is
        // blocked.
        let engine = engine(profiles::basic(), 1.0);
        let base = Instant::now();

        for i in 0..10u64 {
            let verdict = engine.evaluate(
                key(2),
                "curl/8",
                Some("111111"),
                base + Duration::from_millis(500 * i),
            );
            assert_eq!(verdict, Verdict::Invalid, "attempt {i}");
        }

        let verdict = engine.evaluate(key(2), "curl/8", Some("111111"), base + Duration::from_secs(5));
        assert!(matches!(verdict, Verdict::Blocked { .. }));
    }

    #[test]
    fn test_blocked_carries_retry_after() {
        let policy = profiles::basic();
        let block_duration = policy.block_duration;
        let engine = engine(policy, 1.0);
        let base = Instant::now();

        for i in 0..10u64 {
            engine.evaluate(key(3), "curl/8", Some("111111"), base + Duration::from_millis(i));
        }
        let at_block = base + Duration::from_secs(1);
        match engine.evaluate(key(3), "curl/8", Some("111111"), at_block) {
            Verdict::Blocked { retry_after } => assert_eq!(retry_after, block_duration),
            other => panic!("expected block, got {other:?}"),
        }
    }

    #[test]
    fn test_hammering_through_blocks_reaches_blacklist() {
        let policy = profiles::behavioral();
        let threshold = policy.blacklist_threshold;
        let engine = engine(policy, 1.0);
        let base = Instant::now();

        for i in 0..12u64 {
            engine.evaluate(key(4), "bot/1.0", Some("111111"), base + Duration::from_millis(i));
        }

        let mut verdicts = Vec::new();
        for i in 0..threshold as u64 {
            verdicts.push(engine.evaluate(
                key(4),
                "bot/1.0",
                Some("111111"),
                base + Duration::from_secs(1 + i),
            ));
        }

        assert!(matches!(verdicts[0], Verdict::Blocked { .. }));
        assert_eq!(*verdicts.last().unwrap(), Verdict::Blacklisted);

        // Once out, always blacklisted until expiry, malformed or not.
        let verdict = engine.evaluate(key(4), "bot/1.0", None, base + Duration::from_secs(60));
        assert_eq!(verdict, Verdict::Blacklisted);
    }

    #[test]
    fn test_malformed_after_escalation_gates() {
        let engine = engine(profiles::behavioral(), 1.0);
        let base = Instant::now();

        for (i, bad) in [None, Some(""), Some("12a456"), Some("12 456"), Some("١٢٣٤٥٦")]
            .into_iter()
            .enumerate()
        {
            let verdict = engine.evaluate(
                key(5),
                "curl/8",
                bad,
                base + Duration::from_millis(i as u64),
            );
            assert_eq!(verdict, Verdict::Malformed, "case {i}");
        }
    }

    #[test]
    fn test_malformed_floods_still_block() {
        let engine = engine(profiles::behavioral(), 1.0);
        let base = Instant::now();

        for i in 0..12u64 {
            engine.evaluate(key(6), "curl/8", None, base + Duration::from_millis(i));
        }
        let verdict = engine.evaluate(key(6), "curl/8", None, base + Duration::from_secs(1));
        assert!(matches!(verdict, Verdict::Blocked { .. }));
    }

    #[test]
    fn test_low_entropy_client_throttled_when_draw_fires() {
        // Noise 0.0 makes every draw fire; the repeated identity string
        // keeps entropy at zero.
        let engine = engine(profiles::behavioral(), 0.0);
        let base = Instant::now();

        let verdict = engine.evaluate(key(7), "bot/1.0", Some("111111"), base);
        assert_eq!(verdict, Verdict::Throttled);
    }

    #[test]
    fn test_low_entropy_client_admitted_when_draw_misses() {
        let engine = engine(profiles::behavioral(), 1.0);
        let base = Instant::now();

        let verdict = engine.evaluate(key(8), "bot/1.0", Some("111111"), base);
        assert_eq!(verdict, Verdict::Invalid);
    }

    #[test]
    fn test_entropy_check_disabled_in_basic_profile() {
        // Draws always fire, but the basic profile never consults the
        // behavioral signal; with service noise zeroed the request passes.
        let mut policy = profiles::basic();
        policy.p_service_noise = 0.0;
        let engine = engine(policy, 0.0);

        let verdict = engine.evaluate(key(9), "bot/1.0", Some("111111"), Instant::now());
        assert_eq!(verdict, Verdict::Invalid);
    }

    #[test]
    fn test_service_noise_overrides_valid_outcome() {
        let mut policy = profiles::behavioral();
        policy.entropy_enabled = false;
        let engine = engine(policy, 0.0);

        let verdict = engine.evaluate(key(10), "curl/8", Some(CODE), Instant::now());
        assert_eq!(verdict, Verdict::ServiceUnavailable);
    }

    #[test]
    fn test_throttle_rate_tracks_configured_probability() {
        let mut policy = profiles::behavioral();
        policy.p_service_noise = 0.0;
        let engine = AdmissionEngine::new(
            policy,
            RETENTION,
            Arc::new(StoredCodeVerifier::new(CODE, BALANCE)),
            Box::new(SeededNoise(Mutex::new(StdRng::seed_from_u64(7)))),
        );

        // One first-contact request per distinct client: single-entry
        // history, entropy zero, so each rejection is purely the 0.6 draw.
        let trials = 1000u32;
        let base = Instant::now();
        let throttled = (0..trials)
            .filter(|&i| {
                let addr = IpAddr::V4(Ipv4Addr::from(0x0a00_0000 + i));
                engine.evaluate(addr, "bot/1.0", Some("111111"), base) == Verdict::Throttled
            })
            .count();

        let rate = throttled as f64 / trials as f64;
        assert!(
            (0.5..0.7).contains(&rate),
            "throttle rate {rate} drifted from 0.6"
        );
    }

    #[test]
    fn test_concurrent_overflow_blocks_exactly_once() {
        let policy = profiles::basic();
        let n = policy.max_attempts_window + 1;
        let engine = Arc::new(engine(policy, 1.0));
        let base = Instant::now();

        let handles: Vec<_> = (0..n)
            .map(|_| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    engine.evaluate(key(11), "curl/8", Some("111111"), base)
                })
            })
            .collect();

        let verdicts: Vec<Verdict> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let blocked = verdicts
            .iter()
            .filter(|v| matches!(v, Verdict::Blocked { .. }))
            .count();

        assert_eq!(blocked, 1, "exactly one request crosses the threshold");
        assert_eq!(verdicts.len() - blocked, n - 1);
    }

    #[test]
    fn test_is_numeric() {
        assert!(is_numeric("123456"));
        assert!(is_numeric("0"));
        assert!(!is_numeric(""));
        assert!(!is_numeric("12a"));
        assert!(!is_numeric("12.3"));
        assert!(!is_numeric("-123"));
    }
}
