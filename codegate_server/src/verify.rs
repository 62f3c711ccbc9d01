//! Verification collaborator
//!
//! The guard never learns the stored secret; it hands admitted codes
//! across this seam and forwards the outcome.

use codegate_common::constants;
use rand::Rng;

/// Outcome of checking a submitted code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Valid { balance: String },
    Invalid,
}

pub trait CodeVerifier: Send + Sync {
    fn verify(&self, code: &str) -> Verification;
}

/// Equality check against a single stored code.
pub struct StoredCodeVerifier {
    code: String,
    balance: String,
}

impl StoredCodeVerifier {
    pub fn new(code: impl Into<String>, balance: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            balance: balance.into(),
        }
    }

    /// Fresh random six-digit lab code.
    pub fn generate(balance: impl Into<String>) -> Self {
        let code = rand::thread_rng()
            .gen_range(constants::CODE_MIN..=constants::CODE_MAX)
            .to_string();
        Self::new(code, balance)
    }

    /// The stored code, logged once at startup for lab runs.
    pub fn code(&self) -> &str {
        &self.code
    }
}

impl CodeVerifier for StoredCodeVerifier {
    fn verify(&self, code: &str) -> Verification {
        if code == self.code {
            Verification::Valid {
                balance: self.balance.clone(),
            }
        } else {
            Verification::Invalid
        }
    }
}
