//! Codegate Common - Shared wire types for the verification guard
//!
//! This crate contains the request/response bodies for the `/check_code`
//! endpoint and the status vocabulary used by both the server and CLI.

use serde::{Deserialize, Serialize};

/// Body of a `POST /check_code` request.
///
/// `code` is optional on the wire: a missing field is handled by the server
/// as a malformed submission rather than a deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRequest {
    /// Candidate code, expected to be ASCII digits
    pub code: Option<String>,
}

impl CheckRequest {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
        }
    }
}

/// Body of every `/check_code` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResponse {
    /// Outcome class: one of the `status` constants below
    pub status: String,

    /// Human-readable detail
    pub message: String,

    /// Account balance, present only on a valid submission
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<String>,
}

impl CheckResponse {
    fn new(status: &str, message: &str) -> Self {
        Self {
            status: status.to_string(),
            message: message.to_string(),
            balance: None,
        }
    }

    /// Valid code: `ok` with the balance payload
    pub fn valid(balance: impl Into<String>) -> Self {
        Self {
            balance: Some(balance.into()),
            ..Self::new(status::OK, message::VALID)
        }
    }

    /// Wrong code: same HTTP status as valid, different body
    pub fn invalid() -> Self {
        Self::new(status::FAIL, message::INVALID)
    }

    /// Temporarily blocked after window overflow
    pub fn blocked() -> Self {
        Self::new(status::BLOCKED, message::TOO_MANY_ATTEMPTS)
    }

    /// Probabilistic rejection of a suspicious client
    pub fn throttled() -> Self {
        Self::new(status::BLOCKED, message::SUSPICIOUS)
    }

    /// Blacklisted client
    pub fn blacklisted() -> Self {
        Self::new(status::BLACKLISTED, message::BLACKLISTED)
    }

    /// Request body failed format validation
    pub fn invalid_format() -> Self {
        Self::new(status::ERROR, message::INVALID_FORMAT)
    }

    /// Synthetic transient failure
    pub fn service_unavailable() -> Self {
        Self::new(status::ERROR, message::SERVICE_UNAVAILABLE)
    }
}

/// Response `status` vocabulary
pub mod status {
    pub const OK: &str = "ok";
    pub const FAIL: &str = "fail";
    pub const BLOCKED: &str = "blocked";
    pub const BLACKLISTED: &str = "blacklisted";
    pub const ERROR: &str = "error";
}

/// Response `message` vocabulary
pub mod message {
    pub const VALID: &str = "valid";
    pub const INVALID: &str = "invalid";
    pub const TOO_MANY_ATTEMPTS: &str = "too many attempts";
    pub const SUSPICIOUS: &str = "suspicious client behavior";
    pub const BLACKLISTED: &str = "ip blacklisted";
    pub const INVALID_FORMAT: &str = "invalidformat";
    pub const SERVICE_UNAVAILABLE: &str = "service_unavailable";
}

/// Constants shared between server and CLI
pub mod constants {
    /// Path of the guarded verification endpoint
    pub const CHECK_CODE_PATH: &str = "/check_code";

    /// Identity string reported when a client sends no User-Agent
    pub const ANONYMOUS_IDENTITY: &str = "-";

    /// Balance payload returned for a valid code
    pub const DEFAULT_BALANCE: &str = "KZ 1,000.00";

    /// Inclusive range of lab verification codes
    pub const CODE_MIN: u32 = 100_000;
    pub const CODE_MAX: u32 = 999_999;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_response_carries_balance() {
        let resp = CheckResponse::valid(constants::DEFAULT_BALANCE);
        let json = serde_json::to_value(&resp).unwrap();

        assert_eq!(json["status"], "ok");
        assert_eq!(json["message"], "valid");
        assert_eq!(json["balance"], constants::DEFAULT_BALANCE);
    }

    #[test]
    fn test_rejections_omit_balance() {
        for resp in [
            CheckResponse::invalid(),
            CheckResponse::blocked(),
            CheckResponse::blacklisted(),
            CheckResponse::invalid_format(),
            CheckResponse::service_unavailable(),
        ] {
            let json = serde_json::to_value(&resp).unwrap();
            assert!(json.get("balance").is_none(), "{:?}", resp.status);
        }
    }

    #[test]
    fn test_request_tolerates_missing_code() {
        let req: CheckRequest = serde_json::from_str("{}").unwrap();
        assert!(req.code.is_none());

        let req: CheckRequest = serde_json::from_str(r#"{"code":"123456"}"#).unwrap();
        assert_eq!(req.code.as_deref(), Some("123456"));
    }

    #[test]
    fn test_throttled_shares_blocked_status() {
        // A throttled client must be indistinguishable from a blocked one
        // by status field alone.
        assert_eq!(CheckResponse::throttled().status, status::BLOCKED);
        assert_ne!(
            CheckResponse::throttled().message,
            CheckResponse::blocked().message
        );
    }
}
