//! Escalating block/blacklist state machine
//!
//! Per client key the progression is Clear -> Blocked -> Blacklisted.
//! Both penalty states expire implicitly: status is derived from the
//! timers on every check, never stored separately. `block_count` survives
//! expiry, so a returning offender re-escalates on its first overflow.

use std::time::Instant;

use super::ledger;
use super::policy::GuardPolicy;
use super::store::ClientRecord;

/// Derived standing of a client at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Clear,
    Blocked,
    Blacklisted,
}

/// Evaluate one request against the client's record, recording the attempt
/// and promoting the client if its window overflows.
///
/// The blacklist gate runs strictly before the ledger is touched: a
/// blacklisted client cannot keep feeding its own counters. For every
/// other client the attempt is recorded first, then the pre-append window
/// count is compared against the policy maximum. An overflow (re)arms the
/// block timer and bumps `block_count`; once `block_count` reaches the
/// blacklist threshold the same event promotes straight to Blacklisted.
pub fn check_and_escalate(record: &mut ClientRecord, policy: &GuardPolicy, now: Instant) -> Status {
    if record.is_blacklisted(now) {
        return Status::Blacklisted;
    }

    let window_count = ledger::record_and_count(record, now, policy.attempt_window);
    if window_count >= policy.max_attempts_window {
        record.blocked_until = Some(now + policy.block_duration);
        record.block_count += 1;

        if policy.blacklist_enabled && record.block_count >= policy.blacklist_threshold {
            record.blacklisted_until = Some(now + policy.blacklist_duration);
            return Status::Blacklisted;
        }
        return Status::Blocked;
    }

    // A drained window does not end a block early.
    if record.is_blocked(now) {
        return Status::Blocked;
    }

    Status::Clear
}
