//! Sliding-window attempt ledger

use std::time::{Duration, Instant};

use super::store::ClientRecord;

/// Evict expired attempts, count what remains, then record `now`.
///
/// Returns the post-cleanup, pre-append count; escalation compares that
/// count against the window maximum. Every request that reaches the ledger
/// is recorded, including ones about to be rejected, so throttled retries
/// keep accumulating toward escalation.
pub fn record_and_count(record: &mut ClientRecord, now: Instant, window: Duration) -> usize {
    evict_expired(record, now, window);
    let count = record.recent_attempts.len();
    record.recent_attempts.push_back(now);
    count
}

/// Drop attempts older than `window` relative to `now`.
///
/// Entries exactly at the window boundary are kept. Idempotent for a
/// fixed `now`.
pub fn evict_expired(record: &mut ClientRecord, now: Instant, window: Duration) {
    while let Some(oldest) = record.recent_attempts.front() {
        if now.duration_since(*oldest) > window {
            record.recent_attempts.pop_front();
        } else {
            break;
        }
    }
}
