//! Per-client record store
//!
//! The map from client key to `ClientRecord` is the only shared mutable
//! state in the guard. Records are created lazily on first request and
//! swept once they have gone idle with no active penalty.

use std::collections::VecDeque;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Everything the guard tracks about one client key.
#[derive(Debug)]
pub struct ClientRecord {
    /// Request timestamps inside the attempt window, oldest first
    pub recent_attempts: VecDeque<Instant>,

    /// End of the current block, if any
    pub blocked_until: Option<Instant>,

    /// Times this client has been promoted into the blocked state
    pub block_count: u32,

    /// End of the current blacklist, if any
    pub blacklisted_until: Option<Instant>,

    /// Most recently declared identity strings, oldest evicted first
    pub identity_history: VecDeque<String>,

    /// Malformed submissions attributed to this client. Diagnostic only;
    /// escalation never consults it.
    pub error_count: u64,

    /// Last time any request touched this record
    pub last_seen: Instant,
}

impl ClientRecord {
    pub(crate) fn new(now: Instant) -> Self {
        Self {
            recent_attempts: VecDeque::new(),
            blocked_until: None,
            block_count: 0,
            blacklisted_until: None,
            identity_history: VecDeque::new(),
            error_count: 0,
            last_seen: now,
        }
    }

    /// Record a declared identity string, evicting the oldest entry once
    /// the history is at capacity.
    pub fn push_identity(&mut self, identity: &str, cap: usize) {
        while self.identity_history.len() >= cap.max(1) {
            self.identity_history.pop_front();
        }
        self.identity_history.push_back(identity.to_string());
    }

    pub fn is_blocked(&self, now: Instant) -> bool {
        self.blocked_until.is_some_and(|until| now < until)
    }

    pub fn is_blacklisted(&self, now: Instant) -> bool {
        self.blacklisted_until.is_some_and(|until| now < until)
    }

    /// Whether a block or blacklist is still running.
    pub fn has_active_penalty(&self, now: Instant) -> bool {
        self.is_blocked(now) || self.is_blacklisted(now)
    }
}

/// Concurrent record store keyed by client address.
pub struct ClientStore {
    records: DashMap<IpAddr, ClientRecord>,
    retention: Duration,
}

impl ClientStore {
    pub fn new(retention: Duration) -> Self {
        Self {
            records: DashMap::new(),
            retention,
        }
    }

    /// Run `f` on the client's record under its entry guard.
    ///
    /// The guard serializes all mutation for one key, so the window count
    /// and escalation counters cannot race across concurrent requests.
    /// `f` must stay non-blocking.
    pub fn with_record<T>(
        &self,
        key: IpAddr,
        now: Instant,
        f: impl FnOnce(&mut ClientRecord) -> T,
    ) -> T {
        let mut entry = self
            .records
            .entry(key)
            .or_insert_with(|| ClientRecord::new(now));
        let record = entry.value_mut();
        record.last_seen = now;
        f(record)
    }

    /// Number of tracked clients.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop records that have been idle past the retention period and
    /// carry no active penalty. Returns how many were evicted.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| {
            record.has_active_penalty(now)
                || now.duration_since(record.last_seen) < self.retention
        });
        before - self.records.len()
    }
}
