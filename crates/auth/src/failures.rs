//! Temporary blocking after repeated authentication failures.
//!
//! Limits come from a configurer (`max_auth_failure_count`,
//! `auth_failure_block_minutes`). Keys are whatever the host blocks on,
//! usually a login or a client address.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};

use crate::configurer::AuthorizationConfigurer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailurePolicy {
    pub max_failures: u32,
    pub block_duration: Duration,
}

impl FailurePolicy {
    pub fn from_configurer(configurer: &AuthorizationConfigurer) -> Self {
        Self {
            max_failures: configurer.max_auth_failure_count(),
            block_duration: Duration::minutes(i64::from(configurer.auth_failure_block_minutes())),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct FailureRecord {
    count: u32,
    last_failure: DateTime<Utc>,
    blocked_until: Option<DateTime<Utc>>,
}

impl FailureRecord {
    fn first(now: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            last_failure: now,
            blocked_until: None,
        }
    }

    /// A record is stale once its block has run out or, without a block, once
    /// `window` has passed since the last failure.
    fn is_stale(&self, now: DateTime<Utc>, window: Duration) -> bool {
        match self.blocked_until {
            Some(until) => until <= now,
            None => self.last_failure + window <= now,
        }
    }
}

/// Counts failed sign-ins per key and blocks keys that hit the limit.
///
/// Failures are forgotten `block_duration` after the last one, and a block is
/// forgotten when it runs out, so stale keys do not pile up.
#[derive(Debug)]
pub struct AuthFailureTracker {
    policy: FailurePolicy,
    records: Mutex<HashMap<String, FailureRecord>>,
}

impl AuthFailureTracker {
    pub fn new(policy: FailurePolicy) -> Self {
        Self {
            policy,
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_configurer(configurer: &AuthorizationConfigurer) -> Self {
        Self::new(FailurePolicy::from_configurer(configurer))
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, FailureRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn drop_if_stale(&self, records: &mut HashMap<String, FailureRecord>, key: &str, now: DateTime<Utc>) {
        if records
            .get(key)
            .is_some_and(|r| r.is_stale(now, self.policy.block_duration))
        {
            records.remove(key);
        }
    }

    /// Record that still applies to `key` at `now`.
    fn live<'a>(
        &self,
        records: &'a mut HashMap<String, FailureRecord>,
        key: &str,
        now: DateTime<Utc>,
    ) -> Option<&'a FailureRecord> {
        self.drop_if_stale(records, key, now);
        records.get(key)
    }

    /// Record a failed attempt. Returns the instant the key is blocked until,
    /// if this failure reached the limit.
    pub fn record_failure(&self, key: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut records = self.lock();
        self.drop_if_stale(&mut records, key, now);
        let record = records
            .entry(key.to_string())
            .or_insert_with(|| FailureRecord::first(now));

        record.count = record.count.saturating_add(1);
        record.last_failure = now;

        if record.blocked_until.is_none() && record.count >= self.policy.max_failures {
            let until = now + self.policy.block_duration;
            record.blocked_until = Some(until);
            tracing::warn!(key, failures = record.count, %until, "blocking after repeated authentication failures");
        }
        record.blocked_until
    }

    pub fn is_blocked(&self, key: &str, now: DateTime<Utc>) -> bool {
        let mut records = self.lock();
        self.live(&mut records, key, now)
            .is_some_and(|r| r.blocked_until.is_some())
    }

    /// Failures of `key` that still count at `now`.
    pub fn failure_count(&self, key: &str, now: DateTime<Utc>) -> u32 {
        let mut records = self.lock();
        self.live(&mut records, key, now).map_or(0, |r| r.count)
    }

    /// Forget the failures of `key` after a successful sign-in.
    pub fn record_success(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Drop every stale record. Returns how many were dropped.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut records = self.lock();
        let before = records.len();
        records.retain(|_, r| !r.is_stale(now, self.policy.block_duration));
        let purged = before - records.len();
        if purged > 0 {
            tracing::debug!(purged, remaining = records.len(), "purged expired authentication failures");
        }
        purged
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.lock().len()
    }
}
