//! In-memory failed-login ledger
//!
//! Failures are stored per origin in a sharded concurrent map so concurrent
//! logins from the same or different origins never lose an append.

use crate::traits::AttemptLedger;
use crate::AuthResult;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

/// One failed login attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginAttemptRecord {
    /// Client network origin
    pub origin_address: String,

    /// When the attempt failed
    pub timestamp: DateTime<Utc>,
}

/// Ledger backed by a `DashMap` of per-origin timestamp queues
#[derive(Debug, Clone, Default)]
pub struct InMemoryAttemptLedger {
    entries: Arc<DashMap<String, VecDeque<DateTime<Utc>>>>,
    retention: Option<Duration>,
}

impl InMemoryAttemptLedger {
    /// Create a ledger that keeps every record
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger that drops an origin's records older than `retention`
    /// whenever a new failure is appended for it
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            retention: Some(retention),
        }
    }

    /// Records stored for an origin, oldest first
    pub fn records(&self, origin: &str) -> Vec<LoginAttemptRecord> {
        let mut records: Vec<LoginAttemptRecord> = self
            .entries
            .get(origin)
            .map(|queue| {
                queue
                    .iter()
                    .map(|timestamp| LoginAttemptRecord {
                        origin_address: origin.to_string(),
                        timestamp: *timestamp,
                    })
                    .collect()
            })
            .unwrap_or_default();
        records.sort_by_key(|record| record.timestamp);
        records
    }

    /// Number of records across all origins
    pub fn total_records(&self) -> usize {
        self.entries.iter().map(|entry| entry.value().len()).sum()
    }

    /// Forget every failure of an origin
    pub fn clear(&self, origin: &str) {
        self.entries.remove(origin);
    }

    /// Drop records older than `cutoff`, returning how many were removed
    pub fn prune_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, queue| {
            let before = queue.len();
            queue.retain(|timestamp| *timestamp >= cutoff);
            removed += before - queue.len();
            !queue.is_empty()
        });

        if removed > 0 {
            tracing::debug!(removed, %cutoff, "Pruned failed login records");
        }
        removed
    }
}

#[async_trait]
impl AttemptLedger for InMemoryAttemptLedger {
    async fn record_failure(&self, origin: &str, timestamp: DateTime<Utc>) -> AuthResult<()> {
        let mut queue = self.entries.entry(origin.to_string()).or_default();
        queue.push_back(timestamp);

        if let Some(retention) = self.retention {
            let horizon = timestamp - retention;
            queue.retain(|recorded| *recorded >= horizon);
        }

        Ok(())
    }

    async fn count_recent_failures(
        &self,
        origin: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> AuthResult<u32> {
        let cutoff = now - window;
        let count = self
            .entries
            .get(origin)
            .map(|queue| queue.iter().filter(|timestamp| **timestamp >= cutoff).count())
            .unwrap_or(0);

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, minute, 0).unwrap()
    }

    #[tokio::test]
    async fn test_counts_only_inside_window() {
        let ledger = InMemoryAttemptLedger::new();

        ledger.record_failure("10.0.0.1", at(0)).await.unwrap();
        ledger.record_failure("10.0.0.1", at(20)).await.unwrap();
        ledger.record_failure("10.0.0.1", at(28)).await.unwrap();

        let count = ledger
            .count_recent_failures("10.0.0.1", Duration::minutes(15), at(30))
            .await
            .unwrap();
        assert_eq!(count, 2);

        let count = ledger
            .count_recent_failures("10.0.0.1", Duration::minutes(60), at(30))
            .await
            .unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn test_origins_are_independent() {
        let ledger = InMemoryAttemptLedger::new();

        ledger.record_failure("10.0.0.1", at(1)).await.unwrap();
        ledger.record_failure("10.0.0.2", at(1)).await.unwrap();
        ledger.record_failure("10.0.0.2", at(2)).await.unwrap();

        let window = Duration::minutes(10);
        assert_eq!(
            ledger.count_recent_failures("10.0.0.1", window, at(5)).await.unwrap(),
            1
        );
        assert_eq!(
            ledger.count_recent_failures("10.0.0.2", window, at(5)).await.unwrap(),
            2
        );
        assert_eq!(
            ledger.count_recent_failures("10.0.0.3", window, at(5)).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_window_boundary_is_inclusive() {
        let ledger = InMemoryAttemptLedger::new();
        ledger.record_failure("origin", at(15)).await.unwrap();

        let count = ledger
            .count_recent_failures("origin", Duration::minutes(15), at(30))
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_retention_prunes_on_append() {
        let ledger = InMemoryAttemptLedger::with_retention(Duration::minutes(10));

        ledger.record_failure("origin", at(0)).await.unwrap();
        ledger.record_failure("origin", at(5)).await.unwrap();
        ledger.record_failure("origin", at(30)).await.unwrap();

        let records = ledger.records("origin");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].timestamp, at(30));
    }

    #[tokio::test]
    async fn test_prune_and_clear() {
        let ledger = InMemoryAttemptLedger::new();

        ledger.record_failure("a", at(0)).await.unwrap();
        ledger.record_failure("a", at(40)).await.unwrap();
        ledger.record_failure("b", at(1)).await.unwrap();
        assert_eq!(ledger.total_records(), 3);

        assert_eq!(ledger.prune_older_than(at(30)), 2);
        assert_eq!(ledger.total_records(), 1);
        assert!(ledger.records("b").is_empty());

        ledger.clear("a");
        assert_eq!(ledger.total_records(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_are_not_lost() {
        let ledger = InMemoryAttemptLedger::new();
        let mut handles = Vec::new();

        for task in 0..8 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                let origin = if task % 2 == 0 { "shared" } else { "other" };
                for _ in 0..50 {
                    ledger.record_failure(origin, at(10)).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let window = Duration::minutes(5);
        assert_eq!(
            ledger.count_recent_failures("shared", window, at(12)).await.unwrap(),
            200
        );
        assert_eq!(
            ledger.count_recent_failures("other", window, at(12)).await.unwrap(),
            200
        );
    }
}
