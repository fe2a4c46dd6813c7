//! In-memory usage store for tests and single-process runs.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

use privlens_core::usage::{QuotaDecision, UsageRecord};

use crate::{StoreError, UsageStore};

#[derive(Default)]
struct Inner {
    usage: HashMap<(String, String), UsageRecord>,
    profiles: HashMap<String, String>,
}

/// Usage store backed by a process-local map.
///
/// The whole check-and-increment runs under one lock, so it gives the
/// same no-overrun guarantee as the persistent store.
#[derive(Default)]
pub struct MemoryUsageStore {
    inner: Mutex<Inner>,
}

impl MemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|e| StoreError::Other(format!("mutex poisoned: {e}")))
    }
}

impl UsageStore for MemoryUsageStore {
    fn ensure_record(&self, user_id: &str, feature: &str) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner
            .usage
            .entry((user_id.to_string(), feature.to_string()))
            .or_default();
        Ok(())
    }

    fn check_and_consume(
        &self,
        user_id: &str,
        feature: &str,
        limit: u32,
    ) -> Result<QuotaDecision, StoreError> {
        let mut inner = self.lock()?;
        let record = inner
            .usage
            .entry((user_id.to_string(), feature.to_string()))
            .or_default();
        if record.free_runs_used < limit {
            record.free_runs_used += 1;
            record.usage_count += 1;
            Ok(QuotaDecision::Allowed(*record))
        } else {
            Ok(QuotaDecision::Denied(*record))
        }
    }

    fn record_pro_run(&self, user_id: &str, feature: &str) -> Result<UsageRecord, StoreError> {
        let mut inner = self.lock()?;
        let record = inner
            .usage
            .entry((user_id.to_string(), feature.to_string()))
            .or_default();
        record.pro_runs_used += 1;
        record.usage_count += 1;
        Ok(*record)
    }

    fn get(&self, user_id: &str, feature: &str) -> Result<Option<UsageRecord>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .usage
            .get(&(user_id.to_string(), feature.to_string()))
            .copied())
    }

    fn ensure_profile(&self, email: &str) -> Result<String, StoreError> {
        let mut inner = self.lock()?;
        let id = inner
            .profiles
            .entry(email.to_string())
            .or_insert_with(|| Uuid::new_v4().to_string());
        Ok(id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn quota_sequence_allows_then_denies() {
        let store = MemoryUsageStore::new();

        let first = store.check_and_consume("u1", "annotate", 2).unwrap();
        assert!(matches!(first, QuotaDecision::Allowed(r) if r.free_runs_used == 1));

        let second = store.check_and_consume("u1", "annotate", 2).unwrap();
        assert!(matches!(second, QuotaDecision::Allowed(r) if r.free_runs_used == 2));

        let third = store.check_and_consume("u1", "annotate", 2).unwrap();
        assert!(matches!(third, QuotaDecision::Denied(r) if r.free_runs_used == 2));

        // Denial never advances the counters.
        let record = store.get("u1", "annotate").unwrap().unwrap();
        assert_eq!(record.free_runs_used, 2);
        assert_eq!(record.usage_count, 2);
    }

    #[test]
    fn limit_zero_denies_immediately() {
        let store = MemoryUsageStore::new();
        let decision = store.check_and_consume("u1", "annotate", 0).unwrap();
        assert!(matches!(decision, QuotaDecision::Denied(r) if r.free_runs_used == 0));
    }

    #[test]
    fn users_and_features_are_isolated() {
        let store = MemoryUsageStore::new();
        store.check_and_consume("u1", "annotate", 2).unwrap();
        store.check_and_consume("u1", "export", 2).unwrap();

        assert_eq!(store.get("u1", "annotate").unwrap().unwrap().free_runs_used, 1);
        assert_eq!(store.get("u1", "export").unwrap().unwrap().free_runs_used, 1);
        assert!(store.get("u2", "annotate").unwrap().is_none());
    }

    #[test]
    fn pro_runs_do_not_consume_free_quota() {
        let store = MemoryUsageStore::new();
        let record = store.record_pro_run("u1", "annotate").unwrap();
        assert_eq!(record.free_runs_used, 0);
        assert_eq!(record.pro_runs_used, 1);
        assert_eq!(record.usage_count, 1);

        let decision = store.check_and_consume("u1", "annotate", 1).unwrap();
        assert!(matches!(decision, QuotaDecision::Allowed(r) if r.usage_count == 2));
    }

    #[test]
    fn ensure_record_is_idempotent() {
        let store = MemoryUsageStore::new();
        store.ensure_record("u1", "annotate").unwrap();
        store.ensure_record("u1", "annotate").unwrap();
        let record = store.get("u1", "annotate").unwrap().unwrap();
        assert_eq!(record, UsageRecord::default());

        // Ensuring an active record never resets its counters.
        store.check_and_consume("u1", "annotate", 2).unwrap();
        store.ensure_record("u1", "annotate").unwrap();
        let record = store.get("u1", "annotate").unwrap().unwrap();
        assert_eq!(record.free_runs_used, 1);
    }

    #[test]
    fn ensure_profile_returns_stable_id() {
        let store = MemoryUsageStore::new();
        let a = store.ensure_profile("user@example.org").unwrap();
        let b = store.ensure_profile("user@example.org").unwrap();
        let c = store.ensure_profile("other@example.org").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn concurrent_consumers_never_exceed_limit() {
        let store = Arc::new(MemoryUsageStore::new());
        let limit = 2;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .check_and_consume("u1", "annotate", limit)
                        .unwrap()
                        .is_allowed()
                })
            })
            .collect();

        let allowed = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&allowed| allowed)
            .count();
        assert_eq!(allowed as u32, limit);

        let record = store.get("u1", "annotate").unwrap().unwrap();
        assert_eq!(record.free_runs_used, limit);
        assert_eq!(record.usage_count, limit);
    }
}
