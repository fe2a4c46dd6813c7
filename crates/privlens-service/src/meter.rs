//! Usage metering facade over a [`UsageStore`].

use std::collections::HashSet;

use tracing::debug;

use privlens_core::usage::{QuotaDecision, UsageRecord};
use privlens_store::{StoreError, UsageStore};

/// Free-run gate for metered features.
///
/// Wraps a store, the free-run limit and a set of exempt user ids.
/// Bypassed callers are always allowed and their counters are never
/// created or touched.
pub struct UsageMeter<S: UsageStore> {
    store: S,
    limit: u32,
    bypass: HashSet<String>,
}

impl<S: UsageStore> UsageMeter<S> {
    pub fn new(store: S, limit: u32) -> Self {
        Self {
            store,
            limit,
            bypass: HashSet::new(),
        }
    }

    /// Exempt the given user ids from metering.
    pub fn with_bypass(mut self, ids: impl IntoIterator<Item = String>) -> Self {
        self.bypass.extend(ids);
        self
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Gate one run of `feature` for `user_id`.
    ///
    /// Exempt users short-circuit to `Allowed` with zeroed counters;
    /// everyone else goes through the store's atomic check-and-consume.
    pub fn check(&self, user_id: &str, feature: &str) -> Result<QuotaDecision, StoreError> {
        if self.bypass.contains(user_id) {
            debug!(user_id, feature, "metering bypassed");
            return Ok(QuotaDecision::Allowed(UsageRecord::default()));
        }
        self.store.check_and_consume(user_id, feature, self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use privlens_core::defaults::{ANNOTATE_FEATURE, FREE_RUN_LIMIT};
    use privlens_store::MemoryUsageStore;

    #[test]
    fn allows_until_limit_then_denies() {
        let meter = UsageMeter::new(MemoryUsageStore::new(), FREE_RUN_LIMIT);

        let first = meter.check("u1", ANNOTATE_FEATURE).unwrap();
        assert!(matches!(first, QuotaDecision::Allowed(r) if r.free_runs_used == 1));

        let second = meter.check("u1", ANNOTATE_FEATURE).unwrap();
        assert!(matches!(second, QuotaDecision::Allowed(r) if r.free_runs_used == 2));

        let third = meter.check("u1", ANNOTATE_FEATURE).unwrap();
        assert!(matches!(third, QuotaDecision::Denied(r) if r.free_runs_used == 2));
    }

    #[test]
    fn denial_reports_untouched_counters() {
        let meter = UsageMeter::new(MemoryUsageStore::new(), 1);
        meter.check("u1", ANNOTATE_FEATURE).unwrap();

        let denied = meter.check("u1", ANNOTATE_FEATURE).unwrap();
        let QuotaDecision::Denied(counters) = denied else {
            panic!("expected denial");
        };
        assert_eq!(counters.free_runs_used, 1);
        assert_eq!(counters.usage_count, 1);
        assert_eq!(
            meter.store().get("u1", ANNOTATE_FEATURE).unwrap().unwrap(),
            counters
        );
    }

    #[test]
    fn bypassed_user_never_touches_the_store() {
        let meter = UsageMeter::new(MemoryUsageStore::new(), 0)
            .with_bypass(["auditor".to_string()]);

        for _ in 0..5 {
            let decision = meter.check("auditor", ANNOTATE_FEATURE).unwrap();
            assert!(matches!(decision, QuotaDecision::Allowed(r) if r == UsageRecord::default()));
        }
        assert!(meter.store().get("auditor", ANNOTATE_FEATURE).unwrap().is_none());
    }

    #[test]
    fn non_bypassed_users_are_still_metered() {
        let meter = UsageMeter::new(MemoryUsageStore::new(), 1)
            .with_bypass(["auditor".to_string()]);

        assert!(meter.check("u1", ANNOTATE_FEATURE).unwrap().is_allowed());
        assert!(!meter.check("u1", ANNOTATE_FEATURE).unwrap().is_allowed());
        assert!(meter.check("auditor", ANNOTATE_FEATURE).unwrap().is_allowed());
    }

    #[test]
    fn users_are_metered_independently() {
        let meter = UsageMeter::new(MemoryUsageStore::new(), 1);
        assert!(meter.check("u1", ANNOTATE_FEATURE).unwrap().is_allowed());
        assert!(meter.check("u2", ANNOTATE_FEATURE).unwrap().is_allowed());
        assert!(!meter.check("u1", ANNOTATE_FEATURE).unwrap().is_allowed());
    }
}
