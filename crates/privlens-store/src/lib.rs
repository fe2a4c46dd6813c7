//! Storage layer: per-user usage counters behind the free-run quota.

use privlens_core::usage::{QuotaDecision, UsageRecord};

mod error;
pub use error::StoreError;

mod memory;
pub use memory::MemoryUsageStore;

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::DuckUsageStore;

/// Persistence seam for usage metering.
///
/// Counters are keyed by (user, feature). Implementations must make
/// [`check_and_consume`](UsageStore::check_and_consume) atomic: the quota
/// check and the increment happen as one guarded step, so two concurrent
/// callers can never both consume the last free run.
pub trait UsageStore {
    /// Create the counter row for a (user, feature) pair if it does not
    /// exist yet. Idempotent.
    fn ensure_record(&self, user_id: &str, feature: &str) -> Result<(), StoreError>;

    /// Consume one free run if any remain under `limit`.
    ///
    /// Allowed decisions carry the counters after the increment; denied
    /// decisions carry the current counters untouched.
    fn check_and_consume(
        &self,
        user_id: &str,
        feature: &str,
        limit: u32,
    ) -> Result<QuotaDecision, StoreError>;

    /// Record a paid run. Never denied and never touches the free-run
    /// counter. Returns the counters after the increment.
    fn record_pro_run(&self, user_id: &str, feature: &str) -> Result<UsageRecord, StoreError>;

    /// Current counters for a (user, feature) pair, if any.
    fn get(&self, user_id: &str, feature: &str) -> Result<Option<UsageRecord>, StoreError>;

    /// Map an email to a stable opaque user id, creating the profile on
    /// first sight.
    fn ensure_profile(&self, email: &str) -> Result<String, StoreError>;
}
