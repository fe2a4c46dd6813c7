//! Usage counters and the free-tier quota decision.

use serde::{Deserialize, Serialize};

/// Counters for one `(user_id, feature)` pair.
///
/// `usage_count` covers both free and pro runs; the per-tier counters
/// split it. Records start at zero and counters only ever grow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub free_runs_used: u32,
    pub pro_runs_used: u32,
    pub usage_count: u32,
}

/// Outcome of a quota check.
///
/// Exhaustion is a decision the caller branches on, not an error:
/// `Denied` still carries the counters so the caller can report them.
/// `Allowed` carries the post-increment counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum QuotaDecision {
    Allowed(UsageRecord),
    Denied(UsageRecord),
}

impl QuotaDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, QuotaDecision::Allowed(_))
    }

    /// The counters carried by the decision, whichever way it went.
    pub fn counters(&self) -> &UsageRecord {
        match self {
            QuotaDecision::Allowed(rec) | QuotaDecision::Denied(rec) => rec,
        }
    }
}
