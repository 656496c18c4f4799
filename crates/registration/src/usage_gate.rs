use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use tabrelay_core::{AutomationError, UsageRecord};
use tabrelay_storage::{ConsumeOutcome, UsageLedger};

/// Usage numbers surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    pub count: u32,
    pub limit: u32,
    pub has_paid: bool,
    pub usage_left: Option<u32>,
}

impl UsageSnapshot {
    fn from_record(record: &UsageRecord, limit: u32) -> Self {
        Self {
            count: record.usage_count,
            limit,
            has_paid: record.has_paid,
            usage_left: (!record.has_paid).then(|| limit.saturating_sub(record.usage_count)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allowed(UsageSnapshot),
    Denied { reason: String, usage: UsageSnapshot },
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allowed(_))
    }

    pub fn usage(&self) -> &UsageSnapshot {
        match self {
            GateDecision::Allowed(usage) => usage,
            GateDecision::Denied { usage, .. } => usage,
        }
    }
}

/// Per-user free-tier quota in front of the pipeline.
#[derive(Clone)]
pub struct UsageGate {
    ledger: Arc<dyn UsageLedger>,
    free_limit: u32,
}

impl UsageGate {
    pub fn new(ledger: Arc<dyn UsageLedger>, free_limit: u32) -> Self {
        Self { ledger, free_limit }
    }

    pub fn free_limit(&self) -> u32 {
        self.free_limit
    }

    /// Atomically consume `units` from the user's free allowance.
    /// A missing ledger row or an unreadable ledger is an error, never an allow.
    pub async fn check_and_consume(
        &self,
        user_id: &str,
        units: u32,
    ) -> Result<GateDecision, AutomationError> {
        let outcome = self
            .ledger
            .try_consume(user_id, units, self.free_limit)
            .await
            .map_err(|e| AutomationError::Storage(format!("usage ledger: {}", e)))?;

        let decision = match outcome {
            ConsumeOutcome::Consumed(record) => {
                info!(user_id, count = record.usage_count, limit = self.free_limit, "usage consumed");
                GateDecision::Allowed(UsageSnapshot::from_record(&record, self.free_limit))
            }
            ConsumeOutcome::Unlimited(record) => {
                debug!(user_id, "premium user, usage not counted");
                GateDecision::Allowed(UsageSnapshot::from_record(&record, self.free_limit))
            }
            ConsumeOutcome::Exceeded(record) => {
                info!(user_id, count = record.usage_count, requested = units, "usage limit exceeded");
                GateDecision::Denied {
                    reason: "limit exceeded".to_string(),
                    usage: UsageSnapshot::from_record(&record, self.free_limit),
                }
            }
            ConsumeOutcome::Missing => {
                return Err(AutomationError::InvalidInput(format!(
                    "no usage record for user {}",
                    user_id
                )))
            }
        };

        Ok(decision)
    }

    /// Same decision as `check_and_consume` without touching the ledger.
    pub async fn preview(&self, user_id: &str, units: u32) -> Result<GateDecision, AutomationError> {
        let record = self
            .ledger
            .usage(user_id)
            .await
            .map_err(|e| AutomationError::Storage(format!("usage ledger: {}", e)))?
            .ok_or_else(|| AutomationError::InvalidInput(format!("no usage record for user {}", user_id)))?;

        let usage = UsageSnapshot::from_record(&record, self.free_limit);
        if record.has_paid || record.usage_count.saturating_add(units) <= self.free_limit {
            Ok(GateDecision::Allowed(usage))
        } else {
            Ok(GateDecision::Denied { reason: "limit exceeded".to_string(), usage })
        }
    }
}
