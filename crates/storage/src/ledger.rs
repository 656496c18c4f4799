use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use tabrelay_core::{
    AutomationSession, LogEntry, NewCredential, SavedCredential, SessionStatus, UsageRecord,
};

/// Result of a guarded quota increment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// Units were added; carries the updated record.
    Consumed(UsageRecord),
    /// Paid user, nothing was written.
    Unlimited(UsageRecord),
    /// Increment would pass the limit, nothing was written.
    Exceeded(UsageRecord),
    /// No ledger row for this user.
    Missing,
}

#[async_trait]
pub trait UsageLedger: Send + Sync {
    /// Create a zeroed row if the user has none yet.
    async fn ensure_usage_record(&self, user_id: &str) -> Result<()>;

    async fn usage(&self, user_id: &str) -> Result<Option<UsageRecord>>;

    /// Atomically add `units` unless the user is paid or the sum would exceed `limit`.
    async fn try_consume(&self, user_id: &str, units: u32, limit: u32) -> Result<ConsumeOutcome>;

    /// Set `has_paid`. There is deliberately no way to clear it.
    async fn mark_paid(&self, user_id: &str, billing_customer_id: Option<&str>) -> Result<()>;
}

#[async_trait]
pub trait SessionLedger: Send + Sync {
    /// Insert a `pending` session. Returns false when the id is already taken.
    async fn open_session(&self, id: Uuid, user_id: &str, url: &str) -> Result<bool>;

    async fn append_log(
        &self,
        session_id: Uuid,
        action: &str,
        details: &str,
        success: bool,
    ) -> Result<i64>;

    /// Move a `pending` session to a terminal status. Returns false if it was not pending.
    async fn finish_session(
        &self,
        id: Uuid,
        status: SessionStatus,
        error: Option<&str>,
    ) -> Result<bool>;

    async fn session(&self, id: Uuid) -> Result<Option<AutomationSession>>;

    async fn session_logs(&self, id: Uuid) -> Result<Vec<LogEntry>>;
}

#[async_trait]
pub trait CredentialVault: Send + Sync {
    async fn insert_credential(&self, credential: NewCredential) -> Result<SavedCredential>;

    /// Owner-scoped lookup; another user's id yields `None`.
    async fn credential(&self, user_id: &str, id: Uuid) -> Result<Option<SavedCredential>>;

    async fn list_credentials(&self, user_id: &str) -> Result<Vec<SavedCredential>>;
}

pub trait AutomationStore: UsageLedger + SessionLedger + CredentialVault {}

impl<T> AutomationStore for T where T: UsageLedger + SessionLedger + CredentialVault {}
