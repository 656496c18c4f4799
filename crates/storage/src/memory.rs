//! In-process store used by tests and `--in-memory` dry runs.

use std::sync::atomic::{AtomicI64, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use tabrelay_core::{
    AutomationSession, LogEntry, NewCredential, SavedCredential, SessionStatus, UsageRecord,
};

use crate::ledger::{ConsumeOutcome, CredentialVault, SessionLedger, UsageLedger};

#[derive(Default)]
pub struct MemoryStore {
    usage: DashMap<String, UsageRecord>,
    sessions: DashMap<Uuid, AutomationSession>,
    logs: DashMap<Uuid, Vec<LogEntry>>,
    log_seq: AtomicI64,
    credentials: DashMap<Uuid, SavedCredential>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a ledger row.
    pub fn put_usage(&self, record: UsageRecord) {
        self.usage.insert(record.user_id.clone(), record);
    }

    pub fn credential_count(&self) -> usize {
        self.credentials.len()
    }
}

#[async_trait]
impl UsageLedger for MemoryStore {
    async fn ensure_usage_record(&self, user_id: &str) -> Result<()> {
        self.usage
            .entry(user_id.to_string())
            .or_insert_with(|| UsageRecord::new(user_id));
        Ok(())
    }

    async fn usage(&self, user_id: &str) -> Result<Option<UsageRecord>> {
        Ok(self.usage.get(user_id).map(|r| r.clone()))
    }

    async fn try_consume(&self, user_id: &str, units: u32, limit: u32) -> Result<ConsumeOutcome> {
        // The shard write lock held by get_mut makes check and increment one step.
        let Some(mut record) = self.usage.get_mut(user_id) else {
            return Ok(ConsumeOutcome::Missing);
        };

        if record.has_paid {
            return Ok(ConsumeOutcome::Unlimited(record.clone()));
        }

        let new_count = record.usage_count.saturating_add(units);
        if new_count > limit {
            return Ok(ConsumeOutcome::Exceeded(record.clone()));
        }

        record.usage_count = new_count;
        record.last_used_at = Some(Utc::now());
        Ok(ConsumeOutcome::Consumed(record.clone()))
    }

    async fn mark_paid(&self, user_id: &str, billing_customer_id: Option<&str>) -> Result<()> {
        let mut record = self
            .usage
            .entry(user_id.to_string())
            .or_insert_with(|| UsageRecord::new(user_id));
        record.has_paid = true;
        if let Some(customer) = billing_customer_id {
            record.billing_customer_id = Some(customer.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl SessionLedger for MemoryStore {
    async fn open_session(&self, id: Uuid, user_id: &str, url: &str) -> Result<bool> {
        let mut created = false;
        self.sessions.entry(id).or_insert_with(|| {
            created = true;
            AutomationSession {
                id,
                user_id: user_id.to_string(),
                url: url.to_string(),
                status: SessionStatus::Pending,
                error: None,
                created_at: Utc::now(),
                completed_at: None,
            }
        });
        Ok(created)
    }

    async fn append_log(
        &self,
        session_id: Uuid,
        action: &str,
        details: &str,
        success: bool,
    ) -> Result<i64> {
        if !self.sessions.contains_key(&session_id) {
            anyhow::bail!("session {} does not exist", session_id);
        }

        let id = self.log_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.logs.entry(session_id).or_default().push(LogEntry {
            id,
            session_id,
            action: action.to_string(),
            details: details.to_string(),
            success,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn finish_session(
        &self,
        id: Uuid,
        status: SessionStatus,
        error: Option<&str>,
    ) -> Result<bool> {
        let Some(mut session) = self.sessions.get_mut(&id) else {
            return Ok(false);
        };
        if session.status.is_terminal() {
            return Ok(false);
        }

        session.status = status;
        session.error = error.map(str::to_string);
        session.completed_at = Some(Utc::now());
        Ok(true)
    }

    async fn session(&self, id: Uuid) -> Result<Option<AutomationSession>> {
        Ok(self.sessions.get(&id).map(|s| s.clone()))
    }

    async fn session_logs(&self, id: Uuid) -> Result<Vec<LogEntry>> {
        Ok(self.logs.get(&id).map(|l| l.clone()).unwrap_or_default())
    }
}

#[async_trait]
impl CredentialVault for MemoryStore {
    async fn insert_credential(&self, credential: NewCredential) -> Result<SavedCredential> {
        let saved = SavedCredential {
            id: Uuid::new_v4(),
            owner_user_id: credential.owner_user_id,
            url: credential.url,
            email: credential.email,
            password_ciphertext: credential.password_ciphertext,
            site_name: credential.site_name,
            successfully_registered: credential.successfully_registered,
            manual_needed: credential.manual_needed,
            created_at: Utc::now(),
        };
        self.credentials.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn credential(&self, user_id: &str, id: Uuid) -> Result<Option<SavedCredential>> {
        Ok(self
            .credentials
            .get(&id)
            .filter(|c| c.owner_user_id == user_id)
            .map(|c| c.clone()))
    }

    async fn list_credentials(&self, user_id: &str) -> Result<Vec<SavedCredential>> {
        let mut list: Vec<SavedCredential> = self
            .credentials
            .iter()
            .filter(|c| c.owner_user_id == user_id)
            .map(|c| c.clone())
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }
}
