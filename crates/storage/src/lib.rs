use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use tabrelay_core::{
    AutomationSession, LogEntry, NewCredential, SavedCredential, SessionStatus, UsageRecord,
};

mod credential_queries;
pub mod ledger;
pub mod memory;
mod session_queries;
mod usage_queries;

pub use ledger::{AutomationStore, ConsumeOutcome, CredentialVault, SessionLedger, UsageLedger};
pub use memory::MemoryStore;

/// Postgres-backed store for the usage ledger, sessions, logs and credentials.
#[derive(Clone)]
pub struct Storage {
    pool: PgPool,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::with_pool_size(database_url, 20).await
    }

    pub async fn with_pool_size(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!(max_connections, "connected to postgres");
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::raw_sql(include_str!("../migrations/001_init.sql"))
            .execute(&self.pool)
            .await?;
        info!("migrations complete");
        Ok(())
    }

    pub async fn check_connectivity(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UsageLedger for Storage {
    async fn ensure_usage_record(&self, user_id: &str) -> Result<()> {
        usage_queries::ensure_usage_record(&self.pool, user_id).await
    }

    async fn usage(&self, user_id: &str) -> Result<Option<UsageRecord>> {
        usage_queries::get_usage(&self.pool, user_id).await
    }

    async fn try_consume(&self, user_id: &str, units: u32, limit: u32) -> Result<ConsumeOutcome> {
        usage_queries::try_consume(&self.pool, user_id, units, limit).await
    }

    async fn mark_paid(&self, user_id: &str, billing_customer_id: Option<&str>) -> Result<()> {
        usage_queries::mark_paid(&self.pool, user_id, billing_customer_id).await
    }
}

#[async_trait]
impl SessionLedger for Storage {
    async fn open_session(&self, id: Uuid, user_id: &str, url: &str) -> Result<bool> {
        session_queries::open_session(&self.pool, id, user_id, url).await
    }

    async fn append_log(
        &self,
        session_id: Uuid,
        action: &str,
        details: &str,
        success: bool,
    ) -> Result<i64> {
        session_queries::append_log(&self.pool, session_id, action, details, success).await
    }

    async fn finish_session(
        &self,
        id: Uuid,
        status: SessionStatus,
        error: Option<&str>,
    ) -> Result<bool> {
        session_queries::finish_session(&self.pool, id, status, error).await
    }

    async fn session(&self, id: Uuid) -> Result<Option<AutomationSession>> {
        session_queries::get_session(&self.pool, id).await
    }

    async fn session_logs(&self, id: Uuid) -> Result<Vec<LogEntry>> {
        session_queries::get_session_logs(&self.pool, id).await
    }
}

#[async_trait]
impl CredentialVault for Storage {
    async fn insert_credential(&self, credential: NewCredential) -> Result<SavedCredential> {
        credential_queries::insert_credential(&self.pool, &credential).await
    }

    async fn credential(&self, user_id: &str, id: Uuid) -> Result<Option<SavedCredential>> {
        credential_queries::get_credential(&self.pool, user_id, id).await
    }

    async fn list_credentials(&self, user_id: &str) -> Result<Vec<SavedCredential>> {
        credential_queries::list_credentials(&self.pool, user_id).await
    }
}
