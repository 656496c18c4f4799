use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use tabrelay_core::{AutomationSession, LogEntry, SessionStatus};

pub async fn open_session(pool: &PgPool, id: Uuid, user_id: &str, url: &str) -> Result<bool> {
    let result = sqlx::query(
        "INSERT INTO automation_sessions (id, user_id, url, status)
         VALUES ($1, $2, $3, 'pending')
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(id)
    .bind(user_id)
    .bind(url)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn append_log(
    pool: &PgPool,
    session_id: Uuid,
    action: &str,
    details: &str,
    success: bool,
) -> Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO automation_logs (session_id, action, details, success)
         VALUES ($1, $2, $3, $4)
         RETURNING id",
    )
    .bind(session_id)
    .bind(action)
    .bind(details)
    .bind(success)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Guarded on `status = 'pending'` so a terminal session is never rewritten.
pub async fn finish_session(
    pool: &PgPool,
    id: Uuid,
    status: SessionStatus,
    error: Option<&str>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE automation_sessions
        SET status = $2, error = $3, completed_at = NOW()
        WHERE id = $1 AND status = 'pending'
        "#,
    )
    .bind(id)
    .bind(status.as_str())
    .bind(error)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn get_session(pool: &PgPool, id: Uuid) -> Result<Option<AutomationSession>> {
    let row: Option<(Uuid, String, String, String, Option<String>, DateTime<Utc>, Option<DateTime<Utc>>)> =
        sqlx::query_as(
            "SELECT id, user_id, url, status, error, created_at, completed_at
             FROM automation_sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

    let Some((id, user_id, url, status, error, created_at, completed_at)) = row else {
        return Ok(None);
    };

    let status = SessionStatus::parse(&status)
        .ok_or_else(|| anyhow::anyhow!("unknown session status '{}'", status))?;

    Ok(Some(AutomationSession {
        id,
        user_id,
        url,
        status,
        error,
        created_at,
        completed_at,
    }))
}

pub async fn get_session_logs(pool: &PgPool, session_id: Uuid) -> Result<Vec<LogEntry>> {
    let rows: Vec<(i64, Uuid, String, String, bool, DateTime<Utc>)> = sqlx::query_as(
        "SELECT id, session_id, action, details, success, created_at
         FROM automation_logs WHERE session_id = $1 ORDER BY id",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, session_id, action, details, success, created_at)| LogEntry {
            id,
            session_id,
            action,
            details,
            success,
            created_at,
        })
        .collect())
}
