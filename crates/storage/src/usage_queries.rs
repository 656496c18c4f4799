use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use tabrelay_core::UsageRecord;

use crate::ledger::ConsumeOutcome;

type UsageRow = (String, i32, bool, Option<String>, Option<DateTime<Utc>>);

fn to_record(row: UsageRow) -> UsageRecord {
    UsageRecord {
        user_id: row.0,
        usage_count: row.1.max(0) as u32,
        has_paid: row.2,
        billing_customer_id: row.3,
        last_used_at: row.4,
    }
}

/// Postgres INT parameter for a unit count. Values past `i32::MAX` would wrap
/// negative and let the guarded update decrement the counter.
fn units_param(units: u32) -> Result<i32> {
    i32::try_from(units).map_err(|_| anyhow!("unit count {} is out of range", units))
}

pub async fn ensure_usage_record(pool: &PgPool, user_id: &str) -> Result<()> {
    sqlx::query("INSERT INTO user_usage (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn get_usage(pool: &PgPool, user_id: &str) -> Result<Option<UsageRecord>> {
    let row: Option<UsageRow> = sqlx::query_as(
        "SELECT user_id, usage_count, has_paid, billing_customer_id, last_used_at
         FROM user_usage WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(to_record))
}

/// Single guarded UPDATE so concurrent sessions cannot both pass the limit.
pub async fn try_consume(
    pool: &PgPool,
    user_id: &str,
    units: u32,
    limit: u32,
) -> Result<ConsumeOutcome> {
    let updated: Option<UsageRow> = sqlx::query_as(
        r#"
        UPDATE user_usage
        SET usage_count = usage_count + $2, last_used_at = NOW()
        WHERE user_id = $1
        AND has_paid = false
        AND usage_count + $2 <= $3
        RETURNING user_id, usage_count, has_paid, billing_customer_id, last_used_at
        "#,
    )
    .bind(user_id)
    .bind(units_param(units)?)
    .bind(i32::try_from(limit).unwrap_or(i32::MAX))
    .fetch_optional(pool)
    .await?;

    if let Some(row) = updated {
        return Ok(ConsumeOutcome::Consumed(to_record(row)));
    }

    // The update matched nothing; find out why. has_paid never goes back to false,
    // so a paid answer here is stable.
    Ok(match get_usage(pool, user_id).await? {
        None => ConsumeOutcome::Missing,
        Some(record) if record.has_paid => ConsumeOutcome::Unlimited(record),
        Some(record) => ConsumeOutcome::Exceeded(record),
    })
}

pub async fn mark_paid(pool: &PgPool, user_id: &str, billing_customer_id: Option<&str>) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO user_usage (user_id, has_paid, billing_customer_id)
        VALUES ($1, true, $2)
        ON CONFLICT (user_id) DO UPDATE
        SET has_paid = true,
            billing_customer_id = COALESCE(EXCLUDED.billing_customer_id, user_usage.billing_customer_id)
        "#,
    )
    .bind(user_id)
    .bind(billing_customer_id)
    .execute(pool)
    .await?;

    Ok(())
}
