use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use tabrelay_core::{NewCredential, SavedCredential};

type CredentialRow = (Uuid, String, String, String, String, String, bool, bool, DateTime<Utc>);

const COLUMNS: &str = "id, user_id, url, email, password_ciphertext, site_name, \
                       successfully_registered, manual_needed, created_at";

fn to_credential(row: CredentialRow) -> SavedCredential {
    SavedCredential {
        id: row.0,
        owner_user_id: row.1,
        url: row.2,
        email: row.3,
        password_ciphertext: row.4,
        site_name: row.5,
        successfully_registered: row.6,
        manual_needed: row.7,
        created_at: row.8,
    }
}

pub async fn insert_credential(pool: &PgPool, credential: &NewCredential) -> Result<SavedCredential> {
    let row: CredentialRow = sqlx::query_as(&format!(
        "INSERT INTO saved_credentials (id, user_id, url, email, password_ciphertext, site_name, successfully_registered, manual_needed)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(&credential.owner_user_id)
    .bind(&credential.url)
    .bind(&credential.email)
    .bind(&credential.password_ciphertext)
    .bind(&credential.site_name)
    .bind(credential.successfully_registered)
    .bind(credential.manual_needed)
    .fetch_one(pool)
    .await?;

    Ok(to_credential(row))
}

pub async fn get_credential(pool: &PgPool, user_id: &str, id: Uuid) -> Result<Option<SavedCredential>> {
    let row: Option<CredentialRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM saved_credentials WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(to_credential))
}

pub async fn list_credentials(pool: &PgPool, user_id: &str) -> Result<Vec<SavedCredential>> {
    let rows: Vec<CredentialRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM saved_credentials WHERE user_id = $1 ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(to_credential).collect())
}
