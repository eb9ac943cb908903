//! Persisted Gmail OAuth2 tokens.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Gmail token row. `user_id` NULL is the site-wide sender token.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GmailToken {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub access_token: String,
    /// Empty when the provider never issued one.
    pub refresh_token: String,
    pub token_expiry: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const COLUMNS: &str = "id, user_id, access_token, refresh_token, token_expiry, created_at, updated_at";

impl GmailToken {
    /// Load the token for `user_id` (None for the site token).
    pub async fn find(pool: &PgPool, user_id: Option<Uuid>) -> Result<Option<Self>> {
        let sql = format!("SELECT {COLUMNS} FROM gmail_tokens WHERE user_id IS NOT DISTINCT FROM $1");
        let token = sqlx::query_as::<_, GmailToken>(&sql)
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .context("failed to load gmail token")?;

        Ok(token)
    }

    /// Insert or replace the token for `user_id`.
    pub async fn upsert(
        pool: &PgPool,
        user_id: Option<Uuid>,
        access_token: &str,
        refresh_token: &str,
        token_expiry: DateTime<Utc>,
    ) -> Result<()> {
        let mut tx = pool.begin().await.context("failed to begin transaction")?;

        let updated = sqlx::query(
            r#"
            UPDATE gmail_tokens
            SET access_token = $1, refresh_token = $2, token_expiry = $3, updated_at = now()
            WHERE user_id IS NOT DISTINCT FROM $4
            "#,
        )
        .bind(access_token)
        .bind(refresh_token)
        .bind(token_expiry)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .context("failed to update gmail token")?;

        if updated.rows_affected() == 0 {
            sqlx::query(
                r#"
                INSERT INTO gmail_tokens (id, user_id, access_token, refresh_token, token_expiry)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(Uuid::now_v7())
            .bind(user_id)
            .bind(access_token)
            .bind(refresh_token)
            .bind(token_expiry)
            .execute(&mut *tx)
            .await
            .context("failed to insert gmail token")?;
        }

        tx.commit().await.context("failed to commit gmail token")?;
        Ok(())
    }
}
