use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuthTokenRow {
    pub token_hash: String,
    pub user_id: i64,
    pub prefix: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl AuthTokenRow {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Bearer tokens, stored as SHA-256 digests of the raw value.
pub struct AuthTokenRepo;

impl AuthTokenRepo {
    pub async fn create(
        pool: &PgPool,
        token_hash: &str,
        user_id: i64,
        prefix: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO auth_token (token_hash, user_id, prefix, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(token_hash)
        .bind(user_id)
        .bind(prefix)
        .bind(expires_at)
        .execute(pool)
        .await
        .context("Failed to create auth token")?;
        Ok(())
    }

    pub async fn get_by_hash(pool: &PgPool, hash: &str) -> Result<Option<AuthTokenRow>> {
        let row = sqlx::query_as::<_, AuthTokenRow>(
            "SELECT token_hash, user_id, prefix, created_at, expires_at, last_used_at FROM auth_token WHERE token_hash = $1",
        )
        .bind(hash)
        .fetch_optional(pool)
        .await
        .context("Failed to get auth token")?;
        Ok(row)
    }

    pub async fn delete(pool: &PgPool, hash: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM auth_token WHERE token_hash = $1")
            .bind(hash)
            .execute(pool)
            .await
            .context("Failed to delete auth token")?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn touch_last_used(pool: &PgPool, hash: &str) -> Result<()> {
        sqlx::query("UPDATE auth_token SET last_used_at = NOW() WHERE token_hash = $1")
            .bind(hash)
            .execute(pool)
            .await
            .context("Failed to update auth token last_used_at")?;
        Ok(())
    }

    /// Remove every token whose expiry has passed. Returns the number removed.
    pub async fn delete_expired(pool: &PgPool) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM auth_token WHERE expires_at IS NOT NULL AND expires_at <= NOW()",
        )
        .execute(pool)
        .await
        .context("Failed to delete expired auth tokens")?;
        Ok(result.rows_affected())
    }

    pub async fn count_for_user(pool: &PgPool, user_id: i64) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM auth_token WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .context("Failed to count auth tokens")?;
        Ok(count.0)
    }
}
