use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

const USER_COLUMNS: &str = "id, username, email, name, password_hash, is_active, is_staff, is_superuser, created_at, last_login_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Insert payload. Email must already be normalized and the password hashed.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub name: &'a str,
    pub password_hash: &'a str,
    pub is_staff: bool,
    pub is_superuser: bool,
}

/// Self-service profile changes; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges<'a> {
    pub username: Option<&'a str>,
    pub email: Option<&'a str>,
    pub name: Option<&'a str>,
    pub password_hash: Option<&'a str>,
}

/// Staff-managed changes; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserFlags<'a> {
    pub name: Option<&'a str>,
    pub is_active: Option<bool>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
}

pub struct UserRepo;

impl UserRepo {
    pub async fn create(pool: &PgPool, user: &NewUser<'_>) -> Result<UserRow> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"INSERT INTO "user" (username, email, name, password_hash, is_staff, is_superuser)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING {}"#,
            USER_COLUMNS
        ))
        .bind(user.username)
        .bind(user.email)
        .bind(user.name)
        .bind(user.password_hash)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .fetch_one(pool)
        .await
        .context("Failed to create user")?;
        Ok(row)
    }

    pub async fn get_by_id(pool: &PgPool, id: i64) -> Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"SELECT {} FROM "user" WHERE id = $1"#,
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by id")?;
        Ok(row)
    }

    pub async fn get_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"SELECT {} FROM "user" WHERE email = $1"#,
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by email")?;
        Ok(row)
    }

    pub async fn get_by_username(pool: &PgPool, username: &str) -> Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"SELECT {} FROM "user" WHERE username = $1"#,
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by username")?;
        Ok(row)
    }

    /// Look a user up by login identifier: an exact username match wins over
    /// an email match.
    pub async fn get_by_login(
        pool: &PgPool,
        username: &str,
        normalized_email: &str,
    ) -> Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"SELECT {} FROM "user" WHERE username = $1 OR email = $2
               ORDER BY (username = $1) DESC LIMIT 1"#,
            USER_COLUMNS
        ))
        .bind(username)
        .bind(normalized_email)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by login")?;
        Ok(row)
    }

    pub async fn touch_last_login(pool: &PgPool, id: i64) -> Result<()> {
        sqlx::query(r#"UPDATE "user" SET last_login_at = NOW() WHERE id = $1"#)
            .bind(id)
            .execute(pool)
            .await
            .context("Failed to update last_login_at")?;
        Ok(())
    }

    pub async fn update_profile(
        pool: &PgPool,
        id: i64,
        changes: &ProfileChanges<'_>,
    ) -> Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"UPDATE "user" SET
                 username = COALESCE($2, username),
                 email = COALESCE($3, email),
                 name = COALESCE($4, name),
                 password_hash = COALESCE($5, password_hash)
               WHERE id = $1
               RETURNING {}"#,
            USER_COLUMNS
        ))
        .bind(id)
        .bind(changes.username)
        .bind(changes.email)
        .bind(changes.name)
        .bind(changes.password_hash)
        .fetch_optional(pool)
        .await
        .context("Failed to update user profile")?;
        Ok(row)
    }

    pub async fn update_flags(
        pool: &PgPool,
        id: i64,
        flags: &UserFlags<'_>,
    ) -> Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"UPDATE "user" SET
                 name = COALESCE($2, name),
                 is_active = COALESCE($3, is_active),
                 is_staff = COALESCE($4, is_staff),
                 is_superuser = COALESCE($5, is_superuser)
               WHERE id = $1
               RETURNING {}"#,
            USER_COLUMNS
        ))
        .bind(id)
        .bind(flags.name)
        .bind(flags.is_active)
        .bind(flags.is_staff)
        .bind(flags.is_superuser)
        .fetch_optional(pool)
        .await
        .context("Failed to update user flags")?;
        Ok(row)
    }

    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<UserRow>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            r#"SELECT {} FROM "user" ORDER BY id LIMIT $1 OFFSET $2"#,
            USER_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list users")?;
        Ok(rows)
    }

    pub async fn count(pool: &PgPool) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(r#"SELECT COUNT(*) FROM "user""#)
            .fetch_one(pool)
            .await
            .context("Failed to count users")?;
        Ok(count.0)
    }
}
