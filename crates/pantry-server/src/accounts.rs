use crate::auth::hash_password;
use crate::config::InitialSuperuserConfig;
use anyhow::Context;
use pantry_common::models::user::UpdateProfileRequest;
use pantry_common::validation::{MIN_PASSWORD_LENGTH, normalize_email};
use pantry_db::{NewUser, ProfileChanges, UserRepo, UserRow, unique_violation};
use sqlx::PgPool;
use thiserror::Error;

/// Account manager failures the HTTP layer reports as field errors
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("A user with that {field} already exists.")]
    Duplicate { field: &'static str },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AccountError {
    /// Field the error is attached to, if any
    pub fn field(&self) -> Option<&'static str> {
        match self {
            AccountError::Validation { field, .. } | AccountError::Duplicate { field } => {
                Some(field)
            }
            AccountError::Internal(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewAccount<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub name: &'a str,
}

/// Create a regular user. The email is normalized and the password hashed
/// before anything is stored.
pub async fn create_user(pool: &PgPool, account: &NewAccount<'_>) -> Result<UserRow, AccountError> {
    create_account(pool, account, false).await
}

/// Create a user with staff and superuser rights
pub async fn create_superuser(
    pool: &PgPool,
    account: &NewAccount<'_>,
) -> Result<UserRow, AccountError> {
    create_account(pool, account, true).await
}

async fn create_account(
    pool: &PgPool,
    account: &NewAccount<'_>,
    elevated: bool,
) -> Result<UserRow, AccountError> {
    let username = account.username.trim();
    if username.is_empty() {
        return Err(AccountError::Validation {
            field: "username",
            message: "This field may not be blank.".to_string(),
        });
    }
    let email = normalize_email(account.email);
    if email.is_empty() {
        return Err(AccountError::Validation {
            field: "email",
            message: "Users must have an email address.".to_string(),
        });
    }
    check_password(account.password)?;

    let password_hash = hash_password(account.password)?;
    let new_user = NewUser {
        username,
        email: &email,
        name: account.name.trim(),
        password_hash: &password_hash,
        is_staff: elevated,
        is_superuser: elevated,
    };

    UserRepo::create(pool, &new_user)
        .await
        .map_err(duplicate_or_internal)
}

/// Apply a self-service profile change. `None` fields are left as stored.
/// Returns `Ok(None)` when the user no longer exists.
pub async fn update_profile(
    pool: &PgPool,
    user_id: i64,
    changes: &UpdateProfileRequest,
) -> Result<Option<UserRow>, AccountError> {
    let username = changes.username.as_deref().map(str::trim);
    if username.is_some_and(str::is_empty) {
        return Err(AccountError::Validation {
            field: "username",
            message: "This field may not be blank.".to_string(),
        });
    }
    let email = changes.email.as_deref().map(normalize_email);
    if email.as_deref().is_some_and(str::is_empty) {
        return Err(AccountError::Validation {
            field: "email",
            message: "Users must have an email address.".to_string(),
        });
    }
    let password_hash = match changes.password.as_deref() {
        Some(password) => {
            check_password(password)?;
            Some(hash_password(password)?)
        }
        None => None,
    };

    let profile = ProfileChanges {
        username,
        email: email.as_deref(),
        name: changes.name.as_deref().map(str::trim),
        password_hash: password_hash.as_deref(),
    };

    UserRepo::update_profile(pool, user_id, &profile)
        .await
        .map_err(duplicate_or_internal)
}

/// Create the configured superuser unless its username or email is taken.
pub async fn seed_initial_superuser(
    pool: &PgPool,
    config: &InitialSuperuserConfig,
) -> anyhow::Result<()> {
    let email = normalize_email(&config.email);
    if UserRepo::get_by_username(pool, &config.username)
        .await?
        .is_some()
        || UserRepo::get_by_email(pool, &email).await?.is_some()
    {
        tracing::info!(
            "Initial superuser '{}' already exists, skipping seed",
            config.username
        );
        return Ok(());
    }

    let account = NewAccount {
        username: &config.username,
        email: &config.email,
        password: &config.password,
        name: "",
    };
    create_superuser(pool, &account)
        .await
        .map_err(anyhow::Error::from)
        .context("Failed to create initial superuser")?;
    tracing::info!("Created initial superuser: {}", config.username);
    Ok(())
}

fn check_password(password: &str) -> Result<(), AccountError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AccountError::Validation {
            field: "password",
            message: format!(
                "Ensure this field has at least {} characters.",
                MIN_PASSWORD_LENGTH
            ),
        });
    }
    Ok(())
}

fn duplicate_or_internal(err: anyhow::Error) -> AccountError {
    match unique_violation(&err).as_deref() {
        Some("user_username_key") => AccountError::Duplicate { field: "username" },
        Some("user_email_key") => AccountError::Duplicate { field: "email" },
        _ => AccountError::Internal(err),
    }
}
