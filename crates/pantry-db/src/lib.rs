pub mod pool;
pub mod repos;

// Re-export commonly used items
pub use pool::{create_pool, run_migrations};
pub use repos::attribute::{AttributeKind, AttributeRepo, AttributeRow, LinkedAttributeRow};
pub use repos::auth_token::{AuthTokenRepo, AuthTokenRow};
pub use repos::recipe::{
    ImageChange, NewRecipe, RecipeChanges, RecipeFilter, RecipeRepo, RecipeRow,
};
pub use repos::user::{NewUser, ProfileChanges, UserFlags, UserRepo, UserRow};

/// Name of the unique constraint behind a failed insert/update, if the
/// error chain carries a Postgres unique violation.
pub fn unique_violation(err: &anyhow::Error) -> Option<String> {
    err.chain().find_map(|cause| match cause.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            Some(db.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    })
}

pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    unique_violation(err).is_some()
}
