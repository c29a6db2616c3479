pub mod attribute;
pub mod auth_token;
pub mod recipe;
pub mod user;
