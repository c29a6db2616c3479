pub mod accounts;
pub mod auth;
pub mod config;
pub mod media;
pub mod state;
pub mod sweeper;
pub mod web;
