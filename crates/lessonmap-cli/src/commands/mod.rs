pub mod auth;
pub mod cache;
pub mod config;
pub mod lesson;
