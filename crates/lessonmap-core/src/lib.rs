pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod diagram;
pub mod error;
pub mod generation;
pub mod lesson;

// Re-export common error type
pub use error::{LessonMapError, Result};
