//! Application layer for LessonMap.
//!
//! Use cases that tie the lesson server, the diagram renderer and the
//! content tiers together: streaming a lesson, saving it, drilling into
//! nodes, keeping the history and the signed-in session.

pub mod auth_usecase;
pub mod lesson_usecase;
pub mod node_content;
pub mod persistence_save;
pub mod stream_consumer;

#[cfg(test)]
mod testing;

pub use auth_usecase::AuthUseCase;
pub use lesson_usecase::{LessonUseCase, LessonView};
pub use node_content::{CONTENT_PLACEHOLDER, MemoryTier, NodeContentCache};
pub use persistence_save::PersistenceSave;
pub use stream_consumer::{StreamConsumer, StreamOutcome};
