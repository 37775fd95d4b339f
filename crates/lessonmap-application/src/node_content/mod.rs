//! Subtopic content for clicked diagram nodes.
//!
//! [`NodeContentCache`] composes two [`ContentTier`](lessonmap_core::cache::ContentTier)s:
//! the in-process [`MemoryTier`] and, when available, the on-disk content store.

mod memory_tier;
mod resolver;

pub use memory_tier::MemoryTier;
pub use resolver::{
    CONTENT_PLACEHOLDER, FETCH_FAILURE_MESSAGE, FETCH_SUCCESS_MESSAGE, NodeContentCache,
};
