//! Lessons, subtopics and generated content.

pub mod model;

pub use model::{
    Content, ContentMetadata, Grade, Lesson, LessonRequest, Model, SaveLessonRequest, SavedLesson,
    Subtopic, SubtopicRequest, SubtopicResponse, TokenUsage,
};
