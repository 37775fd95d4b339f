//! Lesson domain model.
//!
//! Lessons, subtopics and their generated content as the LessonMap server
//! stores and returns them, plus the request bodies the client sends.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// AI backends the server knows how to drive.
///
/// The server is the authority on model names, so requests carry plain
/// strings; this enum is the catalogue offered to the user.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, AsRefStr,
)]
pub enum Model {
    #[serde(rename = "gemini-2.5-flash")]
    #[strum(serialize = "gemini-2.5-flash")]
    Gemini25Flash,
    #[serde(rename = "gpt-4o-mini")]
    #[strum(serialize = "gpt-4o-mini")]
    Gpt4oMini,
    #[serde(rename = "gpt-oss-20b:free")]
    #[strum(serialize = "gpt-oss-20b:free")]
    GptOss20bFree,
}

impl Model {
    /// Model used for subtopic requests when the lesson has none selected.
    pub const SUBTOPIC_FALLBACK: Model = Model::Gpt4oMini;

    /// Resolves an optional, possibly blank model string for a subtopic request.
    pub fn or_subtopic_fallback(model: Option<&str>) -> String {
        match model.map(str::trim) {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => Self::SUBTOPIC_FALLBACK.to_string(),
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Model::Gemini25Flash
    }
}

/// Audience level the generated material targets.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, AsRefStr,
)]
pub enum Grade {
    #[serde(rename = "10")]
    #[strum(serialize = "10")]
    Tenth,
    #[serde(rename = "12")]
    #[strum(serialize = "12")]
    Twelfth,
    #[serde(rename = "college")]
    #[strum(serialize = "college", ascii_case_insensitive)]
    College,
}

impl Grade {
    /// Resolves an optional, possibly blank grade string, defaulting to grade 12.
    pub fn or_default(grade: Option<&str>) -> String {
        match grade.map(str::trim) {
            Some(g) if !g.is_empty() => g.to_string(),
            _ => Grade::default().to_string(),
        }
    }
}

impl Default for Grade {
    fn default() -> Self {
        Grade::Twelfth
    }
}

/// A saved lesson as returned by `GET /lessons` and `GET /lesson/{id}`.
///
/// Owned by exactly one user; replaced wholesale on re-save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    /// User-entered topic.
    pub title: String,
    /// Diagram-description text.
    #[serde(rename = "mermaidDiagram", default)]
    pub diagram: String,
    #[serde(default)]
    pub model_used: Option<String>,
    #[serde(default)]
    pub grade: Option<String>,
    /// Ordered subtopic references.
    #[serde(default)]
    pub subtopics: Vec<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// A subtopic, identified by the label extracted from the diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtopic {
    pub name: String,
    #[serde(default)]
    pub content_id: Option<String>,
}

/// Token accounting reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContentMetadata {
    pub model: Option<String>,
    pub usage: Option<TokenUsage>,
}

/// Generated explanatory text for a subtopic. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub text: String,
    #[serde(default)]
    pub metadata: ContentMetadata,
}

// ============================================================================
// Request / response bodies
// ============================================================================

/// Body of `POST /lesson/stream`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonRequest {
    pub lesson_name: String,
    pub model: String,
    pub user_id: String,
    pub grade: String,
}

/// Body of `POST /lesson`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveLessonRequest {
    pub lesson_name: String,
    pub model: String,
    pub user_id: String,
    pub grade: String,
    pub mermaid_code: String,
}

impl SaveLessonRequest {
    pub fn from_stream_request(request: &LessonRequest, mermaid_code: impl Into<String>) -> Self {
        Self {
            lesson_name: request.lesson_name.clone(),
            model: request.model.clone(),
            user_id: request.user_id.clone(),
            grade: request.grade.clone(),
            mermaid_code: mermaid_code.into(),
        }
    }
}

/// Response of `POST /lesson`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SavedLesson {
    #[serde(default, rename = "_id", alias = "id")]
    pub id: Option<String>,
    #[serde(default)]
    pub lesson_name: String,
    #[serde(default)]
    pub mermaid_code: String,
    #[serde(default)]
    pub model_used: Option<String>,
}

/// Body of `POST /subtopic`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtopicRequest {
    pub lesson_name: String,
    pub subtopic_name: String,
    pub model: String,
    pub grade: String,
}

/// Response of `POST /subtopic`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtopicResponse {
    #[serde(default)]
    pub lesson_name: String,
    #[serde(default)]
    pub subtopic_name: String,
    pub subtopic_content: String,
    #[serde(default)]
    pub model_used: Option<String>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

impl SubtopicResponse {
    pub fn into_content(self) -> Content {
        Content {
            text: self.subtopic_content,
            metadata: ContentMetadata {
                model: self.model_used,
                usage: self.usage,
            },
        }
    }
}
