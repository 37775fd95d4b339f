//! Ports to the outside world.
//!
//! - [`LessonApi`]: the lesson server, one method per endpoint
//! - [`DiagramSink`]: where streamed diagram text is republished
//! - [`Notifier`]: transient user-visible notifications

use crate::auth::{SignInRequest, UpdateProfileRequest, UserProfile, VerifyOtpRequest, VerifyOtpResponse};
use crate::error::Result;
use crate::lesson::{
    Lesson, LessonRequest, SaveLessonRequest, SavedLesson, SubtopicRequest, SubtopicResponse,
};
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use strum::Display;

/// Text chunks of a streamed lesson diagram, in arrival order.
pub type LessonStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Client for the lesson server.
///
/// Implementations attach the current session token (if any) to every
/// request. Errors are mapped into the shared error type:
/// a stream that cannot be opened is `GenerationUnavailable`, rejected
/// credentials are `Unauthorized`, everything else is `Network`.
#[async_trait]
pub trait LessonApi: Send + Sync {
    /// Replaces the session token sent with subsequent requests.
    fn set_session_token(&self, _token: Option<String>) {}

    /// `POST /initiate-signin`
    async fn initiate_sign_in(&self, request: &SignInRequest) -> Result<()>;

    /// `POST /verify-otp`
    async fn verify_otp(&self, request: &VerifyOtpRequest) -> Result<VerifyOtpResponse>;

    /// `POST /logout`
    async fn logout(&self) -> Result<()>;

    /// `GET /get-user/{id}`
    async fn get_user(&self, user_id: &str) -> Result<UserProfile>;

    /// `PUT /update-profile/{id}`
    async fn update_profile(&self, user_id: &str, request: &UpdateProfileRequest) -> Result<()>;

    /// `POST /lesson/stream`. Resolves once the response has started.
    async fn stream_lesson(&self, request: &LessonRequest) -> Result<LessonStream>;

    /// `POST /lesson`
    async fn save_lesson(&self, request: &SaveLessonRequest) -> Result<SavedLesson>;

    /// `GET /lessons?user_id=`, oldest first.
    async fn list_lessons(&self, user_id: &str) -> Result<Vec<Lesson>>;

    /// `GET /lesson/{id}?user_id=`
    async fn get_lesson(&self, lesson_id: &str, user_id: &str) -> Result<Lesson>;

    /// `DELETE /clear/{id}?user_id=`
    async fn delete_lesson(&self, lesson_id: &str, user_id: &str) -> Result<()>;

    /// `DELETE /clear_history?user_id=`
    async fn clear_history(&self, user_id: &str) -> Result<()>;

    /// `POST /subtopic`
    async fn fetch_subtopic(&self, request: &SubtopicRequest) -> Result<SubtopicResponse>;
}

/// Receives the accumulated diagram text during and after a stream.
pub trait DiagramSink: Send + Sync {
    fn publish(&self, text: &str, streaming: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum NotificationLevel {
    Success,
    Info,
    Error,
}

/// A transient message for the user, the equivalent of a toast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}
