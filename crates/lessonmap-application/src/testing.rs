//! Hand-written test doubles shared by the use case tests.

use async_trait::async_trait;
use futures::StreamExt;
use lessonmap_core::api::{
    DiagramSink, LessonApi, LessonStream, Notification, NotificationLevel, Notifier,
};
use lessonmap_core::auth::{
    AuthenticatedUser, SignInRequest, UpdateProfileRequest, UserProfile, VerifyOtpRequest,
    VerifyOtpResponse,
};
use lessonmap_core::cache::{CacheEntry, CacheKey, ContentTier};
use lessonmap_core::lesson::{
    Lesson, LessonRequest, SaveLessonRequest, SavedLesson, SubtopicRequest, SubtopicResponse,
};
use lessonmap_core::{LessonMapError, Result};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

pub fn lesson_request(name: &str) -> LessonRequest {
    LessonRequest {
        lesson_name: name.to_string(),
        model: "gemini-2.5-flash".to_string(),
        user_id: "u1".to_string(),
        grade: "12".to_string(),
    }
}

pub fn lesson(id: &str, title: &str, diagram: &str) -> Lesson {
    Lesson {
        id: id.to_string(),
        title: title.to_string(),
        diagram: diagram.to_string(),
        model_used: Some("gpt-4o-mini".to_string()),
        grade: Some("10".to_string()),
        subtopics: Vec::new(),
        timestamp: None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamScript {
    /// Yield the chunks, then end.
    Chunks,
    /// Yield the chunks, then never end.
    Pending,
    /// Yield this many chunks, then fail.
    ErrorAfter(usize),
    /// Refuse to open.
    Unavailable,
}

/// Scriptable in-memory lesson server.
pub struct MockLessonApi {
    chunks: Vec<String>,
    script: StreamScript,
    lessons: Mutex<Vec<Lesson>>,
    subtopics: HashMap<String, String>,
    subtopic_delay: Option<Duration>,
    subtopic_fails: AtomicBool,
    save_fails: bool,
    history_fails: bool,
    logout_fails: bool,
    token: Mutex<Option<String>>,
    saved: Mutex<Vec<SaveLessonRequest>>,
    subtopic_requests: Mutex<Vec<SubtopicRequest>>,
    profile_updates: Mutex<Vec<UpdateProfileRequest>>,
    stream_calls: AtomicUsize,
    subtopic_calls: AtomicUsize,
}

impl MockLessonApi {
    pub fn new() -> Self {
        Self {
            chunks: Vec::new(),
            script: StreamScript::Chunks,
            lessons: Mutex::new(Vec::new()),
            subtopics: HashMap::new(),
            subtopic_delay: None,
            subtopic_fails: AtomicBool::new(false),
            save_fails: false,
            history_fails: false,
            logout_fails: false,
            token: Mutex::new(None),
            saved: Mutex::new(Vec::new()),
            subtopic_requests: Mutex::new(Vec::new()),
            profile_updates: Mutex::new(Vec::new()),
            stream_calls: AtomicUsize::new(0),
            subtopic_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_chunks<I, S>(mut self, chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chunks = chunks.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_pending_chunks<I, S>(self, chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut api = self.with_chunks(chunks);
        api.script = StreamScript::Pending;
        api
    }

    pub fn with_stream_error_after(mut self, chunks: usize) -> Self {
        self.script = StreamScript::ErrorAfter(chunks);
        self
    }

    pub fn with_stream_unavailable(mut self) -> Self {
        self.script = StreamScript::Unavailable;
        self
    }

    pub fn with_lessons(self, lessons: Vec<Lesson>) -> Self {
        *self.lessons.lock().unwrap() = lessons;
        self
    }

    pub fn with_subtopic(mut self, label: &str, content: &str) -> Self {
        self.subtopics.insert(label.to_string(), content.to_string());
        self
    }

    pub fn with_subtopic_delay(mut self, delay: Duration) -> Self {
        self.subtopic_delay = Some(delay);
        self
    }

    pub fn with_subtopic_failure(self) -> Self {
        self.set_subtopic_failure(true);
        self
    }

    pub fn set_subtopic_failure(&self, fails: bool) {
        self.subtopic_fails.store(fails, Ordering::SeqCst);
    }

    pub fn with_save_failure(mut self) -> Self {
        self.save_fails = true;
        self
    }

    pub fn with_history_failure(mut self) -> Self {
        self.history_fails = true;
        self
    }

    pub fn with_logout_failure(mut self) -> Self {
        self.logout_fails = true;
        self
    }

    pub fn token(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }

    pub fn lessons(&self) -> Vec<Lesson> {
        self.lessons.lock().unwrap().clone()
    }

    pub fn saved_requests(&self) -> Vec<SaveLessonRequest> {
        self.saved.lock().unwrap().clone()
    }

    pub fn subtopic_requests(&self) -> Vec<SubtopicRequest> {
        self.subtopic_requests.lock().unwrap().clone()
    }

    pub fn profile_updates(&self) -> Vec<UpdateProfileRequest> {
        self.profile_updates.lock().unwrap().clone()
    }

    pub fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    pub fn subtopic_calls(&self) -> usize {
        self.subtopic_calls.load(Ordering::SeqCst)
    }

    fn history_result(&self) -> Result<()> {
        if self.history_fails {
            return Err(LessonMapError::network(Some(500), "history unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl LessonApi for MockLessonApi {
    fn set_session_token(&self, token: Option<String>) {
        *self.token.lock().unwrap() = token;
    }

    async fn initiate_sign_in(&self, _request: &SignInRequest) -> Result<()> {
        Ok(())
    }

    async fn verify_otp(&self, request: &VerifyOtpRequest) -> Result<VerifyOtpResponse> {
        if request.otp == "000000" {
            return Err(LessonMapError::Unauthorized("Invalid or expired OTP".into()));
        }
        Ok(VerifyOtpResponse {
            user: AuthenticatedUser {
                id: "u1".into(),
                name: request.name.clone(),
                email: Some(request.email.clone()),
                token: "t0k".into(),
            },
        })
    }

    async fn logout(&self) -> Result<()> {
        if self.logout_fails {
            return Err(LessonMapError::network(None, "connection reset"));
        }
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<UserProfile> {
        if self.token().is_none() {
            return Err(LessonMapError::Unauthorized("missing token".into()));
        }
        Ok(UserProfile {
            email: format!("{user_id}@example.com"),
            name: "Ada".into(),
        })
    }

    async fn update_profile(&self, _user_id: &str, request: &UpdateProfileRequest) -> Result<()> {
        self.profile_updates.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn stream_lesson(&self, _request: &LessonRequest) -> Result<LessonStream> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);

        let chunks = self.chunks.clone().into_iter().map(Ok::<String, LessonMapError>);
        let stream: LessonStream = match self.script {
            StreamScript::Unavailable => {
                return Err(LessonMapError::GenerationUnavailable(
                    "Could not reach lesson server".into(),
                ));
            }
            StreamScript::Chunks => Box::pin(futures::stream::iter(chunks)),
            StreamScript::Pending => {
                Box::pin(futures::stream::iter(chunks).chain(futures::stream::pending()))
            }
            StreamScript::ErrorAfter(n) => {
                let failure = futures::stream::once(async {
                    Err(LessonMapError::network(None, "Lesson stream interrupted"))
                });
                Box::pin(futures::stream::iter(chunks.take(n)).chain(failure))
            }
        };
        Ok(stream)
    }

    async fn save_lesson(&self, request: &SaveLessonRequest) -> Result<SavedLesson> {
        if self.save_fails {
            return Err(LessonMapError::network(Some(500), "database down"));
        }
        let mut saved = self.saved.lock().unwrap();
        saved.push(request.clone());
        Ok(SavedLesson {
            id: Some(format!("saved-{}", saved.len())),
            lesson_name: request.lesson_name.clone(),
            mermaid_code: request.mermaid_code.clone(),
            model_used: Some(request.model.clone()),
        })
    }

    async fn list_lessons(&self, _user_id: &str) -> Result<Vec<Lesson>> {
        self.history_result()?;
        Ok(self.lessons())
    }

    async fn get_lesson(&self, lesson_id: &str, _user_id: &str) -> Result<Lesson> {
        self.lessons()
            .into_iter()
            .find(|lesson| lesson.id == lesson_id)
            .ok_or_else(|| LessonMapError::not_found("lesson", lesson_id))
    }

    async fn delete_lesson(&self, lesson_id: &str, _user_id: &str) -> Result<()> {
        self.history_result()?;
        let mut lessons = self.lessons.lock().unwrap();
        let before = lessons.len();
        lessons.retain(|lesson| lesson.id != lesson_id);
        if lessons.len() == before {
            return Err(LessonMapError::not_found("lesson", lesson_id));
        }
        Ok(())
    }

    async fn clear_history(&self, _user_id: &str) -> Result<()> {
        self.history_result()?;
        self.lessons.lock().unwrap().clear();
        Ok(())
    }

    async fn fetch_subtopic(&self, request: &SubtopicRequest) -> Result<SubtopicResponse> {
        self.subtopic_calls.fetch_add(1, Ordering::SeqCst);
        self.subtopic_requests.lock().unwrap().push(request.clone());

        if let Some(delay) = self.subtopic_delay {
            tokio::time::sleep(delay).await;
        }
        if self.subtopic_fails.load(Ordering::SeqCst) {
            return Err(LessonMapError::network(Some(500), "model timed out"));
        }

        let content = self
            .subtopics
            .get(&request.subtopic_name)
            .cloned()
            .unwrap_or_else(|| format!("About {}", request.subtopic_name));
        Ok(SubtopicResponse {
            lesson_name: request.lesson_name.clone(),
            subtopic_name: request.subtopic_name.clone(),
            subtopic_content: content,
            model_used: Some(request.model.clone()),
            usage: None,
        })
    }
}

#[derive(Default)]
pub struct RecordingSink {
    published: Mutex<Vec<(String, bool)>>,
}

impl RecordingSink {
    pub fn published(&self) -> Vec<(String, bool)> {
        self.published.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<(String, bool)> {
        self.published.lock().unwrap().last().cloned()
    }
}

impl DiagramSink for RecordingSink {
    fn publish(&self, text: &str, streaming: bool) {
        self.published.lock().unwrap().push((text.to_string(), streaming));
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(NotificationLevel, String)> {
        self.notifications
            .lock()
            .unwrap()
            .iter()
            .map(|n| (n.level, n.message.clone()))
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().unwrap().push(notification);
    }
}

/// A tier whose backing store is always unavailable.
pub struct FailingTier;

#[async_trait]
impl ContentTier for FailingTier {
    fn name(&self) -> &'static str {
        "broken"
    }

    async fn get(&self, _key: &CacheKey) -> Result<Option<CacheEntry>> {
        Err(LessonMapError::storage("store is locked"))
    }

    async fn put(&self, _key: &CacheKey, _entry: CacheEntry) -> Result<()> {
        Err(LessonMapError::storage("store is locked"))
    }

    async fn clear(&self) -> Result<()> {
        Err(LessonMapError::storage("store is locked"))
    }
}
