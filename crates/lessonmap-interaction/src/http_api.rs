//! HttpLessonApi - reqwest client for the lesson server.

use crate::utf8::Utf8ChunkDecoder;
use async_trait::async_trait;
use futures::StreamExt;
use lessonmap_core::api::{LessonApi, LessonStream};
use lessonmap_core::auth::{
    SESSION_COOKIE_NAME, SignInRequest, UpdateProfileRequest, UserProfile, VerifyOtpRequest,
    VerifyOtpResponse,
};
use lessonmap_core::lesson::{
    Lesson, LessonRequest, SaveLessonRequest, SavedLesson, SubtopicRequest, SubtopicResponse,
};
use lessonmap_core::{LessonMapError, Result};
use reqwest::header::{AUTHORIZATION, COOKIE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::RwLock;

/// What a request is about, used to build `NotFound` errors.
#[derive(Debug, Clone, Copy)]
struct Target<'a> {
    kind: &'static str,
    id: &'a str,
}

impl<'a> Target<'a> {
    fn new(kind: &'static str, id: &'a str) -> Self {
        Self { kind, id }
    }
}

/// [`LessonApi`] over HTTP.
///
/// When a session token is set it is sent both as `Authorization: Bearer`
/// and as the `token` cookie, matching what the server accepts on its
/// different routes.
pub struct HttpLessonApi {
    client: Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl HttpLessonApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            token: RwLock::new(None),
        }
    }

    pub fn with_token(self, token: Option<String>) -> Self {
        self.set_session_token(token);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|guard| guard.clone())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        tracing::debug!("[HttpLessonApi] {} {}", method, url);

        let mut builder = self.client.request(method, url);
        if let Some(token) = self.token() {
            builder = builder
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .header(
                    COOKIE,
                    format!("{}={}", SESSION_COOKIE_NAME, urlencoding::encode(&token)),
                );
        }
        builder
    }

    /// Sends and checks the status, mapping failures onto [`LessonMapError`].
    async fn send(&self, builder: RequestBuilder, target: Option<Target<'_>>) -> Result<Response> {
        let response = builder.send().await.map_err(|err| {
            LessonMapError::network(None, format!("Request failed: {err}"))
        })?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(map_http_error(status, &body, target))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        target: Option<Target<'_>>,
    ) -> Result<T> {
        let response = self.send(builder, target).await?;
        let body = response
            .text()
            .await
            .map_err(|err| LessonMapError::network(None, format!("Failed to read response: {err}")))?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl LessonApi for HttpLessonApi {
    fn set_session_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = token;
        }
    }

    async fn initiate_sign_in(&self, request: &SignInRequest) -> Result<()> {
        let builder = self.request(Method::POST, "/initiate-signin").json(request);
        self.send(builder, None).await?;
        Ok(())
    }

    async fn verify_otp(&self, request: &VerifyOtpRequest) -> Result<VerifyOtpResponse> {
        let builder = self.request(Method::POST, "/verify-otp").json(request);
        self.send_json(builder, None).await
    }

    async fn logout(&self) -> Result<()> {
        let builder = self
            .request(Method::POST, "/logout")
            .json(&serde_json::json!({}));
        self.send(builder, None).await?;
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<UserProfile> {
        let path = format!("/get-user/{}", urlencoding::encode(user_id));
        let builder = self.request(Method::GET, &path);
        self.send_json(builder, Some(Target::new("user", user_id))).await
    }

    async fn update_profile(&self, user_id: &str, request: &UpdateProfileRequest) -> Result<()> {
        let path = format!("/update-profile/{}", urlencoding::encode(user_id));
        let builder = self.request(Method::PUT, &path).json(request);
        self.send(builder, Some(Target::new("user", user_id))).await?;
        Ok(())
    }

    async fn stream_lesson(&self, request: &LessonRequest) -> Result<LessonStream> {
        let builder = self.request(Method::POST, "/lesson/stream").json(request);

        let response = builder.send().await.map_err(|err| {
            LessonMapError::GenerationUnavailable(format!("Could not reach lesson server: {err}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(status, &body);
            return Err(LessonMapError::GenerationUnavailable(format!(
                "HTTP {}: {message}",
                status.as_u16()
            )));
        }

        tracing::info!("[HttpLessonApi] Lesson stream opened for '{}'", request.lesson_name);

        let bytes = Box::pin(response.bytes_stream());
        let stream = futures::stream::unfold(
            (bytes, Utf8ChunkDecoder::new(), false),
            |(mut bytes, mut decoder, finished)| async move {
                if finished {
                    return None;
                }
                loop {
                    match bytes.next().await {
                        Some(Ok(chunk)) => {
                            let text = decoder.decode(&chunk);
                            if !text.is_empty() {
                                return Some((Ok(text), (bytes, decoder, false)));
                            }
                        }
                        Some(Err(err)) => {
                            let error = LessonMapError::network(
                                None,
                                format!("Lesson stream interrupted: {err}"),
                            );
                            return Some((Err(error), (bytes, decoder, true)));
                        }
                        None => {
                            let rest = decoder.finish();
                            if rest.is_empty() {
                                return None;
                            }
                            return Some((Ok(rest), (bytes, decoder, true)));
                        }
                    }
                }
            },
        );

        Ok(Box::pin(stream))
    }

    async fn save_lesson(&self, request: &SaveLessonRequest) -> Result<SavedLesson> {
        let builder = self.request(Method::POST, "/lesson").json(request);
        self.send_json(builder, None).await
    }

    async fn list_lessons(&self, user_id: &str) -> Result<Vec<Lesson>> {
        let builder = self
            .request(Method::GET, "/lessons")
            .query(&[("user_id", user_id)]);
        self.send_json(builder, None).await
    }

    async fn get_lesson(&self, lesson_id: &str, user_id: &str) -> Result<Lesson> {
        let path = format!("/lesson/{}", urlencoding::encode(lesson_id));
        let builder = self
            .request(Method::GET, &path)
            .query(&[("user_id", user_id)]);
        self.send_json(builder, Some(Target::new("lesson", lesson_id))).await
    }

    async fn delete_lesson(&self, lesson_id: &str, user_id: &str) -> Result<()> {
        let path = format!("/clear/{}", urlencoding::encode(lesson_id));
        let builder = self
            .request(Method::DELETE, &path)
            .query(&[("user_id", user_id)]);
        self.send(builder, Some(Target::new("lesson", lesson_id))).await?;
        Ok(())
    }

    async fn clear_history(&self, user_id: &str) -> Result<()> {
        let builder = self
            .request(Method::DELETE, "/clear_history")
            .query(&[("user_id", user_id)]);
        self.send(builder, None).await?;
        Ok(())
    }

    async fn fetch_subtopic(&self, request: &SubtopicRequest) -> Result<SubtopicResponse> {
        let builder = self.request(Method::POST, "/subtopic").json(request);
        self.send_json(builder, None).await
    }
}

/// Prefers the JSON `detail` / `error` / `message` field, then the raw body,
/// then the status reason.
fn error_message(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["detail", "error", "message"].iter().find_map(|field| {
                value.get(field).map(|v| match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
            })
        });

    from_json
        .or_else(|| Some(body.trim().to_string()).filter(|s| !s.is_empty()))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        })
}

fn map_http_error(status: StatusCode, body: &str, target: Option<Target<'_>>) -> LessonMapError {
    let message = error_message(status, body);

    match (status, target) {
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => LessonMapError::Unauthorized(message),
        (StatusCode::NOT_FOUND, Some(target)) => LessonMapError::not_found(target.kind, target.id),
        _ => LessonMapError::network(Some(status.as_u16()), message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_detail() {
        let msg = error_message(StatusCode::BAD_REQUEST, r#"{"detail":"Invalid OTP"}"#);
        assert_eq!(msg, "Invalid OTP");

        let msg = error_message(StatusCode::BAD_REQUEST, r#"{"error":"boom"}"#);
        assert_eq!(msg, "boom");

        let msg = error_message(StatusCode::BAD_GATEWAY, "");
        assert_eq!(msg, "Bad Gateway");

        let msg = error_message(StatusCode::INTERNAL_SERVER_ERROR, "plain text");
        assert_eq!(msg, "plain text");
    }

    #[test]
    fn test_status_mapping() {
        let target = Some(Target::new("lesson", "abc"));

        let err = map_http_error(StatusCode::UNAUTHORIZED, "", target);
        assert!(matches!(err, LessonMapError::Unauthorized(_)));

        let err = map_http_error(StatusCode::NOT_FOUND, "", target);
        assert!(err.is_not_found());

        let err = map_http_error(StatusCode::NOT_FOUND, "", None);
        assert!(matches!(err, LessonMapError::Network { status: Some(404), .. }));

        let err = map_http_error(StatusCode::SERVICE_UNAVAILABLE, "", None);
        assert!(matches!(err, LessonMapError::Network { status: Some(503), .. }));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let api = HttpLessonApi::new("http://localhost:8000/");
        assert_eq!(api.base_url(), "http://localhost:8000");
        assert_eq!(api.url("/lessons"), "http://localhost:8000/lessons");
    }
}
