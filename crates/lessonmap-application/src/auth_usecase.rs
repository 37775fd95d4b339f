//! Email-OTP sign-in and the stored session.

use chrono::Utc;
use lessonmap_core::api::{LessonApi, Notification, Notifier};
use lessonmap_core::auth::{
    SessionCookie, SignInRequest, UpdateProfileRequest, UserProfile, VerifyOtpRequest,
};
use lessonmap_core::{LessonMapError, Result};
use lessonmap_infrastructure::SessionStorage;
use std::sync::Arc;

pub const LOGOUT_SUCCESS_MESSAGE: &str = "Logged out successfully!";
pub const LOGOUT_FAILURE_MESSAGE: &str = "Failed to log out. Please try again.";

/// Use case for signing in and out.
///
/// A verified sign-in stores the `token` cookie through [`SessionStorage`]
/// and hands the token to the API client for later requests.
pub struct AuthUseCase {
    api: Arc<dyn LessonApi>,
    storage: SessionStorage,
    notifier: Arc<dyn Notifier>,
    secure: bool,
}

impl AuthUseCase {
    /// `base_url` decides whether the cookie carries `Secure`.
    pub fn new(
        api: Arc<dyn LessonApi>,
        storage: SessionStorage,
        notifier: Arc<dyn Notifier>,
        base_url: &str,
    ) -> Self {
        Self {
            api,
            storage,
            notifier,
            secure: SessionCookie::secure_for(base_url),
        }
    }

    /// Asks the server to email a one-time passcode.
    pub async fn initiate_sign_in(&self, email: &str, name: &str) -> Result<()> {
        let request = SignInRequest {
            email: email.trim().to_string(),
            name: name.trim().to_string(),
        };
        self.api.initiate_sign_in(&request).await?;
        tracing::info!("[Auth] Passcode requested for {}", request.email);
        Ok(())
    }

    /// Exchanges the passcode for a session and stores the cookie.
    pub async fn verify_otp(&self, email: &str, name: &str, otp: &str) -> Result<SessionCookie> {
        let request = VerifyOtpRequest {
            email: email.trim().to_string(),
            name: name.trim().to_string(),
            otp: otp.trim().to_string(),
        };
        let response = self.api.verify_otp(&request).await?;
        let user = response.user;

        let cookie = SessionCookie::new(&user.token, &user.id, &user.name, self.secure, Utc::now());
        self.storage.save(&cookie)?;
        self.api.set_session_token(Some(user.token));

        tracing::info!("[Auth] Signed in as {} ({})", user.name, user.id);
        Ok(cookie)
    }

    /// The stored session, if any, with its token handed to the API client.
    ///
    /// An unreadable session file counts as signed out.
    pub fn current_session(&self) -> Option<SessionCookie> {
        match self.storage.load(Utc::now()) {
            Ok(Some(cookie)) => {
                self.api.set_session_token(Some(cookie.value.clone()));
                Some(cookie)
            }
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(
                    "[Auth] Ignoring unreadable session at {}: {}",
                    self.storage.path().display(),
                    err
                );
                None
            }
        }
    }

    /// Like [`current_session`](Self::current_session) but signed-out is an error.
    pub fn require_session(&self) -> Result<SessionCookie> {
        self.current_session()
            .ok_or_else(|| LessonMapError::Unauthorized("Not signed in. Run `lessonmap signin` first.".into()))
    }

    /// Ends the session on the server, then forgets the cookie.
    ///
    /// On failure the cookie is kept so the user can retry.
    pub async fn logout(&self) -> bool {
        match self.api.logout().await {
            Ok(()) => {
                if let Err(err) = self.storage.clear() {
                    tracing::warn!("[Auth] Could not remove session file: {}", err);
                }
                self.api.set_session_token(None);
                self.notifier.notify(Notification::success(LOGOUT_SUCCESS_MESSAGE));
                true
            }
            Err(err) => {
                tracing::error!("[Auth] Logout failed: {}", err);
                self.notifier.notify(Notification::error(LOGOUT_FAILURE_MESSAGE));
                false
            }
        }
    }

    pub async fn profile(&self, user_id: &str) -> Result<UserProfile> {
        self.api.get_user(user_id).await
    }

    /// Renames the user, keeping the stored cookie's name in step.
    pub async fn update_profile(&self, user_id: &str, name: &str) -> Result<()> {
        let request = UpdateProfileRequest {
            name: name.trim().to_string(),
        };
        self.api.update_profile(user_id, &request).await?;

        if let Some(mut cookie) = self.current_session() {
            if cookie.user_id == user_id {
                cookie.user_name = request.name.clone();
                self.storage.save(&cookie)?;
            }
        }
        tracing::info!("[Auth] Profile of {} renamed to {}", user_id, request.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockLessonApi, RecordingNotifier};
    use lessonmap_core::api::NotificationLevel;
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        api: Arc<MockLessonApi>,
        notifier: Arc<RecordingNotifier>,
        storage: SessionStorage,
    }

    impl Fixture {
        fn new(api: MockLessonApi) -> Self {
            let temp_dir = TempDir::new().unwrap();
            let storage = SessionStorage::with_path(temp_dir.path().join("session.json"));
            Self {
                _temp_dir: temp_dir,
                api: Arc::new(api),
                notifier: Arc::new(RecordingNotifier::default()),
                storage,
            }
        }

        fn usecase(&self, base_url: &str) -> AuthUseCase {
            AuthUseCase::new(
                self.api.clone(),
                self.storage.clone(),
                self.notifier.clone(),
                base_url,
            )
        }
    }

    #[tokio::test]
    async fn test_verify_stores_cookie_and_sets_token() {
        let fixture = Fixture::new(MockLessonApi::new());
        let auth = fixture.usecase("https://api.example.com");

        auth.initiate_sign_in(" ada@example.com ", "Ada").await.unwrap();
        let cookie = auth.verify_otp("ada@example.com", "Ada", "123456").await.unwrap();

        assert_eq!(cookie.value, "t0k");
        assert!(cookie.secure);
        assert_eq!(fixture.api.token().as_deref(), Some("t0k"));

        let stored = fixture.storage.load(Utc::now()).unwrap().unwrap();
        assert_eq!(stored.user_id, "u1");
        assert_eq!(stored.user_name, "Ada");
    }

    #[tokio::test]
    async fn test_rejected_otp_stores_nothing() {
        let fixture = Fixture::new(MockLessonApi::new());
        let auth = fixture.usecase("http://localhost:8000");

        let err = auth.verify_otp("ada@example.com", "Ada", "000000").await.unwrap_err();
        assert!(matches!(err, LessonMapError::Unauthorized(_)));
        assert!(auth.current_session().is_none());
        assert!(fixture.api.token().is_none());
    }

    #[tokio::test]
    async fn test_current_session_restores_token() {
        let fixture = Fixture::new(MockLessonApi::new());
        fixture
            .storage
            .save(&SessionCookie::new("saved", "u1", "Ada", false, Utc::now()))
            .unwrap();

        let auth = fixture.usecase("http://localhost:8000");
        let session = auth.require_session().unwrap();
        assert_eq!(session.value, "saved");
        assert_eq!(fixture.api.token().as_deref(), Some("saved"));
    }

    #[tokio::test]
    async fn test_unreadable_session_counts_as_signed_out() {
        let fixture = Fixture::new(MockLessonApi::new());
        std::fs::write(fixture.storage.path(), "not json").unwrap();

        let auth = fixture.usecase("http://localhost:8000");
        assert!(auth.current_session().is_none());
        assert!(matches!(
            auth.require_session(),
            Err(LessonMapError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let fixture = Fixture::new(MockLessonApi::new());
        let auth = fixture.usecase("http://localhost:8000");
        auth.verify_otp("ada@example.com", "Ada", "123456").await.unwrap();

        assert!(auth.logout().await);
        assert!(auth.current_session().is_none());
        assert!(fixture.api.token().is_none());
        assert_eq!(
            fixture.notifier.messages(),
            vec![(NotificationLevel::Success, LOGOUT_SUCCESS_MESSAGE.to_string())]
        );
    }

    #[tokio::test]
    async fn test_failed_logout_keeps_cookie() {
        let fixture = Fixture::new(MockLessonApi::new().with_logout_failure());
        let auth = fixture.usecase("http://localhost:8000");
        auth.verify_otp("ada@example.com", "Ada", "123456").await.unwrap();

        assert!(!auth.logout().await);
        assert!(auth.current_session().is_some());
        assert_eq!(
            fixture.notifier.messages(),
            vec![(NotificationLevel::Error, LOGOUT_FAILURE_MESSAGE.to_string())]
        );
    }

    #[tokio::test]
    async fn test_profile_and_rename() {
        let fixture = Fixture::new(MockLessonApi::new());
        let auth = fixture.usecase("http://localhost:8000");
        auth.verify_otp("ada@example.com", "Ada", "123456").await.unwrap();

        let profile = auth.profile("u1").await.unwrap();
        assert_eq!(profile.email, "u1@example.com");

        auth.update_profile("u1", "  Ada L. ").await.unwrap();
        assert_eq!(fixture.api.profile_updates()[0].name, "Ada L.");
        assert_eq!(auth.current_session().unwrap().user_name, "Ada L.");
    }
}
