//! The `token` session cookie.
//!
//! Mirrors what a browser would keep for the session: a 7-day `Max-Age`,
//! `Path=/`, `SameSite=Lax`, and `Secure` only when the API is served over TLS.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

pub const SESSION_COOKIE_NAME: &str = "token";

/// Seven days, in seconds.
pub const SESSION_COOKIE_MAX_AGE: i64 = 60 * 60 * 24 * 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    /// Identity of the user the token was issued for.
    pub user_id: String,
    pub user_name: String,
    pub issued_at: DateTime<Utc>,
    pub max_age_secs: i64,
    pub path: String,
    pub same_site: SameSite,
    pub secure: bool,
}

impl SessionCookie {
    /// Creates the session cookie for a freshly verified user.
    ///
    /// `secure` should be true when the API base URL uses `https`.
    pub fn new(
        token: impl Into<String>,
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        secure: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            name: SESSION_COOKIE_NAME.to_string(),
            value: token.into(),
            user_id: user_id.into(),
            user_name: user_name.into(),
            issued_at: now,
            max_age_secs: SESSION_COOKIE_MAX_AGE,
            path: "/".to_string(),
            same_site: SameSite::Lax,
            secure,
        }
    }

    /// Whether a base URL calls for the `Secure` attribute.
    pub fn secure_for(base_url: &str) -> bool {
        base_url.trim_start().to_ascii_lowercase().starts_with("https://")
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + Duration::seconds(self.max_age_secs)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    /// Value for a `Cookie:` request header.
    pub fn header_value(&self) -> String {
        format!("{}={}", self.name, urlencoding::encode(&self.value))
    }

    /// The full attribute string, as it would be written to `document.cookie`.
    pub fn attribute_string(&self) -> String {
        let mut out = format!(
            "{}; Max-Age={}; Path={}; SameSite={}",
            self.header_value(),
            self.max_age_secs,
            self.path,
            self.same_site
        );
        if self.secure {
            out.push_str("; Secure");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issued() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_attribute_string_plain_http() {
        let cookie = SessionCookie::new("a b", "u1", "Ada", false, issued());
        assert_eq!(
            cookie.attribute_string(),
            "token=a%20b; Max-Age=604800; Path=/; SameSite=Lax"
        );
    }

    #[test]
    fn test_attribute_string_tls() {
        let secure = SessionCookie::secure_for("https://api.example.com");
        let cookie = SessionCookie::new("abc", "u1", "Ada", secure, issued());
        assert!(cookie.attribute_string().ends_with("; Secure"));
        assert!(!SessionCookie::secure_for("http://localhost:8000"));
    }

    #[test]
    fn test_expiry_after_seven_days() {
        let cookie = SessionCookie::new("abc", "u1", "Ada", false, issued());
        assert!(!cookie.is_expired(issued() + Duration::days(6)));
        assert!(cookie.is_expired(issued() + Duration::days(7)));
    }
}
