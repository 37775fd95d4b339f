//! Sign-in request and response bodies.

use serde::{Deserialize, Serialize};

/// Body of `POST /initiate-signin`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub name: String,
}

/// Body of `POST /verify-otp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub name: String,
    pub otp: String,
}

/// The signed-in user together with the session token issued for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub token: String,
}

/// Response of `POST /verify-otp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyOtpResponse {
    pub user: AuthenticatedUser,
}

/// Response of `GET /get-user/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
}

/// Body of `PUT /update-profile/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_response_accepts_mongo_id() {
        let json = r#"{"user":{"_id":"u-42","name":"Ada","token":"t0k"}}"#;
        let response: VerifyOtpResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.user.id, "u-42");
        assert_eq!(response.user.token, "t0k");
        assert!(response.user.email.is_none());
    }
}
