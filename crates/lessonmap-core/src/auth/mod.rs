//! Email-OTP sign-in models and the session cookie.

pub mod cookie;
pub mod model;

pub use cookie::{SESSION_COOKIE_MAX_AGE, SESSION_COOKIE_NAME, SameSite, SessionCookie};
pub use model::{AuthenticatedUser, SignInRequest, UpdateProfileRequest, UserProfile, VerifyOtpRequest, VerifyOtpResponse};
