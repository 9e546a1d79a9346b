use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// OAuth 2.0 token set.
///
/// Contains the access token, the optional refresh token, and the
/// expiration time for an authenticated session.
///
/// # Security
///
/// Tokens should be stored securely and never logged. The `Debug`
/// implementation redacts them.
///
/// # Examples
///
/// ```
/// use core_auth::OAuthTokens;
///
/// let tokens = OAuthTokens::new("ya29.a0...".to_string(), Some("1//0g...".to_string()), 3600);
/// assert!(!tokens.is_expired());
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthTokens {
    /// The access token used for API requests
    pub access_token: String,
    /// The refresh token used to obtain new access tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// When the access token expires (UTC)
    pub expires_at: DateTime<Utc>,
}

impl OAuthTokens {
    /// Create a new token set expiring `expires_in` seconds from now
    pub fn new(access_token: String, refresh_token: Option<String>, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: Utc::now() + Duration::seconds(expires_in),
        }
    }

    /// Check if the access token is expired or will expire within five minutes
    pub fn is_expired(&self) -> bool {
        self.is_expired_with_buffer(300)
    }

    /// Check if the access token is expired with a custom buffer
    pub fn is_expired_with_buffer(&self, buffer_seconds: i64) -> bool {
        Utc::now() + Duration::seconds(buffer_seconds) >= self.expires_at
    }

    /// Remaining lifetime, or `None` once expired
    pub fn time_until_expiry(&self) -> Option<Duration> {
        let remaining = self.expires_at - Utc::now();
        if remaining > Duration::zero() {
            Some(remaining)
        } else {
            None
        }
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }
}

impl fmt::Debug for OAuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthTokens")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
