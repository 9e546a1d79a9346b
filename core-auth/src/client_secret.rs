//! Google OAuth Client Secret Parsing
//!
//! Reads the `client_secret.json` file downloaded from the Google Cloud
//! console and turns it into an [`OAuthConfig`] for the Drive scopes.

use crate::error::{AuthError, Result};
use crate::oauth::OAuthConfig;
use serde::Deserialize;

/// Full read/write Drive access, needed to add parents
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Read access to the Google Photos space
pub const DRIVE_PHOTOS_READONLY_SCOPE: &str =
    "https://www.googleapis.com/auth/drive.photos.readonly";

/// Out-of-band redirect used when the secret lists none
pub const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Credentials of an OAuth client registered in the Google console
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

/// Console downloads wrap the credentials in an `installed` or `web` section
#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ClientSecret {
    /// Parse the raw contents of `client_secret.json`
    ///
    /// # Errors
    ///
    /// [`AuthError::ClientSecretInvalid`] when the JSON is malformed, has
    /// neither an `installed` nor a `web` section, or has an empty client id.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let file: ClientSecretFile = serde_json::from_slice(bytes)
            .map_err(|e| AuthError::ClientSecretInvalid(e.to_string()))?;

        let secret = file.installed.or(file.web).ok_or_else(|| {
            AuthError::ClientSecretInvalid(
                "expected an \"installed\" or \"web\" section".to_string(),
            )
        })?;

        if secret.client_id.trim().is_empty() {
            return Err(AuthError::ClientSecretInvalid(
                "client_id is empty".to_string(),
            ));
        }

        Ok(secret)
    }

    /// First registered redirect URI, or the out-of-band one
    pub fn redirect_uri(&self) -> &str {
        self.redirect_uris
            .first()
            .map(String::as_str)
            .unwrap_or(OOB_REDIRECT_URI)
    }

    /// OAuth configuration requesting the Drive and Photos scopes
    pub fn into_oauth_config(self) -> OAuthConfig {
        let redirect_uri = self.redirect_uri().to_string();
        OAuthConfig {
            client_id: self.client_id,
            client_secret: self.client_secret,
            redirect_uri,
            scopes: vec![
                DRIVE_SCOPE.to_string(),
                DRIVE_PHOTOS_READONLY_SCOPE.to_string(),
            ],
            auth_url: self.auth_uri,
            token_url: self.token_uri,
        }
    }
}
