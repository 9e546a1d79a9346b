//! Authentication Manager
//!
//! Hands out a valid Drive access token: the stored one while it is fresh,
//! a refreshed one once it is about to expire, and an interactively granted
//! one when nothing usable is stored.

use crate::error::{AuthError, Result};
use crate::oauth::{OAuthConfig, OAuthFlowManager};
use crate::token_store::TokenStore;
use crate::types::OAuthTokens;
use async_trait::async_trait;
use bridge_traits::http::HttpClient;
use bridge_traits::storage::SecureStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, instrument, warn};
use url::Url;

/// Refresh this long before the access token actually expires
const TOKEN_REFRESH_BUFFER: Duration = Duration::from_secs(300);

/// What the user hands back after visiting the consent page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCode {
    pub code: String,
    /// Present when the user pasted the full redirect URL
    pub state: Option<String>,
}

impl AuthorizationCode {
    /// Accept either the bare code or the full redirect URL
    ///
    /// ```
    /// use core_auth::AuthorizationCode;
    ///
    /// let pasted = AuthorizationCode::parse("http://localhost/?state=xyz&code=4/abc").unwrap();
    /// assert_eq!(pasted.code, "4/abc");
    /// assert_eq!(pasted.state.as_deref(), Some("xyz"));
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(AuthError::Prompt("no authorization code entered".to_string()));
        }

        if let Ok(url) = Url::parse(input) {
            if url.has_host() {
                let mut code = None;
                let mut state = None;
                for (key, value) in url.query_pairs() {
                    match key.as_ref() {
                        "code" => code = Some(value.into_owned()),
                        "state" => state = Some(value.into_owned()),
                        "error" => {
                            return Err(AuthError::AuthenticationFailed(format!(
                                "consent was not granted: {}",
                                value
                            )))
                        }
                        _ => {}
                    }
                }
                let code = code.ok_or_else(|| {
                    AuthError::Prompt("redirect URL has no code parameter".to_string())
                })?;
                return Ok(Self { code, state });
            }
        }

        Ok(Self {
            code: input.to_string(),
            state: None,
        })
    }
}

/// Interactive step of the authorization code grant
#[async_trait]
pub trait AuthorizationPrompt: Send + Sync {
    /// Show `auth_url` to the user and return what they paste back
    async fn request_code(&self, auth_url: &str) -> Result<AuthorizationCode>;
}

/// Prompt on the controlling terminal
///
/// Prints the consent URL to stdout and reads one line from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdioPrompt;

#[async_trait]
impl AuthorizationPrompt for StdioPrompt {
    async fn request_code(&self, auth_url: &str) -> Result<AuthorizationCode> {
        println!(
            "Go to the following link in your browser, then paste the authorization code \
             (or the full URL you were redirected to):\n{}",
            auth_url
        );

        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .map_err(|e| AuthError::Prompt(format!("failed to read authorization code: {}", e)))?;

        AuthorizationCode::parse(&line)
    }
}

/// Drive session provider
pub struct AuthManager {
    flow: OAuthFlowManager,
    token_store: TokenStore,
}

impl AuthManager {
    pub fn new(
        config: OAuthConfig,
        http_client: Arc<dyn HttpClient>,
        secure_store: Arc<dyn SecureStore>,
    ) -> Self {
        Self {
            flow: OAuthFlowManager::new(config, http_client),
            token_store: TokenStore::new(secure_store),
        }
    }

    /// Return a usable access token, refreshing or prompting as needed
    ///
    /// # Errors
    ///
    /// - [`AuthError::TokenRefreshFailed`] when a stored refresh token is rejected
    /// - [`AuthError::Prompt`] / [`AuthError::InvalidAuthCode`] when the
    ///   interactive grant fails
    /// - [`AuthError::SecureStorageUnavailable`] when tokens cannot be persisted
    #[instrument(skip(self, prompt))]
    pub async fn access_token(&self, prompt: &dyn AuthorizationPrompt) -> Result<String> {
        let stored = match self.token_store.retrieve_tokens().await {
            Ok(tokens) => tokens,
            Err(AuthError::TokenCorrupted(reason)) => {
                warn!(reason = %reason, "Discarding unreadable stored tokens");
                None
            }
            Err(e) => return Err(e),
        };

        let tokens = match stored {
            Some(tokens) if !tokens.is_expired_with_buffer(TOKEN_REFRESH_BUFFER.as_secs() as i64) => {
                return Ok(tokens.access_token);
            }
            Some(OAuthTokens {
                refresh_token: Some(refresh_token),
                ..
            }) => {
                info!("Access token expired or expiring soon, refreshing");
                self.flow.refresh_access_token(&refresh_token).await?
            }
            Some(_) => {
                info!("Stored token expired and has no refresh token");
                self.interactive_grant(prompt).await?
            }
            None => self.interactive_grant(prompt).await?,
        };

        self.token_store.store_tokens(&tokens).await?;
        Ok(tokens.access_token)
    }

    async fn interactive_grant(&self, prompt: &dyn AuthorizationPrompt) -> Result<OAuthTokens> {
        info!("No usable stored credentials, starting authorization");
        let (auth_url, verifier) = self.flow.build_auth_url()?;
        let answer = prompt.request_code(&auth_url).await?;
        self.flow
            .exchange_code(&answer.code, answer.state.as_deref(), &verifier)
            .await
    }
}
