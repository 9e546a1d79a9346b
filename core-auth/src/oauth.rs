//! OAuth 2.0 Authorization Flow Manager with PKCE Support
//!
//! This module implements RFC 6749 (OAuth 2.0) and RFC 7636 (PKCE) for the
//! installed-application flow against Google's token endpoint.
//!
//! # Overview
//!
//! The OAuth flow manager handles:
//! - Building authorization URLs with PKCE challenge
//! - Exchanging authorization codes for tokens
//! - Refreshing access tokens
//! - State verification for CSRF protection
//!
//! # Security
//!
//! - Generates cryptographically secure random state and code verifier
//! - Never logs sensitive values (tokens, codes, verifiers)
//!
//! # Example
//!
//! ```no_run
//! use core_auth::{ClientSecret, OAuthFlowManager};
//! use std::sync::Arc;
//!
//! # async fn example(raw: &[u8]) -> core_auth::Result<()> {
//! # use bridge_traits::http::HttpClient;
//! # let http_client: Arc<dyn HttpClient> = todo!();
//! let config = ClientSecret::from_json(raw)?.into_oauth_config();
//! let flow_manager = OAuthFlowManager::new(config, http_client);
//! let (auth_url, pkce_verifier) = flow_manager.build_auth_url()?;
//! // Show auth_url to the user, then exchange the code they paste back.
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::OAuthTokens;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, RetryPolicy};
use rand::Rng;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// OAuth 2.0 provider configuration.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret (optional for public clients)
    pub client_secret: Option<String>,
    /// Redirect URI registered for the client
    pub redirect_uri: String,
    /// List of OAuth scopes to request
    pub scopes: Vec<String>,
    /// Authorization endpoint URL
    pub auth_url: String,
    /// Token endpoint URL
    pub token_url: String,
}

/// PKCE (Proof Key for Code Exchange) verifier.
///
/// Holds the code verifier and the CSRF state for one authorization
/// attempt. Only the challenge derived from the verifier leaves the process
/// before the code exchange.
#[derive(Debug, Clone)]
pub struct PkceVerifier {
    verifier: String,
    state: String,
}

impl PkceVerifier {
    /// Create a new PKCE verifier with cryptographically secure random values.
    ///
    /// Both values use URL-safe base64 encoding without padding.
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();

        // 32 bytes -> 43 characters, the RFC 7636 minimum
        let mut verifier_bytes = [0u8; 32];
        rng.fill(&mut verifier_bytes);
        let verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);

        let mut state_bytes = [0u8; 16];
        rng.fill(&mut state_bytes);
        let state = URL_SAFE_NO_PAD.encode(state_bytes);

        Self { verifier, state }
    }

    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    /// BASE64URL(SHA256(code_verifier))
    pub fn challenge(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }
}

impl Default for PkceVerifier {
    fn default() -> Self {
        Self::new()
    }
}

/// OAuth 2.0 flow manager.
pub struct OAuthFlowManager {
    config: OAuthConfig,
    http_client: Arc<dyn HttpClient>,
}

impl OAuthFlowManager {
    pub fn new(config: OAuthConfig, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            http_client,
        }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Build the authorization URL with PKCE challenge.
    ///
    /// Returns the URL the user should visit and the verifier that must be
    /// passed to [`exchange_code`](Self::exchange_code) afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured authorization URL cannot be parsed.
    #[instrument(skip(self), fields(client_id = %self.config.client_id))]
    pub fn build_auth_url(&self) -> Result<(String, PkceVerifier)> {
        let verifier = PkceVerifier::new();
        let challenge = verifier.challenge();

        let mut url = Url::parse(&self.config.auth_url)
            .map_err(|e| AuthError::Other(format!("Invalid auth URL: {}", e)))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", &self.config.client_id);
            query.append_pair("redirect_uri", &self.config.redirect_uri);
            query.append_pair("response_type", "code");
            query.append_pair("scope", &self.config.scopes.join(" "));
            query.append_pair("state", verifier.state());
            query.append_pair("code_challenge", &challenge);
            query.append_pair("code_challenge_method", "S256");
            query.append_pair("access_type", "offline"); // Request refresh token
        }

        debug!("Built authorization URL");

        Ok((url.to_string(), verifier))
    }

    /// Exchange an authorization code for OAuth tokens.
    ///
    /// `state` is the value returned alongside the code. Out-of-band flows
    /// that only hand back the code pass `None` and skip the check.
    ///
    /// # Errors
    ///
    /// - [`AuthError::StateMismatch`] when the state does not match
    /// - [`AuthError::InvalidAuthCode`] when the token endpoint rejects the code
    /// - [`AuthError::NetworkError`] when the endpoint cannot be reached
    #[instrument(skip(self, code, state, verifier))]
    pub async fn exchange_code(
        &self,
        code: &str,
        state: Option<&str>,
        verifier: &PkceVerifier,
    ) -> Result<OAuthTokens> {
        if let Some(state) = state {
            if state != verifier.state() {
                warn!("OAuth state mismatch on authorization callback");
                return Err(AuthError::StateMismatch {
                    expected: verifier.state().to_string(),
                    actual: state.to_string(),
                });
            }
        }

        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("code_verifier", verifier.verifier()),
        ];
        if let Some(client_secret) = self.config.client_secret.as_deref() {
            params.push(("client_secret", client_secret));
        }

        debug!("Exchanging authorization code for tokens");

        let request =
            HttpRequest::new(HttpMethod::Post, self.config.token_url.clone()).form(&params);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| AuthError::NetworkError(e.to_string()))?;

        if !response.is_success() {
            let status = response.status;
            let error_body = response.text_lossy();

            warn!(
                status = status,
                error = %error_body,
                "Token exchange failed while exchanging authorization code"
            );

            return Err(AuthError::InvalidAuthCode(format!(
                "Token endpoint returned {}: {}",
                status, error_body
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .map_err(|e| AuthError::Other(format!("Failed to parse token response: {}", e)))?;

        info!(
            expires_in = token_response.expires_in,
            has_refresh_token = token_response.refresh_token.is_some(),
            "Exchanged authorization code for tokens"
        );

        Ok(OAuthTokens::new(
            token_response.access_token,
            token_response.refresh_token,
            token_response.expires_in,
        ))
    }

    /// Refresh an access token using a refresh token.
    ///
    /// Google does not rotate refresh tokens, so the old one is kept when
    /// the response omits it.
    ///
    /// # Errors
    ///
    /// [`AuthError::TokenRefreshFailed`] when the token is revoked, the
    /// endpoint keeps failing, or it cannot be reached.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<OAuthTokens> {
        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
        ];
        if let Some(client_secret) = self.config.client_secret.as_deref() {
            params.push(("client_secret", client_secret));
        }

        debug!("Refreshing access token");

        let request =
            HttpRequest::new(HttpMethod::Post, self.config.token_url.clone()).form(&params);

        let response = self
            .http_client
            .execute_with_retry(request, RetryPolicy::default())
            .await
            .map_err(|e| AuthError::TokenRefreshFailed(e.to_string()))?;

        if !response.is_success() {
            let status = response.status;
            let error_body = response.text_lossy();

            warn!(
                status = status,
                error = %error_body,
                "Token refresh rejected"
            );

            return Err(AuthError::TokenRefreshFailed(format!(
                "Token endpoint returned {}: {}",
                status, error_body
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .map_err(|e| AuthError::Other(format!("Failed to parse token response: {}", e)))?;

        info!(
            expires_in = token_response.expires_in,
            "Refreshed access token"
        );

        Ok(OAuthTokens::new(
            token_response.access_token,
            token_response
                .refresh_token
                .or_else(|| Some(refresh_token.to_string())),
            token_response.expires_in,
        ))
    }
}

/// Token response from the OAuth provider.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600 // Default to 1 hour if not specified
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::HttpResponse;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Replays canned responses and records every request
    #[derive(Default)]
    struct ScriptedHttpClient {
        responses: Mutex<Vec<BridgeResult<HttpResponse>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedHttpClient {
        fn replying(status: u16, body: &str) -> Self {
            let client = Self::default();
            client.responses.lock().unwrap().push(Ok(HttpResponse {
                status,
                headers: HashMap::new(),
                body: Bytes::from(body.to_string()),
            }));
            client
        }

        fn last_body(&self) -> String {
            let requests = self.requests.lock().unwrap();
            let body = requests.last().and_then(|r| r.body.clone()).unwrap();
            String::from_utf8(body.to_vec()).unwrap()
        }
    }

    #[async_trait::async_trait]
    impl HttpClient for ScriptedHttpClient {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
            self.requests.lock().unwrap().push(request);
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(BridgeError::OperationFailed(
                    "no scripted response".to_string(),
                ));
            }
            responses.remove(0)
        }
    }

    fn test_config() -> OAuthConfig {
        OAuthConfig {
            client_id: "test-client".to_string(),
            client_secret: Some("secret".to_string()),
            redirect_uri: "http://localhost".to_string(),
            scopes: vec!["scope1".to_string(), "scope2".to_string()],
            auth_url: "https://provider.com/auth".to_string(),
            token_url: "https://provider.com/token".to_string(),
        }
    }

    #[test]
    fn test_pkce_verifier_generation() {
        let verifier = PkceVerifier::new();

        assert!(verifier.verifier().len() >= 43);
        assert!(!verifier.state().is_empty());
        assert_eq!(verifier.challenge(), verifier.challenge());

        let verifier2 = PkceVerifier::new();
        assert_ne!(verifier.verifier(), verifier2.verifier());
        assert_ne!(verifier.state(), verifier2.state());
    }

    #[test]
    fn test_pkce_challenge_known_value() {
        // RFC 7636 appendix B
        let verifier = PkceVerifier {
            verifier: "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk".to_string(),
            state: "state".to_string(),
        };

        assert_eq!(
            verifier.challenge(),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_build_auth_url() {
        let manager =
            OAuthFlowManager::new(test_config(), Arc::new(ScriptedHttpClient::default()));
        let (url, verifier) = manager.build_auth_url().unwrap();

        assert!(url.contains("client_id=test-client"));
        assert!(url.contains("redirect_uri=http"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=scope1+scope2") || url.contains("scope=scope1%20scope2"));
        assert!(url.contains(&format!("state={}", verifier.state())));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains("access_type=offline"));
    }

    #[test]
    fn test_build_auth_url_invalid_url() {
        let mut config = test_config();
        config.auth_url = "not a valid url".to_string();

        let manager = OAuthFlowManager::new(config, Arc::new(ScriptedHttpClient::default()));
        assert!(manager.build_auth_url().is_err());
    }

    #[tokio::test]
    async fn test_exchange_code_success() {
        let http = Arc::new(ScriptedHttpClient::replying(
            200,
            r#"{"access_token":"at","refresh_token":"rt","expires_in":3600,"token_type":"Bearer"}"#,
        ));
        let manager = OAuthFlowManager::new(test_config(), http.clone());
        let verifier = PkceVerifier::new();

        let tokens = manager
            .exchange_code("4/code", Some(verifier.state()), &verifier)
            .await
            .unwrap();

        assert_eq!(tokens.access_token, "at");
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt"));

        let body = http.last_body();
        assert!(body.contains("grant_type=authorization_code"));
        assert!(body.contains("code=4%2Fcode"));
        assert!(body.contains(&format!("code_verifier={}", verifier.verifier())));
        assert!(body.contains("client_secret=secret"));
    }

    #[tokio::test]
    async fn test_exchange_code_state_mismatch() {
        let http = Arc::new(ScriptedHttpClient::default());
        let manager = OAuthFlowManager::new(test_config(), http.clone());
        let verifier = PkceVerifier::new();

        let err = manager
            .exchange_code("code", Some("forged"), &verifier)
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::StateMismatch { .. }));
        assert!(http.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_exchange_code_rejected() {
        let http = Arc::new(ScriptedHttpClient::replying(
            400,
            r#"{"error":"invalid_grant"}"#,
        ));
        let manager = OAuthFlowManager::new(test_config(), http);

        let err = manager
            .exchange_code("bad", None, &PkceVerifier::new())
            .await
            .unwrap_err();

        match err {
            AuthError::InvalidAuthCode(message) => assert!(message.contains("invalid_grant")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_refresh_keeps_refresh_token_when_omitted() {
        let http = Arc::new(ScriptedHttpClient::replying(
            200,
            r#"{"access_token":"new","expires_in":1800}"#,
        ));
        let manager = OAuthFlowManager::new(test_config(), http.clone());

        let tokens = manager.refresh_access_token("old-refresh").await.unwrap();

        assert_eq!(tokens.access_token, "new");
        assert_eq!(tokens.refresh_token.as_deref(), Some("old-refresh"));
        assert!(http.last_body().contains("grant_type=refresh_token"));
    }

    #[tokio::test]
    async fn test_refresh_rejected() {
        let http = Arc::new(ScriptedHttpClient::replying(401, "revoked"));
        let manager = OAuthFlowManager::new(test_config(), http);

        let err = manager.refresh_access_token("rt").await.unwrap_err();
        assert!(matches!(err, AuthError::TokenRefreshFailed(_)));
    }

    #[test]
    fn test_token_response_deserialization_minimal() {
        let response: TokenResponse = serde_json::from_str(r#"{"access_token": "token"}"#).unwrap();
        assert_eq!(response.access_token, "token");
        assert_eq!(response.refresh_token, None);
        assert_eq!(response.expires_in, 3600);
    }
}
