//! Secure Token Storage
//!
//! Persists OAuth tokens through the injected `SecureStore` under a single
//! fixed key. Tokens are never logged or included in error messages.

use crate::error::{AuthError, Result};
use crate::types::OAuthTokens;
use bridge_traits::storage::SecureStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Key the Drive tokens live under
pub const TOKEN_KEY: &str = "google_drive.oauth_tokens";

/// Secure storage for OAuth tokens
#[derive(Clone)]
pub struct TokenStore {
    secure_store: Arc<dyn SecureStore>,
}

impl TokenStore {
    pub fn new(secure_store: Arc<dyn SecureStore>) -> Self {
        Self { secure_store }
    }

    /// Store the tokens, replacing any previous set
    pub async fn store_tokens(&self, tokens: &OAuthTokens) -> Result<()> {
        let json = serde_json::to_vec(tokens)
            .map_err(|e| AuthError::Other(format!("Failed to serialize tokens: {}", e)))?;

        self.secure_store
            .set_secret(TOKEN_KEY, &json)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to store tokens in secure storage");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        info!(
            has_refresh_token = tokens.has_refresh_token(),
            "Tokens stored securely"
        );
        Ok(())
    }

    /// Retrieve the stored tokens
    ///
    /// Returns `Ok(None)` when nothing is stored. Unparseable data is
    /// deleted and reported as [`AuthError::TokenCorrupted`] so the next run
    /// starts a fresh grant.
    pub async fn retrieve_tokens(&self) -> Result<Option<OAuthTokens>> {
        let data = self
            .secure_store
            .get_secret(TOKEN_KEY)
            .await
            .map_err(|e| AuthError::SecureStorageUnavailable(e.to_string()))?;

        let Some(data) = data else {
            debug!("No stored tokens");
            return Ok(None);
        };

        match serde_json::from_slice::<OAuthTokens>(&data) {
            Ok(tokens) => {
                debug!(expired = tokens.is_expired(), "Retrieved stored tokens");
                Ok(Some(tokens))
            }
            Err(e) => {
                warn!(error = %e, "Stored tokens are corrupted, deleting");
                if let Err(delete_err) = self.delete_tokens().await {
                    warn!(error = %delete_err, "Failed to delete corrupted tokens");
                }
                Err(AuthError::TokenCorrupted(e.to_string()))
            }
        }
    }

    pub async fn delete_tokens(&self) -> Result<()> {
        self.secure_store
            .delete_secret(TOKEN_KEY)
            .await
            .map_err(|e| AuthError::SecureStorageUnavailable(e.to_string()))?;
        info!("Tokens deleted");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    /// In-memory secure store shared with the manager tests
    #[derive(Default)]
    pub(crate) struct MemorySecureStore {
        pub(crate) data: Mutex<HashMap<String, Vec<u8>>>,
        pub(crate) fail: bool,
    }

    #[async_trait]
    impl SecureStore for MemorySecureStore {
        async fn set_secret(&self, key: &str, value: &[u8]) -> BridgeResult<()> {
            if self.fail {
                return Err(BridgeError::NotAvailable("store offline".to_string()));
            }
            self.data
                .lock()
                .await
                .insert(key.to_string(), value.to_vec());
            Ok(())
        }

        async fn get_secret(&self, key: &str) -> BridgeResult<Option<Vec<u8>>> {
            if self.fail {
                return Err(BridgeError::NotAvailable("store offline".to_string()));
            }
            Ok(self.data.lock().await.get(key).cloned())
        }

        async fn delete_secret(&self, key: &str) -> BridgeResult<()> {
            self.data.lock().await.remove(key);
            Ok(())
        }

        async fn list_keys(&self) -> BridgeResult<Vec<String>> {
            Ok(self.data.lock().await.keys().cloned().collect())
        }

        async fn clear_all(&self) -> BridgeResult<()> {
            self.data.lock().await.clear();
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_store_and_retrieve() {
        let store = TokenStore::new(Arc::new(MemorySecureStore::default()));
        let tokens = OAuthTokens::new("at".to_string(), Some("rt".to_string()), 3600);

        assert!(store.retrieve_tokens().await.unwrap().is_none());
        store.store_tokens(&tokens).await.unwrap();

        assert_eq!(store.retrieve_tokens().await.unwrap(), Some(tokens));
    }

    #[tokio::test]
    async fn test_delete_tokens() {
        let store = TokenStore::new(Arc::new(MemorySecureStore::default()));
        store
            .store_tokens(&OAuthTokens::new("at".to_string(), None, 60))
            .await
            .unwrap();

        store.delete_tokens().await.unwrap();
        assert!(store.retrieve_tokens().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupted_tokens_are_removed() {
        let secure = Arc::new(MemorySecureStore::default());
        secure
            .data
            .lock()
            .await
            .insert(TOKEN_KEY.to_string(), b"garbage".to_vec());
        let store = TokenStore::new(secure.clone());

        let err = store.retrieve_tokens().await.unwrap_err();
        assert!(matches!(err, AuthError::TokenCorrupted(_)));
        assert!(secure.data.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_store() {
        let store = TokenStore::new(Arc::new(MemorySecureStore {
            fail: true,
            ..Default::default()
        }));

        let err = store
            .store_tokens(&OAuthTokens::new("at".to_string(), None, 60))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::SecureStorageUnavailable(_)));
    }
}
