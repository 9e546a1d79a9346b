use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Client secret is invalid: {0}")]
    ClientSecretInvalid(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    #[error("Authorization code rejected: {0}")]
    InvalidAuthCode(String),

    #[error("OAuth state mismatch: expected {expected}, got {actual}")]
    StateMismatch { expected: String, actual: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Secure storage unavailable: {0}")]
    SecureStorageUnavailable(String),

    #[error("Stored tokens are corrupted: {0}")]
    TokenCorrupted(String),

    #[error("Authorization prompt failed: {0}")]
    Prompt(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;
