//! # Authentication Module
//!
//! OAuth 2.0 session provider for the Drive API.
//!
//! ## Overview
//!
//! This crate turns a downloaded `client_secret.json` into a bearer token the
//! Drive connector can use. Tokens are cached through a `SecureStore`, are
//! refreshed when they are about to expire, and are obtained interactively
//! the first time through an [`AuthorizationPrompt`].
//!
//! ## Features
//!
//! - OAuth 2.0 authorization code flow with PKCE
//! - Automatic token refresh before expiration
//! - Token persistence via the injected secure store
//! - Console prompt for the one-time consent step

pub mod client_secret;
pub mod error;
pub mod manager;
pub mod oauth;
pub mod token_store;
pub mod types;

pub use client_secret::ClientSecret;
pub use error::{AuthError, Result};
pub use manager::{AuthManager, AuthorizationCode, AuthorizationPrompt, StdioPrompt};
pub use oauth::{OAuthConfig, OAuthFlowManager, PkceVerifier};
pub use token_store::TokenStore;
pub use types::OAuthTokens;
