//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `FileSystemAccess` using `tokio::fs`
//! - `SecureStore` backed by a user-only JSON file
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{JsonFileSecureStore, ReqwestHttpClient, TokioFileSystem};
//!
//! let http_client = ReqwestHttpClient::new()?;
//! let fs = TokioFileSystem::new();
//! let secure_store = JsonFileSecureStore::new(JsonFileSecureStore::default_path()?);
//! ```

mod filesystem;
mod http;
mod secure_store;

pub use filesystem::TokioFileSystem;
pub use http::ReqwestHttpClient;
pub use secure_store::JsonFileSecureStore;

use std::path::PathBuf;

/// Application directory name used under the per-user cache directory
pub const APP_DIR_NAME: &str = "album-sync";

/// Per-user cache directory for this application
///
/// Falls back to `~/.cache` when the platform has no cache directory.
pub fn default_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".cache")))
        .map(|dir| dir.join(APP_DIR_NAME))
}
