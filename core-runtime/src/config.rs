//! # Core Configuration Module
//!
//! Provides configuration management for album-sync.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the file locations, the sync tunables and the host
//! bridges the engine runs against. It enforces fail-fast validation so a
//! bad page size or a missing bridge is reported before any remote call.
//!
//! ## Bridges
//!
//! - `HttpClient` - Drive and OAuth requests (desktop default: reqwest)
//! - `FileSystemAccess` - Local directory walks (desktop default: tokio fs)
//! - `SecureStore` - OAuth token persistence (desktop default: JSON file
//!   at the credentials path)
//!
//! When the `desktop-shims` feature is enabled, the desktop defaults are
//! injected automatically if not provided. Without it, a missing bridge is
//! an [`Error::CapabilityMissing`].
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .cache_file("/home/me/.cache/album-sync/files.json")
//!     .page_size(500)
//!     .dry_run(true)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{FileSystemAccess, HttpClient, SecureStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Largest page size the Drive files endpoint accepts
pub const MAX_PAGE_SIZE: u32 = 1000;

/// MIME type the cache and album reads are restricted to
pub const DEFAULT_IMAGE_MIME_TYPE: &str = "image/jpeg";

/// File name of the content cache inside the cache directory
pub const CACHE_FILE_NAME: &str = "files.json";

/// Default client secret location, relative to the working directory
pub const DEFAULT_CLIENT_SECRET_FILE: &str = "client_secret.json";

/// Folder path from the store root down to the albums container
pub fn default_album_root() -> Vec<String> {
    vec!["Google Photos".to_string(), "Albums".to_string()]
}

/// How the cache refresh walks the remote listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshOrdering {
    /// Newest first; stop at the first file older than the watermark
    #[default]
    DescendingCreation,
    /// Read every page regardless of the watermark
    Exhaustive,
}

/// Which file the cache keeps when two remote files share a content hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    /// Older `createdTime` wins, ties broken by the smaller id
    #[default]
    KeepEarliest,
    /// Last observed file wins
    Overwrite,
}

/// Core configuration for album-sync.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Location of the persisted content cache
    pub cache_file: PathBuf,

    /// Location of the OAuth client secret downloaded from the console
    pub client_secret_file: PathBuf,

    /// Folder names from the store root to the albums container
    pub album_root: Vec<String>,

    /// Page size for every list call
    pub page_size: u32,

    /// MIME type of the files that are cached and linked
    pub image_mime_type: String,

    pub refresh_ordering: RefreshOrdering,

    pub collision_policy: CollisionPolicy,

    /// Evaluate everything but issue no remote mutations
    pub dry_run: bool,

    pub http_client: Arc<dyn HttpClient>,

    pub file_system: Arc<dyn FileSystemAccess>,

    pub secure_store: Arc<dyn SecureStore>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("cache_file", &self.cache_file)
            .field("client_secret_file", &self.client_secret_file)
            .field("album_root", &self.album_root)
            .field("page_size", &self.page_size)
            .field("image_mime_type", &self.image_mime_type)
            .field("refresh_ordering", &self.refresh_ordering)
            .field("collision_policy", &self.collision_policy)
            .field("dry_run", &self.dry_run)
            .field("http_client", &"HttpClient { ... }")
            .field("file_system", &"FileSystemAccess { ... }")
            .field("secure_store", &"SecureStore { ... }")
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Paths are not empty
    /// - Page size is within 1..=1000
    /// - The album root has at least one non-empty segment
    /// - The MIME type is set
    pub fn validate(&self) -> Result<()> {
        if self.cache_file.as_os_str().is_empty() {
            return Err(Error::Config("Cache file path cannot be empty".to_string()));
        }

        if self.client_secret_file.as_os_str().is_empty() {
            return Err(Error::Config(
                "Client secret path cannot be empty".to_string(),
            ));
        }

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::Config(format!(
                "Page size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.page_size
            )));
        }

        if self.album_root.is_empty() {
            return Err(Error::Config("Album root path cannot be empty".to_string()));
        }

        if self.album_root.iter().any(|segment| segment.trim().is_empty()) {
            return Err(Error::Config(
                "Album root path segments cannot be blank".to_string(),
            ));
        }

        if self.image_mime_type.trim().is_empty() {
            return Err(Error::Config("Image MIME type cannot be empty".to_string()));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn capability_missing(capability: &str, purpose: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: format!(
            "{} implementation is required for {}. \
             Enable the 'desktop-shims' feature to use the desktop default, \
             or inject one through the builder.",
            capability, purpose
        ),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    let client = bridge_desktop::ReqwestHttpClient::new()
        .map_err(|e| Error::Internal(format!("Failed to create default HttpClient: {}", e)))?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(capability_missing("HttpClient", "Drive and OAuth requests"))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Ok(Arc::new(bridge_desktop::TokioFileSystem::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Err(capability_missing("FileSystemAccess", "reading local directories"))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_secure_store(credentials_file: Option<&Path>) -> Result<Arc<dyn SecureStore>> {
    use bridge_desktop::JsonFileSecureStore;

    let path = match credentials_file {
        Some(path) => path.to_path_buf(),
        None => JsonFileSecureStore::default_path().map_err(|e| {
            Error::Config(format!("Cannot locate default credentials file: {}", e))
        })?,
    };
    Ok(Arc::new(JsonFileSecureStore::new(path)))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_secure_store(_credentials_file: Option<&Path>) -> Result<Arc<dyn SecureStore>> {
    Err(capability_missing("SecureStore", "credential persistence"))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_cache_file() -> Result<PathBuf> {
    bridge_desktop::default_cache_dir()
        .map(|dir| dir.join(CACHE_FILE_NAME))
        .ok_or_else(|| {
            Error::Config(
                "No cache directory available on this platform. Use .cache_file() to set it."
                    .to_string(),
            )
        })
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_cache_file() -> Result<PathBuf> {
    Err(Error::Config(
        "Cache file is required. Use .cache_file() to set it.".to_string(),
    ))
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Call [`build()`](CoreConfigBuilder::build) to validate and create the
/// final config.
#[derive(Default)]
pub struct CoreConfigBuilder {
    cache_file: Option<PathBuf>,
    credentials_file: Option<PathBuf>,
    client_secret_file: Option<PathBuf>,
    album_root: Option<Vec<String>>,
    page_size: Option<u32>,
    image_mime_type: Option<String>,
    refresh_ordering: RefreshOrdering,
    collision_policy: CollisionPolicy,
    dry_run: bool,
    http_client: Option<Arc<dyn HttpClient>>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    secure_store: Option<Arc<dyn SecureStore>>,
}

impl CoreConfigBuilder {
    /// Sets the content cache location.
    pub fn cache_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_file = Some(path.into());
        self
    }

    /// Sets the credentials file backing the default secure store.
    ///
    /// Ignored when a secure store is injected.
    pub fn credentials_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.credentials_file = Some(path.into());
        self
    }

    pub fn client_secret_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.client_secret_file = Some(path.into());
        self
    }

    /// Sets the folder path to the albums container.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder().album_root(["Google Photos", "Albums"]);
    /// ```
    pub fn album_root<I, S>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.album_root = Some(segments.into_iter().map(Into::into).collect());
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn image_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.image_mime_type = Some(mime_type.into());
        self
    }

    pub fn refresh_ordering(mut self, ordering: RefreshOrdering) -> Self {
        self.refresh_ordering = ordering;
        self
    }

    pub fn collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    /// Builds the configuration, filling desktop defaults where allowed.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] when a value is out of range or a required path
    ///   cannot be determined
    /// - [`Error::CapabilityMissing`] when a bridge is missing and no
    ///   desktop default is compiled in
    pub fn build(self) -> Result<CoreConfig> {
        let cache_file = match self.cache_file {
            Some(path) => path,
            None => provide_default_cache_file()?,
        };

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system()?,
        };

        let secure_store = match self.secure_store {
            Some(store) => store,
            None => provide_default_secure_store(self.credentials_file.as_deref())?,
        };

        let config = CoreConfig {
            cache_file,
            client_secret_file: self
                .client_secret_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CLIENT_SECRET_FILE)),
            album_root: self.album_root.unwrap_or_else(default_album_root),
            page_size: self.page_size.unwrap_or(MAX_PAGE_SIZE),
            image_mime_type: self
                .image_mime_type
                .unwrap_or_else(|| DEFAULT_IMAGE_MIME_TYPE.to_string()),
            refresh_ordering: self.refresh_ordering,
            collision_policy: self.collision_policy,
            dry_run: self.dry_run,
            http_client,
            file_system,
            secure_store,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::{HttpRequest, HttpResponse};
    use bridge_traits::storage::DirEntry;
    use bytes::Bytes;

    struct MockSecureStore;

    #[async_trait]
    impl SecureStore for MockSecureStore {
        async fn set_secret(&self, _key: &str, _value: &[u8]) -> BridgeResult<()> {
            Ok(())
        }

        async fn get_secret(&self, _key: &str) -> BridgeResult<Option<Vec<u8>>> {
            Ok(None)
        }

        async fn delete_secret(&self, _key: &str) -> BridgeResult<()> {
            Ok(())
        }

        async fn list_keys(&self) -> BridgeResult<Vec<String>> {
            Ok(Vec::new())
        }

        async fn clear_all(&self) -> BridgeResult<()> {
            Ok(())
        }
    }

    struct MockHttpClient;

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Ok(HttpResponse {
                status: 200,
                headers: Default::default(),
                body: Bytes::new(),
            })
        }
    }

    struct MockFileSystem;

    #[async_trait]
    impl FileSystemAccess for MockFileSystem {
        async fn list_directory(&self, _path: &Path) -> BridgeResult<Vec<DirEntry>> {
            Ok(Vec::new())
        }

        async fn read_file(&self, _path: &Path) -> BridgeResult<Bytes> {
            Ok(Bytes::new())
        }

        async fn open_read_stream(
            &self,
            _path: &Path,
        ) -> BridgeResult<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
            Ok(Box::new(tokio::io::empty()))
        }

        async fn canonicalize(&self, path: &Path) -> BridgeResult<PathBuf> {
            Ok(path.to_path_buf())
        }
    }

    fn mocked_builder() -> CoreConfigBuilder {
        CoreConfig::builder()
            .cache_file("/cache/album-sync/files.json")
            .http_client(Arc::new(MockHttpClient))
            .file_system(Arc::new(MockFileSystem))
            .secure_store(Arc::new(MockSecureStore))
    }

    #[test]
    fn test_build_with_injected_bridges_uses_defaults() {
        let config = mocked_builder().build().unwrap();

        assert_eq!(config.page_size, MAX_PAGE_SIZE);
        assert_eq!(config.image_mime_type, "image/jpeg");
        assert_eq!(config.album_root, vec!["Google Photos", "Albums"]);
        assert_eq!(config.client_secret_file, PathBuf::from("client_secret.json"));
        assert_eq!(config.refresh_ordering, RefreshOrdering::DescendingCreation);
        assert_eq!(config.collision_policy, CollisionPolicy::KeepEarliest);
        assert!(!config.dry_run);
    }

    #[test]
    fn test_builder_overrides() {
        let config = mocked_builder()
            .page_size(50)
            .album_root(["Photos"])
            .refresh_ordering(RefreshOrdering::Exhaustive)
            .collision_policy(CollisionPolicy::Overwrite)
            .dry_run(true)
            .build()
            .unwrap();

        assert_eq!(config.page_size, 50);
        assert_eq!(config.album_root, vec!["Photos"]);
        assert_eq!(config.refresh_ordering, RefreshOrdering::Exhaustive);
        assert_eq!(config.collision_policy, CollisionPolicy::Overwrite);
        assert!(config.dry_run);
    }

    #[test]
    fn test_page_size_bounds() {
        let err = mocked_builder().page_size(0).build().unwrap_err();
        assert!(err.to_string().contains("Page size"));

        let err = mocked_builder().page_size(1001).build().unwrap_err();
        assert!(err.to_string().contains("1001"));

        assert!(mocked_builder().page_size(1).build().is_ok());
        assert!(mocked_builder().page_size(1000).build().is_ok());
    }

    #[test]
    fn test_album_root_must_not_be_empty() {
        let err = mocked_builder()
            .album_root(Vec::<String>::new())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Album root"));

        let err = mocked_builder()
            .album_root(["Google Photos", " "])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("blank"));
    }

    #[test]
    fn test_empty_cache_file_rejected() {
        let err = mocked_builder().cache_file("").build().unwrap_err();
        assert!(err.to_string().contains("Cache file"));
    }

    #[test]
    fn test_debug_hides_bridges() {
        let config = mocked_builder().build().unwrap();
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("HttpClient { ... }"));
        assert!(rendered.contains("files.json"));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_missing_secure_store_is_capability_error() {
        let result = CoreConfig::builder()
            .cache_file("/cache/files.json")
            .http_client(Arc::new(MockHttpClient))
            .file_system(Arc::new(MockFileSystem))
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, message }) => {
                assert_eq!(capability, "SecureStore");
                assert!(message.contains("credential persistence"));
            }
            other => panic!("expected CapabilityMissing, got {:?}", other),
        }
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_missing_cache_file_without_shims() {
        let err = CoreConfig::builder()
            .http_client(Arc::new(MockHttpClient))
            .file_system(Arc::new(MockFileSystem))
            .secure_store(Arc::new(MockSecureStore))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Cache file is required"));
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_build_with_desktop_defaults() {
        let dir = std::env::temp_dir().join("album-sync-config-test");
        let config = CoreConfig::builder()
            .cache_file(dir.join("files.json"))
            .credentials_file(dir.join("credentials.json"))
            .build()
            .expect("desktop defaults should succeed");

        assert_eq!(config.cache_file, dir.join("files.json"));
    }
}
