//! Storage Abstractions
//!
//! Contracts for the remote file store, local filesystem access and
//! credential persistence.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// MIME type the remote store uses for folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Ordering applied to a file listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOrder {
    /// Newest files first, by creation time
    CreatedDescending,
}

/// Filter for a remote file listing
///
/// Every populated field is combined with logical AND.
///
/// # Example
///
/// ```
/// use bridge_traits::storage::{FileQuery, FOLDER_MIME_TYPE};
///
/// let query = FileQuery::new()
///     .in_parent("root")
///     .mime_type(FOLDER_MIME_TYPE)
///     .named("Google Photos");
///
/// assert_eq!(query.name.as_deref(), Some("Google Photos"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileQuery {
    /// Only files that have this folder among their parents
    pub parent_id: Option<String>,
    /// Only files of this exact MIME type
    pub mime_type: Option<String>,
    /// Only files with this exact name
    pub name: Option<String>,
    /// Only files whose trashed flag matches
    pub trashed: Option<bool>,
    pub order: Option<QueryOrder>,
    /// Provider-specific corpus to search (e.g. Drive's `photos` space)
    pub space: Option<String>,
}

impl FileQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn not_trashed(mut self) -> Self {
        self.trashed = Some(false);
        self
    }

    pub fn order_by(mut self, order: QueryOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub fn in_space(mut self, space: impl Into<String>) -> Self {
        self.space = Some(space.into());
        self
    }
}

/// File metadata as reported by the remote store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    pub mime_type: Option<String>,
    /// Lowercase hex MD5 of the content; absent for folders and native documents
    pub md5_checksum: Option<String>,
    pub size: Option<u64>,
    /// RFC 3339 creation time, exactly as the store reported it
    pub created_time: Option<String>,
    pub parent_ids: Vec<String>,
}

/// One page of a listing
#[derive(Debug, Clone, Default)]
pub struct FileListPage {
    pub files: Vec<RemoteFile>,
    /// Token for the next page; `None` on the terminal page
    pub next_page_token: Option<String>,
}

/// Remote hierarchical file store
///
/// The three capabilities the sync engine needs. Implementations issue one
/// round-trip per call; paging is driven by the caller.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::{FileQuery, RemoteStore};
///
/// async fn count(store: &dyn RemoteStore, folder: &str) -> Result<usize> {
///     let query = FileQuery::new().in_parent(folder).not_trashed();
///     let mut token = None;
///     let mut total = 0;
///     loop {
///         let page = store.list_files(&query, token.as_deref(), 1000).await?;
///         total += page.files.len();
///         match page.next_page_token {
///             Some(next) => token = Some(next),
///             None => return Ok(total),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// List one page of files matching `query`
    async fn list_files(
        &self,
        query: &FileQuery,
        page_token: Option<&str>,
        page_size: u32,
    ) -> Result<FileListPage>;

    /// Create a folder named `name` under `parent_id`, returning its id
    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<String>;

    /// Add `parent_id` as an additional parent of `file_id`
    ///
    /// The file keeps its existing parents; no content is transferred.
    async fn add_parent(&self, file_id: &str, parent_id: &str) -> Result<()>;
}

/// Entry returned by [`FileSystemAccess::list_directory`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub path: PathBuf,
    pub is_directory: bool,
}

/// Local file system access trait
///
/// The subset of file I/O the reconciler needs, behind a trait so tests can
/// run against an in-memory tree.
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// List immediate entries of a directory, in the order the OS yields them
    async fn list_directory(&self, path: &Path) -> Result<Vec<DirEntry>>;

    /// Read entire file contents into memory
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Open a file for streaming reads
    ///
    /// Lets callers hash large files without buffering them whole.
    async fn open_read_stream(
        &self,
        path: &Path,
    ) -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>>;

    /// Resolve `.`/`..` and symlinks into an absolute path
    async fn canonicalize(&self, path: &Path) -> Result<PathBuf>;
}

/// Credential storage trait
///
/// Holds OAuth tokens between runs. Values are opaque bytes.
///
/// # Security Requirements
///
/// Implementations MUST:
/// - Restrict access to the current user
/// - Never log or expose stored values
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Store a secret value, replacing any previous one
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Retrieve a secret value
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete a secret; succeeds if it is already absent
    async fn delete_secret(&self, key: &str) -> Result<()>;

    /// Check if a secret exists without retrieving it
    async fn has_secret(&self, key: &str) -> Result<bool> {
        Ok(self.get_secret(key).await?.is_some())
    }

    /// List all secret keys (without values)
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Clear all secrets
    async fn clear_all(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder_combines_filters() {
        let query = FileQuery::new()
            .in_parent("folder1")
            .mime_type("image/jpeg")
            .not_trashed()
            .order_by(QueryOrder::CreatedDescending)
            .in_space("photos");

        assert_eq!(query.parent_id.as_deref(), Some("folder1"));
        assert_eq!(query.mime_type.as_deref(), Some("image/jpeg"));
        assert_eq!(query.trashed, Some(false));
        assert_eq!(query.order, Some(QueryOrder::CreatedDescending));
        assert_eq!(query.space.as_deref(), Some("photos"));
        assert_eq!(query.name, None);
    }
}
