//! Sync Data Model
//!
//! Cached remote metadata, per-file outcomes and run reports.

use bridge_traits::storage::RemoteFile;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Creation timestamp as reported by the remote store
///
/// Drive emits RFC 3339 in UTC with a fixed-width fraction
/// (`2024-01-01T00:00:00.000Z`), so ordering the raw strings orders the
/// instants. Nothing is parsed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreatedAt(String);

impl CreatedAt {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CreatedAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata of one remote image, keyed by content hash in the cache
///
/// The serialized field names are those of the `files.json` cache format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFileMetadata {
    #[serde(rename = "Name")]
    pub name: String,
    pub id: String,
    #[serde(rename = "size", with = "decimal_string", default)]
    pub size_bytes: u64,
    /// Lowercase hex MD5
    #[serde(rename = "md5Checksum")]
    pub content_hash: String,
    #[serde(rename = "createdTime")]
    pub created_at: CreatedAt,
}

impl RemoteFileMetadata {
    /// Convert a listed file, or `None` when the store reported no hash
    pub fn from_remote(file: &RemoteFile) -> Option<Self> {
        let content_hash = file.md5_checksum.as_deref().filter(|h| !h.is_empty())?;
        Some(Self {
            name: file.name.clone(),
            id: file.id.clone(),
            size_bytes: file.size.unwrap_or(0),
            content_hash: content_hash.to_ascii_lowercase(),
            created_at: CreatedAt::new(file.created_time.clone().unwrap_or_default()),
        })
    }
}

/// `size` is a JSON string holding a decimal integer
mod decimal_string {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

/// A regular file found in a target directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub path: PathBuf,
    pub content_hash: String,
}

/// What happened to one local file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// The album already holds a file with this hash
    AlreadyPresent,
    /// The cached remote file was added to the album
    Linked { file_id: String },
    /// No remote file with this hash is known
    NotFound,
    ReadFailed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    /// Absent when the file could not be read
    pub content_hash: Option<String>,
    pub outcome: FileOutcome,
}

/// Result of reconciling one directory against its album
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryReport {
    pub directory: PathBuf,
    pub album_name: String,
    /// Empty when the album would have been created in a dry run
    pub album_id: String,
    pub album_created: bool,
    pub files: Vec<FileReport>,
    pub skipped_directories: usize,
}

impl DirectoryReport {
    fn count(&self, matches: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|f| matches(&f.outcome)).count()
    }

    pub fn already_present(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::AlreadyPresent))
    }

    pub fn linked(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Linked { .. }))
    }

    pub fn not_found(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::NotFound))
    }

    pub fn read_failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::ReadFailed { .. }))
    }
}

/// Counters from one cache refresh
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshStats {
    pub pages_fetched: usize,
    pub files_seen: usize,
    /// Entries merged into the cache
    pub files_added: usize,
    /// Files the store listed without a content hash
    pub files_unhashed: usize,
    /// Set when the scan stopped at a file older than the watermark
    pub stopped_early: bool,
    /// The store listed nothing, so the cache was left untouched
    pub skipped: bool,
}

/// Summary of a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub refresh: RefreshStats,
    pub cache_entries: usize,
    pub albums_discovered: usize,
    pub albums_created: Vec<String>,
    pub directories: Vec<DirectoryReport>,
    pub dry_run: bool,
}

impl SyncReport {
    pub fn total_linked(&self) -> usize {
        self.directories.iter().map(DirectoryReport::linked).sum()
    }

    pub fn total_not_found(&self) -> usize {
        self.directories.iter().map(DirectoryReport::not_found).sum()
    }

    pub fn total_already_present(&self) -> usize {
        self.directories
            .iter()
            .map(DirectoryReport::already_present)
            .sum()
    }

    pub fn total_read_failed(&self) -> usize {
        self.directories.iter().map(DirectoryReport::read_failed).sum()
    }
}
