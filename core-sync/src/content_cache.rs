//! # Content Cache
//!
//! Persistent map from content hash to remote image metadata.
//!
//! The cache is refreshed incrementally: the listing is requested newest
//! first and the scan stops at the first file created before the
//! watermark, the newest creation time already cached. That is only
//! complete if files are added to the store in roughly increasing creation
//! order. The assumption lives in [`OrderingPolicy`] so it can be swapped
//! for [`ExhaustiveScan`] when it does not hold.
//!
//! The watermark is not stored on disk; [`ContentCache::load`] derives it
//! from the entries.

use crate::error::{Result, SyncError};
use crate::model::{CreatedAt, RefreshStats, RemoteFileMetadata};
use bridge_traits::storage::{FileQuery, QueryOrder, RemoteStore};
use core_runtime::config::{
    CollisionPolicy, RefreshOrdering, DEFAULT_IMAGE_MIME_TYPE, MAX_PAGE_SIZE,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Drive corpus holding Google Photos content
pub const PHOTOS_SPACE: &str = "photos";

/// Decides when a newest-first scan may stop
pub trait OrderingPolicy: Send + Sync {
    /// Whether the scan stops at a file created at `created_at`, given the
    /// watermark from before this refresh
    fn should_stop(&self, created_at: &CreatedAt, watermark: &CreatedAt) -> bool;

    fn name(&self) -> &'static str;
}

/// Stop at the first file strictly older than the watermark
///
/// Files created exactly at the watermark are still recorded.
#[derive(Debug, Clone, Copy, Default)]
pub struct DescendingCreation;

impl OrderingPolicy for DescendingCreation {
    fn should_stop(&self, created_at: &CreatedAt, watermark: &CreatedAt) -> bool {
        created_at < watermark
    }

    fn name(&self) -> &'static str {
        "descending-creation"
    }
}

/// Never stop early; every page is read
#[derive(Debug, Clone, Copy, Default)]
pub struct ExhaustiveScan;

impl OrderingPolicy for ExhaustiveScan {
    fn should_stop(&self, _created_at: &CreatedAt, _watermark: &CreatedAt) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "exhaustive"
    }
}

/// Policy implementing a configured ordering
pub fn ordering_policy(ordering: RefreshOrdering) -> Arc<dyn OrderingPolicy> {
    match ordering {
        RefreshOrdering::DescendingCreation => Arc::new(DescendingCreation),
        RefreshOrdering::Exhaustive => Arc::new(ExhaustiveScan),
    }
}

/// Parameters of a refresh
#[derive(Clone)]
pub struct RefreshOptions {
    pub image_mime_type: String,
    pub page_size: u32,
    pub space: String,
    pub collision_policy: CollisionPolicy,
    pub ordering: Arc<dyn OrderingPolicy>,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            image_mime_type: DEFAULT_IMAGE_MIME_TYPE.to_string(),
            page_size: MAX_PAGE_SIZE,
            space: PHOTOS_SPACE.to_string(),
            collision_policy: CollisionPolicy::default(),
            ordering: Arc::new(DescendingCreation),
        }
    }
}

impl std::fmt::Debug for RefreshOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshOptions")
            .field("image_mime_type", &self.image_mime_type)
            .field("page_size", &self.page_size)
            .field("space", &self.space)
            .field("collision_policy", &self.collision_policy)
            .field("ordering", &self.ordering.name())
            .finish()
    }
}

/// Content-hash index of the remote image library
#[derive(Debug, Clone)]
pub struct ContentCache {
    path: PathBuf,
    entries: BTreeMap<String, RemoteFileMetadata>,
    watermark: Option<CreatedAt>,
}

impl ContentCache {
    /// Empty cache that will persist to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
            watermark: None,
        }
    }

    /// Load the cache file, or start empty if it does not exist
    ///
    /// # Errors
    ///
    /// [`SyncError::CacheCorrupt`] when the file is not a valid cache, and
    /// [`SyncError::Io`] when it exists but cannot be read.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No cache file yet, starting empty");
                return Ok(Self::new(path));
            }
            Err(e) => return Err(SyncError::io(path, e)),
        };

        let entries: BTreeMap<String, RemoteFileMetadata> = serde_json::from_slice(&data)
            .map_err(|e| SyncError::CacheCorrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let watermark = entries.values().map(|m| &m.created_at).max().cloned();
        info!(
            entries = entries.len(),
            watermark = watermark.as_ref().map(CreatedAt::as_str).unwrap_or("none"),
            "Loaded content cache"
        );

        Ok(Self {
            path: path.to_path_buf(),
            entries,
            watermark,
        })
    }

    /// Write the entries to `path`, replacing the previous file atomically
    pub async fn save(&self, path: &Path) -> Result<()> {
        write_entries(path, &self.entries).await
    }

    /// Bring the cache up to date with the store and persist it
    ///
    /// Nothing changes, in memory or on disk, unless the whole scan
    /// succeeds.
    #[instrument(skip(self, store), fields(ordering = options.ordering.name()))]
    pub async fn refresh(
        &mut self,
        store: &dyn RemoteStore,
        options: &RefreshOptions,
    ) -> Result<RefreshStats> {
        let query = FileQuery::new()
            .mime_type(options.image_mime_type.as_str())
            .not_trashed()
            .order_by(QueryOrder::CreatedDescending)
            .in_space(options.space.as_str());

        let mut stats = RefreshStats::default();
        let mut staged: BTreeMap<String, RemoteFileMetadata> = BTreeMap::new();
        let mut newest: Option<CreatedAt> = None;
        let mut page_token: Option<String> = None;

        'pages: loop {
            let page = store
                .list_files(&query, page_token.as_deref(), options.page_size)
                .await?;
            stats.pages_fetched += 1;

            for file in &page.files {
                let created_at = CreatedAt::new(file.created_time.clone().unwrap_or_default());
                if newest.is_none() {
                    newest = Some(created_at.clone());
                }

                if let Some(watermark) = &self.watermark {
                    if options.ordering.should_stop(&created_at, watermark) {
                        debug!(
                            created_at = %created_at,
                            watermark = %watermark,
                            "Reached files older than the watermark"
                        );
                        stats.stopped_early = true;
                        break 'pages;
                    }
                }

                stats.files_seen += 1;
                match RemoteFileMetadata::from_remote(file) {
                    Some(meta) => {
                        debug!(
                            index = stats.files_seen,
                            created_at = %meta.created_at,
                            id = %meta.id,
                            hash = %meta.content_hash,
                            name = %meta.name,
                            "Recording remote file"
                        );
                        admit(&mut staged, meta, options.collision_policy);
                    }
                    None => {
                        debug!(
                            id = %file.id,
                            name = %file.name,
                            "Skipping file without content hash"
                        );
                        stats.files_unhashed += 1;
                    }
                }
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        let Some(newest) = newest else {
            info!("Store listed no files, leaving the cache untouched");
            stats.skipped = true;
            return Ok(stats);
        };

        let mut merged = self.entries.clone();
        for meta in staged.into_values() {
            let hash = meta.content_hash.clone();
            if admit(&mut merged, meta, options.collision_policy)
                && !self.entries.contains_key(&hash)
            {
                stats.files_added += 1;
            }
        }

        write_entries(&self.path, &merged).await?;

        self.entries = merged;
        self.watermark = match self.watermark.take() {
            Some(previous) if previous > newest => Some(previous),
            _ => Some(newest),
        };

        info!(
            pages = stats.pages_fetched,
            seen = stats.files_seen,
            added = stats.files_added,
            unhashed = stats.files_unhashed,
            stopped_early = stats.stopped_early,
            entries = self.entries.len(),
            "Cache refreshed"
        );
        Ok(stats)
    }

    pub fn lookup(&self, content_hash: &str) -> Option<&RemoteFileMetadata> {
        self.entries.get(content_hash)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Newest creation time known to be cached
    pub fn watermark(&self) -> Option<&CreatedAt> {
        self.watermark.as_ref()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Insert `meta` under its hash, resolving a clash with a different file
///
/// Returns whether the map changed.
fn admit(
    entries: &mut BTreeMap<String, RemoteFileMetadata>,
    meta: RemoteFileMetadata,
    policy: CollisionPolicy,
) -> bool {
    let Some(existing) = entries.get(&meta.content_hash) else {
        entries.insert(meta.content_hash.clone(), meta);
        return true;
    };

    if *existing == meta {
        return false;
    }

    let replace = match policy {
        CollisionPolicy::Overwrite => true,
        _ if existing.id == meta.id => true,
        CollisionPolicy::KeepEarliest => {
            (&meta.created_at, &meta.id) < (&existing.created_at, &existing.id)
        }
    };

    if existing.id != meta.id {
        warn!(
            hash = %meta.content_hash,
            kept = if replace { meta.id.as_str() } else { existing.id.as_str() },
            dropped = if replace { existing.id.as_str() } else { meta.id.as_str() },
            "Two remote files share a content hash"
        );
    }

    if replace {
        entries.insert(meta.content_hash.clone(), meta);
    }
    replace
}

async fn write_entries(path: &Path, entries: &BTreeMap<String, RemoteFileMetadata>) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            create_private_dir(parent)
                .await
                .map_err(|e| SyncError::io(parent, e))?;
        }
    }

    let data = serde_json::to_vec(entries).map_err(|e| SyncError::io(path, e))?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, &data)
        .await
        .map_err(|e| SyncError::io(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| SyncError::io(path, e))?;

    debug!(path = %path.display(), entries = entries.len(), "Cache saved");
    Ok(())
}

#[cfg(unix)]
async fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    tokio::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(dir)
        .await
}

#[cfg(not(unix))]
async fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await
}
