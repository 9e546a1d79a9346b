//! # Sync Coordinator
//!
//! Runs one sync pass end to end.
//!
//! ## Workflow
//!
//! 1. Load the content cache from disk
//! 2. Refresh it from the remote store (persisted only on success)
//! 3. Discover the albums under the configured container path
//! 4. Reconcile each target directory, in argument order
//! 5. Return a [`SyncReport`] summarising the run
//!
//! Every remote call is awaited before the next one is issued.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{SyncConfig, SyncCoordinator};
//! use std::path::PathBuf;
//!
//! # async fn example(store: Arc<dyn RemoteStore>, fs: Arc<dyn FileSystemAccess>, config: &CoreConfig) -> core_sync::Result<()> {
//! let coordinator = SyncCoordinator::new(store, fs, SyncConfig::from_core(config));
//! let report = coordinator.run(&[PathBuf::from("Holidays 2024")]).await?;
//! println!("linked {} files", report.total_linked());
//! # Ok(())
//! # }
//! ```

use crate::album_index::{AlbumIndex, AlbumIndexOptions, ROOT_FOLDER_ID};
use crate::content_cache::{ordering_policy, ContentCache, RefreshOptions, PHOTOS_SPACE};
use crate::error::Result;
use crate::model::SyncReport;
use crate::reconciler::Reconciler;
use bridge_traits::storage::{FileSystemAccess, RemoteStore};
use core_runtime::config::CoreConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};

/// Sync coordinator configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Location of the content cache file
    pub cache_file: PathBuf,

    pub refresh: RefreshOptions,

    pub albums: AlbumIndexOptions,

    /// Report what would change without creating or linking anything
    pub dry_run: bool,
}

impl SyncConfig {
    /// Defaults for everything but the cache location
    pub fn new(cache_file: impl Into<PathBuf>) -> Self {
        Self {
            cache_file: cache_file.into(),
            refresh: RefreshOptions::default(),
            albums: AlbumIndexOptions::default(),
            dry_run: false,
        }
    }

    pub fn from_core(config: &CoreConfig) -> Self {
        Self {
            cache_file: config.cache_file.clone(),
            refresh: RefreshOptions {
                image_mime_type: config.image_mime_type.clone(),
                page_size: config.page_size,
                space: PHOTOS_SPACE.to_string(),
                collision_policy: config.collision_policy,
                ordering: ordering_policy(config.refresh_ordering),
            },
            albums: AlbumIndexOptions {
                root_id: ROOT_FOLDER_ID.to_string(),
                album_root: config.album_root.clone(),
                image_mime_type: config.image_mime_type.clone(),
                page_size: config.page_size,
                space: PHOTOS_SPACE.to_string(),
                dry_run: config.dry_run,
            },
            dry_run: config.dry_run,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self.albums.dry_run = dry_run;
        self
    }
}

/// Sync coordinator for one run against a remote store
pub struct SyncCoordinator {
    store: Arc<dyn RemoteStore>,
    file_system: Arc<dyn FileSystemAccess>,
    config: SyncConfig,
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        file_system: Arc<dyn FileSystemAccess>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            file_system,
            config,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Refresh the cache, then reconcile `directories` in order
    ///
    /// With no directories only the cache refresh happens.
    ///
    /// # Errors
    ///
    /// Stops at the first fatal error; directories already reconciled keep
    /// their links.
    #[instrument(skip(self), fields(dry_run = self.config.dry_run))]
    pub async fn run(&self, directories: &[PathBuf]) -> Result<SyncReport> {
        let store = self.store.as_ref();

        let mut cache = ContentCache::load(&self.config.cache_file).await?;
        let refresh = cache.refresh(store, &self.config.refresh).await?;

        let mut report = SyncReport {
            refresh,
            cache_entries: cache.len(),
            dry_run: self.config.dry_run,
            ..Default::default()
        };

        if directories.is_empty() {
            info!(entries = cache.len(), "No directories given, cache refreshed");
            return Ok(report);
        }

        let mut albums = AlbumIndex::discover(store, &self.config.albums).await?;
        report.albums_discovered = albums.discovered_count();

        let reconciler = Reconciler::new(store, self.file_system.as_ref(), self.config.dry_run);
        for dir in directories {
            let directory = reconciler
                .reconcile_directory(dir, &cache, &mut albums)
                .await?;
            report.directories.push(directory);
        }
        report.albums_created = albums.created_albums();

        info!(
            directories = report.directories.len(),
            linked = report.total_linked(),
            already_present = report.total_already_present(),
            not_found = report.total_not_found(),
            read_failed = report.total_read_failed(),
            albums_created = report.albums_created.len(),
            "Sync complete"
        );
        Ok(report)
    }
}
