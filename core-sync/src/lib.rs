//! # Album Sync Engine
//!
//! Links local photo folders to Google Photos albums held in Drive, using
//! files that are already stored remotely. Nothing is uploaded.
//!
//! ## Components
//!
//! - **Content Cache** (`content_cache`): content hash to remote file, refreshed incrementally
//! - **Album Index** (`album_index`): album folders, their contents, and on-demand creation
//! - **Reconciler** (`reconciler`): per-directory hash, skip, link or report
//! - **Sync Coordinator** (`coordinator`): one end-to-end run

pub mod album_index;
pub mod content_cache;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod reconciler;

pub use album_index::{resolve_folder_path, Album, AlbumIndex, AlbumIndexOptions};
pub use content_cache::{
    ordering_policy, ContentCache, DescendingCreation, ExhaustiveScan, OrderingPolicy,
    RefreshOptions,
};
pub use coordinator::{SyncConfig, SyncCoordinator};
pub use core_runtime::config::{CollisionPolicy, RefreshOrdering};
pub use error::{Result, SyncError};
pub use model::{
    CreatedAt, DirectoryReport, FileOutcome, FileReport, LocalFile, RefreshStats,
    RemoteFileMetadata, SyncReport,
};
pub use reconciler::{album_name_for, content_hash, content_hash_stream, Reconciler};
