//! # Reconciler
//!
//! Links the files of one local directory into the album named after it.
//!
//! Each regular file is hashed and then, in order:
//! - skipped if the album already holds that hash;
//! - linked if the cache knows a remote file with that hash;
//! - reported as not found otherwise.
//!
//! Nothing is ever uploaded. Subdirectories are not descended into.

use crate::album_index::AlbumIndex;
use crate::content_cache::ContentCache;
use crate::error::{Result, SyncError};
use crate::model::{DirectoryReport, FileOutcome, FileReport, LocalFile};
use bridge_traits::storage::{FileSystemAccess, RemoteStore};
use md5::{Digest, Md5};
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, instrument, warn};

const HASH_CHUNK_SIZE: usize = 8 * 1024;

/// Lowercase hex MD5, the same digest Drive reports as `md5Checksum`
pub fn content_hash(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// [`content_hash`] of everything `reader` yields, read 8 KiB at a time
pub async fn content_hash_stream<R>(reader: &mut R) -> std::io::Result<String>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut hasher = Md5::new();
    let mut buf = [0u8; HASH_CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Album name for a directory: its base name
///
/// `canonical` is only consulted when `dir` itself has no usable base name
/// (e.g. `.`).
pub fn album_name_for(dir: &Path, canonical: &Path) -> Result<String> {
    dir.file_name()
        .or_else(|| canonical.file_name())
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| SyncError::InvalidDirectory(dir.to_path_buf()))
}

pub struct Reconciler<'a> {
    store: &'a dyn RemoteStore,
    file_system: &'a dyn FileSystemAccess,
    dry_run: bool,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        store: &'a dyn RemoteStore,
        file_system: &'a dyn FileSystemAccess,
        dry_run: bool,
    ) -> Self {
        Self {
            store,
            file_system,
            dry_run,
        }
    }

    /// Reconcile `dir` against its album
    ///
    /// # Errors
    ///
    /// Fails when the directory cannot be resolved or listed, or on any
    /// remote store error. Unreadable files are recorded in the report
    /// instead.
    #[instrument(skip(self, cache, albums), fields(dry_run = self.dry_run))]
    pub async fn reconcile_directory(
        &self,
        dir: &Path,
        cache: &ContentCache,
        albums: &mut AlbumIndex,
    ) -> Result<DirectoryReport> {
        let canonical = self
            .file_system
            .canonicalize(dir)
            .await
            .map_err(|e| SyncError::io(dir, e))?;
        let album_name = album_name_for(dir, &canonical)?;
        info!(album = %album_name, "Processing directory");

        let album = albums.get(self.store, &album_name).await?;

        let entries = self
            .file_system
            .list_directory(&canonical)
            .await
            .map_err(|e| SyncError::io(&canonical, e))?;

        let mut report = DirectoryReport {
            directory: dir.to_path_buf(),
            album_name,
            album_id: album.id.clone(),
            album_created: album.was_created(),
            ..Default::default()
        };

        for entry in entries {
            if entry.is_directory {
                report.skipped_directories += 1;
                continue;
            }

            let path = dir.join(entry.path.file_name().unwrap_or(entry.path.as_os_str()));
            let hashed = match self.file_system.open_read_stream(&entry.path).await {
                Ok(mut stream) => content_hash_stream(&mut stream)
                    .await
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            let file = match hashed {
                Ok(content_hash) => LocalFile { content_hash, path },
                Err(reason) => {
                    let err = SyncError::LocalRead {
                        path: path.clone(),
                        reason: reason.clone(),
                    };
                    warn!(error = %err, "Skipping unreadable file");
                    report.files.push(FileReport {
                        path,
                        content_hash: None,
                        outcome: FileOutcome::ReadFailed { reason },
                    });
                    continue;
                }
            };

            let outcome = if album.contains(&file.content_hash) {
                debug!(path = %file.path.display(), "Already in album");
                FileOutcome::AlreadyPresent
            } else if let Some(remote) = cache.lookup(&file.content_hash) {
                if self.dry_run {
                    info!(path = %file.path.display(), file_id = %remote.id, "Would link");
                } else {
                    self.store.add_parent(&remote.id, &album.id).await?;
                    info!(
                        path = %file.path.display(),
                        file_id = %remote.id,
                        album_id = %album.id,
                        "Linked"
                    );
                }
                album.insert(file.content_hash.as_str(), remote.id.as_str());
                FileOutcome::Linked {
                    file_id: remote.id.clone(),
                }
            } else {
                debug!(path = %file.path.display(), hash = %file.content_hash, "Not found");
                FileOutcome::NotFound
            };

            report.files.push(FileReport {
                path: file.path,
                content_hash: Some(file.content_hash),
                outcome,
            });
        }

        info!(
            album = %report.album_name,
            linked = report.linked(),
            already_present = report.already_present(),
            not_found = report.not_found(),
            read_failed = report.read_failed(),
            "Directory done"
        );
        Ok(report)
    }
}
