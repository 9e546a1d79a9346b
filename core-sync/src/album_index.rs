//! # Album Index
//!
//! Albums are the folders directly under `Google Photos/Albums` in Drive.
//! The index lists them once per run and loads an album's contents (a map
//! from content hash to file id) the first time the album is needed.
//! Albums that do not exist yet are created on demand.

use crate::error::{Result, SyncError};
use bridge_traits::storage::{FileQuery, RemoteFile, RemoteStore, FOLDER_MIME_TYPE};
use core_runtime::config::{default_album_root, DEFAULT_IMAGE_MIME_TYPE, MAX_PAGE_SIZE};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument, warn};

use crate::content_cache::PHOTOS_SPACE;

/// Alias Drive accepts for the root folder of My Drive
pub const ROOT_FOLDER_ID: &str = "root";

#[derive(Debug, Clone)]
pub struct AlbumIndexOptions {
    pub root_id: String,
    /// Folder names leading from the root to the albums container
    pub album_root: Vec<String>,
    pub image_mime_type: String,
    pub page_size: u32,
    pub space: String,
    /// Never create folders; missing albums are reported with an empty id
    pub dry_run: bool,
}

impl Default for AlbumIndexOptions {
    fn default() -> Self {
        Self {
            root_id: ROOT_FOLDER_ID.to_string(),
            album_root: default_album_root(),
            image_mime_type: DEFAULT_IMAGE_MIME_TYPE.to_string(),
            page_size: MAX_PAGE_SIZE,
            space: PHOTOS_SPACE.to_string(),
            dry_run: false,
        }
    }
}

/// A named remote folder and the content it holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Album {
    pub id: String,
    pub name: String,
    contained: HashMap<String, String>,
    loaded: bool,
    created: bool,
}

impl Album {
    fn discovered(file: &RemoteFile) -> Self {
        Self {
            id: file.id.clone(),
            name: file.name.clone(),
            contained: HashMap::new(),
            loaded: false,
            created: false,
        }
    }

    fn created(id: String, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            contained: HashMap::new(),
            loaded: true,
            created: true,
        }
    }

    pub fn contains(&self, content_hash: &str) -> bool {
        self.contained.contains_key(content_hash)
    }

    /// Record that the album now holds `file_id`
    pub fn insert(&mut self, content_hash: impl Into<String>, file_id: impl Into<String>) {
        self.contained.insert(content_hash.into(), file_id.into());
    }

    pub fn contained_hashes(&self) -> &HashMap<String, String> {
        &self.contained
    }

    /// Created during this run (or, in a dry run, would have been)
    pub fn was_created(&self) -> bool {
        self.created
    }
}

/// Walk `segments` from `root_id`, one folder per level
///
/// # Errors
///
/// [`SyncError::PathNotFound`] when a level has no such folder and
/// [`SyncError::AmbiguousPath`] when it has several.
#[instrument(skip(store))]
pub async fn resolve_folder_path(
    store: &dyn RemoteStore,
    root_id: &str,
    segments: &[String],
) -> Result<String> {
    let mut parent = root_id.to_string();

    for segment in segments {
        let query = FileQuery::new()
            .in_parent(parent.as_str())
            .mime_type(FOLDER_MIME_TYPE)
            .named(segment.as_str())
            .not_trashed();
        let matches = list_all(store, &query, MAX_PAGE_SIZE).await?;

        let id = match matches.as_slice() {
            [] => {
                return Err(SyncError::PathNotFound {
                    parent_id: parent,
                    segment: segment.clone(),
                })
            }
            [only] => only.id.clone(),
            _ => {
                return Err(SyncError::AmbiguousPath {
                    parent_id: parent,
                    segment: segment.clone(),
                    count: matches.len(),
                })
            }
        };

        debug!(parent = %parent, segment = %segment, id = %id, "Resolved folder");
        parent = id;
    }

    Ok(parent)
}

async fn list_all(
    store: &dyn RemoteStore,
    query: &FileQuery,
    page_size: u32,
) -> Result<Vec<RemoteFile>> {
    let mut files = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let page = store
            .list_files(query, page_token.as_deref(), page_size)
            .await?;
        files.extend(page.files);

        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => return Ok(files),
        }
    }
}

/// Albums known in this run
#[derive(Debug)]
pub struct AlbumIndex {
    container_id: String,
    albums: Vec<Album>,
    options: AlbumIndexOptions,
}

impl AlbumIndex {
    /// Resolve the albums container and list the albums in it
    #[instrument(skip_all)]
    pub async fn discover(store: &dyn RemoteStore, options: &AlbumIndexOptions) -> Result<Self> {
        let container_id =
            resolve_folder_path(store, &options.root_id, &options.album_root).await?;
        info!(
            path = %options.album_root.join("/"),
            id = %container_id,
            "Resolved albums container"
        );

        let query = FileQuery::new()
            .in_parent(container_id.as_str())
            .mime_type(FOLDER_MIME_TYPE)
            .not_trashed();
        let folders = list_all(store, &query, options.page_size).await?;

        let mut seen = HashSet::new();
        for folder in &folders {
            info!(id = %folder.id, name = %folder.name, "Existing album");
            if !seen.insert(folder.name.as_str()) {
                warn!(
                    name = %folder.name,
                    id = %folder.id,
                    "Duplicate album name, only the first listed folder is used"
                );
            }
        }

        Ok(Self {
            container_id,
            albums: folders.iter().map(Album::discovered).collect(),
            options: options.clone(),
        })
    }

    /// The album called `name`, creating it if needed
    ///
    /// A discovered album's contents are read on the first call for it;
    /// later calls return the same in-memory album, including hashes
    /// inserted since.
    #[instrument(skip(self, store))]
    pub async fn get(&mut self, store: &dyn RemoteStore, name: &str) -> Result<&mut Album> {
        let index = match self.albums.iter().position(|a| a.name == name) {
            Some(index) => index,
            None => {
                let album = self.create(store, name).await?;
                self.albums.push(album);
                self.albums.len() - 1
            }
        };

        let album = &mut self.albums[index];
        if !album.loaded {
            album.contained = Self::read_with(store, &album.id, &self.options).await?;
            album.loaded = true;
            debug!(
                album = %album.name,
                files = album.contained.len(),
                "Loaded album contents"
            );
        }
        Ok(album)
    }

    async fn create(&self, store: &dyn RemoteStore, name: &str) -> Result<Album> {
        if self.options.dry_run {
            info!(album = %name, "Would create album");
            return Ok(Album::created(String::new(), name));
        }

        let id = store.create_folder(name, &self.container_id).await?;
        info!(album = %name, id = %id, "Created album");
        Ok(Album::created(id, name))
    }

    /// Every image in `folder_id`, as content hash to file id
    pub async fn read(
        &self,
        store: &dyn RemoteStore,
        folder_id: &str,
    ) -> Result<HashMap<String, String>> {
        Self::read_with(store, folder_id, &self.options).await
    }

    async fn read_with(
        store: &dyn RemoteStore,
        folder_id: &str,
        options: &AlbumIndexOptions,
    ) -> Result<HashMap<String, String>> {
        let query = FileQuery::new()
            .in_parent(folder_id)
            .mime_type(options.image_mime_type.as_str())
            .not_trashed()
            .in_space(options.space.as_str());

        let files = list_all(store, &query, options.page_size).await?;
        Ok(files
            .into_iter()
            .filter_map(|f| {
                let hash = f.md5_checksum?.to_ascii_lowercase();
                Some((hash, f.id))
            })
            .collect())
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn album_names(&self) -> impl Iterator<Item = &str> {
        self.albums.iter().map(|a| a.name.as_str())
    }

    /// Names of albums created during this run
    pub fn created_albums(&self) -> Vec<String> {
        self.albums
            .iter()
            .filter(|a| a.created)
            .map(|a| a.name.clone())
            .collect()
    }

    /// Albums found by [`AlbumIndex::discover`]
    pub fn discovered_count(&self) -> usize {
        self.albums.iter().filter(|a| !a.created).count()
    }
}
