//! Credential Storage in a User-Only JSON File

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SecureStore,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::APP_DIR_NAME;

/// File-backed secure storage implementation
///
/// Secrets are kept as a JSON object of `key -> base64(value)`. The file is
/// rewritten atomically on every change and restricted to the owning user
/// on Unix.
pub struct JsonFileSecureStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileSecureStore {
    /// Create a store backed by the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// `~/.credentials/album-sync.json`
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| {
            BridgeError::NotAvailable("Home directory could not be determined".to_string())
        })?;
        Ok(home
            .join(".credentials")
            .join(format!("{}.json", APP_DIR_NAME)))
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_map(&self) -> Result<BTreeMap<String, String>> {
        match tokio::fs::read(&self.path).await {
            Ok(data) if data.is_empty() => Ok(BTreeMap::new()),
            Ok(data) => serde_json::from_slice(&data).map_err(|e| {
                error!(path = ?self.path, error = %e, "Credential file is not valid JSON");
                BridgeError::OperationFailed(format!(
                    "Failed to parse credential file {}: {}",
                    self.path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(BridgeError::Io(e)),
        }
    }

    async fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                create_private_dir(parent).await?;
            }
        }

        let data = serde_json::to_vec_pretty(map)
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to encode secrets: {}", e)))?;

        let tmp = self.path.with_extension("json.tmp");
        let mut file = open_private_file(&tmp).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
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

/// Temp file for a rewrite, mode 0600 before any bytes are written
async fn open_private_file(path: &Path) -> std::io::Result<tokio::fs::File> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);
    let file = options.open(path).await?;
    // A leftover temp file keeps its old mode through `open`
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600)).await?;
    }
    Ok(file)
}

#[async_trait]
impl SecureStore for JsonFileSecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        map.insert(key.to_string(), STANDARD.encode(value));
        self.write_map(&map).await?;

        debug!(key = key, "Stored secret");
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let _guard = self.lock.lock().await;
        let map = self.read_map().await?;

        match map.get(key) {
            Some(encoded) => {
                let decoded = STANDARD.decode(encoded).map_err(|e| {
                    error!(key = key, error = %e, "Failed to decode secret");
                    BridgeError::OperationFailed(format!("Failed to decode secret: {}", e))
                })?;
                debug!(key = key, "Retrieved secret");
                Ok(Some(decoded))
            }
            None => {
                debug!(key = key, "Secret not found");
                Ok(None)
            }
        }
    }

    async fn delete_secret(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        if map.remove(key).is_some() {
            self.write_map(&map).await?;
            debug!(key = key, "Deleted secret");
        }
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_map().await?.into_keys().collect())
    }

    async fn clear_all(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BridgeError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> JsonFileSecureStore {
        JsonFileSecureStore::new(dir.path().join("creds").join("album-sync.json"))
    }

    #[tokio::test]
    async fn test_set_get_delete_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert_eq!(store.get_secret("token").await.unwrap(), None);

        store.set_secret("token", b"\x00binary\xff").await.unwrap();
        assert_eq!(
            store.get_secret("token").await.unwrap().as_deref(),
            Some(&b"\x00binary\xff"[..])
        );
        assert!(store.has_secret("token").await.unwrap());

        store.delete_secret("token").await.unwrap();
        assert!(!store.has_secret("token").await.unwrap());
    }

    #[tokio::test]
    async fn test_values_survive_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        store_in(&dir).set_secret("a", b"1").await.unwrap();
        store_in(&dir).set_secret("b", b"2").await.unwrap();

        let keys = store_in(&dir).list_keys().await.unwrap();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_clear_all_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.set_secret("a", b"1").await.unwrap();

        store.clear_all().await.unwrap();
        assert!(!store.path().exists());
        store.clear_all().await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("album-sync.json");
        std::fs::write(&path, b"not json").unwrap();

        let store = JsonFileSecureStore::new(&path);
        assert!(store.get_secret("a").await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_is_user_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.set_secret("a", b"1").await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_credentials_dir_is_user_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".credentials").join("album-sync.json");
        let store = JsonFileSecureStore::new(&path);
        store.set_secret("token", b"refresh").await.unwrap();

        let parent = path.parent().unwrap();
        let dir_mode = std::fs::metadata(parent).unwrap().permissions().mode();
        assert_eq!(dir_mode & 0o777, 0o700);
        let file_mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(file_mode & 0o777, 0o600);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stale_temp_file_is_narrowed() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        let tmp = store.path().with_extension("json.tmp");
        std::fs::write(&tmp, b"stale").unwrap();
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o644)).unwrap();

        store.set_secret("a", b"1").await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.get_secret("a").await.unwrap().as_deref(), Some(&b"1"[..]));
    }
}
