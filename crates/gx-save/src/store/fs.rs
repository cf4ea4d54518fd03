use super::{validate_key, BlobStore};
use gx_core::SaveError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

const PARTIAL_SUFFIX: &str = ".partial";

/// Blob store mapping keys to files under a root directory
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, SaveError> {
        validate_key(key)?;
        Ok(key.split('/').fold(self.root.clone(), |path, segment| path.join(segment)))
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

#[async_trait::async_trait]
impl BlobStore for FsBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SaveError> {
        let path = self.path_for(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), SaveError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write then rename so a crash never leaves a truncated blob
        let partial = partial_path(&path);
        fs::write(&partial, bytes).await?;
        fs::rename(&partial, &path).await?;
        tracing::trace!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), SaveError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, SaveError> {
        // Start from the deepest directory named by the prefix
        let dir_part = prefix.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
        let start = if dir_part.is_empty() {
            self.root.clone()
        } else {
            self.path_for(dir_part)?
        };

        let mut keys = Vec::new();
        let mut pending = vec![(start, dir_part.to_string())];

        while let Some((dir, key_prefix)) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                    continue;
                };
                let key = if key_prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{}/{}", key_prefix, name)
                };

                if entry.file_type().await?.is_dir() {
                    pending.push((entry.path(), key));
                } else if !name.ends_with(PARTIAL_SUFFIX) && key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        store.put("ns/saves/abc/game.srm", &[9, 8, 7]).await.unwrap();
        assert!(dir.path().join("ns/saves/abc/game.srm").exists());
        assert_eq!(
            store.get("ns/saves/abc/game.srm").await.unwrap(),
            Some(vec![9, 8, 7])
        );

        store.remove("ns/saves/abc/game.srm").await.unwrap();
        store.remove("ns/saves/abc/game.srm").await.unwrap();
        assert_eq!(store.get("ns/saves/abc/game.srm").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_walks_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        store.put("ns/states/h/3/state", b"s").await.unwrap();
        store.put("ns/states/h/3/meta.json", b"{}").await.unwrap();
        store.put("ns/states/h/0/state", b"s").await.unwrap();
        store.put("ns/h", b"legacy").await.unwrap();

        assert_eq!(
            store.list("ns/states/h/").await.unwrap(),
            vec![
                "ns/states/h/0/state".to_string(),
                "ns/states/h/3/meta.json".to_string(),
                "ns/states/h/3/state".to_string(),
            ]
        );
        assert_eq!(store.list("ns/h").await.unwrap(), vec!["ns/h".to_string()]);
        assert!(store.list("missing/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        assert!(store.put("../escape", b"x").await.is_err());
        assert!(store.get("ns/../../etc/passwd").await.is_err());
    }
}
