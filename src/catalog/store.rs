//! JSON documents rewritten in full on every save.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt store {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A single JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the document; a missing file yields `T::default()`, unparsable
    /// content is reported as corruption.
    pub async fn load<T>(&self) -> Result<T, StoreError>
    where
        T: DeserializeOwned + Default,
    {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(T::default()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Writes to a sibling temp file, syncs it, then renames it over the target.
    pub async fn save<T>(&self, value: &T) -> Result<(), StoreError>
    where
        T: Serialize + ?Sized,
    {
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Serialize {
            path: self.path.clone(),
            source,
        })?;

        let io_err = |source: io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = self
            .path
            .with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

        let write = async {
            let mut file = fs::File::create(&tmp).await?;
            file.write_all(&bytes).await?;
            file.write_all(b"\n").await?;
            file.sync_all().await?;
            fs::rename(&tmp, &self.path).await
        };

        if let Err(e) = write.await {
            let _ = fs::remove_file(&tmp).await;
            return Err(io_err(e));
        }

        debug!(path = %self.path.display(), bytes = bytes.len(), "Store written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_loads_default() {
        let temp = TempDir::new().unwrap();
        let file = JsonFile::new(temp.path().join("none.json"));
        let map: BTreeMap<String, String> = file.load().await.unwrap();
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let file = JsonFile::new(temp.path().join("nested/titles.json"));

        let mut map = BTreeMap::new();
        map.insert("aot".to_string(), "Attack on Titan".to_string());
        file.save(&map).await.unwrap();

        let text = std::fs::read_to_string(file.path()).unwrap();
        assert!(text.contains("\n  \"aot\""), "store should be indented: {text}");

        let back: BTreeMap<String, String> = file.load().await.unwrap();
        assert_eq!(back, map);

        let leftovers: Vec<_> = std::fs::read_dir(temp.path().join("nested"))
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_truncated_file_is_corrupt() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("shows.json");
        std::fs::write(&path, b"{\"1\": {\"id\": 1, ").unwrap();

        let result: Result<BTreeMap<String, serde_json::Value>, _> =
            JsonFile::new(&path).load().await;
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    }
}
