use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::io::BufReader;

use super::error::StorageError;
use super::path::ObjectPath;
use super::traits::{BoxReader, ObjectInfo, ObjectStore};

const TEMP_DIR: &str = ".tmp";

/// Filesystem-backed object store.
///
/// Objects are stored at `{base_path}/{object path}`; writes go through
/// `{base_path}/.tmp` and are renamed into place so readers never observe a
/// partially written object.
pub struct FilesystemObjectStore {
    base_path: PathBuf,
    public_base_url: String,
    max_size: u64,
}

impl FilesystemObjectStore {
    /// Create a new filesystem object store.
    pub async fn new(
        base_path: PathBuf,
        public_base_url: impl Into<String>,
        max_size: u64,
    ) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(TEMP_DIR)).await?;
        Ok(Self {
            base_path,
            public_base_url: public_base_url.into(),
            max_size,
        })
    }

    fn object_path(&self, path: &ObjectPath) -> PathBuf {
        self.base_path.join(path.as_str())
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(TEMP_DIR)
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl ObjectStore for FilesystemObjectStore {
    async fn upload(
        &self,
        path: &ObjectPath,
        data: &[u8],
        _content_type: Option<&str>,
    ) -> Result<(), StorageError> {
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        let target = self.object_path(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &target).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(())
    }

    fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    async fn open(&self, path: &ObjectPath) -> Result<BoxReader, StorageError> {
        match fs::File::open(self.object_path(path)).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<ObjectInfo>, StorageError> {
        let mut objects = Vec::new();
        let mut pending = vec![self.base_path.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                let full = entry.path();
                if file_type.is_dir() {
                    if full != self.base_path.join(TEMP_DIR) {
                        pending.push(full);
                    }
                    continue;
                }

                let Some(relative) = full
                    .strip_prefix(&self.base_path)
                    .ok()
                    .and_then(|p| p.to_str())
                else {
                    continue;
                };
                // Files dropped in by hand with odd names are not ours to manage.
                let Ok(path) = ObjectPath::parse(&relative.replace('\\', "/")) else {
                    continue;
                };

                let meta = entry.metadata().await?;
                let modified_at = meta
                    .modified()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now());
                objects.push(ObjectInfo {
                    path,
                    size: meta.len(),
                    modified_at,
                });
            }
        }

        objects.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(objects)
    }

    async fn delete(&self, path: &ObjectPath) -> Result<bool, StorageError> {
        match fs::remove_file(self.object_path(path)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
