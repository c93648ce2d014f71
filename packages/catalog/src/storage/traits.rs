use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::path::ObjectPath;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Listing entry for a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub path: ObjectPath,
    pub size: u64,
    pub modified_at: DateTime<Utc>,
}

/// Path-addressed object storage for uploaded media.
///
/// Objects live in a single bucket and are reachable at
/// `{public_base_url}/{path}` once `upload` has returned `Ok`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` at `path`, replacing any previous object there.
    async fn upload(
        &self,
        path: &ObjectPath,
        data: &[u8],
        content_type: Option<&str>,
    ) -> Result<(), StorageError>;

    /// Base URL under which objects are publicly served.
    fn public_base_url(&self) -> &str;

    /// Public URL of the object at `path`.
    fn public_url(&self, path: &ObjectPath) -> String {
        format!("{}/{}", self.public_base_url().trim_end_matches('/'), path)
    }

    /// Map a public URL back to its object path.
    ///
    /// Returns `None` for URLs that do not point into this store.
    fn path_from_url(&self, url: &str) -> Option<ObjectPath> {
        let base = self.public_base_url().trim_end_matches('/');
        let rest = url.strip_prefix(base)?.strip_prefix('/')?;
        ObjectPath::parse(rest).ok()
    }

    /// Open an object as a streaming async reader.
    async fn open(&self, path: &ObjectPath) -> Result<BoxReader, StorageError>;

    /// Retrieve all bytes of an object.
    async fn read(&self, path: &ObjectPath) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.open(path).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// List every stored object.
    async fn list(&self) -> Result<Vec<ObjectInfo>, StorageError>;

    /// Delete an object.
    ///
    /// Returns `true` if the object was deleted, `false` if it did not exist.
    async fn delete(&self, path: &ObjectPath) -> Result<bool, StorageError>;
}
