use std::fmt;

use uuid::Uuid;

use super::error::StorageError;

const MAX_PATH_LEN: usize = 512;
const MAX_EXTENSION_LEN: usize = 10;

/// A validated, bucket-relative object path such as `machines/0190c1e2-....png`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectPath(String);

impl ObjectPath {
    /// Validate a bucket-relative path.
    pub fn parse(path: &str) -> Result<Self, StorageError> {
        if path.is_empty() {
            return Err(StorageError::InvalidPath("path cannot be empty".into()));
        }
        if path.len() > MAX_PATH_LEN {
            return Err(StorageError::InvalidPath(format!(
                "path exceeds {MAX_PATH_LEN} characters"
            )));
        }
        if path.chars().any(|c| c.is_ascii_control()) {
            return Err(StorageError::InvalidPath(
                "control characters are not allowed".into(),
            ));
        }
        if path.contains('\\') {
            return Err(StorageError::InvalidPath("backslashes are not allowed".into()));
        }
        if path.starts_with('/') {
            return Err(StorageError::InvalidPath("path must be relative".into()));
        }
        for segment in path.split('/') {
            if segment.is_empty() {
                return Err(StorageError::InvalidPath("empty path segment".into()));
            }
            if segment == "." || segment == ".." {
                return Err(StorageError::InvalidPath(
                    "'.' and '..' segments are not allowed".into(),
                ));
            }
            if segment.starts_with('.') {
                return Err(StorageError::InvalidPath("hidden segments are not allowed".into()));
            }
        }
        Ok(Self(path.to_string()))
    }

    /// Generate a fresh path under `prefix` for an upload named `file_name`.
    ///
    /// The stem is a UUIDv7, so paths are unique and sort by upload time; the
    /// original extension is kept when it is short and alphanumeric.
    pub fn generate(prefix: &str, file_name: &str) -> Self {
        let stem = Uuid::now_v7();
        let prefix = prefix.trim_matches('/');
        let name = match extension_of(file_name) {
            Some(ext) => format!("{stem}.{ext}"),
            None => stem.to_string(),
        };
        if prefix.is_empty() {
            Self(name)
        } else {
            Self(format!("{prefix}/{name}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Top-level directory of the path, if any (`machines` for `machines/x.png`).
    pub fn prefix(&self) -> Option<&str> {
        self.0.split_once('/').map(|(head, _)| head)
    }
}

/// Lowercased extension of an uploaded file name, if it looks sane.
fn extension_of(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.trim().rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > MAX_EXTENSION_LEN {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

impl fmt::Debug for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectPath({})", self.0)
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
