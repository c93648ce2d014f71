mod error;
mod path;
mod traits;

pub mod filesystem;

pub use error::StorageError;
pub use path::ObjectPath;
pub use traits::{BoxReader, ObjectInfo, ObjectStore};
