//! Where protected media lives: a local directory or an object store.
//!
//! Either way the bytes only leave through the stream gate; nothing here
//! hands out a URL a client could fetch on its own.

use std::path::PathBuf;
use std::sync::Arc;

use object_store::{ObjectStore, path::Path as ObjectPath};
use url::Url;

use super::MediaKind;

/// Storage backend for session media.
#[derive(Debug, Clone)]
pub enum MediaStorage {
    /// Files under `{root}/videos` and `{root}/files`.
    Local { root: PathBuf },
    /// Objects under `{prefix}/videos/` and `{prefix}/files/`.
    Object {
        store: Arc<dyn ObjectStore>,
        prefix: ObjectPath,
    },
}

/// Concrete target of a validated media request.
#[derive(Debug, Clone)]
pub enum MediaLocation {
    File(PathBuf),
    Object {
        store: Arc<dyn ObjectStore>,
        path: ObjectPath,
        size: u64,
    },
}

/// A stored media name must be a single plain path component.
pub fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 255
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
}

impl MediaStorage {
    /// Object storage addressed by URL, e.g. `s3://bucket/media` or `memory:///`.
    /// Credentials come from the environment the way each backend expects.
    pub fn from_url(url: &Url) -> Result<Self, object_store::Error> {
        let (store, prefix) = object_store::parse_url(url)?;
        Ok(MediaStorage::Object {
            store: Arc::from(store),
            prefix,
        })
    }

    /// Resolve a filename to its storage location.
    /// Returns `None` for unsafe names and for media that does not exist.
    pub async fn locate(
        &self,
        kind: MediaKind,
        filename: &str,
    ) -> std::io::Result<Option<MediaLocation>> {
        if !is_safe_filename(filename) {
            return Ok(None);
        }

        match self {
            MediaStorage::Local { root } => {
                let path = root.join(kind.storage_dir()).join(filename);
                match tokio::fs::metadata(&path).await {
                    Ok(meta) if meta.is_file() => Ok(Some(MediaLocation::File(path))),
                    Ok(_) => Ok(None),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                    Err(e) => Err(e),
                }
            }
            MediaStorage::Object { store, prefix } => {
                let path = prefix.child(kind.storage_dir()).child(filename);
                match store.head(&path).await {
                    Ok(meta) => Ok(Some(MediaLocation::Object {
                        store: store.clone(),
                        path: meta.location,
                        size: meta.size,
                    })),
                    Err(object_store::Error::NotFound { .. }) => Ok(None),
                    Err(e) => Err(std::io::Error::other(e)),
                }
            }
        }
    }
}
