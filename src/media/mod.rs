//! Protected media: signed capability links and storage resolution.

mod link;
mod storage;

pub use link::{MEDIA_LINK_TTL_SECS, MediaLinkError, MediaSigner, SignedLink};
pub use storage::{MediaLocation, MediaStorage, is_safe_filename};

/// The two kinds of paid material attached to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    File,
}

impl MediaKind {
    /// Path segment of the public stream route.
    pub fn route_segment(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::File => "file",
        }
    }

    /// Directory (or object prefix) holding this kind of media.
    pub fn storage_dir(&self) -> &'static str {
        match self {
            MediaKind::Video => "videos",
            MediaKind::File => "files",
        }
    }
}

/// Session media references are either stored filenames or links to
/// externally hosted material, which is handed out as-is.
pub fn is_external_ref(reference: &str) -> bool {
    let lower = reference.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
