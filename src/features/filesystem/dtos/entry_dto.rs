use std::pin::Pin;

use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::core::error::FilesystemError;
use crate::modules::storage::ListingEntry;

/// Content type used when a write does not specify one
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Whether a listing entry names a file or a directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

/// Visibility level of a path.
///
/// The backend has no visibility primitive, so lookups report `Unknown`;
/// the variant set exists for interface completeness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
    #[default]
    Unknown,
}

/// One element of a directory listing as seen by filesystem consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirEntry {
    pub path: String,
    pub kind: EntryKind,
    /// Size in bytes; 0 for directories
    pub size: i64,
    pub mime_type: Option<String>,
    pub modified_at: DateTime<Utc>,
}

impl From<ListingEntry> for DirEntry {
    fn from(entry: ListingEntry) -> Self {
        let kind = if entry.folder {
            EntryKind::Dir
        } else {
            EntryKind::File
        };
        Self {
            path: entry.path,
            kind,
            size: entry.size,
            mime_type: entry.mime_type,
            modified_at: entry.updated_at,
        }
    }
}

/// Metadata for a single file or directory.
///
/// The mime type is the backend-reported value, taken verbatim; nothing is
/// inferred locally from the path extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub mime_type: Option<String>,
    pub size: i64,
    pub modified_at: DateTime<Utc>,
}

/// Options accepted by write operations
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Content type recorded for the upload; defaults to
    /// [`DEFAULT_CONTENT_TYPE`] when absent
    pub mime_type: Option<String>,
}

/// A lazy, single-pass stream of directory entries
pub type DirEntryStream =
    Pin<Box<dyn Stream<Item = Result<DirEntry, FilesystemError>> + Send>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_entry_from_folder_listing() {
        let entry = ListingEntry {
            path: "b".to_string(),
            folder: true,
            size: 0,
            mime_type: None,
            updated_at: "2026-01-15T10:30:00Z".parse().unwrap(),
        };

        let dto = DirEntry::from(entry);
        assert_eq!(dto.kind, EntryKind::Dir);
        assert_eq!(dto.path, "b");
        assert_eq!(dto.size, 0);
        assert!(dto.mime_type.is_none());
    }

    #[test]
    fn test_dir_entry_from_file_listing() {
        let entry = ListingEntry {
            path: "a.txt".to_string(),
            folder: false,
            size: 10,
            mime_type: Some("text/plain".to_string()),
            updated_at: "2026-01-15T10:30:00Z".parse().unwrap(),
        };

        let dto = DirEntry::from(entry);
        assert_eq!(dto.kind, EntryKind::File);
        assert_eq!(dto.size, 10);
        assert_eq!(dto.mime_type, Some("text/plain".to_string()));
    }

    #[test]
    fn test_entry_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&EntryKind::File).unwrap(), "\"file\"");
        assert_eq!(serde_json::to_string(&EntryKind::Dir).unwrap(), "\"dir\"");
    }

    #[test]
    fn test_visibility_defaults_to_unknown() {
        assert_eq!(Visibility::default(), Visibility::Unknown);
    }
}
