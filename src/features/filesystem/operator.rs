//! Capability-based filesystem interface
//!
//! The operation set higher-level storage consumers depend on, independent
//! of the backend behind it. Implementations translate each call into
//! backend requests and surface failures as [`FilesystemError`] kinds;
//! consumers never see backend response types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::core::error::{FilesystemError, Result};
use crate::features::filesystem::dtos::{DirEntryStream, FileMetadata, Visibility, WriteOptions};
use crate::modules::storage::{ByteStream, FileDetail};

#[async_trait]
pub trait FilesystemOperator: Send + Sync {
    /// Whether a path exists.
    ///
    /// Collapses every failure kind, including transport errors, to
    /// `false`; genuine absence and a transient backend outage are
    /// indistinguishable here. Callers that need the distinction must use
    /// [`try_detail`](Self::try_detail) instead.
    async fn exists(&self, path: &str) -> bool;

    /// Whether a path exists and names a directory. Same failure collapse
    /// as [`exists`](Self::exists).
    async fn is_directory(&self, path: &str) -> bool;

    /// Attribute lookup that preserves the failure kind, for callers that
    /// must distinguish absence from transient errors.
    async fn try_detail(&self, path: &str) -> Result<FileDetail>;

    /// Read a file fully into memory.
    async fn read(&self, path: &str) -> Result<Vec<u8>, FilesystemError>;

    /// Read a file as a byte stream the caller owns and must drop.
    async fn read_stream(&self, path: &str) -> Result<ByteStream, FilesystemError>;

    /// Write a full payload to a path, overwriting any existing content.
    /// There are no partial or append semantics.
    async fn write(
        &self,
        path: &str,
        contents: Vec<u8>,
        options: WriteOptions,
    ) -> Result<(), FilesystemError>;

    /// Write from a byte stream. Ownership of the stream transfers to the
    /// call; it is consumed and released on every exit path, success or
    /// failure.
    async fn write_stream(
        &self,
        path: &str,
        stream: ByteStream,
        options: WriteOptions,
    ) -> Result<(), FilesystemError>;

    /// Delete a file. Deleting a missing path fails.
    async fn delete(&self, path: &str) -> Result<(), FilesystemError>;

    /// Delete a directory and, backend-side, everything under it.
    async fn delete_directory(&self, path: &str) -> Result<(), FilesystemError>;

    /// Create a directory.
    async fn create_directory(&self, path: &str) -> Result<(), FilesystemError>;

    /// Declared capability gap: the backend has no visibility primitive,
    /// so this always fails with `UnsupportedOperation`.
    async fn set_visibility(
        &self,
        path: &str,
        visibility: Visibility,
    ) -> Result<(), FilesystemError>;

    /// Visibility lookup; reports [`Visibility::Unknown`] since there is
    /// no backing concept.
    async fn visibility(&self, path: &str) -> Result<Visibility, FilesystemError>;

    /// Mime type, size and modification time for a path.
    async fn metadata(&self, path: &str) -> Result<FileMetadata, FilesystemError>;

    /// List a directory lazily; `deep=false` yields immediate children
    /// only. One pass per call.
    fn list(&self, path: &str, deep: bool) -> DirEntryStream;

    /// A URL whose lifetime is left to backend policy.
    async fn public_url(&self, path: &str) -> Result<String, FilesystemError>;

    /// A URL valid until `expires_at`. Fails without a network call when
    /// `expires_at` is not in the future.
    async fn temporary_url(
        &self,
        path: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<String, FilesystemError>;

    /// Move a file by copying it to `destination` and deleting `source`.
    async fn move_file(&self, source: &str, destination: &str) -> Result<(), FilesystemError>;

    /// Copy a file's contents to `destination`, preserving its mime type.
    async fn copy(&self, source: &str, destination: &str) -> Result<(), FilesystemError>;
}
