//! StretchFS object-storage client and filesystem adapter.
//!
//! Two layers, leaf-first: [`StretchFsClient`] turns logical file
//! operations into authenticated requests against a single StretchFS
//! endpoint, and [`StretchFsAdapter`] exposes the capability-based
//! [`FilesystemOperator`] interface on top of it, translating backend
//! failures into a typed error taxonomy.
//!
//! ```no_run
//! use stretchfs_storage::{
//!     FilesystemOperator, StorageConfig, StretchFsAdapter, StretchFsClient, WriteOptions,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StorageConfig::from_env()?;
//! let adapter = StretchFsAdapter::new(StretchFsClient::new(config)?);
//!
//! adapter
//!     .write("docs/hello.txt", b"hello".to_vec(), WriteOptions::default())
//!     .await?;
//! let contents = adapter.read("docs/hello.txt").await?;
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod features;
pub mod modules;
mod shared;

pub use crate::core::config::StorageConfig;
pub use crate::core::error::{FilesystemError, StorageError};
pub use crate::features::filesystem::dtos::{
    DirEntry, DirEntryStream, EntryKind, FileMetadata, Visibility, WriteOptions,
};
pub use crate::features::filesystem::{FilesystemOperator, StretchFsAdapter};
pub use crate::modules::storage::{
    byte_stream_from_reader, BoxError, ByteStream, EntryStream, FileDetail, ListingEntry,
    SignedUrl, StretchFsClient,
};
