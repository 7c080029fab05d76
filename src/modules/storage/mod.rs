//! Storage module for the remote StretchFS backend
//!
//! Provides the HTTP client for file/folder CRUD, streamed transfers,
//! listing, and signed URL generation.

mod client;
mod types;

pub use client::StretchFsClient;
pub use types::{
    byte_stream_from_reader, BoxError, ByteStream, EntryStream, FileDetail, ListingEntry,
    ListingPage, SignedUrl,
};
