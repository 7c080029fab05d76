use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{Stream, TryStreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;

use crate::core::error::Result;

/// Attributes the backend reports for a single path.
///
/// Produced on demand by a detail lookup; never cached, so callers must
/// re-fetch for freshness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDetail {
    pub path: String,
    /// Whether the path names a folder rather than a file
    pub folder: bool,
    /// Size in bytes; 0 for folders
    #[serde(default)]
    pub size: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// One element of a directory listing. Ordering is whatever the backend
/// returns; no ordering contract is guaranteed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingEntry {
    pub path: String,
    pub folder: bool,
    #[serde(default)]
    pub size: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// One page of a listing response. The marker is an opaque cursor; its
/// absence means the listing is exhausted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPage {
    #[serde(default)]
    pub entries: Vec<ListingEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_marker: Option<String>,
}

/// A backend-generated download URL plus the lifetime it was requested
/// with. `life` of `None` means the backend's default/permanent policy
/// applied. Generated fresh per request, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedUrl {
    pub url: String,
    pub life: Option<Duration>,
}

/// Boxed error carried by byte streams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An owned stream of byte chunks crossing the call boundary.
///
/// Whoever holds the stream owns it: passing one to an upload transfers
/// ownership for the duration of the call, and the receiver drops it on
/// every exit path. Mid-read failures surface as an error item on the
/// stream itself.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, BoxError>> + Send>>;

/// A lazy, single-pass stream of listing entries. Not restartable; one
/// traversal per call.
pub type EntryStream = Pin<Box<dyn Stream<Item = Result<ListingEntry>> + Send>>;

/// Adapt any async reader (a file, a socket) into a [`ByteStream`] suitable
/// for streamed uploads.
pub fn byte_stream_from_reader<R>(reader: R) -> ByteStream
where
    R: tokio::io::AsyncRead + Send + 'static,
{
    Box::pin(ReaderStream::new(reader).map_err(BoxError::from))
}
