use thiserror::Error;

/// Failures reported by the storage client.
///
/// Every remote call maps onto exactly one of these kinds; nothing is
/// retried and nothing is swallowed at this layer.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no such path: '{path}'")]
    NotFound { path: String },

    #[error("auth token was rejected by the backend")]
    Unauthorized,

    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend rejected the request (HTTP {status}): {message}")]
    RemoteRejected { status: u16, message: String },

    #[error("path already exists: '{path}'")]
    AlreadyExists { path: String },
}

/// Failures surfaced by the filesystem adapter, each qualified with the
/// offending path and carrying the underlying client error for diagnostics.
#[derive(Debug, Error)]
pub enum FilesystemError {
    #[error("unable to read file at '{path}'")]
    ReadFailed {
        path: String,
        #[source]
        source: StorageError,
    },

    #[error("unable to write file at '{path}'")]
    WriteFailed {
        path: String,
        #[source]
        source: StorageError,
    },

    #[error("unable to delete '{path}'")]
    DeleteFailed {
        path: String,
        #[source]
        source: StorageError,
    },

    #[error("unable to create directory '{path}'")]
    CreateDirectoryFailed {
        path: String,
        #[source]
        source: StorageError,
    },

    #[error("unable to retrieve metadata for '{path}'")]
    MetadataUnavailable {
        path: String,
        #[source]
        source: StorageError,
    },

    #[error("unable to generate url for '{path}': {reason}")]
    UrlGenerationFailed {
        path: String,
        reason: String,
        #[source]
        source: Option<StorageError>,
    },

    #[error("operation '{operation}' is not supported for '{path}'")]
    UnsupportedOperation {
        path: String,
        operation: &'static str,
    },
}

pub type Result<T, E = StorageError> = std::result::Result<T, E>;
