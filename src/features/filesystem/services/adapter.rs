use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::time::Duration;
use tracing::debug;

use crate::core::error::{FilesystemError, Result};
use crate::features::filesystem::dtos::{
    DirEntry, DirEntryStream, FileMetadata, Visibility, WriteOptions, DEFAULT_CONTENT_TYPE,
};
use crate::features::filesystem::operator::FilesystemOperator;
use crate::modules::storage::{ByteStream, FileDetail, StretchFsClient};

/// Filesystem adapter over a [`StretchFsClient`].
///
/// Stateless: every call is a fresh request against the backend, and no
/// metadata or listing result is cached. Concurrency safety is inherited
/// from the client.
pub struct StretchFsAdapter {
    client: StretchFsClient,
}

impl StretchFsAdapter {
    pub fn new(client: StretchFsClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FilesystemOperator for StretchFsAdapter {
    async fn exists(&self, path: &str) -> bool {
        self.client.detail(path).await.is_ok()
    }

    async fn is_directory(&self, path: &str) -> bool {
        match self.client.detail(path).await {
            Ok(detail) => detail.folder,
            Err(_) => false,
        }
    }

    async fn try_detail(&self, path: &str) -> Result<FileDetail> {
        self.client.detail(path).await
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, FilesystemError> {
        self.client
            .download(path)
            .await
            .map_err(|source| FilesystemError::ReadFailed {
                path: path.to_string(),
                source,
            })
    }

    async fn read_stream(&self, path: &str) -> Result<ByteStream, FilesystemError> {
        self.client
            .download_stream(path)
            .await
            .map_err(|source| FilesystemError::ReadFailed {
                path: path.to_string(),
                source,
            })
    }

    async fn write(
        &self,
        path: &str,
        contents: Vec<u8>,
        options: WriteOptions,
    ) -> Result<(), FilesystemError> {
        let content_type = options
            .mime_type
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        self.client
            .upload(path, contents, &content_type)
            .await
            .map_err(|source| FilesystemError::WriteFailed {
                path: path.to_string(),
                source,
            })
    }

    async fn write_stream(
        &self,
        path: &str,
        stream: ByteStream,
        options: WriteOptions,
    ) -> Result<(), FilesystemError> {
        let content_type = options
            .mime_type
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        // The stream moves into the client call and is dropped there on
        // every exit path; nothing is buffered here.
        self.client
            .upload_stream(path, stream, &content_type)
            .await
            .map_err(|source| FilesystemError::WriteFailed {
                path: path.to_string(),
                source,
            })
    }

    async fn delete(&self, path: &str) -> Result<(), FilesystemError> {
        self.client
            .delete_file(path)
            .await
            .map_err(|source| FilesystemError::DeleteFailed {
                path: path.to_string(),
                source,
            })
    }

    async fn delete_directory(&self, path: &str) -> Result<(), FilesystemError> {
        self.client
            .delete_folder(path)
            .await
            .map_err(|source| FilesystemError::DeleteFailed {
                path: path.to_string(),
                source,
            })
    }

    async fn create_directory(&self, path: &str) -> Result<(), FilesystemError> {
        self.client
            .create_folder(path)
            .await
            .map_err(|source| FilesystemError::CreateDirectoryFailed {
                path: path.to_string(),
                source,
            })
    }

    async fn set_visibility(
        &self,
        path: &str,
        _visibility: Visibility,
    ) -> Result<(), FilesystemError> {
        Err(FilesystemError::UnsupportedOperation {
            path: path.to_string(),
            operation: "set_visibility",
        })
    }

    async fn visibility(&self, _path: &str) -> Result<Visibility, FilesystemError> {
        Ok(Visibility::Unknown)
    }

    async fn metadata(&self, path: &str) -> Result<FileMetadata, FilesystemError> {
        let detail = self.client.detail(path).await.map_err(|source| {
            FilesystemError::MetadataUnavailable {
                path: path.to_string(),
                source,
            }
        })?;

        Ok(FileMetadata {
            mime_type: detail.mime_type,
            size: detail.size,
            modified_at: detail.updated_at,
        })
    }

    fn list(&self, path: &str, deep: bool) -> DirEntryStream {
        let path = path.to_string();
        let stream = self
            .client
            .list(&path, deep)
            .map(move |item| match item {
                Ok(entry) => Ok(DirEntry::from(entry)),
                Err(source) => Err(FilesystemError::MetadataUnavailable {
                    path: path.clone(),
                    source,
                }),
            });
        Box::pin(stream)
    }

    async fn public_url(&self, path: &str) -> Result<String, FilesystemError> {
        let signed = self.client.download_url(path, None).await.map_err(|source| {
            FilesystemError::UrlGenerationFailed {
                path: path.to_string(),
                reason: "backend request failed".to_string(),
                source: Some(source),
            }
        })?;
        Ok(signed.url)
    }

    async fn temporary_url(
        &self,
        path: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<String, FilesystemError> {
        let ttl = expires_at.signed_duration_since(Utc::now());
        if ttl <= chrono::Duration::zero() {
            return Err(FilesystemError::UrlGenerationFailed {
                path: path.to_string(),
                reason: format!("expiration {} is not in the future", expires_at),
                source: None,
            });
        }

        let life = Duration::from_secs(ttl.num_seconds().max(1) as u64);
        let signed = self
            .client
            .download_url(path, Some(life))
            .await
            .map_err(|source| FilesystemError::UrlGenerationFailed {
                path: path.to_string(),
                reason: "backend request failed".to_string(),
                source: Some(source),
            })?;
        Ok(signed.url)
    }

    async fn move_file(&self, source: &str, destination: &str) -> Result<(), FilesystemError> {
        self.copy(source, destination).await?;
        self.client
            .delete_file(source)
            .await
            .map_err(|source_err| FilesystemError::DeleteFailed {
                path: source.to_string(),
                source: source_err,
            })?;

        debug!("Moved '{}' to '{}'", source, destination);
        Ok(())
    }

    async fn copy(&self, source: &str, destination: &str) -> Result<(), FilesystemError> {
        // The backend has no server-side copy, so compose one from
        // primitives: detail for the mime type, then download + upload.
        let detail = self.client.detail(source).await.map_err(|source_err| {
            FilesystemError::ReadFailed {
                path: source.to_string(),
                source: source_err,
            }
        })?;
        let contents = self.client.download(source).await.map_err(|source_err| {
            FilesystemError::ReadFailed {
                path: source.to_string(),
                source: source_err,
            }
        })?;

        let content_type = detail
            .mime_type
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        self.client
            .upload(destination, contents, &content_type)
            .await
            .map_err(|source_err| FilesystemError::WriteFailed {
                path: destination.to_string(),
                source: source_err,
            })?;

        debug!("Copied '{}' to '{}'", source, destination);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::StorageError;
    use crate::features::filesystem::dtos::EntryKind;
    use crate::modules::storage::BoxError;
    use crate::shared::test_helpers::{spawn_stub, stub_config, unreachable_config, Stub};
    use bytes::Bytes;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio_test::assert_ok;

    async fn stub_adapter(stub: &Stub) -> StretchFsAdapter {
        let client = StretchFsClient::new(stub_config(stub)).unwrap();
        StretchFsAdapter::new(client)
    }

    fn plain_text() -> WriteOptions {
        WriteOptions {
            mime_type: Some("text/plain".to_string()),
        }
    }

    #[tokio::test]
    async fn test_exists_and_is_directory_follow_detail() {
        let stub = spawn_stub().await;
        let adapter = stub_adapter(&stub).await;

        adapter
            .write("a.txt", b"ten bytes!".to_vec(), plain_text())
            .await
            .unwrap();
        adapter.create_directory("b").await.unwrap();

        assert!(adapter.exists("a.txt").await);
        assert!(!adapter.is_directory("a.txt").await);
        assert!(adapter.exists("b").await);
        assert!(adapter.is_directory("b").await);
        assert!(!adapter.exists("missing.txt").await);
    }

    #[tokio::test]
    async fn test_exists_collapses_transport_failures() {
        let config = unreachable_config().await;
        let adapter = StretchFsAdapter::new(StretchFsClient::new(config).unwrap());

        // A dead endpoint is indistinguishable from absence here.
        assert!(!adapter.exists("a.txt").await);
        assert!(!adapter.is_directory("a.txt").await);
    }

    #[tokio::test]
    async fn test_try_detail_preserves_the_failure_kind() {
        let config = unreachable_config().await;
        let adapter = StretchFsAdapter::new(StretchFsClient::new(config).unwrap());

        let err = adapter.try_detail("a.txt").await.unwrap_err();
        assert!(matches!(err, StorageError::Transport(_)));

        let stub = spawn_stub().await;
        let adapter = stub_adapter(&stub).await;
        let err = adapter.try_detail("a.txt").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let stub = spawn_stub().await;
        let adapter = stub_adapter(&stub).await;

        let payload = b"arbitrary payload \x00\xff".to_vec();
        adapter
            .write("data.bin", payload.clone(), WriteOptions::default())
            .await
            .unwrap();
        assert_eq!(adapter.read("data.bin").await.unwrap(), payload);

        // Empty payloads round-trip too.
        adapter
            .write("empty.bin", Vec::new(), WriteOptions::default())
            .await
            .unwrap();
        assert_eq!(adapter.read("empty.bin").await.unwrap(), Vec::<u8>::new());
    }

    #[tokio::test]
    async fn test_read_missing_file_is_read_failed() {
        let stub = spawn_stub().await;
        let adapter = stub_adapter(&stub).await;

        let err = adapter.read("missing.txt").await.unwrap_err();
        match err {
            FilesystemError::ReadFailed { path, source } => {
                assert_eq!(path, "missing.txt");
                assert!(matches!(source, StorageError::NotFound { .. }));
            }
            other => panic!("expected ReadFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_stream_round_trip() {
        let stub = spawn_stub().await;
        let adapter = stub_adapter(&stub).await;

        adapter
            .write("streamed.bin", vec![42u8; 2048], WriteOptions::default())
            .await
            .unwrap();

        let mut stream = adapter.read_stream("streamed.bin").await.unwrap();
        let mut collected = Vec::new();
        while let Some(chunk) = stream.next().await {
            collected.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(collected, vec![42u8; 2048]);
    }

    #[tokio::test]
    async fn test_write_stream_uploads_all_chunks() {
        let stub = spawn_stub().await;
        let adapter = stub_adapter(&stub).await;

        let chunks: Vec<Result<Bytes, BoxError>> = vec![
            Ok(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"stretchfs")),
        ];
        let stream: ByteStream = Box::pin(futures::stream::iter(chunks));

        adapter
            .write_stream("greeting.txt", stream, plain_text())
            .await
            .unwrap();
        assert_eq!(adapter.read("greeting.txt").await.unwrap(), b"hello stretchfs");
    }

    #[tokio::test]
    async fn test_write_stream_releases_stream_when_upload_fails() {
        let stub = spawn_stub().await;
        stub.state.reject_uploads();
        let adapter = stub_adapter(&stub).await;

        struct DropFlag(Arc<AtomicBool>);
        impl Drop for DropFlag {
            fn drop(&mut self) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        let released = Arc::new(AtomicBool::new(false));
        let flag = DropFlag(released.clone());
        let stream: ByteStream = Box::pin(
            futures::stream::iter(vec![Ok::<_, BoxError>(Bytes::from_static(b"payload"))])
                .map(move |item| {
                    let _ = &flag;
                    item
                }),
        );

        let err = adapter
            .write_stream("rejected.txt", stream, plain_text())
            .await
            .unwrap_err();
        assert!(matches!(err, FilesystemError::WriteFailed { .. }));
        assert!(
            released.load(Ordering::SeqCst),
            "source stream must be released on the failure path"
        );
    }

    #[tokio::test]
    async fn test_delete_missing_path_is_delete_failed() {
        let stub = spawn_stub().await;
        let adapter = stub_adapter(&stub).await;

        let err = adapter.delete("ghost.txt").await.unwrap_err();
        match err {
            FilesystemError::DeleteFailed { path, source } => {
                assert_eq!(path, "ghost.txt");
                assert!(matches!(source, StorageError::NotFound { .. }));
            }
            other => panic!("expected DeleteFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_directory_removes_contents() {
        let stub = spawn_stub().await;
        let adapter = stub_adapter(&stub).await;

        adapter.create_directory("docs").await.unwrap();
        adapter
            .write("docs/a.txt", b"x".to_vec(), plain_text())
            .await
            .unwrap();

        adapter.delete_directory("docs").await.unwrap();
        assert!(!adapter.exists("docs").await);
        assert!(!adapter.exists("docs/a.txt").await);
    }

    #[tokio::test]
    async fn test_create_directory_twice_leaves_single_listing_entry() {
        let stub = spawn_stub().await;
        let adapter = stub_adapter(&stub).await;

        adapter.create_directory("b").await.unwrap();
        let second = adapter.create_directory("b").await.unwrap_err();
        match second {
            FilesystemError::CreateDirectoryFailed { path, source } => {
                assert_eq!(path, "b");
                assert!(matches!(source, StorageError::AlreadyExists { .. }));
            }
            other => panic!("expected CreateDirectoryFailed, got {:?}", other),
        }

        let entries: Vec<_> = adapter
            .list("", false)
            .map(|entry| entry.unwrap())
            .collect()
            .await;
        let matching: Vec<_> = entries.iter().filter(|e| e.path == "b").collect();
        assert_eq!(matching.len(), 1);
    }

    #[tokio::test]
    async fn test_set_visibility_is_always_unsupported() {
        let stub = spawn_stub().await;
        let adapter = stub_adapter(&stub).await;

        adapter
            .write("a.txt", b"x".to_vec(), plain_text())
            .await
            .unwrap();

        for level in [Visibility::Public, Visibility::Private] {
            let err = adapter.set_visibility("a.txt", level).await.unwrap_err();
            assert!(matches!(
                err,
                FilesystemError::UnsupportedOperation {
                    operation: "set_visibility",
                    ..
                }
            ));
        }
    }

    #[tokio::test]
    async fn test_visibility_reports_unknown() {
        let stub = spawn_stub().await;
        let adapter = stub_adapter(&stub).await;

        assert_eq!(
            adapter.visibility("anything.txt").await.unwrap(),
            Visibility::Unknown
        );
    }

    #[tokio::test]
    async fn test_metadata_trusts_backend_reported_mime_type() {
        let stub = spawn_stub().await;
        let adapter = stub_adapter(&stub).await;

        // The extension says PNG; the backend says text/plain. The
        // backend-reported value wins.
        adapter
            .write("misleading.png", b"not a png".to_vec(), plain_text())
            .await
            .unwrap();

        let metadata = adapter.metadata("misleading.png").await.unwrap();
        assert_eq!(metadata.mime_type, Some("text/plain".to_string()));
        assert_eq!(metadata.size, 9);
    }

    #[tokio::test]
    async fn test_metadata_missing_path_is_metadata_unavailable() {
        let stub = spawn_stub().await;
        let adapter = stub_adapter(&stub).await;

        let err = adapter.metadata("missing.txt").await.unwrap_err();
        assert!(matches!(err, FilesystemError::MetadataUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_shallow_list_scenario() {
        let stub = spawn_stub().await;
        let adapter = stub_adapter(&stub).await;

        adapter
            .write("a.txt", b"ten bytes!".to_vec(), plain_text())
            .await
            .unwrap();
        adapter.create_directory("b").await.unwrap();

        let entries: Vec<_> = adapter
            .list("", false)
            .map(|entry| entry.unwrap())
            .collect()
            .await;
        assert_eq!(entries.len(), 2);

        let file = entries.iter().find(|e| e.path == "a.txt").unwrap();
        assert_eq!(file.kind, EntryKind::File);
        assert_eq!(file.size, 10);
        assert_eq!(file.mime_type, Some("text/plain".to_string()));

        let dir = entries.iter().find(|e| e.path == "b").unwrap();
        assert_eq!(dir.kind, EntryKind::Dir);
        assert_eq!(dir.size, 0);
    }

    #[tokio::test]
    async fn test_deep_list_includes_nested_files() {
        let stub = spawn_stub().await;
        let adapter = stub_adapter(&stub).await;

        adapter.create_directory("docs").await.unwrap();
        adapter
            .write("docs/inner.txt", b"x".to_vec(), plain_text())
            .await
            .unwrap();
        adapter
            .write("top.txt", b"x".to_vec(), plain_text())
            .await
            .unwrap();

        let shallow: Vec<_> = adapter
            .list("", false)
            .map(|entry| entry.unwrap().path)
            .collect()
            .await;
        assert_eq!(shallow, vec!["docs", "top.txt"]);

        let deep: Vec<_> = adapter
            .list("", true)
            .map(|entry| entry.unwrap().path)
            .collect()
            .await;
        assert_eq!(deep, vec!["docs", "docs/inner.txt", "top.txt"]);
    }

    #[tokio::test]
    async fn test_temporary_url_in_the_past_fails_without_network() {
        // Unreachable endpoint proves the expiry check happens first.
        let config = unreachable_config().await;
        let adapter = StretchFsAdapter::new(StretchFsClient::new(config).unwrap());

        let expired = Utc::now() - chrono::Duration::seconds(10);
        let err = adapter.temporary_url("a.txt", expired).await.unwrap_err();
        match err {
            FilesystemError::UrlGenerationFailed { source, .. } => assert!(source.is_none()),
            other => panic!("expected UrlGenerationFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_temporary_url_encodes_requested_lifetime() {
        let stub = spawn_stub().await;
        let adapter = stub_adapter(&stub).await;

        adapter
            .write("a.txt", b"x".to_vec(), plain_text())
            .await
            .unwrap();

        let expires_at = Utc::now() + chrono::Duration::seconds(60);
        let url = adapter.temporary_url("a.txt", expires_at).await.unwrap();

        let encoded = url
            .rsplit_once("expires=")
            .and_then(|(_, secs)| secs.parse::<u64>().ok())
            .unwrap();
        assert!((58..=60).contains(&encoded), "lifetime was {}", encoded);
    }

    #[tokio::test]
    async fn test_public_url_has_no_expiry() {
        let stub = spawn_stub().await;
        let adapter = stub_adapter(&stub).await;

        adapter
            .write("a.txt", b"x".to_vec(), plain_text())
            .await
            .unwrap();

        let url = adapter.public_url("a.txt").await.unwrap();
        assert!(url.contains("a.txt"));
        assert!(!url.contains("expires="));
    }

    #[tokio::test]
    async fn test_copy_duplicates_contents_and_mime_type() {
        let stub = spawn_stub().await;
        let adapter = stub_adapter(&stub).await;

        adapter
            .write("src.txt", b"copied bytes".to_vec(), plain_text())
            .await
            .unwrap();
        adapter.copy("src.txt", "backup/dst.txt").await.unwrap();

        assert_eq!(adapter.read("src.txt").await.unwrap(), b"copied bytes");
        assert_eq!(
            adapter.read("backup/dst.txt").await.unwrap(),
            b"copied bytes"
        );
        let metadata = adapter.metadata("backup/dst.txt").await.unwrap();
        assert_eq!(metadata.mime_type, Some("text/plain".to_string()));
    }

    #[tokio::test]
    async fn test_move_removes_the_source() {
        let stub = spawn_stub().await;
        let adapter = stub_adapter(&stub).await;

        adapter
            .write("old.txt", b"relocated".to_vec(), plain_text())
            .await
            .unwrap();
        adapter.move_file("old.txt", "new.txt").await.unwrap();

        assert!(!adapter.exists("old.txt").await);
        assert_eq!(adapter.read("new.txt").await.unwrap(), b"relocated");
    }

    #[tokio::test]
    async fn test_copy_missing_source_is_read_failed() {
        let stub = spawn_stub().await;
        let adapter = stub_adapter(&stub).await;

        let err = adapter.copy("ghost.txt", "dst.txt").await.unwrap_err();
        match err {
            FilesystemError::ReadFailed { path, source } => {
                assert_eq!(path, "ghost.txt");
                assert!(matches!(source, StorageError::NotFound { .. }));
            }
            other => panic!("expected ReadFailed, got {:?}", other),
        }
        assert!(!adapter.exists("dst.txt").await);
    }

    #[tokio::test]
    async fn test_write_failure_is_write_failed_with_cause() {
        let stub = spawn_stub().await;
        stub.state.reject_uploads();
        let adapter = stub_adapter(&stub).await;

        let err = adapter
            .write("a.txt", b"x".to_vec(), plain_text())
            .await
            .unwrap_err();
        match err {
            FilesystemError::WriteFailed { path, source } => {
                assert_eq!(path, "a.txt");
                assert!(matches!(source, StorageError::RemoteRejected { .. }));
            }
            other => panic!("expected WriteFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_adapter_is_usable_through_the_trait_object() {
        let stub = spawn_stub().await;
        let adapter: Arc<dyn FilesystemOperator> = Arc::new(stub_adapter(&stub).await);

        assert_ok!(
            adapter
                .write("dyn.txt", b"via dyn".to_vec(), plain_text())
                .await
        );
        assert_eq!(adapter.read("dyn.txt").await.unwrap(), b"via dyn");
    }
}
