//! StretchFS HTTP client
//!
//! Translates logical storage operations into authenticated requests
//! against one configured endpoint and parses responses into the wire
//! types. One attempt per call; retry policy belongs to the caller.

use std::collections::VecDeque;
use std::time::Duration;

use futures::TryStreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::config::StorageConfig;
use crate::core::error::{Result, StorageError};
use crate::modules::storage::types::{
    BoxError, ByteStream, EntryStream, FileDetail, ListingPage, SignedUrl,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DownloadUrlRequest {
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    life_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct DownloadUrlResponse {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Client for the StretchFS file API.
///
/// Owns the HTTP session (endpoint plus bearer token) and is cheap to
/// clone; the underlying connection pool is shared. Safe for concurrent
/// use. The request timeout comes from [`StorageConfig`] and applies to
/// every call; there is no per-call override.
#[derive(Clone)]
pub struct StretchFsClient {
    http_client: reqwest::Client,
    endpoint: String,
    auth_token: String,
}

impl StretchFsClient {
    pub fn new(config: StorageConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http_client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            auth_token: config.auth_token,
        })
    }

    fn url(&self, route: &str) -> String {
        format!("{}/api/{}", self.endpoint, route)
    }

    /// Map a non-success response onto the error taxonomy. The body is
    /// captured for diagnostics; structured `{error}`/`{message}` payloads
    /// are unwrapped, anything else is kept verbatim.
    async fn check_status(path: &str, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::NOT_FOUND => Err(StorageError::NotFound {
                path: path.to_string(),
            }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(StorageError::Unauthorized),
            StatusCode::CONFLICT => Err(StorageError::AlreadyExists {
                path: path.to_string(),
            }),
            _ => {
                let body = response.text().await.unwrap_or_default();
                let message = match serde_json::from_str::<ErrorBody>(&body) {
                    Ok(parsed) => parsed.error.or(parsed.message).unwrap_or(body),
                    Err(_) => body,
                };
                Err(StorageError::RemoteRejected {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    /// Fetch the attributes of a file or folder.
    pub async fn detail(&self, path: &str) -> Result<FileDetail> {
        let url = format!(
            "{}?path={}",
            self.url("file/detail"),
            urlencoding::encode(path)
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.auth_token)
            .send()
            .await?;
        let response = Self::check_status(path, response).await?;

        Ok(response.json::<FileDetail>().await?)
    }

    /// Upload a full in-memory payload, overwriting any existing file.
    pub async fn upload(&self, path: &str, contents: Vec<u8>, content_type: &str) -> Result<()> {
        let size = contents.len();
        let url = self.upload_url(path);

        let response = self
            .http_client
            .put(&url)
            .bearer_auth(&self.auth_token)
            .header(CONTENT_TYPE, content_type)
            .body(contents)
            .send()
            .await?;
        Self::check_status(path, response).await?;

        debug!("Uploaded {} bytes to '{}'", size, path);
        Ok(())
    }

    /// Upload from a byte stream without buffering the whole payload.
    ///
    /// Ownership of the stream transfers to this call; it is consumed (or
    /// dropped, on failure) before the call returns.
    pub async fn upload_stream(
        &self,
        path: &str,
        stream: ByteStream,
        content_type: &str,
    ) -> Result<()> {
        let url = self.upload_url(path);

        let response = self
            .http_client
            .put(&url)
            .bearer_auth(&self.auth_token)
            .header(CONTENT_TYPE, content_type)
            .body(reqwest::Body::wrap_stream(stream))
            .send()
            .await?;
        Self::check_status(path, response).await?;

        debug!("Uploaded stream to '{}'", path);
        Ok(())
    }

    fn upload_url(&self, path: &str) -> String {
        // The backend addresses uploads by parent folder and file name.
        let (folder, name) = split_path(path);
        format!(
            "{}?folder={}&name={}",
            self.url("file/upload"),
            urlencoding::encode(folder),
            urlencoding::encode(name)
        )
    }

    /// Download a file fully into memory.
    pub async fn download(&self, path: &str) -> Result<Vec<u8>> {
        let url = format!(
            "{}?path={}",
            self.url("file/download"),
            urlencoding::encode(path)
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.auth_token)
            .send()
            .await?;
        let response = Self::check_status(path, response).await?;

        let contents = response.bytes().await?.to_vec();
        debug!("Downloaded {} bytes from '{}'", contents.len(), path);
        Ok(contents)
    }

    /// Download a file as a byte stream the caller owns.
    ///
    /// Failures before the first byte are returned here; failures mid-read
    /// surface as an error item on the stream.
    pub async fn download_stream(&self, path: &str) -> Result<ByteStream> {
        let url = format!(
            "{}?path={}",
            self.url("file/download"),
            urlencoding::encode(path)
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.auth_token)
            .send()
            .await?;
        let response = Self::check_status(path, response).await?;

        debug!("Streaming download from '{}'", path);
        Ok(Box::pin(response.bytes_stream().map_err(|e| -> BoxError {
            StorageError::Transport(e).into()
        })))
    }

    /// Delete a file. Not idempotent: deleting a missing path fails with
    /// `NotFound`.
    pub async fn delete_file(&self, path: &str) -> Result<()> {
        let url = format!("{}?path={}", self.url("file"), urlencoding::encode(path));

        let response = self
            .http_client
            .delete(&url)
            .bearer_auth(&self.auth_token)
            .send()
            .await?;
        Self::check_status(path, response).await?;

        debug!("Deleted file '{}'", path);
        Ok(())
    }

    /// Delete a folder; removal of its contents is recursive backend-side.
    pub async fn delete_folder(&self, path: &str) -> Result<()> {
        let url = format!("{}?path={}", self.url("folder"), urlencoding::encode(path));

        let response = self
            .http_client
            .delete(&url)
            .bearer_auth(&self.auth_token)
            .send()
            .await?;
        Self::check_status(path, response).await?;

        debug!("Deleted folder '{}'", path);
        Ok(())
    }

    /// Create a folder. Fails with `AlreadyExists` when the backend
    /// distinguishes the case.
    pub async fn create_folder(&self, path: &str) -> Result<()> {
        let url = format!("{}?path={}", self.url("folder"), urlencoding::encode(path));

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.auth_token)
            .send()
            .await?;
        Self::check_status(path, response).await?;

        debug!("Created folder '{}'", path);
        Ok(())
    }

    /// List a folder as a lazy stream of entries, following the backend's
    /// pagination markers as the stream is consumed. One pass per call;
    /// the stream is not restartable. `recursive=false` yields immediate
    /// children only.
    pub fn list(&self, path: &str, recursive: bool) -> EntryStream {
        let cursor = ListCursor {
            client: self.clone(),
            path: path.to_string(),
            recursive,
            buffered: VecDeque::new(),
            next_request: Some(None),
        };

        Box::pin(futures::stream::try_unfold(cursor, |mut cursor| async move {
            loop {
                if let Some(entry) = cursor.buffered.pop_front() {
                    return Ok(Some((entry, cursor)));
                }
                let Some(marker) = cursor.next_request.take() else {
                    return Ok(None);
                };
                let page = cursor
                    .client
                    .list_page(&cursor.path, cursor.recursive, marker.as_deref())
                    .await?;
                cursor.buffered.extend(page.entries);
                cursor.next_request = page.next_marker.map(Some);
            }
        }))
    }

    async fn list_page(
        &self,
        path: &str,
        recursive: bool,
        marker: Option<&str>,
    ) -> Result<ListingPage> {
        let mut url = format!(
            "{}?path={}&recursive={}",
            self.url("file/list"),
            urlencoding::encode(path),
            recursive
        );
        if let Some(marker) = marker {
            url.push_str(&format!("&marker={}", urlencoding::encode(marker)));
        }

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.auth_token)
            .send()
            .await?;
        let response = Self::check_status(path, response).await?;

        Ok(response.json::<ListingPage>().await?)
    }

    /// Ask the backend for a download URL. A `life` of `None` leaves the
    /// lifetime to backend policy (default expiry or a permanent public
    /// link); that choice is not made client-side.
    pub async fn download_url(&self, path: &str, life: Option<Duration>) -> Result<SignedUrl> {
        let request = DownloadUrlRequest {
            path: path.to_string(),
            life_secs: life.map(|d| d.as_secs()),
        };

        let response = self
            .http_client
            .post(self.url("file/download-url"))
            .bearer_auth(&self.auth_token)
            .json(&request)
            .send()
            .await?;
        let response = Self::check_status(path, response).await?;

        let parsed = response.json::<DownloadUrlResponse>().await?;
        debug!("Generated download url for '{}'", path);
        Ok(SignedUrl {
            url: parsed.url,
            life,
        })
    }
}

/// Split a logical path into parent folder and base name. The only place
/// the client interprets a path; everywhere else it is opaque.
fn split_path(path: &str) -> (&str, &str) {
    let trimmed = path.trim_matches('/');
    match trimmed.rsplit_once('/') {
        Some((folder, name)) => (folder, name),
        None => ("", trimmed),
    }
}

struct ListCursor {
    client: StretchFsClient,
    path: String,
    recursive: bool,
    buffered: VecDeque<crate::modules::storage::types::ListingEntry>,
    // Some(marker) = another page to request; None = exhausted
    next_request: Option<Option<String>>,
}
