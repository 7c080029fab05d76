//! In-memory StretchFS stub used by client and adapter tests.
//!
//! Serves the wire API over a real local socket so tests exercise the
//! full reqwest path, including status mapping and streamed bodies.

use std::collections::BTreeMap;
use std::net::TcpListener as StdTcpListener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::core::config::StorageConfig;
use crate::modules::storage::{ListingEntry, ListingPage};

pub const STUB_TOKEN: &str = "stub-secret-token";

const PAGE_SIZE: usize = 2;

#[derive(Clone)]
struct StoredFile {
    data: Vec<u8>,
    mime: Option<String>,
    updated_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct StubState {
    files: Mutex<BTreeMap<String, StoredFile>>,
    folders: Mutex<BTreeMap<String, DateTime<Utc>>>,
    reject_uploads: AtomicBool,
}

impl StubState {
    /// Make every subsequent upload fail with a semantic rejection.
    pub fn reject_uploads(&self) {
        self.reject_uploads.store(true, Ordering::SeqCst);
    }
}

pub struct Stub {
    pub endpoint: String,
    pub state: Arc<StubState>,
}

/// Start the stub on an ephemeral local port and return its endpoint.
pub async fn spawn_stub() -> Stub {
    let state = Arc::new(StubState::default());
    let app = stub_router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    init_tracing();
    Stub { endpoint, state }
}

/// Config pointing at a running stub, with the token it accepts.
pub fn stub_config(stub: &Stub) -> StorageConfig {
    StorageConfig::new(stub.endpoint.clone(), STUB_TOKEN)
}

/// Config pointing at a port nothing listens on, for transport failures.
pub async fn unreachable_config() -> StorageConfig {
    // Bind then drop to get a port that is very likely unused.
    let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    StorageConfig::new(endpoint, STUB_TOKEN)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn stub_router(state: Arc<StubState>) -> Router {
    Router::new()
        .route("/api/file/detail", get(file_detail))
        .route("/api/file/upload", put(file_upload))
        .route("/api/file/download", get(file_download))
        .route("/api/file/list", get(file_list))
        .route("/api/file/download-url", post(download_url))
        .route("/api/file", delete(file_delete))
        .route("/api/folder", post(folder_create).delete(folder_delete))
        .with_state(state)
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", STUB_TOKEN))
        .unwrap_or(false)
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad token"}))).into_response()
}

fn not_found(path: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": format!("no such path: {}", path)})),
    )
        .into_response()
}

fn normalize(path: &str) -> String {
    path.trim_matches('/').to_string()
}

#[derive(Deserialize)]
struct PathQuery {
    #[serde(default)]
    path: String,
}

#[derive(Deserialize)]
struct UploadQuery {
    #[serde(default)]
    folder: String,
    name: String,
}

#[derive(Deserialize)]
struct ListQuery {
    #[serde(default)]
    path: String,
    #[serde(default)]
    recursive: bool,
    #[serde(default)]
    marker: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DownloadUrlBody {
    path: String,
    life_secs: Option<u64>,
}

fn entry_for_file(path: &str, file: &StoredFile) -> ListingEntry {
    ListingEntry {
        path: path.to_string(),
        folder: false,
        size: file.data.len() as i64,
        mime_type: file.mime.clone(),
        updated_at: file.updated_at,
    }
}

fn entry_for_folder(path: &str, created_at: DateTime<Utc>) -> ListingEntry {
    ListingEntry {
        path: path.to_string(),
        folder: true,
        size: 0,
        mime_type: None,
        updated_at: created_at,
    }
}

async fn file_detail(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Query(query): Query<PathQuery>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let path = normalize(&query.path);

    if let Some(created_at) = state.folders.lock().unwrap().get(&path) {
        return Json(entry_for_folder(&path, *created_at)).into_response();
    }
    if let Some(file) = state.files.lock().unwrap().get(&path) {
        return Json(entry_for_file(&path, file)).into_response();
    }
    not_found(&path)
}

async fn file_upload(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if state.reject_uploads.load(Ordering::SeqCst) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"error": "quota exceeded"})),
        )
            .into_response();
    }

    let path = if query.folder.is_empty() {
        query.name.clone()
    } else {
        format!("{}/{}", normalize(&query.folder), query.name)
    };
    let mime = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    state.files.lock().unwrap().insert(
        path,
        StoredFile {
            data: body.to_vec(),
            mime,
            updated_at: Utc::now(),
        },
    );
    StatusCode::OK.into_response()
}

async fn file_download(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Query(query): Query<PathQuery>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let path = normalize(&query.path);

    match state.files.lock().unwrap().get(&path) {
        Some(file) => file.data.clone().into_response(),
        None => not_found(&path),
    }
}

async fn file_delete(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Query(query): Query<PathQuery>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let path = normalize(&query.path);

    match state.files.lock().unwrap().remove(&path) {
        Some(_) => StatusCode::OK.into_response(),
        None => not_found(&path),
    }
}

async fn folder_create(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Query(query): Query<PathQuery>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let path = normalize(&query.path);

    let mut folders = state.folders.lock().unwrap();
    if folders.contains_key(&path) {
        return (
            StatusCode::CONFLICT,
            Json(json!({"error": "folder already exists"})),
        )
            .into_response();
    }
    folders.insert(path, Utc::now());
    StatusCode::OK.into_response()
}

async fn folder_delete(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Query(query): Query<PathQuery>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let path = normalize(&query.path);

    let removed = state.folders.lock().unwrap().remove(&path);
    if removed.is_none() {
        return not_found(&path);
    }

    // Folder removal is recursive on the real backend.
    let prefix = format!("{}/", path);
    state
        .files
        .lock()
        .unwrap()
        .retain(|key, _| !key.starts_with(&prefix));
    state
        .folders
        .lock()
        .unwrap()
        .retain(|key, _| !key.starts_with(&prefix));
    StatusCode::OK.into_response()
}

async fn file_list(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let base = normalize(&query.path);

    let mut entries = Vec::new();
    for (path, created_at) in state.folders.lock().unwrap().iter() {
        if is_within(&base, path, query.recursive) {
            entries.push(entry_for_folder(path, *created_at));
        }
    }
    for (path, file) in state.files.lock().unwrap().iter() {
        if is_within(&base, path, query.recursive) {
            entries.push(entry_for_file(path, file));
        }
    }
    entries.sort_by(|a, b| a.path.cmp(&b.path));

    let offset = query
        .marker
        .as_deref()
        .and_then(|m| m.parse::<usize>().ok())
        .unwrap_or(0);
    let page: Vec<ListingEntry> = entries.iter().skip(offset).take(PAGE_SIZE).cloned().collect();
    let next_marker = if offset + page.len() < entries.len() {
        Some((offset + page.len()).to_string())
    } else {
        None
    };

    Json(ListingPage {
        entries: page,
        next_marker,
    })
    .into_response()
}

fn is_within(base: &str, candidate: &str, recursive: bool) -> bool {
    let relative = if base.is_empty() {
        candidate
    } else {
        match candidate.strip_prefix(&format!("{}/", base)) {
            Some(rest) => rest,
            None => return false,
        }
    };
    !relative.is_empty() && (recursive || !relative.contains('/'))
}

async fn download_url(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<DownloadUrlBody>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let path = normalize(&body.path);

    if !state.files.lock().unwrap().contains_key(&path) {
        return not_found(&path);
    }

    let url = match body.life_secs {
        Some(secs) => format!("http://stub.local/dl/{}?expires={}", path, secs),
        None => format!("http://stub.local/dl/{}", path),
    };
    Json(json!({"url": url})).into_response()
}
