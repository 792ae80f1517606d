//! Shared test doubles: a scripted in-process [`Backend`] and an HTTP mock
//! of the backend service built on axum.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chunkwise::backend::{
    ArchiveUpload, Backend, ChunkUpdateRequest, ChunksResponse, FilePart, SendChatRequest,
    SendChatResponse,
};
use chunkwise::error::{Error, Result};
use chunkwise::hash::chunk_hash;
use chunkwise::models::{ChatMessage, Chunk, ChunkStatus, SessionMeta};
use serde_json::{json, Value};

/// A chunk as the backend would return it on load.
pub fn remote_chunk(filename: &str, page: i64, content: &str) -> Chunk {
    let filetype = filename.rsplit_once('.').map(|(_, e)| e).unwrap_or("txt");
    let backend_id = page.to_string();
    Chunk {
        chunk_id: backend_id.clone(),
        chunk_hash: chunk_hash(filename, filetype, &backend_id, content),
        previous_hash: None,
        filename: filename.to_string(),
        filetype: filetype.to_string(),
        page_number: page,
        page_content: content.to_string(),
        status: ChunkStatus::New,
        last_edited: None,
        original_hash: None,
    }
}

pub fn session(id: &str, name: &str) -> SessionMeta {
    SessionMeta {
        id: id.to_string(),
        created_at: "2025-01-01T00:00:00Z".to_string(),
        name: Some(name.to_string()),
        archive_name: None,
        archive_size: None,
    }
}

// ─── In-process fake ────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeState {
    /// Backend-of-record chunks per session.
    pub chunks: HashMap<String, Vec<Chunk>>,
    pub sessions: Vec<SessionMeta>,
    /// Endpoint names that answer with an error.
    pub failing: HashSet<&'static str>,
    /// Endpoint names in call order.
    pub calls: Vec<&'static str>,
    pub updates: Vec<ChunkUpdateRequest>,
    pub uploads: Vec<(String, String, Vec<String>)>,
    pub created: Option<Value>,
    pub chat_reply: Option<ChatMessage>,
    pub chat_messages: Option<Vec<ChatMessage>>,
    pub chat_requests: Vec<SendChatRequest>,
}

#[derive(Default)]
pub struct FakeBackend {
    pub state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_chunks(session_id: &str, chunks: Vec<Chunk>) -> Arc<Self> {
        let fake = Self::default();
        fake.state
            .lock()
            .unwrap()
            .chunks
            .insert(session_id.to_string(), chunks);
        Arc::new(fake)
    }

    pub fn fail(&self, endpoint: &'static str) {
        self.state.lock().unwrap().failing.insert(endpoint);
    }

    pub fn recover(&self, endpoint: &'static str) {
        self.state.lock().unwrap().failing.remove(endpoint);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn enter(&self, endpoint: &'static str) -> Result<std::sync::MutexGuard<'_, FakeState>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(endpoint);
        if state.failing.contains(endpoint) {
            return Err(Error::backend(
                Some(500),
                Some(format!("{} unavailable", endpoint)),
                "fallback",
            ));
        }
        Ok(state)
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn get_chunks(&self, session_id: &str) -> Result<ChunksResponse> {
        let state = self.enter("get_chunks")?;
        Ok(ChunksResponse {
            session_id: session_id.to_string(),
            chunks: state.chunks.get(session_id).cloned().unwrap_or_default(),
        })
    }

    async fn update_chunks(&self, request: &ChunkUpdateRequest) -> Result<Value> {
        let mut state = self.enter("update_chunks")?;
        state.updates.push(request.clone());
        // Persist like the real service: deleted chunks disappear.
        let kept: Vec<Chunk> = request
            .documents
            .iter()
            .filter(|c| c.status != ChunkStatus::Deleted)
            .cloned()
            .collect();
        state.chunks.insert(request.session_id.clone(), kept);
        Ok(json!({"status": "success", "message": "Chunks updated"}))
    }

    async fn upload_files(
        &self,
        session_id: &str,
        session_name: &str,
        files: Vec<FilePart>,
    ) -> Result<Value> {
        let mut state = self.enter("upload_files")?;
        state.uploads.push((
            session_id.to_string(),
            session_name.to_string(),
            files.into_iter().map(|f| f.file_name).collect(),
        ));
        Ok(json!({"status": "success", "message": "Files Added"}))
    }

    async fn list_sessions(&self) -> Result<Vec<SessionMeta>> {
        let state = self.enter("list_sessions")?;
        Ok(state.sessions.clone())
    }

    async fn create_session(&self, archive: ArchiveUpload, name: Option<&str>) -> Result<Value> {
        let state = self.enter("create_session")?;
        Ok(state.created.clone().unwrap_or_else(|| {
            json!({
                "id": "server-id",
                "createdAt": "2025-02-02T00:00:00Z",
                "name": name.map(str::to_string).unwrap_or(archive.file_name),
            })
        }))
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        let mut state = self.enter("delete_session")?;
        state.sessions.retain(|s| s.id != session_id);
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> Result<Value> {
        let state = self.enter("get_session")?;
        state
            .sessions
            .iter()
            .find(|s| s.id == session_id)
            .map(|s| serde_json::to_value(s).unwrap())
            .ok_or_else(|| Error::backend(Some(404), Some("Session not found".into()), "x"))
    }

    async fn send_chat(&self, request: &SendChatRequest) -> Result<SendChatResponse> {
        let mut state = self.enter("send_chat")?;
        state.chat_requests.push(request.clone());
        Ok(SendChatResponse {
            session_id: request.session_id.clone(),
            reply: state
                .chat_reply
                .clone()
                .unwrap_or_else(|| ChatMessage::assistant("hello")),
            messages: state.chat_messages.clone(),
        })
    }
}

// ─── HTTP mock ──────────────────────────────────────────────────────

/// What the mock server has seen.
#[derive(Default)]
pub struct MockRecord {
    pub updates: Vec<Value>,
    /// `(field name, file name, content type, size)` of multipart file parts.
    pub upload_parts: Vec<(String, String, String, usize)>,
    /// Text fields of multipart requests.
    pub form_fields: Vec<(String, String)>,
    pub deleted: Vec<String>,
    pub chat_bodies: Vec<Value>,
}

#[derive(Clone, Default)]
pub struct MockServer {
    pub record: Arc<Mutex<MockRecord>>,
    pub chunks: Arc<Mutex<HashMap<String, Vec<Chunk>>>>,
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"detail": "Session not found"})),
    )
        .into_response()
}

async fn get_chunks_handler(State(s): State<MockServer>, Path(id): Path<String>) -> Response {
    let chunks = s.chunks.lock().unwrap();
    match chunks.get(&id) {
        Some(list) => Json(json!({"session_id": id, "chunks": list})).into_response(),
        None => not_found(),
    }
}

async fn update_handler(State(s): State<MockServer>, Json(body): Json<Value>) -> Response {
    let session_id = body["session_id"].as_str().unwrap_or_default().to_string();
    let docs: Vec<Chunk> = serde_json::from_value(body["documents"].clone()).unwrap_or_default();
    let kept: Vec<Chunk> = docs
        .into_iter()
        .filter(|c| c.status != ChunkStatus::Deleted)
        .collect();
    s.chunks.lock().unwrap().insert(session_id, kept);
    s.record.lock().unwrap().updates.push(body);
    Json(json!({"status": "success", "message": "Chunks updated"})).into_response()
}

async fn read_multipart(s: &MockServer, mut multipart: Multipart) -> Vec<(String, Option<String>, Vec<u8>)> {
    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field.bytes().await.unwrap().to_vec();
        {
            let mut record = s.record.lock().unwrap();
            match &file_name {
                Some(f) => record
                    .upload_parts
                    .push((name.clone(), f.clone(), content_type, data.len())),
                None => record
                    .form_fields
                    .push((name.clone(), String::from_utf8_lossy(&data).to_string())),
            }
        }
        fields.push((name, file_name, data));
    }
    fields
}

async fn upload_handler(State(s): State<MockServer>, multipart: Multipart) -> Response {
    let fields = read_multipart(&s, multipart).await;
    let files: Vec<String> = fields
        .iter()
        .filter(|(n, f, _)| n == "files" && f.is_some())
        .filter_map(|(_, f, _)| f.clone())
        .collect();
    if files.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "No files uploaded"})),
        )
            .into_response();
    }
    Json(json!({"status": "success", "message": "Files Added"})).into_response()
}

async fn list_sessions_handler() -> Response {
    Json(json!([
        {"id": "s1", "createdAt": "2025-01-01T00:00:00Z", "name": "alpha"},
        {"id": "s2", "createdAt": "2025-01-02T00:00:00Z"}
    ]))
    .into_response()
}

async fn create_session_handler(State(s): State<MockServer>, multipart: Multipart) -> Response {
    let fields = read_multipart(&s, multipart).await;
    let archive = fields.iter().find(|(n, _, _)| n == "archive");
    let name = fields
        .iter()
        .find(|(n, _, _)| n == "name")
        .map(|(_, _, d)| String::from_utf8_lossy(d).to_string());
    match archive {
        Some((_, Some(file_name), data)) => Json(json!({
            "sessionId": "created-1",
            "createdAt": "2025-03-03T00:00:00Z",
            "name": name.unwrap_or_else(|| file_name.trim_end_matches(".zip").to_string()),
            "archiveName": file_name,
            "archiveSize": data.len(),
        }))
        .into_response(),
        _ => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": [{"loc": ["body", "archive"], "msg": "field required"}]})),
        )
            .into_response(),
    }
}

async fn delete_session_handler(State(s): State<MockServer>, Path(id): Path<String>) -> Response {
    if id == "missing" {
        return not_found();
    }
    s.record.lock().unwrap().deleted.push(id.clone());
    Json(json!({"status": "success", "message": format!("Session {} deleted", id)})).into_response()
}

async fn get_session_handler(Path(id): Path<String>) -> Response {
    if id == "missing" {
        return not_found();
    }
    Json(json!({"id": id, "createdAt": "2025-01-01T00:00:00Z"})).into_response()
}

async fn chat_handler(State(s): State<MockServer>, Json(body): Json<Value>) -> Response {
    let last = body["messages"]
        .as_array()
        .and_then(|m| m.last())
        .and_then(|m| m["content"].as_str())
        .unwrap_or_default()
        .to_string();
    s.record.lock().unwrap().chat_bodies.push(body.clone());
    if last == "boom" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "model crashed").into_response();
    }
    Json(json!({
        "session_id": body["session_id"],
        "reply": {"role": "assistant", "content": format!("echo: {}", last)},
    }))
    .into_response()
}

impl MockServer {
    pub fn with_chunks(session_id: &str, chunks: Vec<Chunk>) -> Self {
        let server = Self::default();
        server
            .chunks
            .lock()
            .unwrap()
            .insert(session_id.to_string(), chunks);
        server
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/api/chunks/update", post(update_handler))
            .route("/api/chunks/{id}", get(get_chunks_handler))
            .route("/api/files/upload", post(upload_handler))
            .route(
                "/api/sessions",
                get(list_sessions_handler).post(create_session_handler),
            )
            .route(
                "/api/session/{id}",
                delete(delete_session_handler).get(get_session_handler),
            )
            .route("/api/chat/send", post(chat_handler))
            .with_state(self.clone())
    }

    /// Serve on an ephemeral port; returns the API base URL.
    pub async fn spawn(&self) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        let app = self.router();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/api", addr)
    }
}
