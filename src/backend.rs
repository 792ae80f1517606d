//! Backend client.
//!
//! [`Backend`] is the seam between the controllers and the REST backend of
//! record. [`HttpBackend`] talks to the real service over `reqwest`; tests
//! plug in scripted fakes.
//!
//! # Endpoints
//!
//! | Method | Path | Trait method |
//! |--------|------|--------------|
//! | `GET` | `/chunks/{session_id}` | [`get_chunks`](Backend::get_chunks) |
//! | `POST` | `/chunks/update` | [`update_chunks`](Backend::update_chunks) |
//! | `POST` | `/files/upload` (multipart) | [`upload_files`](Backend::upload_files) |
//! | `GET` | `/sessions` | [`list_sessions`](Backend::list_sessions) |
//! | `POST` | `/sessions` (multipart) | [`create_session`](Backend::create_session) |
//! | `DELETE` | `/session/{id}` | [`delete_session`](Backend::delete_session) |
//! | `GET` | `/session/{id}` | [`get_session`](Backend::get_session) |
//! | `POST` | `/chat/send` | [`send_chat`](Backend::send_chat) |
//!
//! Paths are relative to the configured `api.base_url`.
//!
//! # Errors
//!
//! Transport failures and non-2xx answers become
//! [`Error::Backend`](crate::error::Error::Backend). The message is pulled
//! from the response body when it carries one, otherwise a generic
//! per-endpoint string is used. No request is ever retried.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ApiConfig;
use crate::error::{extract_message, Error, Result};
use crate::models::{ChatMessage, ChatModel, Chunk, SessionMeta};

/// `GET /chunks/{session_id}` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunksResponse {
    pub session_id: String,
    #[serde(default)]
    pub chunks: Vec<Chunk>,
}

/// `POST /chunks/update` body: the full chunk collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkUpdateRequest {
    pub session_id: String,
    pub session_name: String,
    pub documents: Vec<Chunk>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendChatRequest {
    pub session_id: String,
    pub messages: Vec<ChatMessage>,
    pub model: ChatModel,
}

/// `POST /chat/send` response.
///
/// `messages`, when present and non-empty, is the authoritative transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendChatResponse {
    pub session_id: String,
    pub reply: ChatMessage,
    #[serde(default)]
    pub messages: Option<Vec<ChatMessage>>,
}

/// One file in a multipart upload.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub file_name: String,
    pub data: Vec<u8>,
}

impl FilePart {
    pub fn new(file_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            data,
        }
    }

    fn into_part(self) -> Result<Part> {
        let mime = mime_guess::from_path(&self.file_name).first_or_octet_stream();
        Part::bytes(self.data)
            .file_name(self.file_name)
            .mime_str(mime.essence_str())
            .map_err(|e| Error::validation(format!("invalid upload part: {}", e)))
    }
}

/// The archive a session is created from.
pub type ArchiveUpload = FilePart;

/// Operations the editor needs from its backend of record.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn get_chunks(&self, session_id: &str) -> Result<ChunksResponse>;

    /// Send the full chunk collection. The success payload is opaque.
    async fn update_chunks(&self, request: &ChunkUpdateRequest) -> Result<Value>;

    async fn upload_files(
        &self,
        session_id: &str,
        session_name: &str,
        files: Vec<FilePart>,
    ) -> Result<Value>;

    async fn list_sessions(&self) -> Result<Vec<SessionMeta>>;

    /// Create a session from an archive. The raw record is returned because
    /// the id field name varies between backend versions.
    async fn create_session(&self, archive: ArchiveUpload, name: Option<&str>) -> Result<Value>;

    async fn delete_session(&self, session_id: &str) -> Result<()>;

    async fn get_session(&self, session_id: &str) -> Result<Value>;

    async fn send_chat(&self, request: &SendChatRequest) -> Result<SendChatResponse>;
}

/// [`Backend`] over HTTP.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::backend(None, Some(e.to_string()), "Failed to build HTTP client"))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `{base}/{collection}/{id}` with `id` percent-encoded as a single
    /// path segment.
    fn resource_url(&self, collection: &str, id: &str, fallback: &str) -> Result<Url> {
        let invalid =
            || Error::backend(None, Some(format!("{}: invalid base URL", fallback)), fallback);
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .push(collection)
            .push(id);
        Ok(url)
    }

    /// Send a request and decode a successful JSON body.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        fallback: &str,
    ) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(e, fallback))?;
        let status = response.status();
        debug!("{} -> {}", response.url(), status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::backend(
                Some(status.as_u16()),
                extract_message(&body),
                fallback,
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, fallback))?;
        if body.trim().is_empty() {
            // Treat an empty success body as JSON null.
            return serde_json::from_value(Value::Null).map_err(|_| {
                Error::backend(Some(status.as_u16()), None, fallback)
            });
        }
        serde_json::from_str(&body).map_err(|e| {
            debug!("undecodable body from backend: {}", e);
            Error::backend(
                Some(status.as_u16()),
                Some(format!("{}: unexpected response ({})", fallback, e)),
                fallback,
            )
        })
    }
}

fn transport_error(err: reqwest::Error, fallback: &str) -> Error {
    debug!("transport error: {}", err);
    Error::backend(None, Some(format!("{}: {}", fallback, err)), fallback)
}

#[async_trait]
impl Backend for HttpBackend {
    async fn get_chunks(&self, session_id: &str) -> Result<ChunksResponse> {
        let url = self.resource_url("chunks", session_id, "Failed to fetch chunks")?;
        self.execute(self.client.get(url), "Failed to fetch chunks")
            .await
    }

    async fn update_chunks(&self, request: &ChunkUpdateRequest) -> Result<Value> {
        debug!(
            "updating {} chunks for session {}",
            request.documents.len(),
            request.session_id
        );
        let req = self.client.post(self.url("/chunks/update")).json(request);
        self.execute(req, "Failed to update chunks").await
    }

    async fn upload_files(
        &self,
        session_id: &str,
        session_name: &str,
        files: Vec<FilePart>,
    ) -> Result<Value> {
        let mut form = Form::new()
            .text("session_id", session_id.to_string())
            .text("session_name", session_name.to_string());
        for file in files {
            form = form.part("files", file.into_part()?);
        }
        let req = self.client.post(self.url("/files/upload")).multipart(form);
        self.execute(req, "Failed to upload files").await
    }

    async fn list_sessions(&self) -> Result<Vec<SessionMeta>> {
        let sessions: Option<Vec<SessionMeta>> = self
            .execute(self.client.get(self.url("/sessions")), "Failed to fetch sessions")
            .await?;
        Ok(sessions.unwrap_or_default())
    }

    async fn create_session(&self, archive: ArchiveUpload, name: Option<&str>) -> Result<Value> {
        let mut form = Form::new().part("archive", archive.into_part()?);
        if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
            form = form.text("name", name.to_string());
        }
        let req = self.client.post(self.url("/sessions")).multipart(form);
        self.execute(req, "Failed to create session").await
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        let url = self.resource_url("session", session_id, "Failed to delete session")?;
        let _: Value = self
            .execute(self.client.delete(url), "Failed to delete session")
            .await?;
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> Result<Value> {
        let url = self.resource_url("session", session_id, "Failed to fetch session")?;
        self.execute(self.client.get(url), "Failed to fetch session")
            .await
    }

    async fn send_chat(&self, request: &SendChatRequest) -> Result<SendChatResponse> {
        let req = self.client.post(self.url("/chat/send")).json(request);
        self.execute(req, "Failed to send chat").await
    }
}
