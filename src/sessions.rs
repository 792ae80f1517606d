//! Session store adapter.
//!
//! Wraps the backend session endpoints with a local mirror kept under
//! [`SESSIONS_KEY`](crate::store::SESSIONS_KEY):
//!
//! - reads (`list`, `get`) refresh the mirror on success and fall back to it
//!   when the backend is unreachable;
//! - `create` falls back to a purely local session when the backend call
//!   fails or no archive was supplied;
//! - `delete` removes the local entry first and never restores it, even if
//!   the backend call then fails.
//!
//! Writes to the mirror are best effort: a failing local store is logged and
//! otherwise ignored, as the backend remains the system of record.

use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};
use serde_json::Value;
use uuid::Uuid;

use crate::backend::{ArchiveUpload, Backend};
use crate::error::{Error, Result};
use crate::models::SessionMeta;
use crate::store::{read_json, write_json, KvStore, SESSIONS_KEY};

/// Field names a created-session record may carry its id under, in
/// priority order.
const ID_FIELDS: [&str; 5] = ["id", "sessionId", "uuid", "slug", "name"];

pub struct SessionStore {
    backend: Arc<dyn Backend>,
    cache: Arc<dyn KvStore>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn Backend>, cache: Arc<dyn KvStore>) -> Self {
        Self { backend, cache }
    }

    /// The locally mirrored list. Unreadable caches read as empty.
    pub fn cached(&self) -> Vec<SessionMeta> {
        match read_json::<Vec<SessionMeta>>(self.cache.as_ref(), SESSIONS_KEY) {
            Ok(list) => list.unwrap_or_default(),
            Err(e) => {
                warn!("ignoring unreadable session cache: {}", e);
                Vec::new()
            }
        }
    }

    fn write_cache(&self, sessions: &[SessionMeta]) {
        if let Err(e) = write_json(self.cache.as_ref(), SESSIONS_KEY, &sessions) {
            warn!("failed to write session cache: {}", e);
        }
    }

    /// Server list when reachable (mirrored locally), else the local mirror.
    pub async fn list(&self) -> Vec<SessionMeta> {
        match self.backend.list_sessions().await {
            Ok(sessions) => {
                self.write_cache(&sessions);
                sessions
            }
            Err(e) => {
                warn!("listing sessions from local cache: {}", e);
                self.cached()
            }
        }
    }

    /// Create a session from an archive.
    ///
    /// Never fails: without an archive, or when the backend rejects the
    /// upload, a local-only session with a generated id is recorded instead.
    /// The new record is prepended to the local mirror.
    pub async fn create(&self, archive: Option<ArchiveUpload>, name: Option<&str>) -> SessionMeta {
        let name = name.map(str::trim).filter(|n| !n.is_empty());
        let archive_meta = archive
            .as_ref()
            .map(|a| (a.file_name.clone(), a.data.len() as u64));

        let session = match archive {
            Some(archive) => match self.backend.create_session(archive, name).await {
                Ok(created) => {
                    let session = normalize_created(&created, archive_meta.as_ref(), name);
                    info!("created session {} on backend", session.id);
                    Some(session)
                }
                Err(e) => {
                    warn!("backend session create failed, creating local session: {}", e);
                    None
                }
            },
            None => None,
        };
        let session = session.unwrap_or_else(|| local_session(archive_meta.as_ref(), name));

        let mut sessions = self.cached();
        sessions.insert(0, session.clone());
        self.write_cache(&sessions);
        session
    }

    /// Delete a session.
    ///
    /// The local entry is removed before the backend is called and stays
    /// removed whatever the backend answers. A backend failure is still
    /// returned so callers can surface it.
    pub async fn delete(&self, id: &str) -> Result<()> {
        if id.trim().is_empty() {
            return Err(Error::validation("Session id is required"));
        }
        let sessions: Vec<SessionMeta> = self.cached().into_iter().filter(|s| s.id != id).collect();
        self.write_cache(&sessions);

        match self.backend.delete_session(id).await {
            Ok(()) => {
                info!("deleted session {}", id);
                Ok(())
            }
            Err(e) => {
                warn!("session {} removed locally but backend delete failed: {}", id, e);
                Err(e)
            }
        }
    }

    /// Fetch one session, merging it into the local mirror. Falls back to
    /// the mirror when the backend is unreachable.
    pub async fn get(&self, id: &str) -> Option<SessionMeta> {
        match self.backend.get_session(id).await {
            Ok(value) => {
                let fetched = normalize_fetched(&value, id);
                let mut sessions = self.cached();
                let merged = match sessions.iter_mut().find(|s| s.id == fetched.id) {
                    Some(existing) => {
                        merge_into(existing, fetched);
                        existing.clone()
                    }
                    None => {
                        sessions.insert(0, fetched.clone());
                        fetched
                    }
                };
                self.write_cache(&sessions);
                Some(merged)
            }
            Err(e) => {
                warn!("reading session {} from local cache: {}", id, e);
                self.cached().into_iter().find(|s| s.id == id)
            }
        }
    }
}

/// Caller-side checks before [`SessionStore::create`]: an archive must be
/// chosen and the display name must not already be taken.
pub fn validate_new_session(
    existing: &[SessionMeta],
    archive: Option<&ArchiveUpload>,
    name: Option<&str>,
) -> Result<()> {
    let archive = archive.ok_or_else(|| Error::validation("Please choose a .zip archive"))?;
    let display = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| strip_extension(&archive.file_name).to_string());
    if existing.iter().any(|s| s.display_name() == display) {
        return Err(Error::validation(format!(
            "A session named '{}' already exists",
            display
        )));
    }
    Ok(())
}

fn strip_extension(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

fn derived_name(archive: Option<&(String, u64)>, name: Option<&str>) -> Option<String> {
    name.map(str::to_string)
        .or_else(|| archive.map(|(file_name, _)| strip_extension(file_name).to_string()))
}

/// Turn a create response into a session record.
pub fn normalize_created(
    created: &Value,
    archive: Option<&(String, u64)>,
    name: Option<&str>,
) -> SessionMeta {
    let id = ID_FIELDS
        .iter()
        .find_map(|key| string_field(created, key))
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    SessionMeta {
        id,
        created_at: string_field(created, "createdAt").unwrap_or_else(now_iso),
        name: string_field(created, "name").or_else(|| derived_name(archive, name)),
        archive_name: archive.map(|(file_name, _)| file_name.clone()),
        archive_size: archive.map(|(_, size)| *size).filter(|size| *size > 0),
    }
}

fn local_session(archive: Option<&(String, u64)>, name: Option<&str>) -> SessionMeta {
    let id = Uuid::new_v4().to_string();
    let name = derived_name(archive, name).unwrap_or_else(|| {
        let tail = &id[id.len().saturating_sub(6)..];
        format!("Session {}", tail)
    });
    info!("created local-only session {}", id);
    SessionMeta {
        id,
        created_at: now_iso(),
        name: Some(name),
        archive_name: archive.map(|(file_name, _)| file_name.clone()),
        archive_size: archive.map(|(_, size)| *size).filter(|size| *size > 0),
    }
}

fn normalize_fetched(value: &Value, requested_id: &str) -> SessionMeta {
    SessionMeta {
        id: string_field(value, "id").unwrap_or_else(|| requested_id.to_string()),
        created_at: string_field(value, "createdAt").unwrap_or_else(now_iso),
        name: string_field(value, "name"),
        archive_name: string_field(value, "archiveName"),
        archive_size: value.get("archiveSize").and_then(Value::as_u64),
    }
}

/// Overwrite `existing` with the fields `fetched` actually carries.
fn merge_into(existing: &mut SessionMeta, fetched: SessionMeta) {
    existing.created_at = fetched.created_at;
    if fetched.name.is_some() {
        existing.name = fetched.name;
    }
    if fetched.archive_name.is_some() {
        existing.archive_name = fetched.archive_name;
    }
    if fetched.archive_size.is_some() {
        existing.archive_size = fetched.archive_size;
    }
}
