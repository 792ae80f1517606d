//! Core data models shared by the editor, the reconciler and the backend
//! client.
//!
//! Field names on the wire follow the backend schema: snake_case, except
//! `lastEdited` and `originalHash`, which the browser client introduced.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Change-tracking state of a [`Chunk`] relative to the last sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStatus {
    #[default]
    Unchanged,
    Modified,
    New,
    Deleted,
}

impl ChunkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkStatus::Unchanged => "unchanged",
            ChunkStatus::Modified => "modified",
            ChunkStatus::New => "new",
            ChunkStatus::Deleted => "deleted",
        }
    }

    /// Whether a chunk in this state contributes to a commit.
    pub fn is_change(&self) -> bool {
        !matches!(self, ChunkStatus::Unchanged)
    }
}

impl fmt::Display for ChunkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A content segment of an uploaded document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Client-side identifier. Backends may omit it; loads reassign it anyway.
    #[serde(default)]
    pub chunk_id: String,
    pub chunk_hash: String,
    /// Hash immediately before the latest edit.
    #[serde(default)]
    pub previous_hash: Option<String>,
    pub filename: String,
    pub filetype: String,
    #[serde(default)]
    pub page_number: i64,
    pub page_content: String,
    #[serde(default)]
    pub status: ChunkStatus,
    #[serde(
        rename = "lastEdited",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_edited: Option<DateTime<Utc>>,
    /// Hash at the last sync point with the backend.
    #[serde(rename = "originalHash", default)]
    pub original_hash: Option<String>,
}

/// Lifecycle of a raw file queued for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    New,
    Committed,
}

/// A raw document the user selected for upload, tracked client-side only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub id: String,
    /// Name without the final extension.
    pub filename: String,
    /// Lowercased extension without the dot.
    pub extension: String,
    pub original_name: String,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
    /// Target location on the backend side.
    pub path: String,
    pub status: UploadStatus,
    /// The payload sent at commit time.
    #[serde(skip)]
    pub data: Vec<u8>,
}

/// Session metadata as listed by the backend and mirrored locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMeta {
    pub id: String,
    /// RFC 3339; records that omit it are stamped when decoded.
    #[serde(default = "now_rfc3339")]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_size: Option<u64>,
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

impl SessionMeta {
    /// Name shown to the user; falls back to the id.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    Developer,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Backend chat targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ChatModel {
    #[default]
    #[serde(rename = "gpt-5")]
    Gpt5,
    #[serde(rename = "ollama-local")]
    OllamaLocal,
}

impl ChatModel {
    pub const ALL: [ChatModel; 2] = [ChatModel::Gpt5, ChatModel::OllamaLocal];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChatModel::Gpt5 => "gpt-5",
            ChatModel::OllamaLocal => "ollama-local",
        }
    }
}

impl fmt::Display for ChatModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChatModel::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unknown chat model '{}'. Must be gpt-5 or ollama-local.", s))
    }
}
