//! Error types for the chunk editor core.
//!
//! Every fallible library operation returns [`Result`]. The variants follow
//! the failure taxonomy the front end surfaces to the user:
//!
//! | Variant | When | Network call made? |
//! |---------|------|--------------------|
//! | [`Error::Validation`] | missing/duplicate/invalid user input | no |
//! | [`Error::Backend`] | transport failure or non-2xx response | yes |
//! | [`Error::UnknownChunk`] | a chunk id not present in the collection | no |
//! | [`Error::Storage`] | the local key-value store failed | no |
//! | [`Error::Json`] | a cached value could not be (de)serialized | no |

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Input rejected before any backend round trip.
    #[error("{0}")]
    Validation(String),

    /// The backend could not be reached or answered with a non-2xx status.
    ///
    /// `message` is already user-presentable: either extracted from the
    /// response body or a generic per-endpoint fallback.
    #[error("{message}")]
    Backend {
        /// HTTP status, `None` for transport-level failures.
        status: Option<u16>,
        message: String,
    },

    #[error("unknown chunk: {0}")]
    UnknownChunk(String),

    #[error("local storage error: {0}")]
    Storage(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a backend error, preferring a message extracted from the
    /// response body and otherwise using `fallback`.
    pub fn backend(status: Option<u16>, extracted: Option<String>, fallback: &str) -> Self {
        let message = extracted
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| fallback.to_string());
        Self::Backend { status, message }
    }

    /// True for failures that happened before any network call.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Backend { status, .. } => *status,
            _ => None,
        }
    }
}

/// Pull a human-readable message out of an error response body.
///
/// Understands FastAPI-style `{"detail": "..."}` bodies as well as
/// `{"message": ...}` and `{"error": ...}`. Validation-error arrays under
/// `detail` contribute their first `msg`. Plain-text bodies are used as-is
/// when short enough to display.
pub fn extract_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for key in ["detail", "message", "error"] {
            match json.get(key) {
                Some(serde_json::Value::String(s)) => return Some(s.clone()),
                Some(serde_json::Value::Array(items)) => {
                    if let Some(msg) = items
                        .iter()
                        .find_map(|item| item.get("msg").and_then(|m| m.as_str()))
                    {
                        return Some(msg.to_string());
                    }
                }
                Some(serde_json::Value::Object(obj)) => {
                    if let Some(msg) = obj.get("message").and_then(|m| m.as_str()) {
                        return Some(msg.to_string());
                    }
                }
                _ => {}
            }
        }
        return None;
    }
    if trimmed.len() <= 200 && !trimmed.starts_with('<') {
        return Some(trimmed.to_string());
    }
    None
}
