//! Local key-value storage.
//!
//! The [`KvStore`] trait is the client-side persistence seam: the session
//! cache and chat transcripts live here so they survive restarts without a
//! backend round trip. Controllers receive an `Arc<dyn KvStore>` rather than
//! reaching for a global, which lets tests substitute [`MemoryStore`].
//!
//! # Key schema
//!
//! | Key | Value |
//! |-----|-------|
//! | [`SESSIONS_KEY`] | JSON array of [`SessionMeta`](crate::models::SessionMeta) |
//! | `chat:{session_id}:{model}` (see [`chat_key`]) | JSON `{session_id, messages}` |
//!
//! Values are stored as JSON text; use [`read_json`] / [`write_json`] for
//! typed access.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::models::ChatModel;

/// Storage key of the mirrored session list.
pub const SESSIONS_KEY: &str = "chunkwise_sessions_v1";

const CHAT_KEY_PREFIX: &str = "chat";

/// Composite key of the transcript for one `(session, model)` pair.
pub fn chat_key(session_id: &str, model: ChatModel) -> String {
    format!("{}:{}:{}", CHAT_KEY_PREFIX, session_id, model.as_str())
}

/// String-valued key-value store.
///
/// Implementations must be `Send + Sync`; each call is atomic with respect
/// to other calls on the same store.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// All keys currently present, in sorted order.
    fn keys(&self) -> Result<Vec<String>>;
}

/// Read and decode a JSON value. Missing keys yield `Ok(None)`.
pub fn read_json<T: DeserializeOwned>(store: &dyn KvStore, key: &str) -> Result<Option<T>> {
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub fn write_json<T: Serialize>(store: &dyn KvStore, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}
