//! Commit/diff reconciler.
//!
//! Translates the local chunk collection plus pending uploads into backend
//! calls and computes the clean baseline that follows a successful commit.
//!
//! # Commit sequence
//!
//! ```text
//! summary.total_changes() == 0 ──▶ no-op, no network calls
//!            │
//!            ▼
//!  1. POST /files/upload    (only if uploads with status `new` exist)
//!            │  awaited to completion
//!            ▼
//!  2. POST /chunks/update   (entire collection, every status)
//!            │
//!            ▼
//!  3. reload + rebaseline   (deleted dropped, others `unchanged`)
//! ```
//!
//! A failure in step 1 or 2 returns the error and leaves the caller's state
//! untouched, so the same commit can be retried. The change summary is only
//! used for display and for gating the commit; the backend always receives
//! full state.

use std::fmt;

use log::{debug, info};
use serde_json::Value;

use crate::backend::{Backend, ChunkUpdateRequest, FilePart};
use crate::error::Result;
use crate::models::{Chunk, ChunkStatus};
use crate::uploads::UploadQueue;

/// Identity of the session a commit targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRef {
    pub id: String,
    pub name: String,
}

impl SessionRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Counts of pending local changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    pub modified: usize,
    pub new: usize,
    pub deleted: usize,
    pub new_files: usize,
}

impl ChangeSummary {
    pub fn of(chunks: &[Chunk], uploads: &UploadQueue) -> Self {
        let mut summary = ChangeSummary {
            new_files: uploads.pending_count(),
            ..Default::default()
        };
        for chunk in chunks {
            match chunk.status {
                ChunkStatus::Modified => summary.modified += 1,
                ChunkStatus::New => summary.new += 1,
                ChunkStatus::Deleted => summary.deleted += 1,
                ChunkStatus::Unchanged => {}
            }
        }
        summary
    }

    pub fn total_changes(&self) -> usize {
        self.modified + self.new + self.deleted + self.new_files
    }

    pub fn is_empty(&self) -> bool {
        self.total_changes() == 0
    }
}

fn plural(n: usize, word: &str) -> String {
    format!("{} {}{}", n, word, if n == 1 { "" } else { "s" })
}

impl fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("No changes to commit");
        }
        let mut parts = Vec::new();
        if self.new > 0 {
            parts.push(plural(self.new, "new chunk"));
        }
        if self.modified > 0 {
            parts.push(plural(self.modified, "modified chunk"));
        }
        if self.deleted > 0 {
            parts.push(plural(self.deleted, "deleted chunk"));
        }
        if self.new_files > 0 {
            parts.push(plural(self.new_files, "new file"));
        }
        write!(f, "{}", parts.join(", "))
    }
}

/// Result of [`ChunkEditor::commit`](crate::editor::ChunkEditor::commit).
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// Nothing changed; no backend call was made.
    NothingToCommit,
    Committed {
        summary: ChangeSummary,
        /// Opaque success payload of the chunk update call.
        response: Value,
    },
}

/// Steps 1 and 2: upload pending files, then send the full collection.
///
/// Takes everything by reference; on error nothing has been mutated.
pub async fn push_changes(
    backend: &dyn Backend,
    session: &SessionRef,
    chunks: &[Chunk],
    uploads: &UploadQueue,
) -> Result<Value> {
    let files: Vec<FilePart> = uploads
        .pending()
        .map(|f| FilePart::new(f.original_name.clone(), f.data.clone()))
        .collect();

    if !files.is_empty() {
        debug!("uploading {} files to session {}", files.len(), session.id);
        backend
            .upload_files(&session.id, &session.name, files)
            .await?;
    }

    let request = ChunkUpdateRequest {
        session_id: session.id.clone(),
        session_name: session.name.clone(),
        documents: chunks.to_vec(),
    };
    let response = backend.update_chunks(&request).await?;
    info!(
        "committed {} chunks to session {}",
        request.documents.len(),
        session.id
    );
    Ok(response)
}

/// Step 3: the post-commit baseline.
///
/// Deleted chunks are dropped; every survivor becomes `unchanged` with
/// `originalHash == chunk_hash` and no `lastEdited`.
pub fn rebaseline(chunks: Vec<Chunk>) -> Vec<Chunk> {
    chunks
        .into_iter()
        .filter(|c| c.status != ChunkStatus::Deleted)
        .map(|mut c| {
            c.status = ChunkStatus::Unchanged;
            c.original_hash = Some(c.chunk_hash.clone());
            c.last_edited = None;
            c
        })
        .collect()
}
