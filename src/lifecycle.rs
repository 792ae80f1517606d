//! Chunk lifecycle engine.
//!
//! Pure functions computing a chunk's next state for the three user events:
//! edit, delete and create. The collection controller in [`crate::editor`]
//! routes every mutation through here.
//!
//! # Status transitions on edit
//!
//! | current | hash differs from baseline | next |
//! |---------|----------------------------|------|
//! | `new` | yes / no | `new` |
//! | `unchanged` | yes | `modified` |
//! | `unchanged` | no | `unchanged` |
//! | `modified` | yes | `modified` |
//! | `modified` | no | `unchanged` |
//! | `deleted` | yes | `modified` |
//! | `deleted` | no | `unchanged` |
//!
//! The baseline is the chunk's `originalHash`, i.e. the hash at the last
//! successful sync. A chunk without a baseline always counts as changed.

use chrono::Utc;
use rand::Rng;

use crate::hash::chunk_hash;
use crate::models::{Chunk, ChunkStatus};

/// Filetype assumed when a filename carries no extension.
pub const DEFAULT_FILETYPE: &str = "txt";

const ID_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Transition applied on every content edit.
pub fn next_status(current: ChunkStatus, hash_changed: bool) -> ChunkStatus {
    match (current, hash_changed) {
        (ChunkStatus::New, _) => ChunkStatus::New,
        (_, true) => ChunkStatus::Modified,
        (_, false) => ChunkStatus::Unchanged,
    }
}

/// Replace a chunk's content, rehashing it and recomputing its status.
pub fn apply_edit(chunk: &Chunk, new_content: &str) -> Chunk {
    let new_hash = chunk_hash(
        &chunk.filename,
        &chunk.filetype,
        &chunk.chunk_id,
        new_content,
    );
    let hash_changed = chunk.original_hash.as_deref() != Some(new_hash.as_str());

    Chunk {
        page_content: new_content.to_string(),
        previous_hash: Some(chunk.chunk_hash.clone()),
        status: next_status(chunk.status, hash_changed),
        chunk_hash: new_hash,
        last_edited: Some(Utc::now()),
        ..chunk.clone()
    }
}

/// Tombstone a chunk. Content and hashes are left as they are.
pub fn mark_deleted(chunk: &Chunk) -> Chunk {
    Chunk {
        status: ChunkStatus::Deleted,
        last_edited: Some(Utc::now()),
        ..chunk.clone()
    }
}

/// Build a brand-new chunk with a fresh id.
pub fn create_chunk(content: &str, filename: &str, page_number: i64) -> Chunk {
    create_chunk_with_id(new_chunk_id(), content, filename, page_number)
}

pub(crate) fn create_chunk_with_id(
    chunk_id: String,
    content: &str,
    filename: &str,
    page_number: i64,
) -> Chunk {
    let filetype = filetype_for(filename);
    let hash = chunk_hash(filename, &filetype, &chunk_id, content);

    Chunk {
        chunk_id,
        chunk_hash: hash.clone(),
        previous_hash: None,
        filename: filename.to_string(),
        filetype,
        page_number,
        page_content: content.to_string(),
        status: ChunkStatus::New,
        last_edited: Some(Utc::now()),
        original_hash: Some(hash),
    }
}

/// Extension after the last `.`, or [`DEFAULT_FILETYPE`] if there is none.
pub fn filetype_for(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_string(),
        _ => DEFAULT_FILETYPE.to_string(),
    }
}

/// Generate a client-side id of the form `chunk_<millis>_<random>`.
pub fn new_chunk_id() -> String {
    prefixed_id("chunk")
}

/// `<prefix>_<unix millis>_<9 random base36 chars>`.
pub(crate) fn prefixed_id(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("{}_{}_{}", prefix, Utc::now().timestamp_millis(), suffix)
}
