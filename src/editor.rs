//! Chunk collection controller.
//!
//! [`ChunkEditor`] exclusively owns the in-memory chunks of the active
//! session, the current selection, the word limit and the pending upload
//! queue. Every chunk mutation is routed through [`crate::lifecycle`], and
//! each public method leaves the collection in a consistent state before it
//! returns: async operations fetch first and swap state only on success.

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, warn};

use crate::backend::Backend;
use crate::commit::{self, ChangeSummary, CommitOutcome, SessionRef};
use crate::config::EditorConfig;
use crate::error::{Error, Result};
use crate::lifecycle::{apply_edit, create_chunk_with_id, mark_deleted, new_chunk_id};
use crate::models::{Chunk, ChunkStatus, UploadedFile};
use crate::uploads::UploadQueue;

/// Whitespace-delimited token count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Visible chunks of one file, sorted by page number.
#[derive(Debug)]
pub struct FileGroup<'a> {
    pub filename: &'a str,
    pub chunks: Vec<&'a Chunk>,
}

pub struct ChunkEditor {
    backend: Arc<dyn Backend>,
    session: Option<SessionRef>,
    chunks: Vec<Chunk>,
    selected: Option<String>,
    word_limit: usize,
    new_chunk_template: String,
    upload_dir: String,
    uploads: UploadQueue,
}

impl ChunkEditor {
    pub fn new(backend: Arc<dyn Backend>, config: &EditorConfig) -> Self {
        Self {
            backend,
            session: None,
            chunks: Vec::new(),
            selected: None,
            word_limit: config.word_limit,
            new_chunk_template: config.new_chunk_template.clone(),
            upload_dir: config.upload_dir.clone(),
            uploads: UploadQueue::new(),
        }
    }

    /// Make `session` the active session and load its chunks.
    ///
    /// Switching to a different session discards pending uploads.
    pub async fn open(&mut self, session: SessionRef) -> Result<usize> {
        if session.id.trim().is_empty() {
            return Err(Error::validation("Session id is required"));
        }
        let count = self.load(&session.id).await?;
        self.session = Some(session);
        Ok(count)
    }

    /// Fetch the chunks of `session_id` and make them the clean baseline.
    ///
    /// Loaded chunks get fresh client-side ids, status `unchanged` and
    /// `originalHash = chunk_hash`. The word limit becomes the largest word
    /// count among them (unchanged when the session is empty) and the first
    /// chunk is selected. Loading a different session than the active one
    /// switches to it and discards pending uploads. On failure the current
    /// state is kept.
    pub async fn load(&mut self, session_id: &str) -> Result<usize> {
        if session_id.trim().is_empty() {
            return Err(Error::validation("Session id is required"));
        }
        let response = self.backend.get_chunks(session_id).await?;
        debug!(
            "loaded {} chunks for session {}",
            response.chunks.len(),
            session_id
        );

        let mut ids = HashSet::new();
        let chunks: Vec<Chunk> = response
            .chunks
            .into_iter()
            .map(|mut chunk| {
                chunk.chunk_id = unique_id(&mut ids);
                chunk.status = ChunkStatus::Unchanged;
                chunk.original_hash = Some(chunk.chunk_hash.clone());
                chunk.last_edited = None;
                chunk
            })
            .collect();

        if let Some(max) = chunks.iter().map(|c| word_count(&c.page_content)).max() {
            self.word_limit = max;
        }
        self.selected = chunks.first().map(|c| c.chunk_id.clone());
        self.chunks = chunks;
        if self.session.as_ref().map(|s| s.id.as_str()) != Some(session_id) {
            // Queued files belong to the session they were picked for.
            if !self.uploads.is_empty() {
                debug!("dropping {} queued uploads on session switch", self.uploads.len());
            }
            self.uploads.clear();
            self.session = Some(SessionRef::new(session_id, session_id));
        }
        Ok(self.chunks.len())
    }

    pub fn session(&self) -> Option<&SessionRef> {
        self.session.as_ref()
    }

    /// Every chunk, including tombstoned ones, in collection order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Non-deleted chunks in collection order.
    pub fn visible(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks
            .iter()
            .filter(|c| c.status != ChunkStatus::Deleted)
    }

    pub fn get(&self, chunk_id: &str) -> Option<&Chunk> {
        self.chunks.iter().find(|c| c.chunk_id == chunk_id)
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected(&self) -> Option<&Chunk> {
        self.selected.as_deref().and_then(|id| self.get(id))
    }

    pub fn select(&mut self, chunk_id: &str) -> Result<()> {
        match self.get(chunk_id) {
            Some(c) if c.status != ChunkStatus::Deleted => {
                self.selected = Some(chunk_id.to_string());
                Ok(())
            }
            _ => Err(Error::UnknownChunk(chunk_id.to_string())),
        }
    }

    pub fn edit(&mut self, chunk_id: &str, new_content: &str) -> Result<&Chunk> {
        let pos = self.position(chunk_id)?;
        if self.chunks[pos].status == ChunkStatus::Deleted {
            return Err(Error::validation("Deleted chunks cannot be edited"));
        }
        self.chunks[pos] = apply_edit(&self.chunks[pos], new_content);
        Ok(&self.chunks[pos])
    }

    /// Append a new chunk filled with the configured template and select it.
    pub fn add(&mut self, filename: &str, page_number: i64) -> Result<&Chunk> {
        let filename = filename.trim();
        if filename.is_empty() {
            return Err(Error::validation("Filename is required"));
        }
        if page_number < 1 {
            return Err(Error::validation("Page number must be at least 1"));
        }

        let mut ids: HashSet<String> = self.chunks.iter().map(|c| c.chunk_id.clone()).collect();
        let chunk_id = unique_id(&mut ids);
        let chunk = create_chunk_with_id(chunk_id, &self.new_chunk_template, filename, page_number);
        self.selected = Some(chunk.chunk_id.clone());
        self.chunks.push(chunk);
        Ok(&self.chunks[self.chunks.len() - 1])
    }

    pub fn delete_chunk(&mut self, chunk_id: &str) -> Result<()> {
        let pos = self.position(chunk_id)?;
        self.chunks[pos] = mark_deleted(&self.chunks[pos]);
        self.reselect_if_deleted();
        Ok(())
    }

    /// Tombstone every visible chunk of `filename`. Returns how many.
    pub fn delete_all_chunks_for_file(&mut self, filename: &str) -> usize {
        let mut count = 0;
        for chunk in self.chunks.iter_mut() {
            if chunk.filename == filename && chunk.status != ChunkStatus::Deleted {
                *chunk = mark_deleted(chunk);
                count += 1;
            }
        }
        self.reselect_if_deleted();
        count
    }

    fn reselect_if_deleted(&mut self) {
        let still_visible = self
            .selected()
            .map(|c| c.status != ChunkStatus::Deleted)
            .unwrap_or(false);
        if !still_visible {
            let next = self.visible().next().map(|c| c.chunk_id.clone());
            self.selected = next;
        }
    }

    fn position(&self, chunk_id: &str) -> Result<usize> {
        self.chunks
            .iter()
            .position(|c| c.chunk_id == chunk_id)
            .ok_or_else(|| Error::UnknownChunk(chunk_id.to_string()))
    }

    /// Visible chunks grouped by filename.
    ///
    /// Groups appear in order of first appearance; chunks within a group
    /// are sorted by page number (stable for equal pages).
    pub fn groups(&self) -> Vec<FileGroup<'_>> {
        let mut groups: Vec<FileGroup<'_>> = Vec::new();
        for chunk in self.visible() {
            match groups.iter_mut().find(|g| g.filename == chunk.filename) {
                Some(group) => group.chunks.push(chunk),
                None => groups.push(FileGroup {
                    filename: &chunk.filename,
                    chunks: vec![chunk],
                }),
            }
        }
        for group in &mut groups {
            group.chunks.sort_by_key(|c| c.page_number);
        }
        groups
    }

    /// Distinct filenames among visible chunks.
    pub fn existing_files(&self) -> Vec<&str> {
        self.groups().into_iter().map(|g| g.filename).collect()
    }

    pub fn word_limit(&self) -> usize {
        self.word_limit
    }

    pub fn set_word_limit(&mut self, limit: usize) {
        self.word_limit = limit;
    }

    /// Display signal only; never blocks editing or committing.
    pub fn is_over_limit(&self, chunk: &Chunk) -> bool {
        word_count(&chunk.page_content) > self.word_limit
    }

    pub fn uploads(&self) -> &UploadQueue {
        &self.uploads
    }

    /// Validate and queue a file for the next commit.
    pub fn queue_upload(&mut self, original_name: &str, data: Vec<u8>) -> Result<&UploadedFile> {
        let file = UploadedFile::new(original_name, data, &self.upload_dir)?;
        Ok(self.uploads.add(file))
    }

    pub fn remove_upload(&mut self, id: &str) -> Result<UploadedFile> {
        self.uploads.remove(id)
    }

    pub fn summary(&self) -> ChangeSummary {
        ChangeSummary::of(&self.chunks, &self.uploads)
    }

    /// Whether the commit action is enabled.
    pub fn can_commit(&self) -> bool {
        self.session.is_some() && !self.summary().is_empty()
    }

    /// Push all local changes to the backend and reset to a clean baseline.
    ///
    /// With nothing to commit no backend call is made. On failure the chunk
    /// collection and upload queue are left exactly as they were.
    pub async fn commit(&mut self) -> Result<CommitOutcome> {
        let summary = self.summary();
        if summary.is_empty() {
            return Ok(CommitOutcome::NothingToCommit);
        }
        let session = self
            .session
            .clone()
            .ok_or_else(|| Error::validation("No session loaded"))?;

        let response =
            commit::push_changes(self.backend.as_ref(), &session, &self.chunks, &self.uploads)
                .await?;

        self.uploads.mark_all_committed();
        match self.load(&session.id).await {
            Ok(_) => {
                let reloaded = std::mem::take(&mut self.chunks);
                self.chunks = commit::rebaseline(reloaded);
            }
            Err(e) => {
                warn!(
                    "commit succeeded but reloading session {} failed: {}; rebaselining local state",
                    session.id, e
                );
                let local = std::mem::take(&mut self.chunks);
                self.chunks = commit::rebaseline(local);
                self.reselect_if_deleted();
            }
        }

        Ok(CommitOutcome::Committed { summary, response })
    }
}

fn unique_id(taken: &mut HashSet<String>) -> String {
    loop {
        let id = new_chunk_id();
        if taken.insert(id.clone()) {
            return id;
        }
    }
}
