//! Pending raw-file uploads.
//!
//! Files picked by the user are queued here with status `new` and only sent
//! to the backend as part of a commit (see [`crate::commit`]). After a
//! successful commit every queued file becomes `committed`.

use chrono::Utc;

use crate::error::{Error, Result};
use crate::lifecycle::prefixed_id;
use crate::models::{UploadStatus, UploadedFile};

/// Accepted document extensions, including the leading dot.
pub const ACCEPTED_EXTENSIONS: [&str; 4] = [".txt", ".pdf", ".docx", ".md"];

pub const ACCEPTED_MIME_TYPES: [&str; 4] = [
    "text/plain",
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/markdown",
];

/// Whether a file name is an accepted document type, by extension first
/// and by guessed MIME type second.
pub fn is_accepted(original_name: &str) -> bool {
    let ext = extension_of(original_name);
    if !ext.is_empty() && ACCEPTED_EXTENSIONS.contains(&format!(".{}", ext).as_str()) {
        return true;
    }
    mime_guess::from_path(original_name)
        .iter()
        .any(|m| ACCEPTED_MIME_TYPES.contains(&m.essence_str()))
}

fn extension_of(name: &str) -> String {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}

fn stem_of(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

impl UploadedFile {
    /// Validate and wrap a selected file.
    ///
    /// `upload_dir` is the backend-side target directory recorded on
    /// [`UploadedFile::path`].
    pub fn new(original_name: &str, data: Vec<u8>, upload_dir: &str) -> Result<Self> {
        let original_name = original_name.trim();
        if original_name.is_empty() {
            return Err(Error::validation("No file selected"));
        }
        if !is_accepted(original_name) {
            return Err(Error::validation(format!(
                "File type not supported. Please upload: {}",
                ACCEPTED_EXTENSIONS.join(", ")
            )));
        }

        Ok(Self {
            id: prefixed_id("upload"),
            filename: stem_of(original_name).to_string(),
            extension: extension_of(original_name),
            original_name: original_name.to_string(),
            size: data.len() as u64,
            uploaded_at: Utc::now(),
            path: format!("{}/{}", upload_dir.trim_end_matches('/'), original_name),
            status: UploadStatus::New,
            data,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.status == UploadStatus::New
    }
}

/// Uploaded files tracked for the active session, in selection order.
#[derive(Debug, Default, Clone)]
pub struct UploadQueue {
    files: Vec<UploadedFile>,
}

impl UploadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, file: UploadedFile) -> &UploadedFile {
        self.files.push(file);
        &self.files[self.files.len() - 1]
    }

    /// Drop a file that has not been committed yet.
    pub fn remove(&mut self, id: &str) -> Result<UploadedFile> {
        let pos = self
            .files
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| Error::validation(format!("No uploaded file with id {}", id)))?;
        if !self.files[pos].is_pending() {
            return Err(Error::validation(format!(
                "{} is already committed",
                self.files[pos].original_name
            )));
        }
        Ok(self.files.remove(pos))
    }

    pub fn pending(&self) -> impl Iterator<Item = &UploadedFile> {
        self.files.iter().filter(|f| f.is_pending())
    }

    pub fn pending_count(&self) -> usize {
        self.pending().count()
    }

    pub fn mark_all_committed(&mut self) {
        for file in &mut self.files {
            file.status = UploadStatus::Committed;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &UploadedFile> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }
}
