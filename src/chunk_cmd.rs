//! `chunkwise chunks ...` and `chunkwise upload` commands.
//!
//! Each invocation opens the session in a fresh [`ChunkEditor`], applies one
//! user action and commits it. Chunks are addressed by the 1-based ordinal
//! shown by `chunks list` (files in listing order, pages ascending).

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::client::{connect, open_store};
use crate::commit::{CommitOutcome, SessionRef};
use crate::config::Config;
use crate::editor::{word_count, ChunkEditor};
use crate::sessions::SessionStore;

async fn open_editor(config: &Config, session_id: &str) -> Result<ChunkEditor> {
    let backend = connect(config)?;
    let sessions = SessionStore::new(backend.clone(), open_store(config));
    let name = sessions
        .get(session_id)
        .await
        .map(|s| s.display_name().to_string())
        .unwrap_or_else(|| session_id.to_string());

    let mut editor = ChunkEditor::new(backend, &config.editor);
    editor.open(SessionRef::new(session_id, name)).await?;
    Ok(editor)
}

/// Resolve a listing ordinal to a chunk id.
fn chunk_at(editor: &ChunkEditor, ordinal: usize) -> Result<String> {
    editor
        .groups()
        .iter()
        .flat_map(|g| g.chunks.iter())
        .nth(ordinal.wrapping_sub(1))
        .map(|c| c.chunk_id.clone())
        .with_context(|| format!("no chunk #{} in this session", ordinal))
}

fn read_content(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read content file: {}", path.display()))
}

async fn commit_and_report(editor: &mut ChunkEditor) -> Result<()> {
    println!("Changes: {}", editor.summary());
    match editor.commit().await? {
        CommitOutcome::NothingToCommit => println!("Nothing to commit."),
        CommitOutcome::Committed { summary, .. } => {
            println!("Committed {} changes.", summary.total_changes())
        }
    }
    Ok(())
}

pub async fn run_list_chunks(config: &Config, session_id: &str) -> Result<()> {
    let editor = open_editor(config, session_id).await?;
    let groups = editor.groups();
    let total: usize = groups.iter().map(|g| g.chunks.len()).sum();
    println!(
        "{} chunks across {} files (word limit {})",
        total,
        groups.len(),
        editor.word_limit()
    );

    let mut ordinal = 0;
    for group in &groups {
        println!();
        println!("{}", group.filename);
        for chunk in &group.chunks {
            ordinal += 1;
            let marker = if editor.is_over_limit(chunk) { " !" } else { "" };
            let preview: String = chunk
                .page_content
                .lines()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("")
                .chars()
                .take(60)
                .collect();
            println!(
                "  #{:<4} page {:<4} {:>5}w{:<2} {}",
                ordinal,
                chunk.page_number,
                word_count(&chunk.page_content),
                marker,
                preview
            );
        }
    }
    Ok(())
}

pub async fn run_show_chunk(config: &Config, session_id: &str, ordinal: usize) -> Result<()> {
    let mut editor = open_editor(config, session_id).await?;
    let id = chunk_at(&editor, ordinal)?;
    editor.select(&id)?;
    let chunk = editor.selected().context("selection vanished")?;

    println!("--- Chunk #{} ---", ordinal);
    println!("filename:     {}", chunk.filename);
    println!("filetype:     {}", chunk.filetype);
    println!("page:         {}", chunk.page_number);
    println!("hash:         {}", chunk.chunk_hash);
    println!("status:       {}", chunk.status);
    println!(
        "words:        {} (limit {})",
        word_count(&chunk.page_content),
        editor.word_limit()
    );
    println!();
    println!("{}", chunk.page_content);
    Ok(())
}

pub async fn run_edit_chunk(
    config: &Config,
    session_id: &str,
    ordinal: usize,
    content_file: &Path,
) -> Result<()> {
    let content = read_content(content_file)?;
    let mut editor = open_editor(config, session_id).await?;
    let id = chunk_at(&editor, ordinal)?;
    let chunk = editor.edit(&id, &content)?;
    println!("Chunk #{} is now {}.", ordinal, chunk.status);
    if editor.get(&id).map(|c| editor.is_over_limit(c)).unwrap_or(false) {
        eprintln!("Warning: chunk exceeds the word limit of {}", editor.word_limit());
    }
    commit_and_report(&mut editor).await
}

pub async fn run_add_chunk(
    config: &Config,
    session_id: &str,
    filename: &str,
    page: i64,
    content_file: Option<&Path>,
) -> Result<()> {
    let content = content_file.map(read_content).transpose()?;
    let mut editor = open_editor(config, session_id).await?;
    let id = editor.add(filename, page)?.chunk_id.clone();
    if let Some(content) = content {
        editor.edit(&id, &content)?;
    }
    commit_and_report(&mut editor).await
}

pub async fn run_delete_chunk(config: &Config, session_id: &str, ordinal: usize) -> Result<()> {
    let mut editor = open_editor(config, session_id).await?;
    let id = chunk_at(&editor, ordinal)?;
    editor.delete_chunk(&id)?;
    commit_and_report(&mut editor).await
}

pub async fn run_delete_file(config: &Config, session_id: &str, filename: &str) -> Result<()> {
    let mut editor = open_editor(config, session_id).await?;
    let count = editor.delete_all_chunks_for_file(filename);
    if count == 0 {
        anyhow::bail!("no chunks for file '{}' in this session", filename);
    }
    commit_and_report(&mut editor).await
}

pub async fn run_upload(config: &Config, session_id: &str, files: &[PathBuf]) -> Result<()> {
    if files.is_empty() {
        anyhow::bail!("No file selected");
    }
    let mut editor = open_editor(config, session_id).await?;
    for path in files {
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let queued = editor.queue_upload(&name, data)?;
        println!("Queued {} ({} bytes)", queued.original_name, queued.size);
    }
    commit_and_report(&mut editor).await
}
