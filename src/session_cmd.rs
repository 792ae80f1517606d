//! `chunkwise sessions ...` commands.

use anyhow::{Context, Result};
use std::path::Path;

use crate::backend::ArchiveUpload;
use crate::client::{connect, open_store};
use crate::config::Config;
use crate::models::SessionMeta;
use crate::sessions::{validate_new_session, SessionStore};

fn session_store(config: &Config) -> Result<SessionStore> {
    Ok(SessionStore::new(connect(config)?, open_store(config)))
}

fn print_session(session: &SessionMeta) {
    println!("id:           {}", session.id);
    println!("name:         {}", session.display_name());
    println!("created_at:   {}", session.created_at);
    if let Some(ref archive) = session.archive_name {
        println!("archive:      {}", archive);
    }
    if let Some(size) = session.archive_size {
        println!("archive_size: {} bytes", size);
    }
}

pub async fn run_list_sessions(config: &Config) -> Result<()> {
    let store = session_store(config)?;
    let sessions = store.list().await;
    if sessions.is_empty() {
        println!("No sessions.");
        return Ok(());
    }
    println!("{:<38} {:<28} CREATED", "ID", "NAME");
    for s in &sessions {
        println!("{:<38} {:<28} {}", s.id, s.display_name(), s.created_at);
    }
    Ok(())
}

pub async fn run_show_session(config: &Config, id: &str) -> Result<()> {
    let store = session_store(config)?;
    match store.get(id).await {
        Some(session) => {
            print_session(&session);
            Ok(())
        }
        None => anyhow::bail!("session not found: {}", id),
    }
}

pub async fn run_create_session(config: &Config, archive: &Path, name: Option<&str>) -> Result<()> {
    let store = session_store(config)?;
    let data = std::fs::read(archive)
        .with_context(|| format!("Failed to read archive: {}", archive.display()))?;
    let file_name = archive
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "archive.zip".to_string());
    let upload = ArchiveUpload::new(file_name, data);

    let existing = store.list().await;
    validate_new_session(&existing, Some(&upload), name)?;

    let session = store.create(Some(upload), name).await;
    println!("Session created.");
    print_session(&session);
    Ok(())
}

pub async fn run_delete_session(config: &Config, id: &str) -> Result<()> {
    let store = session_store(config)?;
    store.delete(id).await?;
    println!("Session {} deleted.", id);
    Ok(())
}
