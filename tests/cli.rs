mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use chunkwise::models::SessionMeta;
use chunkwise::store::{write_json, FileStore, SESSIONS_KEY};
use common::{remote_chunk, session, MockServer};
use tempfile::TempDir;

/// Nothing listens on port 1, so every request fails at the transport level.
const DEAD_API: &str = "http://127.0.0.1:1/api";

fn chunkwise_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("chunkwise");
    path
}

fn setup_test_env(base_url: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::create_dir_all(root.join("data")).unwrap();

    let config_content = format!(
        r#"[api]
base_url = "{}"
timeout_secs = 5

[storage]
path = "{}/data/state.json"

[editor]
word_limit = 50
"#,
        base_url,
        root.display()
    );
    let config_path = config_dir.join("chunkwise.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn state_store(tmp: &TempDir) -> FileStore {
    FileStore::new(tmp.path().join("data").join("state.json"))
}

fn run_chunkwise(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = chunkwise_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("CHUNKWISE_API_URL")
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run chunkwise binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_help_lists_commands() {
    let (tmp, config) = setup_test_env(DEAD_API);
    let (stdout, _, ok) = run_chunkwise(&config, &["--help"]);
    assert!(ok);
    for command in ["sessions", "chunks", "upload", "chat"] {
        assert!(stdout.contains(command), "missing {} in help", command);
    }
    drop(tmp);
}

#[test]
fn test_invalid_config_is_rejected() {
    let (tmp, _) = setup_test_env(DEAD_API);
    let bad = tmp.path().join("config").join("bad.toml");
    fs::write(&bad, "[api]\nbase_url = \"ftp://example\"\n").unwrap();

    let (_, stderr, ok) = run_chunkwise(&bad, &["sessions", "list"]);
    assert!(!ok);
    assert!(stderr.contains("http(s) URL"), "stderr: {}", stderr);
}

#[test]
fn test_sessions_list_offline_without_cache() {
    let (_tmp, config) = setup_test_env(DEAD_API);
    let (stdout, _, ok) = run_chunkwise(&config, &["sessions", "list"]);
    assert!(ok);
    assert!(stdout.contains("No sessions."));
}

#[test]
fn test_sessions_list_offline_uses_cache() {
    let (tmp, config) = setup_test_env(DEAD_API);
    let cached: Vec<SessionMeta> = vec![session("abc", "Cached Reports")];
    write_json(&state_store(&tmp), SESSIONS_KEY, &cached).unwrap();

    let (stdout, _, ok) = run_chunkwise(&config, &["sessions", "list"]);
    assert!(ok);
    assert!(stdout.contains("abc"));
    assert!(stdout.contains("Cached Reports"));
}

#[test]
fn test_sessions_delete_offline_still_removes_locally() {
    let (tmp, config) = setup_test_env(DEAD_API);
    write_json(
        &state_store(&tmp),
        SESSIONS_KEY,
        &vec![session("abc", "One"), session("def", "Two")],
    )
    .unwrap();

    let (_, _, ok) = run_chunkwise(&config, &["sessions", "delete", "abc"]);
    assert!(!ok);

    let (stdout, _, _) = run_chunkwise(&config, &["sessions", "list"]);
    assert!(!stdout.contains("abc"));
    assert!(stdout.contains("def"));
}

#[test]
fn test_chat_history_empty() {
    let (_tmp, config) = setup_test_env(DEAD_API);
    let (stdout, _, ok) = run_chunkwise(&config, &["chat", "history", "s1"]);
    assert!(ok);
    assert!(stdout.contains("No messages yet for s1 (gpt-5)."));
}

#[test]
fn test_chat_send_offline_fails() {
    let (_tmp, config) = setup_test_env(DEAD_API);
    let (_, stderr, ok) = run_chunkwise(&config, &["chat", "send", "s1", "hello"]);
    assert!(!ok);
    assert!(stderr.contains("Failed to send chat"), "stderr: {}", stderr);

    let (stdout, _, _) = run_chunkwise(&config, &["chat", "history", "s1"]);
    assert!(stdout.contains("No messages yet"));
}

#[test]
fn test_chunks_list_offline_reports_backend_error() {
    let (_tmp, config) = setup_test_env(DEAD_API);
    let (_, stderr, ok) = run_chunkwise(&config, &["chunks", "list", "s1"]);
    assert!(!ok);
    assert!(stderr.contains("Failed to fetch chunks"), "stderr: {}", stderr);
}

#[test]
fn test_upload_rejects_unsupported_type() {
    let (tmp, config) = setup_test_env(DEAD_API);
    let video = tmp.path().join("clip.mp4");
    fs::write(&video, b"\0\0").unwrap();
    let (_, stderr, ok) = run_chunkwise(&config, &["upload", "s1", video.to_str().unwrap()]);
    assert!(!ok);
    // Loading the session fails before the file is even considered.
    assert!(stderr.contains("Failed to fetch chunks"), "stderr: {}", stderr);
}

// The mock server runs on the test's worker threads while the binary blocks
// the calling thread.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_chunks_list_and_edit_against_server() {
    let server = MockServer::with_chunks(
        "s1",
        vec![
            remote_chunk("report.pdf", 1, "quarterly revenue grew"),
            remote_chunk("notes.md", 1, "follow up"),
        ],
    );
    let base = server.spawn().await;
    let (tmp, config) = setup_test_env(&base);

    let (stdout, stderr, ok) = run_chunkwise(&config, &["chunks", "list", "s1"]);
    assert!(ok, "stderr: {}", stderr);
    assert!(stdout.contains("2 chunks across 2 files"));
    assert!(stdout.contains("report.pdf"));
    assert!(stdout.contains("notes.md"));

    let content = tmp.path().join("new.md");
    fs::write(&content, "quarterly revenue grew strongly").unwrap();
    let (stdout, stderr, ok) = run_chunkwise(
        &config,
        &["chunks", "edit", "s1", "1", "--content-file", content.to_str().unwrap()],
    );
    assert!(ok, "stderr: {}", stderr);
    assert!(stdout.contains("Chunk #1 is now modified."));
    assert!(stdout.contains("Changes: 1 modified chunk"));
    assert!(stdout.contains("Committed 1 changes."));

    let chunks = server.chunks.lock().unwrap();
    assert!(chunks["s1"]
        .iter()
        .any(|c| c.page_content == "quarterly revenue grew strongly"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_nothing_to_commit_when_deleting_missing_file() {
    let server = MockServer::with_chunks("s1", vec![remote_chunk("a.md", 1, "x")]);
    let base = server.spawn().await;
    let (_tmp, config) = setup_test_env(&base);

    let (_, stderr, ok) = run_chunkwise(&config, &["chunks", "delete-file", "s1", "b.md"]);
    assert!(!ok);
    assert!(stderr.contains("no chunks for file 'b.md'"));
    assert!(server.record.lock().unwrap().updates.is_empty());
}
