//! # Chunkwise CLI (`chunkwise`)
//!
//! Command-line front end for the chunk editor: manage sessions, inspect and
//! edit a session's chunks, upload documents and chat with the assistant.
//!
//! ## Usage
//!
//! ```bash
//! chunkwise --config ./config/chunkwise.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `chunkwise sessions list` | List sessions (falls back to the local cache) |
//! | `chunkwise sessions create <zip>` | Create a session from an archive |
//! | `chunkwise sessions show <id>` | Show one session |
//! | `chunkwise sessions delete <id>` | Delete a session |
//! | `chunkwise chunks list <session>` | List chunks grouped by file |
//! | `chunkwise chunks edit <session> <n>` | Replace a chunk's content and commit |
//! | `chunkwise chunks add <session>` | Add a chunk and commit |
//! | `chunkwise chunks delete <session> <n>` | Delete a chunk and commit |
//! | `chunkwise upload <session> <files...>` | Upload documents to a session |
//! | `chunkwise chat send <session> <text>` | Send a chat message |
//!
//! ## Examples
//!
//! ```bash
//! # Create a session from a zip of documents
//! chunkwise sessions create ./reports.zip --name "Q3 reports"
//!
//! # See what the backend chunked
//! chunkwise chunks list 3f1c...
//!
//! # Rewrite chunk #4 from a local file
//! chunkwise chunks edit 3f1c... 4 --content-file ./chunk4.md
//!
//! # Ask about the session
//! chunkwise chat send 3f1c... "Summarize the revenue section"
//! ```

use chunkwise::config::{self, Config};
use chunkwise::models::ChatModel;
use chunkwise::{chat_cmd, chunk_cmd, session_cmd};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Chunkwise CLI: edit backend document chunks and chat about them.
#[derive(Parser)]
#[command(
    name = "chunkwise",
    about = "Chunkwise: browse, edit and commit document chunks, and chat about a session",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/chunkwise.toml`. A missing file means defaults.
    #[arg(long, global = true, default_value = "./config/chunkwise.toml")]
    config: PathBuf,

    /// Log request plumbing (same as `RUST_LOG=debug`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage sessions.
    Sessions {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Inspect and edit the chunks of a session.
    ///
    /// Mutating actions load the session, apply the change and commit it
    /// in the same run.
    Chunks {
        #[command(subcommand)]
        action: ChunkAction,
    },

    /// Upload documents (.txt, .pdf, .docx, .md) into a session.
    Upload {
        /// Session id.
        session: String,

        /// Files to upload.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Chat with the assistant about a session.
    Chat {
        #[command(subcommand)]
        action: ChatAction,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// List sessions.
    List,
    /// Show one session.
    Show { id: String },
    /// Create a session from a .zip archive.
    Create {
        /// Archive to upload.
        archive: PathBuf,
        /// Display name (defaults to the archive name without extension).
        #[arg(long)]
        name: Option<String>,
    },
    /// Delete a session (removed from the local cache even if the backend fails).
    Delete { id: String },
}

#[derive(Subcommand)]
enum ChunkAction {
    /// List chunks grouped by file with word counts.
    List { session: String },
    /// Print one chunk.
    Show {
        session: String,
        /// Ordinal from `chunks list`.
        n: usize,
    },
    /// Replace a chunk's content.
    Edit {
        session: String,
        n: usize,
        /// File holding the new content.
        #[arg(long)]
        content_file: PathBuf,
    },
    /// Add a chunk to an existing or new file.
    Add {
        session: String,
        /// Target filename, e.g. `notes.md`.
        #[arg(long = "file")]
        filename: String,
        #[arg(long, default_value_t = 1)]
        page: i64,
        /// Initial content (defaults to the configured template).
        #[arg(long)]
        content_file: Option<PathBuf>,
    },
    /// Delete one chunk.
    Delete { session: String, n: usize },
    /// Delete every chunk of a file.
    DeleteFile { session: String, filename: String },
}

#[derive(Subcommand)]
enum ChatAction {
    /// Send a message and print the reply.
    Send {
        session: String,
        message: String,
        /// `gpt-5` or `ollama-local` (defaults to `chat.default_model`).
        #[arg(long)]
        model: Option<ChatModel>,
    },
    /// Print the local transcript.
    History {
        session: String,
        #[arg(long)]
        model: Option<ChatModel>,
    },
    /// Delete the local transcript.
    Delete {
        session: String,
        #[arg(long)]
        model: Option<ChatModel>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cfg: Config = config::load_config(&cli.config)?;
    let default_model = cfg.chat.default_model;

    match cli.command {
        Commands::Sessions { action } => match action {
            SessionAction::List => session_cmd::run_list_sessions(&cfg).await?,
            SessionAction::Show { id } => session_cmd::run_show_session(&cfg, &id).await?,
            SessionAction::Create { archive, name } => {
                session_cmd::run_create_session(&cfg, &archive, name.as_deref()).await?
            }
            SessionAction::Delete { id } => session_cmd::run_delete_session(&cfg, &id).await?,
        },
        Commands::Chunks { action } => match action {
            ChunkAction::List { session } => chunk_cmd::run_list_chunks(&cfg, &session).await?,
            ChunkAction::Show { session, n } => {
                chunk_cmd::run_show_chunk(&cfg, &session, n).await?
            }
            ChunkAction::Edit {
                session,
                n,
                content_file,
            } => chunk_cmd::run_edit_chunk(&cfg, &session, n, &content_file).await?,
            ChunkAction::Add {
                session,
                filename,
                page,
                content_file,
            } => {
                chunk_cmd::run_add_chunk(&cfg, &session, &filename, page, content_file.as_deref())
                    .await?
            }
            ChunkAction::Delete { session, n } => {
                chunk_cmd::run_delete_chunk(&cfg, &session, n).await?
            }
            ChunkAction::DeleteFile { session, filename } => {
                chunk_cmd::run_delete_file(&cfg, &session, &filename).await?
            }
        },
        Commands::Upload { session, files } => {
            chunk_cmd::run_upload(&cfg, &session, &files).await?
        }
        Commands::Chat { action } => match action {
            ChatAction::Send {
                session,
                message,
                model,
            } => {
                chat_cmd::run_chat_send(&cfg, &session, &message, model.unwrap_or(default_model))
                    .await?
            }
            ChatAction::History { session, model } => {
                chat_cmd::run_chat_history(&cfg, &session, model.unwrap_or(default_model))?
            }
            ChatAction::Delete { session, model } => {
                chat_cmd::run_chat_delete(&cfg, &session, model.unwrap_or(default_model))?
            }
        },
    }

    Ok(())
}
