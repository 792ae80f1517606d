//! # Chunkwise
//!
//! Client-side core of a document chunk editor with sessions and a chat
//! assistant.
//!
//! A user uploads a document archive, the backend splits it into chunks,
//! and the editor lets the user browse, edit, add and delete chunks before
//! committing everything back. Local edits are tracked against the backend
//! of record with content hashes and a per-chunk status.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌─────────────┐
//! │ SessionStore │──▶│  ChunkEditor  │──▶│  Reconciler │
//! │ (sessions)   │   │ (lifecycle)   │   │  (commit)   │
//! └──────┬───────┘   └───────┬───────┘   └──────┬──────┘
//!        │                   │                  │
//!        ▼                   ▼                  ▼
//!   ┌─────────┐        ┌───────────────────────────┐
//!   │ KvStore │◀──────▶│      Backend (HTTP)       │
//!   └─────────┘        └───────────────────────────┘
//!        ▲                          ▲
//!        └──── ChatController ──────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`hash`] | Content fingerprint for change detection |
//! | [`lifecycle`] | Pure chunk status transitions (edit/delete/create) |
//! | [`editor`] | In-memory chunk collection controller |
//! | [`commit`] | Change summary, commit push and post-commit baseline |
//! | [`uploads`] | Pending raw-file uploads |
//! | [`sessions`] | Session store adapter with local mirror |
//! | [`chat`] | Chat transcripts and optimistic send |
//! | [`backend`] | Backend trait and `reqwest` implementation |
//! | [`store`] | Local key-value storage |
//! | [`config`] | TOML configuration |
//! | [`error`] | Error taxonomy |

pub mod backend;
pub mod chat;
pub mod chat_cmd;
pub mod chunk_cmd;
pub mod client;
pub mod commit;
pub mod config;
pub mod editor;
pub mod error;
pub mod hash;
pub mod lifecycle;
pub mod models;
pub mod session_cmd;
pub mod sessions;
pub mod store;
pub mod uploads;
