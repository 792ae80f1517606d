//! Wiring from configuration to the runtime collaborators.
//!
//! CLI commands call [`connect`] for the backend and [`open_store`] for the
//! local key-value store, then build controllers on top of them.

use std::sync::Arc;

use anyhow::Result;

use crate::backend::{Backend, HttpBackend};
use crate::config::Config;
use crate::store::{FileStore, KvStore};

pub fn connect(config: &Config) -> Result<Arc<dyn Backend>> {
    let backend = HttpBackend::new(&config.api)?;
    log::debug!("using backend at {}", backend.base_url());
    Ok(Arc::new(backend))
}

pub fn open_store(config: &Config) -> Arc<dyn KvStore> {
    Arc::new(FileStore::new(config.storage.path.clone()))
}
