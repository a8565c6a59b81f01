pub mod disk;
pub mod memory;

use crate::core::config::AppConfig;
use crate::core::session::SessionStore;
use anyhow::Result;
use disk::DiskSessionStore;
use memory::MemorySessionStore;
use tracing::warn;

/// Opens the on-disk session store, falling back to memory when the data
/// directory is unusable so read-only commands still run.
pub fn open_session_store(config: &AppConfig) -> Result<Box<dyn SessionStore>> {
    let path = config.default_data_path()?.join("session");
    match DiskSessionStore::open(&path) {
        Ok(store) => Ok(Box::new(store)),
        Err(e) => {
            warn!(error = %e, "Session store unavailable, session will not persist");
            Ok(Box::new(MemorySessionStore::new()))
        }
    }
}
