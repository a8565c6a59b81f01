use crate::core::session::{Session, SessionStore};
use anyhow::{Context, Result};
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use tracing::debug;

const SESSION_KEY: &str = "current";

/// Session persisted in a fjall partition under the data directory.
pub struct DiskSessionStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl DiskSessionStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create data directory: {}", path.display()))?;

        let keyspace = fjall::Config::new(path)
            .open()
            .with_context(|| format!("Failed to open session store at {}", path.display()))?;
        let partition = keyspace
            .open_partition("session", PartitionCreateOptions::default())
            .context("Failed to open session partition")?;

        debug!("Opened session store at {}", path.display());
        Ok(Self {
            keyspace,
            partition,
        })
    }
}

impl SessionStore for DiskSessionStore {
    fn load(&self) -> Result<Option<Session>> {
        match self.partition.get(SESSION_KEY)? {
            Some(bytes) => {
                let session: Session =
                    serde_json::from_slice(&bytes).context("Stored session is corrupt")?;
                debug!("Hydrated session from disk");
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    fn save(&self, session: &Session) -> Result<()> {
        self.partition
            .insert(SESSION_KEY, serde_json::to_vec(session)?)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!("Session saved");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.partition.remove(SESSION_KEY)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!("Session cleared");
        Ok(())
    }
}
