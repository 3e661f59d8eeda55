//! Runtime configuration shared by every front end.

use std::io;
use std::path::PathBuf;

use crate::store::{FileStore, KeyValueStore, MemoryStore};

/// Where statistics live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflexConfig {
    /// Directory holding the statistics blob.
    pub data_dir: PathBuf,
    /// Keep statistics in memory only; nothing is read from or written to disk.
    pub ephemeral: bool,
}

impl Default for ReflexConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("reflex-data"),
            ephemeral: false,
        }
    }
}

impl ReflexConfig {
    /// Open the configured backend.
    pub fn open_store(&self) -> io::Result<Box<dyn KeyValueStore>> {
        if self.ephemeral {
            return Ok(Box::new(MemoryStore::new()));
        }
        if self.data_dir.exists() && !self.data_dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("data dir {} is not a directory", self.data_dir.display()),
            ));
        }
        Ok(Box::new(FileStore::new(&self.data_dir)))
    }
}
