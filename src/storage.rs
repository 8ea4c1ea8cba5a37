//! Key/value persistence supplied by the host runtime.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::Result;

pub trait Storage: Send + Sync {
    /// Stored value for `key`, or `default` when absent.
    fn get(&self, key: &str, default: Value) -> Value;

    fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// In-process storage; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<Map<String, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str, default: Value) -> Value {
        self.values
            .lock()
            .ok()
            .and_then(|values| values.get(key).cloned())
            .unwrap_or(default)
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.to_string(), value);
        }
        Ok(())
    }
}

/// One JSON object on disk, rewritten whole on every `set`.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    values: Mutex<Map<String, Value>>,
}

impl FileStorage {
    /// Open the blob at `path`. A missing or corrupt file starts empty.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let values = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<Map<String, Value>>(&content) {
                Ok(values) => values,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Discarding unreadable storage blob");
                    Map::new()
                }
            }
        } else {
            Map::new()
        };

        debug!(path = %path.display(), keys = values.len(), "Opened storage");
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, values: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string(values)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str, default: Value) -> Value {
        self.values
            .lock()
            .ok()
            .and_then(|values| values.get(key).cloned())
            .unwrap_or(default)
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let snapshot = match self.values.lock() {
            Ok(mut values) => {
                values.insert(key.to_string(), value);
                values.clone()
            }
            Err(_) => return Ok(()),
        };
        self.write(&snapshot)
    }
}
