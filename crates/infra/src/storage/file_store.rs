//! JSON file session storage
//!
//! Writes go to a sibling temp file first and are renamed into place, so a
//! crash mid-write leaves the previous document intact.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use steward_core::session::persistence::to_document;
use steward_core::{PersistedSession, SessionStorage};
use steward_domain::{Result, StewardError};
use tracing::{debug, warn};

use crate::errors::InfraError;

/// [`SessionStorage`] persisting to a single JSON file
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SessionStorage for FileSessionStorage {
    fn load(&self) -> Result<Option<Value>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(InfraError::from(e).into()),
        };

        if contents.trim().is_empty() {
            return Ok(None);
        }

        match serde_json::from_str(&contents) {
            Ok(document) => Ok(Some(document)),
            Err(e) => {
                // Unreadable documents are treated as absent; the next save replaces them
                warn!(path = %self.path.display(), error = %e, "discarding corrupt session file");
                Ok(None)
            }
        }
    }

    fn save(&self, session: &PersistedSession) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(InfraError::from)?;
        }

        let document = to_document(session);
        let bytes = serde_json::to_vec_pretty(&document).map_err(InfraError::from)?;

        let temp = self.temp_path();
        fs::write(&temp, bytes).map_err(InfraError::from)?;
        fs::rename(&temp, &self.path).map_err(|e| {
            StewardError::Storage(format!("failed to replace {}: {e}", self.path.display()))
        })?;

        debug!(path = %self.path.display(), "session persisted");
        Ok(())
    }
}
