//! In-memory session storage
//!
//! Used by tests and by hosts that keep one session per process without
//! durable storage.

use parking_lot::Mutex;
use serde_json::Value;
use steward_domain::Result;

use super::persistence::{to_document, PersistedSession};
use super::ports::SessionStorage;

/// [`SessionStorage`] backed by a mutex-guarded JSON document
#[derive(Debug, Default)]
pub struct InMemorySessionStorage {
    document: Mutex<Option<Value>>,
}

impl InMemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the storage with a raw document (e.g. from an older schema)
    pub fn with_document(document: Value) -> Self {
        Self { document: Mutex::new(Some(document)) }
    }

    /// The last saved document
    pub fn document(&self) -> Option<Value> {
        self.document.lock().clone()
    }
}

impl SessionStorage for InMemorySessionStorage {
    fn load(&self) -> Result<Option<Value>> {
        Ok(self.document.lock().clone())
    }

    fn save(&self, session: &PersistedSession) -> Result<()> {
        *self.document.lock() = Some(to_document(session));
        Ok(())
    }
}
