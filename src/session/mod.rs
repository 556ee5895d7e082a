//! Scoped key/value store that carries onboarding state across the consent
//! redirect.
//!
//! In a browser this is session storage. The CLI persists it to a small JSON
//! file so that `securepulse onboard` and `securepulse callback` (two separate
//! processes) see the same values.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Temporary tenant id handed back by onboarding
pub const PENDING_TENANT_KEY: &str = "pending-tenant-id";

/// Nonce sent as `state` to the consent page, when state binding is on
pub const CONSENT_STATE_KEY: &str = "pending-consent-state";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt session file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("session store lock poisoned")]
    Poisoned,
}

/// Get/set/remove capability over string values
pub trait SessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError>;
    fn set(&self, key: &str, value: &str) -> Result<(), SessionError>;
    fn remove(&self, key: &str) -> Result<(), SessionError>;
}

impl<S: SessionStore + ?Sized> SessionStore for &S {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        (**self).remove(key)
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().map(|v| v.is_empty()).unwrap_or(true)
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        let values = self.values.lock().map_err(|_| SessionError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let mut values = self.values.lock().map_err(|_| SessionError::Poisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        let mut values = self.values.lock().map_err(|_| SessionError::Poisoned)?;
        values.remove(key);
        Ok(())
    }
}

/// JSON-file backed store. The file is removed once it holds no keys.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under `{dir}/session/session.json`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join("session").join("session.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, String>, SessionError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let contents = fs::read_to_string(&self.path).map_err(|source| SessionError::Io {
            path: self.path.clone(),
            source,
        })?;

        if contents.trim().is_empty() {
            return Ok(HashMap::new());
        }

        serde_json::from_str(&contents).map_err(|source| SessionError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, values: &HashMap<String, String>) -> Result<(), SessionError> {
        let io_err = |source| SessionError::Io {
            path: self.path.clone(),
            source,
        };

        if values.is_empty() {
            if self.path.exists() {
                fs::remove_file(&self.path).map_err(io_err)?;
            }
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let contents = serde_json::to_string_pretty(values).map_err(|source| {
            SessionError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, contents).map_err(io_err)
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let mut values = self.load()?;
        values.insert(key.to_string(), value.to_string());
        self.save(&values)
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        let mut values = self.load()?;
        if values.remove(key).is_some() {
            self.save(&values)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let store = MemorySessionStore::new();
        assert_eq!(store.get(PENDING_TENANT_KEY).unwrap(), None);

        store.set(PENDING_TENANT_KEY, "t-123").unwrap();
        assert_eq!(store.get(PENDING_TENANT_KEY).unwrap().as_deref(), Some("t-123"));

        store.remove(PENDING_TENANT_KEY).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_file_store_survives_new_instance() {
        let dir = tempfile::tempdir().unwrap();

        FileSessionStore::in_dir(dir.path())
            .set(PENDING_TENANT_KEY, "t-123")
            .unwrap();

        let reopened = FileSessionStore::in_dir(dir.path());
        assert_eq!(
            reopened.get(PENDING_TENANT_KEY).unwrap().as_deref(),
            Some("t-123")
        );
    }

    #[test]
    fn test_file_store_removes_file_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::in_dir(dir.path());

        store.set(PENDING_TENANT_KEY, "t-1").unwrap();
        store.set(CONSENT_STATE_KEY, "nonce").unwrap();
        assert!(store.path().exists());

        store.remove(PENDING_TENANT_KEY).unwrap();
        assert!(store.path().exists());
        assert_eq!(store.get(CONSENT_STATE_KEY).unwrap().as_deref(), Some("nonce"));

        store.remove(CONSENT_STATE_KEY).unwrap();
        assert!(!store.path().exists());

        // Removing from a missing file is a no-op
        store.remove(CONSENT_STATE_KEY).unwrap();
    }

    #[test]
    fn test_file_store_reports_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::in_dir(dir.path());
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "not json").unwrap();

        assert!(matches!(
            store.get(PENDING_TENANT_KEY),
            Err(SessionError::Corrupt { .. })
        ));
    }
}
