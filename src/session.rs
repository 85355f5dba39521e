use crate::{
    error::SessionError,
    models::{Principal, Realm},
};
use dashmap::DashMap;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::broadcast;

// ── Persistence port ───────────────────────────────────────────────────────

/// Raw key/value storage behind the session store. Values are opaque strings;
/// the store decides what they mean.
pub trait SessionBackend: Send + Sync {
    fn load(&self, key: &str) -> Option<String>;
    fn store(&self, key: &str, value: &str) -> Result<(), SessionError>;
    fn remove(&self, key: &str) -> Result<(), SessionError>;
}

/// Process-local backend. Used by tests and by anything that does not need
/// sessions to outlive the process.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
    inner: Arc<DashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionBackend for MemoryBackend {
    fn load(&self, key: &str) -> Option<String> {
        self.inner.get(key).map(|v| v.clone())
    }

    fn store(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.inner.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        self.inner.remove(key);
        Ok(())
    }
}

/// Durable backend: a single JSON object file mapping slot key → raw value.
///
/// Nothing is cached. Every read goes back to disk, so two processes sharing
/// the file see each other's writes on their next read.
#[derive(Clone, Debug)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, SessionError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, slots: &BTreeMap<String, String>) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(slots)?)?;
        Ok(())
    }
}

impl SessionBackend for FileBackend {
    fn load(&self, key: &str) -> Option<String> {
        match self.read_all() {
            Ok(mut slots) => slots.remove(key),
            Err(e) => {
                tracing::warn!("Failed to read session file {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn store(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let mut slots = self.read_all()?;
        slots.insert(key.to_owned(), value.to_owned());
        self.write_all(&slots)
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        let mut slots = self.read_all()?;
        if slots.remove(key).is_some() {
            self.write_all(&slots)?;
        }
        Ok(())
    }
}

// ── Session Store ──────────────────────────────────────────────────────────

/// Change notification for a realm's slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Established(Realm),
    Cleared(Realm),
}

/// Realm-keyed session slots over a [`SessionBackend`]. Each realm has its own
/// slot and nothing written to one is visible through the other.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    pub fn new(backend: impl SessionBackend + 'static) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            backend: Arc::new(backend),
            events,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Raw stored value for the realm, if any non-empty value is present.
    pub fn get(&self, realm: Realm) -> Option<String> {
        self.backend
            .load(realm.storage_key())
            .filter(|v| !v.is_empty())
    }

    /// Parsed principal for the realm. A stored value that is not valid JSON
    /// still yields a principal (named "User") since its presence alone counts
    /// as being signed in.
    pub fn principal(&self, realm: Realm) -> Option<Principal> {
        let raw = self.get(realm)?;
        let payload = match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Stored {} session is not valid JSON: {}", realm, e);
                serde_json::Value::String(raw)
            }
        };
        Some(Principal::from_payload(realm, payload))
    }

    pub fn set(&self, realm: Realm, principal: &Principal) -> Result<(), SessionError> {
        let raw = serde_json::to_string(&principal.payload)?;
        self.backend.store(realm.storage_key(), &raw)?;
        tracing::info!("Session established for {} realm", realm);
        let _ = self.events.send(SessionEvent::Established(realm));
        Ok(())
    }

    pub fn clear(&self, realm: Realm) -> Result<(), SessionError> {
        self.backend.remove(realm.storage_key())?;
        tracing::info!("Session cleared for {} realm", realm);
        let _ = self.events.send(SessionEvent::Cleared(realm));
        Ok(())
    }

    /// Receive establish/clear notifications from this store handle and its clones.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}
