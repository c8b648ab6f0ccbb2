//! Workspace document store.
//!
//! The whole workspace lives in memory behind one mutex; persistence is
//! injected so the API crate never touches the filesystem directly.
//! Every write is snapshot-commit: handlers mutate a clone, the clone is
//! persisted, and only then does it replace the live document. A failed
//! handler or a failed save leaves prior state untouched.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use tracing::info;

use huddle_types::models::Workspace;

/// Storage backend seam. `JsonFile` is the production backend; tests
/// inject `InMemory`.
pub trait Persistence: Send + Sync + 'static {
    /// Load the persisted document, or `None` when nothing exists yet.
    fn load(&self) -> Result<Option<Workspace>>;
    fn save(&self, data: &Workspace) -> Result<()>;
}

/// Whole-document JSON file. Saves go through a temp file plus rename
/// so a crash mid-write cannot truncate the document.
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Persistence for JsonFile {
    fn load(&self) -> Result<Option<Workspace>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        let data = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse {}", self.path.display()))?;
        Ok(Some(data))
    }

    fn save(&self, data: &Workspace) -> Result<()> {
        let bytes = serde_json::to_vec(data).context("serialize workspace")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &bytes).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("rename into {}", self.path.display()))?;
        Ok(())
    }
}

/// No-op backend for tests: the document lives and dies with the store.
pub struct InMemory;

impl Persistence for InMemory {
    fn load(&self) -> Result<Option<Workspace>> {
        Ok(None)
    }

    fn save(&self, _data: &Workspace) -> Result<()> {
        Ok(())
    }
}

pub struct Store {
    data: Mutex<Workspace>,
    persistence: Box<dyn Persistence>,
}

impl Store {
    /// Open a store backed by a JSON file, creating a seeded document
    /// if none exists yet.
    pub fn open(path: &Path) -> Result<Self> {
        let store = Self::with_persistence(Box::new(JsonFile::new(path)))?;
        info!("workspace store opened at {}", path.display());
        Ok(store)
    }

    pub fn with_persistence(persistence: Box<dyn Persistence>) -> Result<Self> {
        let data = match persistence.load()? {
            Some(data) => data,
            None => {
                let fresh = Workspace::new();
                persistence.save(&fresh)?;
                fresh
            }
        };
        Ok(Self { data: Mutex::new(data), persistence })
    }

    /// Store for tests: nothing touches disk.
    pub fn in_memory() -> Self {
        Self {
            data: Mutex::new(Workspace::new()),
            persistence: Box::new(InMemory),
        }
    }

    pub fn read<T, E>(&self, f: impl FnOnce(&Workspace) -> Result<T, E>) -> Result<T, E>
    where
        E: From<anyhow::Error>,
    {
        let guard = self
            .data
            .lock()
            .map_err(|_| E::from(anyhow!("workspace store lock poisoned")))?;
        f(&guard)
    }

    /// Run a mutation under the single-writer boundary. The closure
    /// sees a clone of the document; its result decides whether the
    /// clone is persisted and committed.
    pub fn write<T, E>(&self, f: impl FnOnce(&mut Workspace) -> Result<T, E>) -> Result<T, E>
    where
        E: From<anyhow::Error>,
    {
        let mut guard = self
            .data
            .lock()
            .map_err(|_| E::from(anyhow!("workspace store lock poisoned")))?;
        let mut next = guard.clone();
        let out = f(&mut next)?;
        self.persistence.save(&next).map_err(E::from)?;
        *guard = next;
        Ok(out)
    }
}
