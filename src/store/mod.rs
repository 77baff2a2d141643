use anyhow::{Context, Result};
use fs_err as fs;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::wire::Idea;

pub const HISTORY_KEY: &str = "generatedObjects";
pub const COPIED_KEY: &str = "copiedPrompts";
pub const LAST_IDEAS_KEY: &str = "lastIdeas";

/// Durable string-valued key-value storage.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// One `<key>.json` file per key under a data directory.
#[derive(Debug, Clone)]
pub struct FileKvStore {
    dir: PathBuf,
}

impl FileKvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KvStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path)?))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        // write-then-rename so a crash never leaves half a file behind
        let tmp = NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("creating temp file in {}", self.dir.display()))?;
        fs::write(tmp.path(), value)?;
        tmp.persist(&path)
            .with_context(|| format!("persisting {}", path.display()))?;
        Ok(())
    }
}

/// In-process storage; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryKvStore {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.inner.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A persisted, unordered set of strings.
///
/// Reads never fail the caller: missing or corrupt data loads as empty.
/// Writes are best-effort and synchronous on every mutation.
pub struct LabelSet<S: KvStore> {
    store: S,
    key: &'static str,
    labels: BTreeSet<String>,
}

impl<S: KvStore> LabelSet<S> {
    pub fn open(store: S, key: &'static str) -> Self {
        let mut set = Self { store, key, labels: BTreeSet::new() };
        set.load();
        set
    }

    /// Re-reads the persisted state.
    pub fn load(&mut self) -> BTreeSet<String> {
        self.labels = match self.store.get(self.key) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(items) => items.into_iter().collect(),
                Err(e) => {
                    debug!(key = self.key, error = %e, "corrupt set in storage; starting empty");
                    BTreeSet::new()
                }
            },
            Ok(None) => BTreeSet::new(),
            Err(e) => {
                debug!(key = self.key, error = %e, "storage read failed; starting empty");
                BTreeSet::new()
            }
        };
        self.labels.clone()
    }

    /// Union with `labels`, persisted. Returns the new contents.
    pub fn merge<I>(&mut self, labels: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = String>,
    {
        let before = self.labels.len();
        self.labels.extend(labels);
        if self.labels.len() != before {
            self.persist();
        }
        self.labels.clone()
    }

    /// Returns true when the label was new.
    pub fn insert(&mut self, label: impl Into<String>) -> bool {
        let added = self.labels.insert(label.into());
        if added {
            self.persist();
        }
        added
    }

    pub fn clear(&mut self) {
        self.labels.clear();
        self.persist();
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &BTreeSet<String> {
        &self.labels
    }

    fn persist(&self) {
        let items: Vec<&String> = self.labels.iter().collect();
        let result = serde_json::to_string(&items)
            .map_err(anyhow::Error::from)
            .and_then(|json| self.store.set(self.key, &json));
        if let Err(e) = result {
            warn!(key = self.key, error = %e, "failed to persist set");
        }
    }
}

/// The most recent successful batch, so copy/show/export survive restarts.
pub struct IdeaBatch<S: KvStore> {
    store: S,
    ideas: Vec<Idea>,
}

impl<S: KvStore> IdeaBatch<S> {
    pub fn open(store: S) -> Self {
        let ideas = match store.get(LAST_IDEAS_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                debug!(error = %e, "corrupt last batch; starting empty");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                debug!(error = %e, "storage read failed; starting empty");
                Vec::new()
            }
        };
        Self { store, ideas }
    }

    pub fn replace(&mut self, ideas: Vec<Idea>) {
        self.ideas = ideas;
        let result = serde_json::to_string(&self.ideas)
            .map_err(anyhow::Error::from)
            .and_then(|json| self.store.set(LAST_IDEAS_KEY, &json));
        if let Err(e) = result {
            warn!(error = %e, "failed to persist last batch");
        }
    }

    pub fn ideas(&self) -> &[Idea] {
        &self.ideas
    }
}
