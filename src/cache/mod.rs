pub mod envelope;

use std::collections::HashMap;
use std::hash::Hash;
use std::path::Path;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::config::MixinDetection;
use crate::error::Result;
use crate::parser::exports::FileExports;
use crate::parser::heritage::FileHeritage;

use envelope::{CACHE_VERSION, CacheEnvelope, Record};

/// Content fingerprint of a source file.
pub fn fingerprint(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

/// A file's identity inside the cache: project name plus relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub project: String,
    pub path: String,
}

impl CacheKey {
    pub fn new(project: &str, path: &str) -> Self {
        Self {
            project: project.to_owned(),
            path: path.to_owned(),
        }
    }
}

/// What extracting one file produced. Failures are cached too, so a cache hit
/// reproduces the same warning as a fresh parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileExtraction<T> {
    Parsed(T),
    Failed(String),
}

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    fingerprint: String,
    outcome: FileExtraction<T>,
}

/// One namespace of the extraction cache.
#[derive(Debug)]
pub struct ExtractionStore<T> {
    entries: RwLock<HashMap<CacheKey, CacheEntry<T>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<T> Default for ExtractionStore<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }
}

impl<T: Clone> ExtractionStore<T> {
    /// The cached outcome, if the stored fingerprint matches.
    pub fn get(&self, key: &CacheKey, fingerprint: &str) -> Option<FileExtraction<T>> {
        let found = self
            .entries
            .read()
            .ok()
            .and_then(|entries| {
                entries
                    .get(key)
                    .filter(|entry| entry.fingerprint == fingerprint)
                    .map(|entry| entry.outcome.clone())
            });
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Store (or replace) the outcome for `key`.
    pub fn put(&self, key: CacheKey, fingerprint: String, outcome: FileExtraction<T>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                key,
                CacheEntry {
                    fingerprint,
                    outcome,
                },
            );
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.len(),
        }
    }

    fn records(&self) -> Vec<Record<T>> {
        let Ok(entries) = self.entries.read() else {
            return Vec::new();
        };
        let mut records: Vec<Record<T>> = entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.fingerprint.clone(), entry.outcome.clone()))
            .collect();
        records.sort_by(|a, b| (&a.0.project, &a.0.path).cmp(&(&b.0.project, &b.0.path)));
        records
    }

    fn restore(&self, records: Vec<Record<T>>) {
        for (key, fingerprint, outcome) in records {
            self.put(key, fingerprint, outcome);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

/// Per-file extraction memo, with export and heritage results in separate namespaces.
///
/// A disabled layer never returns a hit and never stores anything, which makes it
/// indistinguishable from an always-empty cache.
#[derive(Debug)]
pub struct CacheLayer {
    enabled: bool,
    mixin_detection: MixinDetection,
    pub exports: ExtractionStore<FileExports>,
    pub heritage: ExtractionStore<FileHeritage>,
}

impl CacheLayer {
    pub fn new(enabled: bool, mixin_detection: MixinDetection) -> Self {
        Self {
            enabled,
            mixin_detection,
            exports: ExtractionStore::default(),
            heritage: ExtractionStore::default(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(false, MixinDetection::default())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Return the cached outcome from `store`, or run `extract` and remember its result.
    pub fn get_or_extract<T: Clone>(
        &self,
        store: &ExtractionStore<T>,
        key: CacheKey,
        fingerprint: &str,
        extract: impl FnOnce() -> FileExtraction<T>,
    ) -> FileExtraction<T> {
        if !self.enabled {
            return extract();
        }
        if let Some(outcome) = store.get(&key, fingerprint) {
            tracing::trace!(project = %key.project, path = %key.path, "cache hit");
            return outcome;
        }
        let outcome = extract();
        store.put(key, fingerprint.to_owned(), outcome.clone());
        outcome
    }

    /// Populate from a saved envelope in `dir`; a missing or stale file leaves the cache empty.
    pub fn load_from(&self, dir: &Path) {
        if !self.enabled {
            return;
        }
        if let Some(envelope) = envelope::load_cache(dir, self.mixin_detection) {
            self.exports.restore(envelope.exports);
            self.heritage.restore(envelope.heritage);
            tracing::debug!(
                exports = self.exports.len(),
                heritage = self.heritage.len(),
                "extraction cache loaded"
            );
        }
    }

    /// Persist both namespaces to `dir`. A disabled layer writes nothing.
    pub fn save_to(&self, dir: &Path) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let envelope = CacheEnvelope {
            version: CACHE_VERSION,
            mixin_detection: self.mixin_detection,
            exports: self.exports.records(),
            heritage: self.heritage.records(),
        };
        envelope::save_cache(dir, &envelope)
    }
}
