//! On-disk caches that survive between runs.
//!
//! Both caches sit on top of [`JsonFile`], a tiny repository that loads a whole
//! JSON document and rewrites it wholesale on save. A missing or unreadable file
//! loads as an empty cache: redoing work is preferred over refusing to run.
//!
//! - [`UrlCache`]: every article URL already deep-fetched, owned by ingestion
//! - [`SummaryCache`]: source URL to generated headline/summary, owned by the
//!   summarizer and written through after every new entry

use crate::error::Result;
use crate::models::CachedSummary;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashSet};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// A JSON document on disk holding one value of `T`.
#[derive(Debug, Clone)]
pub struct JsonFile<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T> JsonFile<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document, falling back to `T::default()` when it is absent or
    /// does not parse.
    pub async fn load(&self) -> T {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No cache file yet");
                return T::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Cache unreadable; starting empty");
                return T::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Cache corrupt; starting empty");
                T::default()
            }
        }
    }

    /// Replace the document with `value`.
    ///
    /// Writes to a sibling temp file first so a crash mid-write leaves the
    /// previous version intact.
    pub async fn save(&self, value: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(value)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// Append-only set of source URLs seen in earlier runs.
#[derive(Debug)]
pub struct UrlCache {
    file: JsonFile<Vec<String>>,
    urls: Vec<String>,
    seen: HashSet<String>,
}

impl UrlCache {
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let file = JsonFile::new(path.as_ref());
        let mut cache = Self {
            file,
            urls: Vec::new(),
            seen: HashSet::new(),
        };
        let stored = cache.file.load().await;
        cache.extend(stored);
        info!(count = cache.len(), "Loaded URL cache");
        cache
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Add URLs not seen before, keeping first-insertion order.
    pub fn extend<I>(&mut self, urls: I)
    where
        I: IntoIterator<Item = String>,
    {
        for url in urls {
            if self.seen.insert(url.clone()) {
                self.urls.push(url);
            }
        }
    }

    pub async fn save(&self) -> Result<()> {
        self.file.save(&self.urls).await?;
        info!(count = self.len(), path = %self.file.path().display(), "Saved URL cache");
        Ok(())
    }
}

/// Generated headline/summary per source URL.
#[derive(Debug)]
pub struct SummaryCache {
    file: JsonFile<BTreeMap<String, CachedSummary>>,
    entries: BTreeMap<String, CachedSummary>,
}

impl SummaryCache {
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let file = JsonFile::new(path.as_ref());
        let entries: BTreeMap<String, CachedSummary> = file.load().await;
        info!(count = entries.len(), "Loaded summary cache");
        Self { file, entries }
    }

    pub fn get(&self, source: &str) -> Option<&CachedSummary> {
        self.entries.get(source)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a new summary and persist the whole cache immediately.
    pub async fn insert(&mut self, source: String, summary: CachedSummary) -> Result<()> {
        self.entries.insert(source, summary);
        self.file.save(&self.entries).await
    }
}
